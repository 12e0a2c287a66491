//! Top-level assembler pipeline.
//!
//! This module wires the phases together:
//!
//! 1. Parsing every source line into a `ParsedLine`
//! 2. **Pass 1**: offset assignment and symbol table construction
//! 3. **Pass 2**: encoding to the flat output buffer
//!
//! The main entry points are [`assemble_source`] for in-memory text and
//! [`assemble_file`] for a source file path. Assembly stops at the first
//! failing line and reports its number and raw text.

use std::path::Path;

use isa_core::{SpecialRegistry, Width};

use crate::encoder::{encode_line, EncodeError};
use crate::parser::{parse_line, ParseError};
use crate::source::{read_lines, SourceLine};
use crate::symbols::{assign_offsets, SymbolError, SymbolTable};

/// Configuration for one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Default operand width for the run, analogous to a processor's
    /// default bitness. Word-width instructions emit a size-override
    /// prefix only when this is not `Word`.
    pub mode: Width,
    /// Special pseudo-instruction registry for the run.
    pub specials: SpecialRegistry,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            mode: Width::Dword,
            specials: SpecialRegistry::with_builtins(),
        }
    }
}

impl AssemblerConfig {
    /// Creates a configuration with the given default operand width and
    /// the built-in special pseudo-instructions.
    #[must_use]
    pub fn with_mode(mode: Width) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Source location of a failing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File path, or `<source>` for in-memory input.
    pub file: String,
    /// 1-indexed line number.
    pub line: usize,
    /// The raw line text.
    pub text: String,
}

/// Assembly error with source location context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    /// Kind of error.
    pub kind: AssembleErrorKind,
    /// Source location if available.
    pub location: Option<SourceLocation>,
}

/// Classification of assembly errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleErrorKind {
    /// Parse error.
    Parse(ParseError),
    /// Symbol table error.
    Symbol(SymbolError),
    /// Encoding error.
    Encode(EncodeError),
    /// I/O error reading the source file.
    Io(String),
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            AssembleErrorKind::Parse(e) => write!(f, "{e}"),
            AssembleErrorKind::Symbol(e) => write!(f, "{e}"),
            AssembleErrorKind::Encode(e) => write!(f, "{e}"),
            AssembleErrorKind::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for AssembleError {}

/// An entry in the offset-to-source listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Output offset of this entry.
    pub offset: u64,
    /// Bytes emitted at this offset.
    pub bytes: Vec<u8>,
    /// Source line text.
    pub source: String,
}

/// Result of assembly: the flat binary plus metadata.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    /// Assembled binary bytes in source order.
    pub binary: Vec<u8>,
    /// Symbol table built during pass 1.
    pub symbols: SymbolTable,
    /// Offset-to-source mapping for listing output.
    pub listing: Vec<ListingEntry>,
}

/// Assembles in-memory source text.
///
/// # Errors
///
/// Returns an `AssembleError` carrying the failing line's number and raw
/// text when any phase fails.
pub fn assemble_source(
    source: &str,
    config: &AssemblerConfig,
) -> Result<AssembleResult, AssembleError> {
    let lines: Vec<SourceLine> = source
        .lines()
        .enumerate()
        .map(|(i, text)| SourceLine {
            text: text.to_string(),
            number: i + 1,
        })
        .collect();
    assemble_lines(&lines, "<source>", config)
}

/// Assembles a source file.
///
/// # Errors
///
/// Returns an `AssembleError` when the file cannot be read or any assembly
/// phase fails.
pub fn assemble_file(
    path: &Path,
    config: &AssemblerConfig,
) -> Result<AssembleResult, AssembleError> {
    let lines = read_lines(path).map_err(|e| AssembleError {
        kind: AssembleErrorKind::Io(e.to_string()),
        location: None,
    })?;
    assemble_lines(&lines, &path.to_string_lossy(), config)
}

fn assemble_lines(
    lines: &[SourceLine],
    file: &str,
    config: &AssemblerConfig,
) -> Result<AssembleResult, AssembleError> {
    let locate = |line_number: usize| {
        Some(SourceLocation {
            file: file.to_string(),
            line: line_number,
            text: lines
                .iter()
                .find(|source| source.number == line_number)
                .map(|source| source.text.clone())
                .unwrap_or_default(),
        })
    };

    let mut parsed = Vec::with_capacity(lines.len());
    for source in lines {
        let line = parse_line(&source.text, config.mode, source.number).map_err(|e| {
            let location = locate(e.line);
            AssembleError {
                kind: AssembleErrorKind::Parse(e),
                location,
            }
        })?;
        parsed.push(line);
    }

    let layout = assign_offsets(&parsed, &config.specials, config.mode).map_err(|e| {
        let location = locate(e.line);
        AssembleError {
            kind: AssembleErrorKind::Symbol(e),
            location,
        }
    })?;

    let mut binary = Vec::new();
    let mut listing = Vec::new();

    for line in &layout.lines {
        let bytes = encode_line(
            &line.parsed,
            &layout.symbols,
            &config.specials,
            config.mode,
            binary.len() as u64,
            line.source_line,
        )
        .map_err(|e| {
            let location = locate(e.line);
            AssembleError {
                kind: AssembleErrorKind::Encode(e),
                location,
            }
        })?;

        if !bytes.is_empty() {
            listing.push(ListingEntry {
                offset: line.offset,
                bytes: bytes.clone(),
                source: lines
                    .iter()
                    .find(|source| source.number == line.source_line)
                    .map(|source| source.text.clone())
                    .unwrap_or_default(),
            });
        }

        binary.extend_from_slice(&bytes);
    }

    Ok(AssembleResult {
        binary,
        symbols: layout.symbols,
        listing,
    })
}
