//! Symbol table and pass-1 offset assignment.
//!
//! The first pass walks parsed lines, computing each line's encoded size
//! and recording every label's offset, which equals the output length at
//! the moment the label line is reached. Sizes never depend on label
//! values (label operands carry the run's fixed default width), so the
//! completed table lets the second pass resolve both backward and forward
//! references.

use std::collections::HashMap;

use isa_core::{size_override_prefix, Instruction, OperandKind, SpecialRegistry, Width};

use crate::parser::{Directive, ParsedLine};

/// A label definition: its output offset and the line that defined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Byte offset within the output buffer.
    pub offset: u64,
    /// Source line number where the label was defined.
    pub defined_at: usize,
}

/// Symbol table mapping label names to their definitions.
pub type SymbolTable = HashMap<String, Symbol>;

/// Error during pass-1 offset assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of symbol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolErrorKind {
    /// Duplicate label definition.
    DuplicateLabel {
        /// The label name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
}

impl std::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for SymbolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateLabel {
                name,
                first_definition,
            } => {
                write!(
                    f,
                    "duplicate label '{name}' (first defined at line {first_definition})"
                )
            }
        }
    }
}

impl std::error::Error for SymbolError {}

/// A parsed line with its assigned output offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetLine {
    /// Byte offset where this line's output begins.
    pub offset: u64,
    /// Size in bytes of this line's output.
    pub size: u64,
    /// The parsed line content.
    pub parsed: ParsedLine,
    /// 1-indexed source line number.
    pub source_line: usize,
}

/// Result of pass-1 offset assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// All lines with their assigned offsets, in source order.
    pub lines: Vec<OffsetLine>,
    /// Symbol table of label definitions.
    pub symbols: SymbolTable,
    /// Total output size in bytes.
    pub end_offset: u64,
}

/// Computes the encoded byte size of a parsed line.
///
/// Comment and label lines occupy no bytes; `.db` occupies one; `.times`
/// multiplies the replayed line's size by the count.
#[must_use]
pub fn line_size(parsed: &ParsedLine, specials: &SpecialRegistry, mode: Width) -> u64 {
    match parsed {
        ParsedLine::Comment | ParsedLine::Label { .. } => 0,
        ParsedLine::Directive { directive } => directive_size(directive, specials, mode),
        ParsedLine::Instruction { instruction } => instruction_size(instruction, specials, mode),
    }
}

fn directive_size(directive: &Directive, specials: &SpecialRegistry, mode: Width) -> u64 {
    match directive {
        Directive::Db(_) => 1,
        Directive::Times { count, line } => count.saturating_mul(line_size(line, specials, mode)),
    }
}

/// Computes the encoded byte size of an instruction: prefix, opcode,
/// optional ModRM, and immediate bytes.
///
/// Mirrors the encoder's field layout. Instructions the encoder will
/// reject are sized as a bare opcode so the encoding pass reports the
/// error itself.
#[must_use]
pub fn instruction_size(instr: &Instruction, specials: &SpecialRegistry, mode: Width) -> u64 {
    if let Some(op) = specials.find(&instr.mnemonic) {
        return op.encoded_len(instr).unwrap_or(0);
    }

    let mut size = 1u64;
    if size_override_prefix(instr.width, mode).is_some() {
        size += 1;
    }
    match instr.operands.as_slice() {
        [dst, src] if dst.kind == OperandKind::Register && src.kind == OperandKind::Register => {
            size += 1;
        }
        [operand] if matches!(operand.kind, OperandKind::Immediate | OperandKind::Label) => {
            size += instr.width.byte_count() as u64;
        }
        _ => {}
    }
    size
}

/// Performs pass-1 offset assignment over parsed lines.
///
/// Source line numbers are the 1-indexed positions within `lines`.
///
/// # Errors
///
/// Returns a `SymbolError` when a label is defined twice, including a
/// label replayed by a `.times` directive with a count above one.
pub fn assign_offsets(
    lines: &[ParsedLine],
    specials: &SpecialRegistry,
    mode: Width,
) -> Result<Layout, SymbolError> {
    let mut symbols = SymbolTable::new();
    let mut offset_lines = Vec::with_capacity(lines.len());
    let mut pc: u64 = 0;

    for (i, parsed) in lines.iter().enumerate() {
        let source_line = i + 1;
        let offset = pc;
        record_line(parsed, source_line, &mut symbols, &mut pc, specials, mode)?;
        offset_lines.push(OffsetLine {
            offset,
            size: pc - offset,
            parsed: parsed.clone(),
            source_line,
        });
    }

    Ok(Layout {
        lines: offset_lines,
        symbols,
        end_offset: pc,
    })
}

fn record_line(
    parsed: &ParsedLine,
    source_line: usize,
    symbols: &mut SymbolTable,
    pc: &mut u64,
    specials: &SpecialRegistry,
    mode: Width,
) -> Result<(), SymbolError> {
    match parsed {
        ParsedLine::Comment => {}
        ParsedLine::Label { name } => {
            if let Some(existing) = symbols.get(name) {
                return Err(SymbolError {
                    kind: SymbolErrorKind::DuplicateLabel {
                        name: name.clone(),
                        first_definition: existing.defined_at,
                    },
                    line: source_line,
                });
            }
            symbols.insert(
                name.clone(),
                Symbol {
                    offset: *pc,
                    defined_at: source_line,
                },
            );
        }
        ParsedLine::Directive {
            directive: Directive::Times { count, line },
        } => {
            for _ in 0..*count {
                record_line(line, source_line, symbols, pc, specials, mode)?;
            }
        }
        ParsedLine::Directive {
            directive: Directive::Db(_),
        } => {
            *pc += 1;
        }
        ParsedLine::Instruction { instruction } => {
            *pc += instruction_size(instruction, specials, mode);
        }
    }
    Ok(())
}
