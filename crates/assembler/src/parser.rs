//! Assembly source line parser for instructions, labels, and directives.
//!
//! Each line is classified by its first non-space character: `;` starts a
//! comment, `:` a label definition, `.` a directive, and anything else is
//! an instruction line. Operand tokens are classified in precedence order:
//! register name, bracketed memory reference, integer literal, label
//! identifier.

use isa_core::{find_register, Instruction, Operand, Width};

/// A data or repetition directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `.db <literal>`: emit one byte, the literal truncated to 8 bits.
    Db(u8),
    /// `.times <count> <rest>`: replay a line `count` times.
    Times {
        /// Repeat count.
        count: u64,
        /// The replayed line.
        line: Box<ParsedLine>,
    },
}

/// A single classified source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Comment line; produces no output and no side effect.
    Comment,
    /// Label definition recording the current output offset.
    Label {
        /// Label name.
        name: String,
    },
    /// Data or repetition directive.
    Directive {
        /// The parsed directive.
        directive: Directive,
    },
    /// Instruction line.
    Instruction {
        /// The parsed instruction.
        instruction: Instruction,
    },
}

/// Parse error with the source line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Kind of parse error.
    pub kind: ParseErrorKind,
    /// 1-indexed source line number.
    pub line: usize,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The line is empty or matches no line shape.
    MalformedLine,
    /// An operand token is not a register, memory reference, literal, or
    /// label identifier.
    MalformedOperand(String),
    /// Unknown directive name.
    UnknownDirective(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedLine => write!(f, "malformed line"),
            Self::MalformedOperand(token) => write!(f, "malformed operand: {token}"),
            Self::UnknownDirective(name) => write!(f, "unknown directive: {name}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses one source line.
///
/// `mode` is the run's default operand width; it fixes the width of label
/// operands so instruction sizes are stable across both passes.
///
/// # Errors
///
/// Returns a `ParseError` for empty lines, unknown directives, and operand
/// tokens that match none of the operand grammars.
pub fn parse_line(line: &str, mode: Width, line_number: usize) -> Result<ParsedLine, ParseError> {
    let trimmed = line.trim();
    let Some(first) = trimmed.chars().next() else {
        return Err(ParseError {
            kind: ParseErrorKind::MalformedLine,
            line: line_number,
        });
    };

    match first {
        ';' => Ok(ParsedLine::Comment),
        ':' => parse_label(&trimmed[1..], line_number),
        '.' => parse_directive(&trimmed[1..], mode, line_number),
        _ => parse_instruction(trimmed, mode, line_number)
            .map(|instruction| ParsedLine::Instruction { instruction }),
    }
}

fn parse_label(text: &str, line_number: usize) -> Result<ParsedLine, ParseError> {
    let name = text.trim();
    if is_valid_label(name) {
        Ok(ParsedLine::Label {
            name: name.to_string(),
        })
    } else {
        Err(ParseError {
            kind: ParseErrorKind::MalformedLine,
            line: line_number,
        })
    }
}

fn is_valid_label(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_directive(text: &str, mode: Width, line_number: usize) -> Result<ParsedLine, ParseError> {
    let (name, args) = split_directive(text);

    let directive = match name.to_ascii_lowercase().as_str() {
        "db" => {
            let value = parse_literal_token(args, line_number)?;
            #[allow(clippy::cast_possible_truncation)]
            let byte = (value & 0xFF) as u8;
            Directive::Db(byte)
        }
        "times" => {
            let args = args.trim();
            let Some((count_token, rest)) = args.split_once(' ') else {
                return Err(ParseError {
                    kind: ParseErrorKind::MalformedLine,
                    line: line_number,
                });
            };
            let count = parse_literal_token(count_token, line_number)?;
            let inner = parse_line(rest, mode, line_number)?;
            Directive::Times {
                count,
                line: Box::new(inner),
            }
        }
        _ => {
            return Err(ParseError {
                kind: ParseErrorKind::UnknownDirective(name.to_string()),
                line: line_number,
            });
        }
    };

    Ok(ParsedLine::Directive { directive })
}

fn split_directive(text: &str) -> (&str, &str) {
    text.find(|c: char| c.is_whitespace())
        .map_or((text, ""), |pos| (&text[..pos], text[pos..].trim_start()))
}

fn parse_instruction(
    text: &str,
    mode: Width,
    line_number: usize,
) -> Result<Instruction, ParseError> {
    let (mnemonic, rest) = text
        .split_once(' ')
        .map_or((text, ""), |(mnemonic, rest)| (mnemonic, rest.trim()));

    let mut operands = Vec::new();
    if !rest.is_empty() {
        for token in rest.split(',') {
            operands.push(parse_operand(token.trim(), mode, line_number)?);
        }
    }

    Ok(Instruction::new(mnemonic, operands))
}

/// Parses one operand token.
///
/// # Errors
///
/// Returns [`ParseErrorKind::MalformedOperand`] when the token matches none
/// of the operand grammars.
pub fn parse_operand(token: &str, mode: Width, line_number: usize) -> Result<Operand, ParseError> {
    if let Some(register) = find_register(token) {
        return Ok(Operand::register(register));
    }

    if token.contains('[') {
        return parse_memory_operand(token, line_number);
    }

    if let Some(value) = parse_literal(token) {
        return Ok(Operand::immediate(value));
    }

    if is_valid_label(token) {
        return Ok(Operand::label(token, mode));
    }

    Err(malformed_operand(token, line_number))
}

fn parse_memory_operand(token: &str, line_number: usize) -> Result<Operand, ParseError> {
    let (Some(open), Some(close)) = (token.find('['), token.find(']')) else {
        return Err(malformed_operand(token, line_number));
    };
    if close < open {
        return Err(malformed_operand(token, line_number));
    }

    let contents = token[open + 1..close].trim();
    parse_literal(contents)
        .map(Operand::memory)
        .ok_or_else(|| malformed_operand(token, line_number))
}

fn parse_literal_token(token: &str, line_number: usize) -> Result<u64, ParseError> {
    parse_literal(token.trim()).ok_or_else(|| malformed_operand(token.trim(), line_number))
}

/// Parses an unsigned integer literal: decimal by default, hex with a `0x`
/// prefix, binary with a `0b` prefix.
fn parse_literal(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2).ok()
    } else {
        s.parse::<u64>().ok()
    }
}

fn malformed_operand(token: &str, line_number: usize) -> ParseError {
    ParseError {
        kind: ParseErrorKind::MalformedOperand(token.to_string()),
        line: line_number,
    }
}
