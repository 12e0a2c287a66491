//! Instruction and directive encoding (pass 2).
//!
//! Converts parsed lines into output bytes using the completed symbol
//! table. Instructions go through the special-registry dispatch first,
//! then the generic prefix/opcode/ModRM path; directives emit their data
//! directly, with `.times` replaying its line through the same pipeline.

use isa_core::{
    find_mnemonic, size_override_prefix, EncodedInstruction, Instruction, OperandKind,
    SpecialEncodeError, SpecialRegistry, Width,
};

use crate::parser::{Directive, ParsedLine};
use crate::symbols::SymbolTable;

/// Error during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    /// Kind of error.
    pub kind: EncodeErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of encoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// The mnemonic is in neither the mnemonic table nor the special
    /// registry.
    UnknownMnemonic(String),
    /// The operand count/kind combination has no defined encoding.
    UnsupportedEncoding(String),
    /// A label reference that the symbol table cannot resolve.
    UndefinedLabel(String),
    /// A special pseudo-instruction encoder rejected its operands.
    Special(SpecialEncodeError),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMnemonic(name) => write!(f, "unknown mnemonic: {name}"),
            Self::UnsupportedEncoding(reason) => write!(f, "unsupported encoding: {reason}"),
            Self::UndefinedLabel(name) => write!(f, "undefined label: {name}"),
            Self::Special(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Encodes one instruction into its field-level record.
///
/// Special pseudo-instructions bypass the generic path entirely. Otherwise
/// the governing width selects at most one size-override prefix, a
/// two-register form packs a register-direct ModRM byte (source in the reg
/// field, destination in r/m) and selects the wide opcode variant, and a
/// single operand is either folded into the opcode (register), emitted as
/// little-endian immediate bytes (immediate or resolved label), or
/// rejected (memory).
///
/// # Errors
///
/// Returns an `EncodeError` for unknown mnemonics, undefined labels, and
/// operand combinations with no defined encoding.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_instruction(
    instr: &Instruction,
    specials: &SpecialRegistry,
    symbols: &SymbolTable,
    mode: Width,
    source_line: usize,
) -> Result<EncodedInstruction, EncodeError> {
    if let Some(op) = specials.find(&instr.mnemonic) {
        return op.encode(instr).map_err(|e| EncodeError {
            kind: EncodeErrorKind::Special(e),
            line: source_line,
        });
    }

    let Some(opcode) = find_mnemonic(&instr.mnemonic) else {
        return Err(EncodeError {
            kind: EncodeErrorKind::UnknownMnemonic(instr.mnemonic.clone()),
            line: source_line,
        });
    };

    let mut encoded = EncodedInstruction {
        opcode,
        ..EncodedInstruction::default()
    };

    let width = instr.width;
    if let Some(prefix) = size_override_prefix(width, mode) {
        encoded.prefixes.push(prefix);
    }

    match instr.operands.as_slice() {
        [] => {}
        [dst, src] if dst.kind == OperandKind::Register && src.kind == OperandKind::Register => {
            encoded.modrm = Some(0b1100_0000 | ((src.value as u8) << 3) | dst.value as u8);
            if width != Width::Byte {
                encoded.opcode |= 0x01;
            }
        }
        [operand] => match operand.kind {
            OperandKind::Register => {
                encoded.opcode = encoded.opcode.wrapping_add(operand.value as u8);
            }
            OperandKind::Immediate => {
                encoded.immediate = immediate_bytes(operand.value, width);
            }
            OperandKind::Label => {
                let name = operand.symbol.as_deref().ok_or_else(|| EncodeError {
                    kind: EncodeErrorKind::UnsupportedEncoding(
                        "label reference without a name".to_string(),
                    ),
                    line: source_line,
                })?;
                let symbol = symbols.get(name).ok_or_else(|| EncodeError {
                    kind: EncodeErrorKind::UndefinedLabel(name.to_string()),
                    line: source_line,
                })?;
                encoded.immediate = immediate_bytes(symbol.offset, width);
            }
            OperandKind::Memory => {
                return Err(EncodeError {
                    kind: EncodeErrorKind::UnsupportedEncoding(
                        "memory operands have no defined encoding".to_string(),
                    ),
                    line: source_line,
                });
            }
        },
        [_, _] => {
            return Err(EncodeError {
                kind: EncodeErrorKind::UnsupportedEncoding(
                    "two-operand forms require two registers".to_string(),
                ),
                line: source_line,
            });
        }
        operands => {
            return Err(EncodeError {
                kind: EncodeErrorKind::UnsupportedEncoding(format!(
                    "no encoding for {} operands",
                    operands.len()
                )),
                line: source_line,
            });
        }
    }

    Ok(encoded)
}

fn immediate_bytes(value: u64, width: Width) -> Vec<u8> {
    value.to_le_bytes()[..width.byte_count()].to_vec()
}

/// Encodes a directive to bytes at `offset`.
///
/// # Errors
///
/// Returns an `EncodeError` when a `.times`-replayed line fails to encode.
pub fn encode_directive(
    directive: &Directive,
    symbols: &SymbolTable,
    specials: &SpecialRegistry,
    mode: Width,
    offset: u64,
    source_line: usize,
) -> Result<Vec<u8>, EncodeError> {
    match directive {
        Directive::Db(value) => Ok(vec![*value]),
        Directive::Times { count, line } => {
            let mut bytes = Vec::new();
            for _ in 0..*count {
                let repetition = encode_line(
                    line,
                    symbols,
                    specials,
                    mode,
                    offset + bytes.len() as u64,
                    source_line,
                )?;
                bytes.extend_from_slice(&repetition);
            }
            Ok(bytes)
        }
    }
}

/// Encodes a parsed line to bytes at `offset`.
///
/// Comment and label lines produce no bytes.
///
/// # Errors
///
/// Returns an `EncodeError` when instruction or directive encoding fails.
pub fn encode_line(
    parsed: &ParsedLine,
    symbols: &SymbolTable,
    specials: &SpecialRegistry,
    mode: Width,
    offset: u64,
    source_line: usize,
) -> Result<Vec<u8>, EncodeError> {
    match parsed {
        ParsedLine::Comment | ParsedLine::Label { .. } => Ok(Vec::new()),
        ParsedLine::Directive { directive } => {
            encode_directive(directive, symbols, specials, mode, offset, source_line)
        }
        ParsedLine::Instruction { instruction } => {
            encode_instruction(instruction, specials, symbols, mode, source_line)
                .map(|encoded| encoded.to_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use crate::symbols::Symbol;

    fn encode(line: &str, mode: Width) -> Result<Vec<u8>, EncodeError> {
        encode_with_symbols(line, mode, &SymbolTable::new())
    }

    fn encode_with_symbols(
        line: &str,
        mode: Width,
        symbols: &SymbolTable,
    ) -> Result<Vec<u8>, EncodeError> {
        let specials = SpecialRegistry::with_builtins();
        let parsed = parse_line(line, mode, 1).unwrap();
        encode_line(&parsed, symbols, &specials, mode, 0, 1)
    }

    #[test]
    fn encode_nop() {
        assert_eq!(encode("nop", Width::Dword).unwrap(), vec![0x90]);
    }

    #[test]
    fn encode_two_qword_registers() {
        assert_eq!(
            encode("mov rax, rcx", Width::Dword).unwrap(),
            vec![0x48, 0x89, 0xC8]
        );
    }

    #[test]
    fn encode_two_word_registers_in_word_mode() {
        assert_eq!(
            encode("mov ax, cx", Width::Word).unwrap(),
            vec![0x89, 0xC8]
        );
    }

    #[test]
    fn encode_two_word_registers_in_dword_mode() {
        assert_eq!(
            encode("mov ax, cx", Width::Dword).unwrap(),
            vec![0x66, 0x89, 0xC8]
        );
    }

    #[test]
    fn encode_two_byte_registers_keeps_the_byte_opcode() {
        assert_eq!(encode("mov al, cl", Width::Dword).unwrap(), vec![0x88, 0xC8]);
    }

    #[test]
    fn modrm_places_source_in_reg_and_destination_in_rm() {
        let bytes = encode("add bx, dx", Width::Word).unwrap();
        assert_eq!(bytes, vec![0x01, 0b1101_0011]);
    }

    #[test]
    fn register_coded_opcode_adds_the_register_code() {
        assert_eq!(encode("mvi cx", Width::Word).unwrap(), vec![0xB9]);
        assert_eq!(encode("inc di", Width::Word).unwrap(), vec![0x47]);
    }

    #[test]
    fn single_immediate_emits_little_endian_bytes() {
        assert_eq!(
            encode("push 500", Width::Dword).unwrap(),
            vec![0x66, 0x06, 0xF4, 0x01]
        );
        assert_eq!(encode("push 200", Width::Dword).unwrap(), vec![0x06, 0xC8]);
    }

    #[test]
    fn qword_immediate_takes_the_64_bit_prefix() {
        let bytes = encode("push 5000000000", Width::Dword).unwrap();
        assert_eq!(bytes[0], 0x48);
        assert_eq!(bytes[1], 0x06);
        assert_eq!(bytes.len(), 10);
        assert_eq!(
            &bytes[2..],
            &5_000_000_000u64.to_le_bytes()[..]
        );
    }

    #[test]
    fn backward_label_resolves_to_recorded_offset() {
        let mut symbols = SymbolTable::new();
        symbols.insert(
            "start".to_string(),
            Symbol {
                offset: 0x10,
                defined_at: 1,
            },
        );
        let bytes = encode_with_symbols("push start", Width::Dword, &symbols).unwrap();
        assert_eq!(bytes, vec![0x06, 0x10, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn undefined_label_is_an_error() {
        let result = encode("push nowhere", Width::Dword);
        assert!(matches!(
            result,
            Err(EncodeError {
                kind: EncodeErrorKind::UndefinedLabel(name),
                ..
            }) if name == "nowhere"
        ));
    }

    #[test]
    fn unknown_mnemonic_is_an_error() {
        let result = encode("foo ax, cx", Width::Dword);
        assert!(matches!(
            result,
            Err(EncodeError {
                kind: EncodeErrorKind::UnknownMnemonic(name),
                line: 1
            }) if name == "foo"
        ));
    }

    #[test]
    fn memory_operand_is_unsupported() {
        let result = encode("push [0x100]", Width::Dword);
        assert!(matches!(
            result,
            Err(EncodeError {
                kind: EncodeErrorKind::UnsupportedEncoding(_),
                ..
            })
        ));
    }

    #[test]
    fn mixed_two_operand_form_is_unsupported() {
        let result = encode("mov ax, 5", Width::Dword);
        assert!(matches!(
            result,
            Err(EncodeError {
                kind: EncodeErrorKind::UnsupportedEncoding(_),
                ..
            })
        ));
    }

    #[test]
    fn three_operands_are_unsupported() {
        let result = encode("add ax, cx, dx", Width::Dword);
        assert!(matches!(
            result,
            Err(EncodeError {
                kind: EncodeErrorKind::UnsupportedEncoding(_),
                ..
            })
        ));
    }

    #[test]
    fn encode_db() {
        assert_eq!(encode(".db 0x41", Width::Dword).unwrap(), vec![0x41]);
    }

    #[test]
    fn encode_times_replays_the_line() {
        assert_eq!(
            encode(".times 3 .db 0x41", Width::Dword).unwrap(),
            vec![0x41, 0x41, 0x41]
        );
    }

    #[test]
    fn encode_times_zero_emits_nothing() {
        assert_eq!(
            encode(".times 0 .db 0x41", Width::Dword).unwrap(),
            Vec::<u8>::new()
        );
    }

    #[test]
    fn encode_fill_through_the_special_registry() {
        assert_eq!(
            encode("fill 0xAB, 3", Width::Dword).unwrap(),
            vec![0xAB, 0xAB, 0xAB]
        );
    }

    #[test]
    fn fill_errors_surface_with_the_source_line() {
        let result = encode("fill 0xAB, 0", Width::Dword);
        assert!(matches!(
            result,
            Err(EncodeError {
                kind: EncodeErrorKind::Special(SpecialEncodeError::EmptyRepeat),
                line: 1
            })
        ));
    }

    #[test]
    fn comments_and_labels_emit_nothing() {
        assert_eq!(encode("; note", Width::Dword).unwrap(), Vec::<u8>::new());
        assert_eq!(encode(":here", Width::Dword).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn encoded_bytes_match_pass_one_sizes() {
        let specials = SpecialRegistry::with_builtins();
        let symbols = SymbolTable::new();
        for line in [
            "nop",
            "mov rax, rcx",
            "mov ax, cx",
            "mov al, cl",
            "push 500",
            "inc cx",
            "mvi dx",
            "fill 0x00, 7",
            ".db 1",
            ".times 4 .db 2",
        ] {
            let parsed = parse_line(line, Width::Dword, 1).unwrap();
            let bytes = encode_line(&parsed, &symbols, &specials, Width::Dword, 0, 1).unwrap();
            assert_eq!(
                bytes.len() as u64,
                crate::symbols::line_size(&parsed, &specials, Width::Dword),
                "size mismatch for {line}"
            );
        }
    }
}
