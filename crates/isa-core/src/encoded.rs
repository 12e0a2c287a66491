//! Encoded instruction record and byte emission.

use crate::width::Width;

/// Operand-size prefix selecting 64-bit width.
pub const OPERAND_SIZE_64_PREFIX: u8 = 0x48;

/// Operand-size override prefix selecting 16-bit width.
pub const OPERAND_SIZE_16_PREFIX: u8 = 0x66;

/// Selects the size-override prefix for an instruction of governing width
/// `width` assembled under default operand width `mode`.
///
/// At most one prefix byte is ever produced: `Qword` always takes the
/// 64-bit prefix, `Word` takes the 16-bit override unless the default mode
/// is already `Word`, and `Dword`/`Byte` take none.
#[must_use]
pub const fn size_override_prefix(width: Width, mode: Width) -> Option<u8> {
    match width {
        Width::Qword => Some(OPERAND_SIZE_64_PREFIX),
        Width::Word => match mode {
            Width::Word => None,
            _ => Some(OPERAND_SIZE_16_PREFIX),
        },
        Width::Byte | Width::Dword => None,
    }
}

/// Field-level encoding of a single instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EncodedInstruction {
    /// Size-override prefix bytes, in emission order.
    pub prefixes: Vec<u8>,
    /// Primary opcode byte.
    pub opcode: u8,
    /// ModRM byte when the form requires one.
    pub modrm: Option<u8>,
    /// SIB byte; never produced by this instruction set.
    pub sib: Option<u8>,
    /// Displacement bytes, little-endian.
    pub displacement: Vec<u8>,
    /// Immediate bytes, little-endian.
    pub immediate: Vec<u8>,
}

impl EncodedInstruction {
    /// Flattens the record into its emitted byte sequence: prefixes, opcode,
    /// ModRM, SIB, displacement, immediate.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        bytes.extend_from_slice(&self.prefixes);
        bytes.push(self.opcode);
        if let Some(modrm) = self.modrm {
            bytes.push(modrm);
        }
        if let Some(sib) = self.sib {
            bytes.push(sib);
        }
        bytes.extend_from_slice(&self.displacement);
        bytes.extend_from_slice(&self.immediate);
        bytes
    }

    /// Total emitted length in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.prefixes.len()
            + 1
            + usize::from(self.modrm.is_some())
            + usize::from(self.sib.is_some())
            + self.displacement.len()
            + self.immediate.len()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Width::Byte, Width::Dword, None)]
    #[case(Width::Word, Width::Dword, Some(OPERAND_SIZE_16_PREFIX))]
    #[case(Width::Word, Width::Word, None)]
    #[case(Width::Word, Width::Qword, Some(OPERAND_SIZE_16_PREFIX))]
    #[case(Width::Dword, Width::Dword, None)]
    #[case(Width::Qword, Width::Dword, Some(OPERAND_SIZE_64_PREFIX))]
    #[case(Width::Qword, Width::Word, Some(OPERAND_SIZE_64_PREFIX))]
    fn prefix_selection(
        #[case] width: Width,
        #[case] mode: Width,
        #[case] expected: Option<u8>,
    ) {
        assert_eq!(size_override_prefix(width, mode), expected);
    }

    #[test]
    fn bytes_follow_fixed_field_order() {
        let encoded = EncodedInstruction {
            prefixes: vec![0x66],
            opcode: 0x89,
            modrm: Some(0xC8),
            sib: None,
            displacement: vec![0x10, 0x00],
            immediate: vec![0x34, 0x12],
        };
        assert_eq!(encoded.to_bytes(), vec![0x66, 0x89, 0xC8, 0x10, 0x00, 0x34, 0x12]);
        assert_eq!(encoded.byte_len(), 7);
    }

    #[test]
    fn bare_opcode_is_one_byte() {
        let encoded = EncodedInstruction {
            opcode: 0x90,
            ..EncodedInstruction::default()
        };
        assert_eq!(encoded.to_bytes(), vec![0x90]);
        assert_eq!(encoded.byte_len(), 1);
    }
}
