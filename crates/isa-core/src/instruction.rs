//! Operand and instruction model.

use crate::catalog::Register;
use crate::width::Width;

/// Classification of a parsed operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OperandKind {
    /// Direct register reference.
    Register,
    /// Numeric literal.
    Immediate,
    /// Bracketed absolute memory reference.
    Memory,
    /// Symbolic label reference, resolved during the encoding pass.
    Label,
}

/// One operand of an instruction, immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Operand {
    /// Operand classification.
    pub kind: OperandKind,
    /// Width this operand contributes to the instruction's governing width.
    pub width: Width,
    /// Register code, immediate value, or memory address.
    pub value: u64,
    /// Displacement from the base address. Always zero in this instruction
    /// set; bracketed base+offset forms are not supported.
    pub offset: u16,
    /// Referenced label name when `kind` is [`OperandKind::Label`].
    pub symbol: Option<String>,
}

impl Operand {
    /// Builds a register operand from a catalog entry.
    #[must_use]
    pub fn register(register: Register) -> Self {
        Self {
            kind: OperandKind::Register,
            width: register.width,
            value: u64::from(register.code),
            offset: 0,
            symbol: None,
        }
    }

    /// Builds an immediate operand; width is the smallest tier fitting
    /// `value`.
    #[must_use]
    pub fn immediate(value: u64) -> Self {
        Self {
            kind: OperandKind::Immediate,
            width: Width::minimal_for(value),
            value,
            offset: 0,
            symbol: None,
        }
    }

    /// Builds a memory operand for an absolute address.
    #[must_use]
    pub fn memory(address: u64) -> Self {
        Self {
            kind: OperandKind::Memory,
            width: Width::minimal_for(address),
            value: address,
            offset: 0,
            symbol: None,
        }
    }

    /// Builds an unresolved label operand.
    ///
    /// The width is fixed to the run's default operand width so instruction
    /// sizes stay identical before and after the label resolves.
    #[must_use]
    pub fn label(name: impl Into<String>, width: Width) -> Self {
        Self {
            kind: OperandKind::Label,
            width,
            value: 0,
            offset: 0,
            symbol: Some(name.into()),
        }
    }
}

/// A parsed instruction: mnemonic plus ordered operands.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// The mnemonic as written in the source.
    pub mnemonic: String,
    /// Operands in source order.
    pub operands: Vec<Operand>,
    /// Governing operand width: the maximum across operands, `Byte` when
    /// there are none.
    pub width: Width,
}

impl Instruction {
    /// Builds an instruction, computing the governing width.
    #[must_use]
    pub fn new(mnemonic: impl Into<String>, operands: Vec<Operand>) -> Self {
        let width = operands
            .iter()
            .map(|operand| operand.width)
            .max()
            .unwrap_or(Width::Byte);
        Self {
            mnemonic: mnemonic.into(),
            operands,
            width,
        }
    }
}
