//! Special pseudo-instruction registry with custom encoders.
//!
//! Pseudo-instructions that do not fit the generic prefix/opcode/ModRM
//! model are dispatched through a registry of tagged variants, each
//! carrying its own encoder. The registry is populated by a registration
//! step at startup and stays open to additional entries.

use thiserror::Error;

use crate::encoded::EncodedInstruction;
use crate::instruction::{Instruction, OperandKind};

/// Errors produced by special pseudo-instruction encoders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecialEncodeError {
    /// The operand list does not match the pseudo-instruction's form.
    #[error("{mnemonic} expects {expected}")]
    OperandMismatch {
        /// The pseudo-instruction name.
        mnemonic: &'static str,
        /// Description of the expected operand form.
        expected: &'static str,
    },
    /// A fill value does not fit in one byte.
    #[error("fill value {0:#x} does not fit in a byte")]
    ValueTooWide(u64),
    /// A repeat count of zero cannot be encoded.
    #[error("repeat count must be at least 1")]
    EmptyRepeat,
}

/// Special pseudo-instruction kinds, each carrying its own encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialOp {
    /// `fill <byte>, <count>`: the byte value repeated `count` times.
    Fill,
}

impl SpecialOp {
    /// Encodes `instr` with this pseudo-instruction's custom encoder,
    /// bypassing the generic prefix/opcode/ModRM path entirely.
    ///
    /// # Errors
    ///
    /// Returns [`SpecialEncodeError`] when the operand form or values are
    /// invalid for this pseudo-instruction.
    pub fn encode(self, instr: &Instruction) -> Result<EncodedInstruction, SpecialEncodeError> {
        match self {
            Self::Fill => encode_fill(instr),
        }
    }

    /// Emitted size in bytes, computable before encoding.
    ///
    /// # Errors
    ///
    /// Returns [`SpecialEncodeError`] when the operand form or values are
    /// invalid for this pseudo-instruction.
    pub fn encoded_len(self, instr: &Instruction) -> Result<u64, SpecialEncodeError> {
        match self {
            Self::Fill => fill_operands(instr).map(|(_, count)| count),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn fill_operands(instr: &Instruction) -> Result<(u8, u64), SpecialEncodeError> {
    match instr.operands.as_slice() {
        [value, count]
            if value.kind == OperandKind::Immediate && count.kind == OperandKind::Immediate =>
        {
            if value.value > 0xFF {
                return Err(SpecialEncodeError::ValueTooWide(value.value));
            }
            if count.value == 0 {
                return Err(SpecialEncodeError::EmptyRepeat);
            }
            Ok((value.value as u8, count.value))
        }
        _ => Err(SpecialEncodeError::OperandMismatch {
            mnemonic: "fill",
            expected: "a byte value and a repeat count",
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn encode_fill(instr: &Instruction) -> Result<EncodedInstruction, SpecialEncodeError> {
    let (value, count) = fill_operands(instr)?;
    Ok(EncodedInstruction {
        opcode: value,
        immediate: vec![value; count as usize - 1],
        ..EncodedInstruction::default()
    })
}

/// Registry of special pseudo-instructions, populated at startup.
#[derive(Debug, Clone, Default)]
pub struct SpecialRegistry {
    entries: Vec<(String, SpecialOp)>,
}

impl SpecialRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a registry with the built-in pseudo-instructions registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("fill", SpecialOp::Fill);
        registry
    }

    /// Registers `op` under `name`, replacing any existing entry of that
    /// name. Names are stored lowercase.
    pub fn register(&mut self, name: &str, op: SpecialOp) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
        {
            entry.1 = op;
        } else {
            self.entries.push((name.to_ascii_lowercase(), op));
        }
    }

    /// Looks up the pseudo-instruction registered under `name`. Matching is
    /// ASCII case-insensitive.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SpecialOp> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, op)| *op)
    }
}
