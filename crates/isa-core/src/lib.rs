//! Instruction catalog and encoding model for the tpasm assembler.

/// Operand width tiers and width inference.
pub mod width;
pub use width::Width;

/// Register and mnemonic catalogs.
pub mod catalog;
pub use catalog::{
    find_mnemonic, find_register, resolve_mnemonic, resolve_register, CatalogError, Register,
    MNEMONIC_TABLE, REGISTER_TABLE,
};

/// Operand and instruction model.
pub mod instruction;
pub use instruction::{Instruction, Operand, OperandKind};

/// Encoded instruction record and byte emission.
pub mod encoded;
pub use encoded::{
    size_override_prefix, EncodedInstruction, OPERAND_SIZE_16_PREFIX, OPERAND_SIZE_64_PREFIX,
};

/// Special pseudo-instruction registry with custom encoders.
pub mod special;
pub use special::{SpecialEncodeError, SpecialOp, SpecialRegistry};

#[cfg(test)]
use proptest as _;
