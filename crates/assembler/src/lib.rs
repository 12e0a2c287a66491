//! tpasm assembler library.

use isa_core as _;

/// Top-level two-pass assembler pipeline.
pub mod assembler;
/// Instruction and directive encoding.
pub mod encoder;
/// Assembly parser for instructions, labels, and directives.
pub mod parser;
/// Source file ingestion.
pub mod source;
/// Symbol table and pass-1 offset assignment.
pub mod symbols;
