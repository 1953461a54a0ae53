//! Register bank information for a global instruction selector
//!
//! Banks are built once per backend in a `RegBankRegistry`, by creating
//! each bank and closing its coverage over the register class hierarchy.
//! A `RegisterBankInfo` implementation then answers, for any instruction,
//! which bank(s) each operand's value should live in.

pub mod bank;
pub mod inference;
pub mod info;
pub mod mapping;
pub mod registry;
pub mod resolve;
pub mod table;

#[cfg(test)]
mod tests;

pub use bank::{BankDisplay, BankError, RegisterBank};
pub use info::RegisterBankInfo;
pub use mapping::{
    InstructionMapping, InstructionMappings, MappingError, MappingId, PartialMapping, ValueMapping,
    DEFAULT_MAPPING_ID, INVALID_MAPPING_ID,
};
pub use registry::RegBankRegistry;
pub use resolve::size_in_bits;
pub use table::{InitError, TableRegisterBankInfo};
