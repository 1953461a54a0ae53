//! Register Bank Info - Common Types and Utilities
//! 
//! This crate contains the identifiers, register handles and bit containers
//! shared by the target description layer and the register bank engine.

pub mod types;
pub mod bitset;
pub mod mask;

pub use types::*;
pub use bitset::{RegClassSet, SetBits};
pub use mask::BitMask;
