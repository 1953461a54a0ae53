//! Common types used throughout the register bank engine
//!
//! This module defines the identifiers and register handles that are shared
//! between the target description layer and the register bank engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Register class identifier (index into the target's class table)
pub type RegClassId = u32;

/// Register bank identifier (index into the register bank registry)
pub type RegBankId = u32;

/// Sub-register index identifier
pub type SubRegIdx = u32;

/// A physical register of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysReg(pub u32);

impl PhysReg {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PhysReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$p{}", self.0)
    }
}

/// A virtual register living in a function's register table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VirtReg(pub u32);

impl VirtReg {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VirtReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A register operand handle
///
/// `NoRegister` is the "no register" sentinel: it never has a bank or a
/// size, and asking for either is a programming error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Register {
    #[default]
    NoRegister,
    Phys(PhysReg),
    Virt(VirtReg),
}

impl Register {
    pub fn phys(index: u32) -> Self {
        Register::Phys(PhysReg(index))
    }

    pub fn virt(index: u32) -> Self {
        Register::Virt(VirtReg(index))
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Register::Phys(_))
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Register::Virt(_))
    }

    /// False only for the `NoRegister` sentinel
    pub fn is_valid(&self) -> bool {
        !matches!(self, Register::NoRegister)
    }
}

impl From<PhysReg> for Register {
    fn from(reg: PhysReg) -> Self {
        Register::Phys(reg)
    }
}

impl From<VirtReg> for Register {
    fn from(reg: VirtReg) -> Self {
        Register::Virt(reg)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::NoRegister => write!(f, "$noreg"),
            Register::Phys(reg) => write!(f, "{}", reg),
            Register::Virt(reg) => write!(f, "{}", reg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_kinds() {
        assert!(Register::phys(3).is_physical());
        assert!(Register::virt(0).is_virtual());
        assert!(!Register::NoRegister.is_valid());
        assert!(Register::virt(0).is_valid());
        assert_eq!(Register::default(), Register::NoRegister);
    }

    #[test]
    fn test_register_display() {
        assert_eq!(Register::virt(7).to_string(), "%7");
        assert_eq!(Register::phys(2).to_string(), "$p2");
        assert_eq!(Register::NoRegister.to_string(), "$noreg");
    }
}
