//! Register banks
//!
//! A register bank is a storage domain (general purpose, floating point,
//! vector, ...) described by the set of register classes it covers and the
//! widest of those classes. Banks are owned by the `RegBankRegistry`, which
//! is the only place that creates and populates them.

use rbank_common::{RegBankId, RegClassId, RegClassSet};
use rbank_target::TargetRegisterInfo;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BankError {
    #[error("Register bank at index {index} was never created")]
    NotCreated { index: RegBankId },

    #[error("Register bank at index {index} has ID {id}")]
    IdMismatch { index: RegBankId, id: RegBankId },

    #[error("Register bank '{bank}' is not valid (never created or never populated)")]
    Invalid { bank: String },

    #[error("Register bank '{bank}' tracks {tracked} register classes but the target has {expected}")]
    ClassCountMismatch { bank: String, tracked: u32, expected: u32 },

    #[error("Register bank '{bank}' covers {class} but not its sub-class {sub_class}")]
    UncoveredSubClass { bank: String, class: String, sub_class: String },

    #[error("Register bank '{bank}' is {size} bits wide, too small for {class} ({class_size} bits)")]
    TooSmall { bank: String, size: u32, class: String, class_size: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct RegisterBank {
    pub(crate) id: Option<RegBankId>,
    pub(crate) name: String,
    /// Size in bits of the widest covered class
    pub(crate) size: u32,
    pub(crate) covered: RegClassSet,
}

impl RegisterBank {
    /// Identifier of the bank; it equals the bank's index in the registry.
    ///
    /// Panics if the bank has not been created.
    pub fn id(&self) -> RegBankId {
        match self.id {
            Some(id) => id,
            None => panic!("register bank has not been created"),
        }
    }

    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum size in bits a value in this bank can have
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Created, named and populated with at least one class
    pub fn is_valid(&self) -> bool {
        self.id.is_some() && !self.name.is_empty() && self.size != 0 && !self.covered.is_empty()
    }

    /// Panics if the bank is not valid yet.
    pub fn covers(&self, rc: RegClassId) -> bool {
        assert!(self.is_valid(), "register bank '{}' has not been initialized yet", self.name);
        self.covered.contains(rc)
    }

    pub fn covered_classes(&self) -> &RegClassSet {
        &self.covered
    }

    /// Check that the bank is consistent with the target's class hierarchy:
    /// every sub-class of a covered class is covered too, and the bank is
    /// wide enough for all of them.
    pub fn try_verify(&self, tri: &dyn TargetRegisterInfo) -> Result<(), BankError> {
        if !self.is_valid() {
            return Err(BankError::Invalid { bank: self.name.clone() });
        }
        let num_classes = tri.num_reg_classes();
        if self.covered.universe() != num_classes {
            return Err(BankError::ClassCountMismatch {
                bank: self.name.clone(),
                tracked: self.covered.universe(),
                expected: num_classes,
            });
        }

        for rc in self.covered.iter() {
            // Probe every class rather than walking the sub-class mask, so
            // this check does not share code with the coverage closure.
            for sub in 0..num_classes {
                if !tri.has_sub_class_eq(rc, sub) {
                    continue;
                }
                let sub_size = tri.reg_class_size_in_bits(sub);
                if self.size < sub_size {
                    return Err(BankError::TooSmall {
                        bank: self.name.clone(),
                        size: self.size,
                        class: tri.reg_class_name(sub).to_string(),
                        class_size: sub_size,
                    });
                }
                if !self.covered.contains(sub) {
                    return Err(BankError::UncoveredSubClass {
                        bank: self.name.clone(),
                        class: tri.reg_class_name(rc).to_string(),
                        sub_class: tri.reg_class_name(sub).to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Panicking form of [`RegisterBank::try_verify`]
    pub fn verify(&self, tri: &dyn TargetRegisterInfo) {
        if let Err(err) = self.try_verify(tri) {
            panic!("{}", err);
        }
    }

    /// Detailed rendering including the covered class names
    pub fn display_with<'a>(&'a self, tri: &'a dyn TargetRegisterInfo) -> BankDisplay<'a> {
        BankDisplay { bank: self, tri }
    }
}

impl fmt::Display for RegisterBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub struct BankDisplay<'a> {
    bank: &'a RegisterBank,
    tri: &'a dyn TargetRegisterInfo,
}

impl fmt::Display for BankDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bank = self.bank;
        match bank.id {
            Some(id) => write!(f, "{}(ID = {}, Size = {})", bank.name, id, bank.size)?,
            None => write!(f, "<uncreated bank>")?,
        }
        write!(f, " covers: ")?;
        if bank.covered.is_empty() {
            return write!(f, "nothing");
        }
        for (i, rc) in bank.covered.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.tri.reg_class_name(rc))?;
        }
        Ok(())
    }
}
