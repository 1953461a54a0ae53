//! Register bank registry and coverage closure
//!
//! The registry owns a fixed number of bank slots. During backend
//! initialization each slot is created once and then populated by one or
//! more coverage calls. After that the registry is only read, and can be
//! shared between threads mapping independent functions.

use crate::bank::{BankError, RegisterBank};
use log::{debug, trace};
use rbank_common::{RegBankId, RegClassId, RegClassSet, SetBits};
use rbank_target::TargetRegisterInfo;
use smallvec::{smallvec, SmallVec};

#[derive(Debug, Clone)]
pub struct RegBankRegistry {
    banks: Vec<RegisterBank>,
}

impl RegBankRegistry {
    /// Registry with `num_banks` uncreated slots
    pub fn new(num_banks: u32) -> Self {
        Self {
            banks: vec![RegisterBank::default(); num_banks as usize],
        }
    }

    pub fn num_reg_banks(&self) -> u32 {
        self.banks.len() as u32
    }

    /// Panics if `id` is out of range.
    pub fn reg_bank(&self, id: RegBankId) -> &RegisterBank {
        assert!(
            id < self.num_reg_banks(),
            "register bank {} out of range ({} banks)",
            id,
            self.banks.len()
        );
        &self.banks[id as usize]
    }

    fn reg_bank_mut(&mut self, id: RegBankId) -> &mut RegisterBank {
        assert!(
            id < self.num_reg_banks(),
            "register bank {} out of range ({} banks)",
            id,
            self.banks.len()
        );
        &mut self.banks[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterBank> {
        self.banks.iter()
    }

    pub fn bank_by_name(&self, name: &str) -> Option<&RegisterBank> {
        self.banks.iter().find(|bank| bank.is_created() && bank.name() == name)
    }

    /// First populated bank covering `rc`
    pub fn bank_covering(&self, rc: RegClassId) -> Option<&RegisterBank> {
        self.banks.iter().find(|bank| bank.is_valid() && bank.covers(rc))
    }

    /// Give slot `id` its identity. Banks are write-once: creating the same
    /// slot twice panics.
    pub fn create_register_bank(&mut self, id: RegBankId, name: &str) {
        debug!("Create register bank: {} with name \"{}\"", id, name);
        let bank = self.reg_bank_mut(id);
        assert!(
            bank.id.is_none(),
            "register bank {} should be created only once (already '{}')",
            id,
            bank.name
        );
        bank.id = Some(id);
        bank.name = name.to_string();
    }

    /// Extend bank `id` with `rc` and every class reachable from it, either
    /// as a sub-class or as the class of a sub-register.
    ///
    /// Calls are monotonic: the covered set only grows and the bank size
    /// only increases. Adding an already covered class is a no-op.
    pub fn add_reg_bank_coverage(&mut self, id: RegBankId, rc: RegClassId, tri: &dyn TargetRegisterInfo) {
        let num_classes = tri.num_reg_classes();
        let bank = self.reg_bank_mut(id);
        debug!("Add coverage for: {} from {}", bank, tri.reg_class_name(rc));

        if bank.covered.universe() == 0 {
            bank.covered = RegClassSet::new(num_classes);
        } else if bank.covered.contains(rc) {
            return;
        }

        let mut worklist: SmallVec<[RegClassId; 8]> = smallvec![rc];
        bank.covered.insert(rc);

        while let Some(cur) = worklist.pop() {
            let cur_size = tri.reg_class_size_in_bits(cur);
            trace!("Examine: {} (size {})", tri.reg_class_name(cur), cur_size);
            bank.size = bank.size.max(cur_size);

            for sub in SetBits::new(tri.sub_class_mask(cur)) {
                if bank.covered.insert(sub) {
                    trace!("  enqueue sub-class: {}", tri.reg_class_name(sub));
                    worklist.push(sub);
                }
            }

            // Classes reached through a sub-register index of `cur` only
            // know about it from their own side, so scan all of them.
            for candidate in 0..num_classes {
                if bank.covered.contains(candidate) {
                    continue;
                }
                let reached = tri
                    .super_reg_classes(candidate)
                    .any(|mask| SetBits::new(mask).any(|super_rc| super_rc == cur));
                if reached {
                    trace!("  enqueue subreg-class: {}", tri.reg_class_name(candidate));
                    bank.covered.insert(candidate);
                    worklist.push(candidate);
                }
            }
        }
        debug!("{} now covers {} classes, size {}", bank, bank.covered.count(), bank.size);
    }

    /// Check every slot: its ID matches its index and the bank is
    /// consistent with `tri`.
    pub fn try_verify(&self, tri: &dyn TargetRegisterInfo) -> Result<(), BankError> {
        for (index, bank) in self.banks.iter().enumerate() {
            let index = index as RegBankId;
            match bank.id {
                None => return Err(BankError::NotCreated { index }),
                Some(id) if id != index => return Err(BankError::IdMismatch { index, id }),
                Some(_) => {}
            }
            debug!("Verify {}", bank.display_with(tri));
            bank.try_verify(tri)?;
        }
        Ok(())
    }

    /// Panicking form of [`RegBankRegistry::try_verify`]
    pub fn verify(&self, tri: &dyn TargetRegisterInfo) {
        if let Err(err) = self.try_verify(tri) {
            panic!("{}", err);
        }
    }
}
