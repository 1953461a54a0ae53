//! Table-driven backend
//!
//! `TableRegisterBankInfo` is a `RegisterBankInfo` whose banks come from a
//! list of seed classes, typically read from a `TargetDescription`. It keeps
//! every default: classes map to the first bank covering them and only
//! target-specific instructions, copies and PHIs can be mapped.

use crate::bank::BankError;
use crate::info::RegisterBankInfo;
use crate::registry::RegBankRegistry;
use log::debug;
use rbank_common::{RegBankId, RegClassId};
use rbank_target::{DescriptionError, RegClassTable, TargetDescription, TargetRegisterInfo};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error(transparent)]
    Bank(#[from] BankError),
}

#[derive(Debug, Clone)]
pub struct TableRegisterBankInfo {
    registry: RegBankRegistry,
}

impl TableRegisterBankInfo {
    /// Wrap an already initialized registry
    pub fn new(registry: RegBankRegistry) -> Self {
        Self { registry }
    }

    /// Create one bank per seed, in order, and populate it from the seed
    /// classes. The result is verified against `tri`.
    pub fn from_seeds(
        seeds: &[(String, Vec<RegClassId>)],
        tri: &dyn TargetRegisterInfo,
    ) -> Result<Self, BankError> {
        let mut registry = RegBankRegistry::new(seeds.len() as u32);
        for (index, (name, classes)) in seeds.iter().enumerate() {
            let id = index as RegBankId;
            registry.create_register_bank(id, name);
            for &rc in classes {
                registry.add_reg_bank_coverage(id, rc, tri);
            }
        }
        registry.try_verify(tri)?;
        debug!("Initialized {} register bank(s)", registry.num_reg_banks());
        Ok(Self::new(registry))
    }

    pub fn from_description(desc: &TargetDescription, reg_info: &RegClassTable) -> Result<Self, InitError> {
        let seeds = desc.reg_bank_seeds(reg_info)?;
        Ok(Self::from_seeds(&seeds, reg_info)?)
    }

    pub fn bank_id(&self, name: &str) -> Option<RegBankId> {
        self.registry.bank_by_name(name).map(|bank| bank.id())
    }
}

impl RegisterBankInfo for TableRegisterBankInfo {
    fn registry(&self) -> &RegBankRegistry {
        &self.registry
    }
}
