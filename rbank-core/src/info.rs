//! The `RegisterBankInfo` trait
//!
//! This is the seam between the target-independent mapping machinery and a
//! backend. A backend provides the bank registry and may refine any of the
//! provided methods: which bank a class belongs to, the mapping of its own
//! opcodes, and alternative mappings offered to the bank selector.

use crate::bank::RegisterBank;
use crate::inference::default_instr_mapping;
use crate::mapping::{InstructionMapping, InstructionMappings};
use crate::registry::RegBankRegistry;
use crate::resolve;
use log::debug;
use rbank_common::{RegClassId, Register};
use rbank_target::{MachineFunction, MachineInstr, MachineRegisterInfo, TargetRegisterInfo};

pub trait RegisterBankInfo {
    /// Banks of this backend, fully initialized
    fn registry(&self) -> &RegBankRegistry;

    /// Bank holding registers of class `rc`
    ///
    /// Defaults to the first bank covering `rc` and panics if there is none.
    fn reg_bank_from_reg_class(&self, rc: RegClassId) -> &RegisterBank {
        match self.registry().bank_covering(rc) {
            Some(bank) => bank,
            None => panic!("register class {} is not covered by any register bank", rc),
        }
    }

    /// Bank of `reg`, if it can be known yet
    fn reg_bank(
        &self,
        reg: Register,
        mri: &MachineRegisterInfo,
        tri: &dyn TargetRegisterInfo,
    ) -> Option<&RegisterBank> {
        resolve::reg_bank(self, reg, mri, tri)
    }

    /// Mapping of `mi` as far as it can be inferred without knowing the
    /// semantics of its opcode. May return the invalid mapping.
    fn instr_mapping_impl(&self, mi: &MachineInstr, mf: &MachineFunction<'_>) -> InstructionMapping<'_> {
        default_instr_mapping(self, mi, mf)
    }

    /// Mapping the bank selector uses for `mi` unless it picks an
    /// alternative.
    ///
    /// Panics for generic opcodes, whose mapping only the target knows, and
    /// when no valid mapping can be inferred. Targets override this to map
    /// generic instructions.
    fn instr_mapping(&self, mi: &MachineInstr, mf: &MachineFunction<'_>) -> InstructionMapping<'_> {
        if !mi.opcode().is_pre_isel_generic() {
            let mapping = self.instr_mapping_impl(mi, mf);
            if mapping.is_valid() {
                return mapping;
            }
        }
        panic!(
            "the target must implement this: no mapping for {}",
            mi.display(mf.instr_info())
        );
    }

    /// Other valid mappings of `mi`, none by default
    fn instr_alternative_mappings(&self, _mi: &MachineInstr, _mf: &MachineFunction<'_>) -> InstructionMappings<'_> {
        InstructionMappings::new()
    }

    /// All candidate mappings of `mi`, the one from `instr_mapping` first.
    /// Each candidate is verified against `mi` in debug builds.
    fn instr_possible_mappings(&self, mi: &MachineInstr, mf: &MachineFunction<'_>) -> InstructionMappings<'_> {
        let mut possible = InstructionMappings::new();
        possible.push(self.instr_mapping(mi, mf));
        possible.extend(self.instr_alternative_mappings(mi, mf));
        debug!("{} possible mapping(s) for {}", possible.len(), mi.display(mf.instr_info()));

        if cfg!(debug_assertions) {
            for mapping in &possible {
                mapping.verify(mi, mf);
            }
        }
        possible
    }
}
