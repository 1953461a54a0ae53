//! Default instruction mapping inference
//!
//! Every register operand is mapped, whole, to the bank it already lives in
//! or to the bank covering the class the instruction requires for it. Copies
//! and PHIs may leave some operands unresolved: those inherit the bank of the
//! last operand that did resolve, since a copy never changes banks.

use crate::bank::RegisterBank;
use crate::info::RegisterBankInfo;
use crate::mapping::{InstructionMapping, DEFAULT_MAPPING_ID};
use crate::resolve::size_in_bits;
use log::trace;
use rbank_target::{MachineFunction, MachineInstr};

/// Compute the mapping of `mi` from what is already known about its
/// operands. Returns the invalid mapping when a non copy-like instruction
/// has an operand whose bank cannot be deduced.
pub fn default_instr_mapping<'b, I>(
    info: &'b I,
    mi: &MachineInstr,
    mf: &MachineFunction<'_>,
) -> InstructionMapping<'b>
where
    I: RegisterBankInfo + ?Sized,
{
    let tri = mf.register_info();
    let tii = mf.instr_info();
    let mri = mf.reg_info();
    let is_copy_like = mi.is_copy_like();

    let mut mapping = InstructionMapping::new(DEFAULT_MAPPING_ID, 1, mi.num_operands());
    let mut complete = true;
    let mut last: Option<(&'b RegisterBank, u32)> = None;

    for (op_idx, operand) in mi.operands().iter().enumerate() {
        let Some(reg) = operand.reg() else {
            continue;
        };
        if !reg.is_valid() {
            continue;
        }

        let bank = info.reg_bank(reg, mri, tri).or_else(|| {
            mi.reg_class_constraint(op_idx, tii)
                .map(|rc| info.reg_bank_from_reg_class(rc))
        });
        let Some(bank) = bank else {
            complete = false;
            if !is_copy_like {
                trace!("No bank for operand {} of {}", op_idx, mi.display(tii));
                return InstructionMapping::default();
            }
            // The remaining operands of a copy take the bank found so far.
            if last.is_some() {
                break;
            }
            continue;
        };

        let size = size_in_bits(reg, mri, tri);
        trace!("Operand {} ({}): {} bits in {}", op_idx, reg, size, bank);
        mapping.set_operand_mapping(op_idx, size, bank);
        last = Some((bank, size));
    }

    if complete {
        return mapping;
    }

    let Some((bank, size)) = last else {
        trace!("No operand of {} has a bank", mi.display(tii));
        return InstructionMapping::default();
    };
    for (op_idx, operand) in mi.operands().iter().enumerate() {
        let is_mappable = operand.reg().is_some_and(|reg| reg.is_valid());
        if is_mappable && mapping.operand_mapping(op_idx).is_empty() {
            trace!("Propagate {} to operand {}", bank, op_idx);
            mapping.set_operand_mapping(op_idx, size, bank);
        }
    }
    mapping
}
