//! Register size and register bank resolution
//!
//! Physical registers are resolved through their minimal register class.
//! Virtual registers use what the function recorded for them: an explicit
//! size, a bank, or a class.

use crate::bank::RegisterBank;
use crate::info::RegisterBankInfo;
use rbank_common::Register;
use rbank_target::{MachineRegisterInfo, RegClassOrRegBank, TargetRegisterInfo};

/// Size in bits of `reg`
///
/// Panics for `NoRegister` and for registers whose class cannot be deduced.
pub fn size_in_bits(reg: Register, mri: &MachineRegisterInfo, tri: &dyn TargetRegisterInfo) -> u32 {
    let rc = match reg {
        Register::NoRegister => panic!("{} does not have a size", reg),
        Register::Phys(preg) => tri.minimal_phys_reg_class(preg),
        Register::Virt(vreg) => {
            let size = mri.size(vreg);
            if size != 0 {
                return size;
            }
            mri.reg_class(vreg)
        }
    };
    match rc {
        Some(rc) => tri.reg_class_size_in_bits(rc),
        None => panic!("unable to deduce the register class of {}", reg),
    }
}

/// Register bank of `reg`, or `None` for a virtual register with neither a
/// class nor a bank yet
///
/// Panics for `NoRegister` and for physical registers outside every class.
pub fn reg_bank<'b, I>(
    info: &'b I,
    reg: Register,
    mri: &MachineRegisterInfo,
    tri: &dyn TargetRegisterInfo,
) -> Option<&'b RegisterBank>
where
    I: RegisterBankInfo + ?Sized,
{
    match reg {
        Register::NoRegister => panic!("{} does not have a register bank", reg),
        Register::Phys(preg) => match tri.minimal_phys_reg_class(preg) {
            Some(rc) => Some(info.reg_bank_from_reg_class(rc)),
            None => panic!("physical register {} is not in any register class", reg),
        },
        Register::Virt(vreg) => match mri.reg_class_or_reg_bank(vreg) {
            RegClassOrRegBank::Bank(id) => Some(info.registry().reg_bank(id)),
            RegClassOrRegBank::Class(rc) => Some(info.reg_bank_from_reg_class(rc)),
            RegClassOrRegBank::Unset => None,
        },
    }
}
