//! Per-function register table
//!
//! Each virtual register carries an optional explicit size and a
//! class-or-bank assignment. Generic virtual registers start out with a size
//! and nothing else; bank selection later records a bank, and instruction
//! selection a class.

use crate::instr::{MachineInstr, TargetInstrInfo};
use crate::reg_info::TargetRegisterInfo;
use rbank_common::{RegBankId, RegClassId, Register, VirtReg};

/// What is known about where a virtual register lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegClassOrRegBank {
    #[default]
    Unset,
    Class(RegClassId),
    Bank(RegBankId),
}

#[derive(Debug, Clone, Default)]
struct VirtRegInfo {
    /// Size in bits, 0 when not recorded
    size: u32,
    class_or_bank: RegClassOrRegBank,
}

/// Virtual register table of one machine function
#[derive(Debug, Clone, Default)]
pub struct MachineRegisterInfo {
    vregs: Vec<VirtRegInfo>,
}

impl MachineRegisterInfo {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&mut self, size: u32, class_or_bank: RegClassOrRegBank) -> Register {
        self.vregs.push(VirtRegInfo { size, class_or_bank });
        Register::virt(self.vregs.len() as u32 - 1)
    }

    /// New virtual register with a size but no class or bank yet
    pub fn create_generic_virtual_register(&mut self, size: u32) -> Register {
        self.create(size, RegClassOrRegBank::Unset)
    }

    /// New virtual register constrained to `rc`; its size comes from the class
    pub fn create_virtual_register(&mut self, rc: RegClassId) -> Register {
        self.create(0, RegClassOrRegBank::Class(rc))
    }

    pub fn num_virt_regs(&self) -> usize {
        self.vregs.len()
    }

    fn info(&self, reg: VirtReg) -> &VirtRegInfo {
        self.vregs
            .get(reg.index())
            .unwrap_or_else(|| panic!("virtual register {} is not in this function", reg))
    }

    fn info_mut(&mut self, reg: VirtReg) -> &mut VirtRegInfo {
        self.vregs
            .get_mut(reg.index())
            .unwrap_or_else(|| panic!("virtual register {} is not in this function", reg))
    }

    /// Explicitly recorded size in bits (0 if none)
    pub fn size(&self, reg: VirtReg) -> u32 {
        self.info(reg).size
    }

    pub fn set_size(&mut self, reg: VirtReg, size: u32) {
        self.info_mut(reg).size = size;
    }

    pub fn reg_class_or_reg_bank(&self, reg: VirtReg) -> RegClassOrRegBank {
        self.info(reg).class_or_bank
    }

    pub fn reg_class(&self, reg: VirtReg) -> Option<RegClassId> {
        match self.info(reg).class_or_bank {
            RegClassOrRegBank::Class(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn set_reg_class(&mut self, reg: VirtReg, rc: RegClassId) {
        self.info_mut(reg).class_or_bank = RegClassOrRegBank::Class(rc);
    }

    pub fn set_reg_bank(&mut self, reg: VirtReg, bank: RegBankId) {
        self.info_mut(reg).class_or_bank = RegClassOrRegBank::Bank(bank);
    }
}

/// A function body together with the target it is compiled for
///
/// Instructions are resolved against this context: it stands in for the
/// parent links a machine instruction would otherwise carry.
pub struct MachineFunction<'t> {
    name: String,
    register_info: &'t dyn TargetRegisterInfo,
    instr_info: &'t dyn TargetInstrInfo,
    reg_info: MachineRegisterInfo,
    instrs: Vec<MachineInstr>,
}

impl<'t> MachineFunction<'t> {
    pub fn new(
        name: &str,
        register_info: &'t dyn TargetRegisterInfo,
        instr_info: &'t dyn TargetInstrInfo,
    ) -> Self {
        Self {
            name: name.to_string(),
            register_info,
            instr_info,
            reg_info: MachineRegisterInfo::new(),
            instrs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_info(&self) -> &'t dyn TargetRegisterInfo {
        self.register_info
    }

    pub fn instr_info(&self) -> &'t dyn TargetInstrInfo {
        self.instr_info
    }

    pub fn reg_info(&self) -> &MachineRegisterInfo {
        &self.reg_info
    }

    pub fn reg_info_mut(&mut self) -> &mut MachineRegisterInfo {
        &mut self.reg_info
    }

    pub fn push_instr(&mut self, instr: MachineInstr) -> usize {
        self.instrs.push(instr);
        self.instrs.len() - 1
    }

    pub fn instrs(&self) -> &[MachineInstr] {
        &self.instrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_vreg_has_size_only() {
        let mut mri = MachineRegisterInfo::new();
        let Register::Virt(reg) = mri.create_generic_virtual_register(32) else {
            panic!("expected a virtual register");
        };
        assert_eq!(mri.size(reg), 32);
        assert_eq!(mri.reg_class_or_reg_bank(reg), RegClassOrRegBank::Unset);
        assert_eq!(mri.reg_class(reg), None);
    }

    #[test]
    fn test_class_and_bank_are_exclusive() {
        let mut mri = MachineRegisterInfo::new();
        let Register::Virt(reg) = mri.create_virtual_register(3) else {
            panic!("expected a virtual register");
        };
        assert_eq!(mri.size(reg), 0);
        assert_eq!(mri.reg_class(reg), Some(3));

        mri.set_reg_bank(reg, 1);
        assert_eq!(mri.reg_class_or_reg_bank(reg), RegClassOrRegBank::Bank(1));
        assert_eq!(mri.reg_class(reg), None);

        mri.set_reg_class(reg, 2);
        assert_eq!(mri.reg_class_or_reg_bank(reg), RegClassOrRegBank::Class(2));
    }

    #[test]
    fn test_vregs_are_numbered_densely() {
        let mut mri = MachineRegisterInfo::new();
        assert_eq!(mri.create_generic_virtual_register(8), Register::virt(0));
        assert_eq!(mri.create_virtual_register(0), Register::virt(1));
        assert_eq!(mri.num_virt_regs(), 2);
    }

    #[test]
    #[should_panic(expected = "is not in this function")]
    fn test_unknown_vreg_panics() {
        let mri = MachineRegisterInfo::new();
        mri.size(VirtReg(4));
    }
}
