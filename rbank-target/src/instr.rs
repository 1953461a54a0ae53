//! Machine instructions and per-opcode operand constraints
//!
//! Opcodes share one numbering space:
//! - `0..PRE_ISEL_GENERIC_START`: target-independent pseudo instructions
//!   (`PHI`, `COPY`, ...)
//! - `PRE_ISEL_GENERIC_START..=PRE_ISEL_GENERIC_END`: generic, pre-selection
//!   operations that every target must map itself
//! - `FIRST_TARGET..`: target-specific instructions, described by a
//!   `TargetInstrInfo`

use rbank_common::{RegClassId, Register};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Opcode(pub u32);

impl Opcode {
    pub const PHI: Opcode = Opcode(0);
    pub const COPY: Opcode = Opcode(1);
    pub const IMPLICIT_DEF: Opcode = Opcode(2);

    pub const G_ADD: Opcode = Opcode(16);
    pub const G_SUB: Opcode = Opcode(17);
    pub const G_MUL: Opcode = Opcode(18);
    pub const G_AND: Opcode = Opcode(19);
    pub const G_OR: Opcode = Opcode(20);
    pub const G_XOR: Opcode = Opcode(21);
    pub const G_CONSTANT: Opcode = Opcode(22);
    pub const G_FCONSTANT: Opcode = Opcode(23);
    pub const G_FADD: Opcode = Opcode(24);
    pub const G_FMUL: Opcode = Opcode(25);
    pub const G_LOAD: Opcode = Opcode(26);
    pub const G_STORE: Opcode = Opcode(27);
    pub const G_TRUNC: Opcode = Opcode(28);
    pub const G_ANYEXT: Opcode = Opcode(29);
    pub const G_BITCAST: Opcode = Opcode(30);

    pub const PRE_ISEL_GENERIC_START: u32 = 16;
    pub const PRE_ISEL_GENERIC_END: u32 = 47;
    pub const FIRST_TARGET: u32 = 64;

    /// Generic operation that must be mapped by a target override
    pub fn is_pre_isel_generic(self) -> bool {
        (Self::PRE_ISEL_GENERIC_START..=Self::PRE_ISEL_GENERIC_END).contains(&self.0)
    }

    pub fn is_target_specific(self) -> bool {
        self.0 >= Self::FIRST_TARGET
    }

    /// Name of a target-independent opcode
    pub fn builtin_name(self) -> Option<&'static str> {
        BUILTIN_OPCODES
            .iter()
            .find(|(_, opcode)| *opcode == self)
            .map(|(name, _)| *name)
    }

    pub fn builtin_by_name(name: &str) -> Option<Opcode> {
        BUILTIN_OPCODES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, opcode)| *opcode)
    }
}

const BUILTIN_OPCODES: &[(&str, Opcode)] = &[
    ("PHI", Opcode::PHI),
    ("COPY", Opcode::COPY),
    ("IMPLICIT_DEF", Opcode::IMPLICIT_DEF),
    ("G_ADD", Opcode::G_ADD),
    ("G_SUB", Opcode::G_SUB),
    ("G_MUL", Opcode::G_MUL),
    ("G_AND", Opcode::G_AND),
    ("G_OR", Opcode::G_OR),
    ("G_XOR", Opcode::G_XOR),
    ("G_CONSTANT", Opcode::G_CONSTANT),
    ("G_FCONSTANT", Opcode::G_FCONSTANT),
    ("G_FADD", Opcode::G_FADD),
    ("G_FMUL", Opcode::G_FMUL),
    ("G_LOAD", Opcode::G_LOAD),
    ("G_STORE", Opcode::G_STORE),
    ("G_TRUNC", Opcode::G_TRUNC),
    ("G_ANYEXT", Opcode::G_ANYEXT),
    ("G_BITCAST", Opcode::G_BITCAST),
];

/// Target knowledge about instruction operands
pub trait TargetInstrInfo {
    fn opcode_name(&self, opcode: Opcode) -> Option<&str>;

    /// Register class operand `op_idx` of `opcode` is constrained to, if any
    fn operand_reg_class(&self, opcode: Opcode, op_idx: usize) -> Option<RegClassId>;
}

#[derive(Debug, Clone)]
struct InstrDesc {
    name: String,
    operand_classes: Vec<Option<RegClassId>>,
}

/// Table-driven `TargetInstrInfo`
#[derive(Debug, Clone, Default)]
pub struct InstrTable {
    descs: HashMap<Opcode, InstrDesc>,
}

impl InstrTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe a target-specific opcode.
    ///
    /// Panics if `opcode` lies in the target-independent range.
    pub fn add_instr(&mut self, opcode: Opcode, name: &str, operand_classes: Vec<Option<RegClassId>>) {
        assert!(
            opcode.is_target_specific(),
            "opcode {} of {} is reserved for target-independent instructions",
            opcode.0,
            name
        );
        self.descs.insert(
            opcode,
            InstrDesc {
                name: name.to_string(),
                operand_classes,
            },
        );
    }

    pub fn opcode_by_name(&self, name: &str) -> Option<Opcode> {
        Opcode::builtin_by_name(name).or_else(|| {
            self.descs
                .iter()
                .find(|(_, desc)| desc.name == name)
                .map(|(opcode, _)| *opcode)
        })
    }
}

impl TargetInstrInfo for InstrTable {
    fn opcode_name(&self, opcode: Opcode) -> Option<&str> {
        opcode
            .builtin_name()
            .or_else(|| self.descs.get(&opcode).map(|desc| desc.name.as_str()))
    }

    fn operand_reg_class(&self, opcode: Opcode, op_idx: usize) -> Option<RegClassId> {
        self.descs
            .get(&opcode)
            .and_then(|desc| desc.operand_classes.get(op_idx).copied().flatten())
    }
}

/// A machine instruction operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineOperand {
    Reg(Register),
    Imm(i64),
    /// Basic block reference (PHI incoming blocks, branch targets)
    Mbb(u32),
}

impl MachineOperand {
    pub fn is_reg(&self) -> bool {
        matches!(self, MachineOperand::Reg(_))
    }

    pub fn reg(&self) -> Option<Register> {
        match self {
            MachineOperand::Reg(reg) => Some(*reg),
            _ => None,
        }
    }
}

impl fmt::Display for MachineOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineOperand::Reg(reg) => write!(f, "{}", reg),
            MachineOperand::Imm(value) => write!(f, "{}", value),
            MachineOperand::Mbb(block) => write!(f, "%bb.{}", block),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInstr {
    opcode: Opcode,
    operands: Vec<MachineOperand>,
}

impl MachineInstr {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operands: Vec::new(),
        }
    }

    pub fn with_operands(opcode: Opcode, operands: Vec<MachineOperand>) -> Self {
        Self { opcode, operands }
    }

    pub fn with_reg(mut self, reg: impl Into<Register>) -> Self {
        self.operands.push(MachineOperand::Reg(reg.into()));
        self
    }

    pub fn with_imm(mut self, value: i64) -> Self {
        self.operands.push(MachineOperand::Imm(value));
        self
    }

    pub fn with_mbb(mut self, block: u32) -> Self {
        self.operands.push(MachineOperand::Mbb(block));
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    pub fn operand(&self, idx: usize) -> &MachineOperand {
        &self.operands[idx]
    }

    pub fn operands(&self) -> &[MachineOperand] {
        &self.operands
    }

    pub fn is_copy(&self) -> bool {
        self.opcode == Opcode::COPY
    }

    pub fn is_phi(&self) -> bool {
        self.opcode == Opcode::PHI
    }

    /// Copies and PHIs: all register operands are expected to share a bank
    pub fn is_copy_like(&self) -> bool {
        self.is_copy() || self.is_phi()
    }

    /// Register class the instruction description imposes on operand `op_idx`
    pub fn reg_class_constraint(&self, op_idx: usize, tii: &dyn TargetInstrInfo) -> Option<RegClassId> {
        tii.operand_reg_class(self.opcode, op_idx)
    }

    pub fn display<'a>(&'a self, tii: &'a dyn TargetInstrInfo) -> InstrDisplay<'a> {
        InstrDisplay { instr: self, tii }
    }
}

pub struct InstrDisplay<'a> {
    instr: &'a MachineInstr,
    tii: &'a dyn TargetInstrInfo,
}

impl fmt::Display for InstrDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tii.opcode_name(self.instr.opcode) {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "<opcode {}>", self.instr.opcode.0)?,
        }
        for (i, operand) in self.instr.operands.iter().enumerate() {
            write!(f, "{}{}", if i == 0 { " " } else { ", " }, operand)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_opcode_ranges() {
        assert!(Opcode::G_ADD.is_pre_isel_generic());
        assert!(Opcode::G_BITCAST.is_pre_isel_generic());
        assert!(!Opcode::COPY.is_pre_isel_generic());
        assert!(!Opcode(Opcode::FIRST_TARGET).is_pre_isel_generic());
        assert!(Opcode(Opcode::FIRST_TARGET).is_target_specific());
        assert!(!Opcode::PHI.is_target_specific());
    }

    #[test]
    fn test_builtin_names_round_trip() {
        assert_eq!(Opcode::builtin_by_name("COPY"), Some(Opcode::COPY));
        assert_eq!(Opcode::G_FADD.builtin_name(), Some("G_FADD"));
        assert_eq!(Opcode(Opcode::FIRST_TARGET).builtin_name(), None);
    }

    #[test]
    fn test_instr_table_constraints() {
        let mut table = InstrTable::new();
        let addrr = Opcode(Opcode::FIRST_TARGET);
        table.add_instr(addrr, "ADDrr", vec![Some(0), Some(0), None]);

        assert_eq!(table.opcode_by_name("ADDrr"), Some(addrr));
        assert_eq!(table.opcode_by_name("PHI"), Some(Opcode::PHI));
        assert_eq!(table.opcode_name(addrr), Some("ADDrr"));
        assert_eq!(table.operand_reg_class(addrr, 1), Some(0));
        assert_eq!(table.operand_reg_class(addrr, 2), None);
        assert_eq!(table.operand_reg_class(addrr, 7), None);
        assert_eq!(table.operand_reg_class(Opcode::COPY, 0), None);
    }

    #[test]
    #[should_panic(expected = "reserved for target-independent instructions")]
    fn test_instr_table_rejects_generic_opcode() {
        let mut table = InstrTable::new();
        table.add_instr(Opcode::G_ADD, "MYADD", vec![]);
    }

    #[test]
    fn test_copy_like_classification() {
        let copy = MachineInstr::new(Opcode::COPY).with_reg(Register::virt(0)).with_reg(Register::virt(1));
        let phi = MachineInstr::new(Opcode::PHI)
            .with_reg(Register::virt(0))
            .with_reg(Register::virt(1))
            .with_mbb(1);
        let add = MachineInstr::new(Opcode::G_ADD);
        assert!(copy.is_copy() && copy.is_copy_like());
        assert!(phi.is_phi() && phi.is_copy_like());
        assert!(!add.is_copy_like());
        assert_eq!(phi.num_operands(), 3);
        assert!(!phi.operand(2).is_reg());
        assert_eq!(phi.operand(1).reg(), Some(Register::virt(1)));
    }

    #[test]
    fn test_display() {
        let table = InstrTable::new();
        let phi = MachineInstr::new(Opcode::PHI)
            .with_reg(Register::virt(2))
            .with_reg(Register::virt(0))
            .with_mbb(1)
            .with_imm(-4);
        assert_eq!(phi.display(&table).to_string(), "PHI %2, %0, %bb.1, -4");
    }
}
