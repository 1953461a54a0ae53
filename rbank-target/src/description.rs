//! JSON target and function descriptions
//!
//! A `TargetDescription` lists the register classes of a target (with their
//! sub-class and sub-register edges and member physical registers), its
//! instructions with per-operand class constraints, and the register banks
//! to populate. A `FunctionDescription` lists virtual registers and
//! instructions of one function, for driving mapping inference offline.

use crate::function::MachineFunction;
use crate::instr::{InstrTable, MachineInstr, MachineOperand, Opcode};
use crate::reg_info::RegClassTable;
use log::debug;
use rbank_common::{RegBankId, RegClassId, Register, SubRegIdx};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("Malformed description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate register class '{0}'")]
    DuplicateRegClass(String),

    #[error("Unknown register class '{0}'")]
    UnknownRegClass(String),

    #[error("Unknown physical register '{0}'")]
    UnknownPhysReg(String),

    #[error("Duplicate register bank '{0}'")]
    DuplicateRegBank(String),

    #[error("Unknown register bank '{0}'")]
    UnknownRegBank(String),

    #[error("Register bank '{0}' does not cover any register class")]
    EmptyRegBank(String),

    #[error("Unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("Opcode {opcode} of '{name}' is reserved (target opcodes start at {first})")]
    ReservedOpcode { name: String, opcode: u32, first: u32 },

    #[error("Opcode {0} is described twice")]
    DuplicateOpcode(u32),

    #[error("Virtual register %{0} is not declared")]
    UnknownVirtReg(u32),

    #[error("Virtual register %{0} has both a class and a bank")]
    ConflictingVirtReg(u32),

    #[error("Virtual register %{0} has neither a size nor a class")]
    SizelessVirtReg(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDescription {
    pub name: String,
    pub reg_classes: Vec<RegClassDesc>,
    #[serde(default)]
    pub instrs: Vec<TargetInstrDesc>,
    #[serde(default)]
    pub reg_banks: Vec<RegBankDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegClassDesc {
    pub name: String,
    /// Size in bits
    pub size: u32,
    #[serde(default)]
    pub sub_classes: Vec<String>,
    #[serde(default)]
    pub sub_regs: Vec<SubRegDesc>,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Registers of the enclosing class have a sub-register at `index` in `class`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubRegDesc {
    pub index: SubRegIdx,
    pub class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInstrDesc {
    pub name: String,
    pub opcode: u32,
    /// Class constraint per operand, `null` for unconstrained operands
    #[serde(default)]
    pub operands: Vec<Option<String>>,
}

/// A register bank and the seed classes its coverage is computed from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegBankDesc {
    pub name: String,
    pub covers: Vec<String>,
}

fn lookup_class(table: &RegClassTable, name: &str) -> Result<RegClassId, DescriptionError> {
    table
        .reg_class_by_name(name)
        .ok_or_else(|| DescriptionError::UnknownRegClass(name.to_string()))
}

impl TargetDescription {
    pub fn from_json(text: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the register class hierarchy
    pub fn build_reg_info(&self) -> Result<RegClassTable, DescriptionError> {
        let mut table = RegClassTable::new();
        for class in &self.reg_classes {
            if table.reg_class_by_name(&class.name).is_some() {
                return Err(DescriptionError::DuplicateRegClass(class.name.clone()));
            }
            table.add_reg_class(&class.name, class.size);
        }

        for class in &self.reg_classes {
            let rc = lookup_class(&table, &class.name)?;
            for sub in &class.sub_classes {
                let sub = lookup_class(&table, sub)?;
                table.add_sub_class(rc, sub);
            }
            for sub_reg in &class.sub_regs {
                let sub_rc = lookup_class(&table, &sub_reg.class)?;
                table.add_sub_reg_class(rc, sub_reg.index, sub_rc);
            }
            for member in &class.members {
                let reg = match table.phys_reg_by_name(member) {
                    Some(reg) => reg,
                    None => table.add_phys_reg(member),
                };
                table.add_member(rc, reg);
            }
        }

        debug!(
            "Target '{}': {} register classes, {} physical registers",
            self.name,
            self.reg_classes.len(),
            table.num_phys_regs()
        );
        Ok(table)
    }

    /// Build the instruction constraint table against `reg_info`
    pub fn build_instr_info(&self, reg_info: &RegClassTable) -> Result<InstrTable, DescriptionError> {
        let mut table = InstrTable::new();
        let mut seen = HashSet::new();
        for instr in &self.instrs {
            let opcode = Opcode(instr.opcode);
            if !opcode.is_target_specific() {
                return Err(DescriptionError::ReservedOpcode {
                    name: instr.name.clone(),
                    opcode: instr.opcode,
                    first: Opcode::FIRST_TARGET,
                });
            }
            if !seen.insert(opcode) {
                return Err(DescriptionError::DuplicateOpcode(instr.opcode));
            }
            let operand_classes = instr
                .operands
                .iter()
                .map(|class| class.as_deref().map(|name| lookup_class(reg_info, name)).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            table.add_instr(opcode, &instr.name, operand_classes);
        }
        Ok(table)
    }

    /// Bank seeds in bank-id order, with class names resolved
    pub fn reg_bank_seeds(&self, reg_info: &RegClassTable) -> Result<Vec<(String, Vec<RegClassId>)>, DescriptionError> {
        let mut names = HashSet::new();
        let mut seeds = Vec::with_capacity(self.reg_banks.len());
        for bank in &self.reg_banks {
            if !names.insert(bank.name.as_str()) {
                return Err(DescriptionError::DuplicateRegBank(bank.name.clone()));
            }
            if bank.covers.is_empty() {
                return Err(DescriptionError::EmptyRegBank(bank.name.clone()));
            }
            let classes = bank
                .covers
                .iter()
                .map(|name| lookup_class(reg_info, name))
                .collect::<Result<Vec<_>, _>>()?;
            seeds.push((bank.name.clone(), classes));
        }
        Ok(seeds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescription {
    pub name: String,
    #[serde(default)]
    pub vregs: Vec<VirtRegDesc>,
    pub instrs: Vec<InstrLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirtRegDesc {
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrLine {
    pub opcode: String,
    #[serde(default)]
    pub operands: Vec<OperandDesc>,
}

/// `{"vreg": 0}`, `{"preg": "X0"}`, `{"imm": 4}`, `{"mbb": 1}` or `"noreg"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandDesc {
    Vreg(u32),
    Preg(String),
    Imm(i64),
    Mbb(u32),
    Noreg,
}

impl FunctionDescription {
    pub fn from_json(text: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Materialize the function against a target. `bank_by_name` resolves
    /// the bank names used by pre-assigned virtual registers.
    pub fn build<'t>(
        &self,
        reg_info: &'t RegClassTable,
        instr_info: &'t InstrTable,
        bank_by_name: impl Fn(&str) -> Option<RegBankId>,
    ) -> Result<MachineFunction<'t>, DescriptionError> {
        let mut mf = MachineFunction::new(&self.name, reg_info, instr_info);

        for (idx, vreg) in self.vregs.iter().enumerate() {
            let idx = idx as u32;
            let reg = match (&vreg.class, &vreg.bank) {
                (Some(_), Some(_)) => return Err(DescriptionError::ConflictingVirtReg(idx)),
                (Some(class), None) => {
                    let rc = lookup_class(reg_info, class)?;
                    mf.reg_info_mut().create_virtual_register(rc)
                }
                (None, bank) => {
                    let size = vreg.size.ok_or(DescriptionError::SizelessVirtReg(idx))?;
                    let reg = mf.reg_info_mut().create_generic_virtual_register(size);
                    if let (Some(bank), Register::Virt(virt)) = (bank, reg) {
                        let id = bank_by_name(bank.as_str())
                            .ok_or_else(|| DescriptionError::UnknownRegBank(bank.clone()))?;
                        mf.reg_info_mut().set_reg_bank(virt, id);
                    }
                    reg
                }
            };
            if let (Some(size), Register::Virt(virt)) = (vreg.size, reg) {
                mf.reg_info_mut().set_size(virt, size);
            }
        }

        let num_vregs = mf.reg_info().num_virt_regs() as u32;
        for line in &self.instrs {
            let opcode = instr_info
                .opcode_by_name(&line.opcode)
                .ok_or_else(|| DescriptionError::UnknownOpcode(line.opcode.clone()))?;
            let operands = line
                .operands
                .iter()
                .map(|operand| match operand {
                    OperandDesc::Vreg(idx) if *idx < num_vregs => Ok(MachineOperand::Reg(Register::virt(*idx))),
                    OperandDesc::Vreg(idx) => Err(DescriptionError::UnknownVirtReg(*idx)),
                    OperandDesc::Preg(name) => reg_info
                        .phys_reg_by_name(name)
                        .map(|reg| MachineOperand::Reg(reg.into()))
                        .ok_or_else(|| DescriptionError::UnknownPhysReg(name.clone())),
                    OperandDesc::Imm(value) => Ok(MachineOperand::Imm(*value)),
                    OperandDesc::Mbb(block) => Ok(MachineOperand::Mbb(*block)),
                    OperandDesc::Noreg => Ok(MachineOperand::Reg(Register::NoRegister)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            mf.push_instr(MachineInstr::with_operands(opcode, operands));
        }

        debug!(
            "Function '{}': {} virtual registers, {} instructions",
            self.name,
            num_vregs,
            mf.instrs().len()
        );
        Ok(mf)
    }
}
