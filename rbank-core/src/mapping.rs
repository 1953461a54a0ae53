//! Instruction mappings
//!
//! An instruction mapping says, for every operand of one instruction, which
//! register bank(s) hold which bits of the operand's value:
//!
//! - `PartialMapping`: a bit mask over the value plus the bank holding
//!   those bits
//! - `ValueMapping`: the partial mappings that together cover one operand
//! - `InstructionMapping`: one value mapping per operand, an ID and a cost
//!
//! Mappings borrow their banks from the registry and verify themselves
//! against the instruction they describe.

use crate::bank::RegisterBank;
use crate::resolve::size_in_bits;
use rbank_common::BitMask;
use rbank_target::{MachineFunction, MachineInstr};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Mapping identifier. Targets number their own mappings from 0 and must
/// stay below the two reserved IDs.
pub type MappingId = u32;

/// ID of the mapping computed by the default inference
pub const DEFAULT_MAPPING_ID: MappingId = u32::MAX;

/// ID of the "no mapping could be produced" value
pub const INVALID_MAPPING_ID: MappingId = u32::MAX - 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Register bank {bank} ({size} bits) is too small for mask {mask} spanning {active} bits")]
    BankTooSmall { bank: String, size: u32, mask: String, active: u32 },

    #[error("Value mapped nowhere")]
    Unmapped,

    #[error("Value mapping is {actual} bits wide, expected {expected}")]
    WidthMismatch { expected: u32, actual: u32 },

    #[error("Partial mappings disagree on the value width ({value} vs {other} bits)")]
    InconsistentWidths { value: u32, other: u32 },

    #[error("Value is not fully mapped (covered bits {covered})")]
    NotFullyMapped { covered: String },

    #[error("Mapping is invalid")]
    Invalid,

    #[error("Mapping has {mapping} operands but the instruction has {instr}")]
    OperandCountMismatch { mapping: usize, instr: usize },

    #[error("Operand {index} is not a register but has a value mapping")]
    NonRegisterMapped { index: usize },

    #[error("Operand {index}: {source}")]
    Operand { index: usize, source: Box<MappingError> },
}

/// The bits of a value selected by `mask` live in `reg_bank`
#[derive(Debug, Clone)]
pub struct PartialMapping<'b> {
    /// Width is the width of the whole value, not of the bank
    pub mask: BitMask,
    pub reg_bank: &'b RegisterBank,
}

impl<'b> PartialMapping<'b> {
    pub fn new(mask: BitMask, reg_bank: &'b RegisterBank) -> Self {
        Self { mask, reg_bank }
    }

    /// The bank must hold at least every bit between the lowest and the
    /// highest active bit of the mask.
    pub fn check(&self) -> Result<(), MappingError> {
        let active = self.mask.active_width();
        if self.reg_bank.size() < active {
            return Err(MappingError::BankTooSmall {
                bank: self.reg_bank.name().to_string(),
                size: self.reg_bank.size(),
                mask: self.mask.to_string(),
                active,
            });
        }
        Ok(())
    }

    pub fn verify(&self) {
        if let Err(err) = self.check() {
            panic!("{}", err);
        }
    }
}

impl PartialEq for PartialMapping<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask && std::ptr::eq(self.reg_bank, other.reg_bank)
    }
}

impl fmt::Display for PartialMapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask({}) = {}, RegBank = {}", self.mask.width(), self.mask, self.reg_bank)
    }
}

/// How one value is broken down across register banks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMapping<'b> {
    pub break_down: SmallVec<[PartialMapping<'b>; 2]>,
}

impl<'b> ValueMapping<'b> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole value of `size` bits in `reg_bank`
    pub fn full(size: u32, reg_bank: &'b RegisterBank) -> Self {
        let mut mapping = Self::new();
        mapping.push(PartialMapping::new(BitMask::all_ones(size), reg_bank));
        mapping
    }

    pub fn push(&mut self, partial: PartialMapping<'b>) {
        self.break_down.push(partial);
    }

    pub fn is_empty(&self) -> bool {
        self.break_down.is_empty()
    }

    pub fn len(&self) -> usize {
        self.break_down.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartialMapping<'b>> {
        self.break_down.iter()
    }

    /// Check that the partial mappings agree on the value width, that the
    /// width is `expected_width`, and that together they cover every bit.
    /// Overlapping partial mappings are accepted.
    pub fn check(&self, expected_width: u32) -> Result<(), MappingError> {
        let Some(last) = self.break_down.last() else {
            return Err(MappingError::Unmapped);
        };
        let value_width = last.mask.width();
        if value_width != expected_width {
            return Err(MappingError::WidthMismatch {
                expected: expected_width,
                actual: value_width,
            });
        }

        let mut covered = BitMask::zero(value_width);
        for partial in &self.break_down {
            if partial.mask.width() != value_width {
                return Err(MappingError::InconsistentWidths {
                    value: value_width,
                    other: partial.mask.width(),
                });
            }
            covered |= &partial.mask;
            partial.check()?;
        }
        if !covered.is_all_ones() {
            return Err(MappingError::NotFullyMapped {
                covered: covered.to_string(),
            });
        }
        Ok(())
    }

    pub fn verify(&self, expected_width: u32) {
        if let Err(err) = self.check(expected_width) {
            panic!("{}", err);
        }
    }
}

impl fmt::Display for ValueMapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#BreakDown: {} ", self.break_down.len())?;
        for (i, partial) in self.break_down.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{}]", partial)?;
        }
        Ok(())
    }
}

/// Mapping of every operand of one instruction
///
/// `InstructionMapping::default()` is the invalid mapping: inference could
/// not produce anything. It is not a mapping of zero operands.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionMapping<'b> {
    id: MappingId,
    cost: u32,
    operands: Vec<ValueMapping<'b>>,
}

impl Default for InstructionMapping<'_> {
    fn default() -> Self {
        Self {
            id: INVALID_MAPPING_ID,
            cost: 0,
            operands: Vec::new(),
        }
    }
}

impl<'b> InstructionMapping<'b> {
    /// Mapping with `num_operands` empty value mappings
    pub fn new(id: MappingId, cost: u32, num_operands: usize) -> Self {
        Self {
            id,
            cost,
            operands: vec![ValueMapping::new(); num_operands],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id != INVALID_MAPPING_ID
    }

    pub fn id(&self) -> MappingId {
        self.id
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    pub fn operand_mapping(&self, op_idx: usize) -> &ValueMapping<'b> {
        assert!(op_idx < self.operands.len(), "operand {} out of range", op_idx);
        &self.operands[op_idx]
    }

    pub fn operand_mapping_mut(&mut self, op_idx: usize) -> &mut ValueMapping<'b> {
        assert!(op_idx < self.operands.len(), "operand {} out of range", op_idx);
        &mut self.operands[op_idx]
    }

    /// Map all `size` bits of operand `op_idx` to `reg_bank`.
    ///
    /// Panics if the bank is narrower than the value.
    pub fn set_operand_mapping(&mut self, op_idx: usize, size: u32, reg_bank: &'b RegisterBank) {
        assert!(
            size <= reg_bank.size(),
            "register bank {} ({} bits) is too small for a {}-bit value",
            reg_bank,
            reg_bank.size(),
            size
        );
        self.operand_mapping_mut(op_idx)
            .push(PartialMapping::new(BitMask::all_ones(size), reg_bank));
    }

    /// Check the mapping against `mi`: one value mapping per operand, empty
    /// for non-register operands, and matching the register size otherwise.
    pub fn check(&self, mi: &MachineInstr, mf: &MachineFunction<'_>) -> Result<(), MappingError> {
        if !self.is_valid() {
            return Err(MappingError::Invalid);
        }
        if self.operands.len() != mi.num_operands() {
            return Err(MappingError::OperandCountMismatch {
                mapping: self.operands.len(),
                instr: mi.num_operands(),
            });
        }

        for (index, (operand, mapping)) in mi.operands().iter().zip(&self.operands).enumerate() {
            let Some(reg) = operand.reg() else {
                if !mapping.is_empty() {
                    return Err(MappingError::NonRegisterMapped { index });
                }
                continue;
            };
            if !reg.is_valid() {
                continue;
            }
            let size = size_in_bits(reg, mf.reg_info(), mf.register_info());
            mapping.check(size).map_err(|err| MappingError::Operand {
                index,
                source: Box::new(err),
            })?;
        }
        Ok(())
    }

    pub fn verify(&self, mi: &MachineInstr, mf: &MachineFunction<'_>) {
        if let Err(err) = self.check(mi, mf) {
            panic!("{}", err);
        }
    }
}

impl fmt::Display for InstructionMapping<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            DEFAULT_MAPPING_ID => write!(f, "ID: default")?,
            INVALID_MAPPING_ID => return write!(f, "ID: invalid"),
            id => write!(f, "ID: {}", id)?,
        }
        write!(f, " Cost: {} Mapping: ", self.cost)?;
        for (idx, mapping) in self.operands.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{{ Idx: {} Map: {}}}", idx, mapping)?;
        }
        Ok(())
    }
}

/// Candidate mappings for one instruction, default mapping first
pub type InstructionMappings<'b> = SmallVec<[InstructionMapping<'b>; 4]>;
