//! Register Bank Info - Target Description Interfaces
//! 
//! This crate describes everything the register bank engine consumes from
//! the rest of a backend:
//! 
//! - the register class hierarchy (`TargetRegisterInfo`)
//! - per-opcode operand constraints (`TargetInstrInfo`)
//! - machine instructions and operands
//! - the per-function virtual register table (`MachineRegisterInfo`)
//! 
//! Table-driven implementations of both target traits are provided, and
//! can be loaded from a JSON target description.

pub mod reg_info;
pub mod instr;
pub mod function;
pub mod description;

pub use reg_info::{RegClassTable, TargetRegisterInfo};
pub use instr::{InstrTable, MachineInstr, MachineOperand, Opcode, TargetInstrInfo};
pub use function::{MachineFunction, MachineRegisterInfo, RegClassOrRegBank};
pub use description::{DescriptionError, FunctionDescription, RegBankDesc, TargetDescription};
