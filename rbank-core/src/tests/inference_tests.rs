use super::fixtures::{Toy, ADDRR, FADDRR, FPR, GPR, MOVW};
use crate::info::RegisterBankInfo;
use crate::mapping::{InstructionMapping, MappingError, DEFAULT_MAPPING_ID};
use crate::resolve::size_in_bits;
use pretty_assertions::assert_eq;
use rbank_common::Register;
use rbank_target::{MachineFunction, MachineInstr, Opcode};

/// (bank, width) of each operand, `None` for unmapped operands
fn summarize(mapping: &InstructionMapping<'_>) -> Vec<Option<(u32, u32)>> {
    (0..mapping.num_operands())
        .map(|idx| {
            let value = mapping.operand_mapping(idx);
            assert!(value.len() <= 1, "operand {} is split", idx);
            value
                .iter()
                .next()
                .map(|partial| (partial.reg_bank.id(), partial.mask.width()))
        })
        .collect()
}

fn generic_with_bank(mf: &mut MachineFunction<'_>, size: u32, bank: u32) -> Register {
    let reg = mf.reg_info_mut().create_generic_virtual_register(size);
    if let Register::Virt(vreg) = reg {
        mf.reg_info_mut().set_reg_bank(vreg, bank);
    }
    reg
}

#[test]
fn test_vreg_bank_from_class() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("classes");
    let narrow = mf.reg_info_mut().create_virtual_register(toy.b);
    let sub_reg = mf.reg_info_mut().create_virtual_register(toy.x32);
    let float = mf.reg_info_mut().create_virtual_register(toy.f64);
    let unset = mf.reg_info_mut().create_generic_virtual_register(32);

    let bank_of = |reg| info.reg_bank(reg, mf.reg_info(), &toy.regs).map(|bank| bank.id());
    assert_eq!(bank_of(narrow), Some(GPR));
    assert_eq!(bank_of(sub_reg), Some(GPR));
    assert_eq!(bank_of(float), Some(FPR));
    assert_eq!(bank_of(unset), None);
}

#[test]
fn test_physical_register_bank_and_size() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mf = toy.function("phys");
    let mri = mf.reg_info();

    assert_eq!(info.reg_bank(toy.r0.into(), mri, &toy.regs).map(|b| b.id()), Some(GPR));
    assert_eq!(info.reg_bank(toy.d0.into(), mri, &toy.regs).map(|b| b.id()), Some(FPR));
    // r0 is in both A and B: its size is the one of the smaller class.
    assert_eq!(size_in_bits(toy.r0.into(), mri, &toy.regs), 16);
    assert_eq!(size_in_bits(toy.r1.into(), mri, &toy.regs), 32);
}

#[test]
fn test_explicit_size_wins_over_class() {
    let toy = Toy::new();
    let mut mf = toy.function("sizes");
    let reg = mf.reg_info_mut().create_virtual_register(toy.a);
    assert_eq!(size_in_bits(reg, mf.reg_info(), &toy.regs), 32);

    if let Register::Virt(vreg) = reg {
        mf.reg_info_mut().set_size(vreg, 8);
    }
    assert_eq!(size_in_bits(reg, mf.reg_info(), &toy.regs), 8);
}

#[test]
fn test_copy_to_unmapped_register() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("copy");
    let x = mf.reg_info_mut().create_generic_virtual_register(32);
    let y = generic_with_bank(&mut mf, 32, GPR);
    let copy = MachineInstr::new(Opcode::COPY).with_reg(x).with_reg(y);

    let mapping = info.instr_mapping(&copy, &mf);
    assert_eq!(mapping.id(), DEFAULT_MAPPING_ID);
    assert_eq!(mapping.cost(), 1);
    assert_eq!(summarize(&mapping), vec![Some((GPR, 32)), Some((GPR, 32))]);
    mapping.verify(&copy, &mf);
}

#[test]
fn test_copy_from_unmapped_register() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("copy");
    let x = generic_with_bank(&mut mf, 64, FPR);
    let y = mf.reg_info_mut().create_generic_virtual_register(64);
    let copy = MachineInstr::new(Opcode::COPY).with_reg(x).with_reg(y);

    let mapping = info.instr_mapping(&copy, &mf);
    assert_eq!(summarize(&mapping), vec![Some((FPR, 64)), Some((FPR, 64))]);
}

#[test]
fn test_copy_from_physical_register() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("copy");
    let x = mf.reg_info_mut().create_generic_virtual_register(32);
    let copy = MachineInstr::new(Opcode::COPY).with_reg(x).with_reg(toy.r1);

    let mapping = info.instr_mapping(&copy, &mf);
    assert_eq!(summarize(&mapping), vec![Some((GPR, 32)), Some((GPR, 32))]);
}

#[test]
fn test_copy_propagates_the_last_known_size() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("copy");
    let x = mf.reg_info_mut().create_generic_virtual_register(16);
    let y = generic_with_bank(&mut mf, 32, GPR);
    let copy = MachineInstr::new(Opcode::COPY).with_reg(x).with_reg(y);

    // The unmapped operand takes the bank and the size of %1, which does
    // not match its own size.
    let mapping = info.instr_mapping_impl(&copy, &mf);
    assert_eq!(summarize(&mapping), vec![Some((GPR, 32)), Some((GPR, 32))]);
    assert_eq!(
        mapping.check(&copy, &mf),
        Err(MappingError::Operand {
            index: 0,
            source: Box::new(MappingError::WidthMismatch {
                expected: 16,
                actual: 32
            }),
        })
    );
}

#[test]
fn test_copy_without_any_bank_is_invalid() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("copy");
    let x = mf.reg_info_mut().create_generic_virtual_register(32);
    let y = mf.reg_info_mut().create_generic_virtual_register(32);
    let copy = MachineInstr::new(Opcode::COPY).with_reg(x).with_reg(y);

    assert!(!info.instr_mapping_impl(&copy, &mf).is_valid());
}

#[test]
fn test_phi_with_block_operands() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("phi");
    let dst = mf.reg_info_mut().create_generic_virtual_register(64);
    let lhs = generic_with_bank(&mut mf, 64, FPR);
    let rhs = mf.reg_info_mut().create_generic_virtual_register(64);
    let phi = MachineInstr::new(Opcode::PHI)
        .with_reg(dst)
        .with_reg(lhs)
        .with_mbb(1)
        .with_reg(rhs)
        .with_mbb(2);

    let mapping = info.instr_mapping(&phi, &mf);
    assert_eq!(
        summarize(&mapping),
        vec![Some((FPR, 64)), Some((FPR, 64)), None, Some((FPR, 64)), None]
    );
    mapping.verify(&phi, &mf);
}

#[test]
fn test_unresolved_operand_of_add_is_invalid() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("add");
    let x = generic_with_bank(&mut mf, 32, GPR);
    let y = generic_with_bank(&mut mf, 32, GPR);
    let z = mf.reg_info_mut().create_generic_virtual_register(32);
    let add = MachineInstr::new(ADDRR).with_reg(x).with_reg(y).with_reg(z);

    let mapping = info.instr_mapping_impl(&add, &mf);
    assert!(!mapping.is_valid());
    assert_eq!(mapping, InstructionMapping::default());
}

#[test]
fn test_operands_resolved_through_class_constraints() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("constraints");
    let d = mf.reg_info_mut().create_generic_virtual_register(64);
    let n = mf.reg_info_mut().create_generic_virtual_register(64);
    let m = mf.reg_info_mut().create_generic_virtual_register(64);
    let fadd = MachineInstr::new(FADDRR).with_reg(d).with_reg(n).with_reg(m);

    let mapping = info.instr_mapping(&fadd, &mf);
    assert_eq!(summarize(&mapping), vec![Some((FPR, 64)); 3]);
}

#[test]
fn test_assigned_bank_wins_over_constraint() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("constraints");
    let dst = mf.reg_info_mut().create_generic_virtual_register(32);
    let src = generic_with_bank(&mut mf, 32, FPR);
    let mov = MachineInstr::new(MOVW).with_reg(dst).with_reg(src);

    let mapping = info.instr_mapping(&mov, &mf);
    assert_eq!(summarize(&mapping), vec![Some((GPR, 32)), Some((FPR, 32))]);
}

#[test]
fn test_no_register_operands_are_skipped() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("noreg");
    let x = generic_with_bank(&mut mf, 32, GPR);
    let y = generic_with_bank(&mut mf, 32, GPR);
    let add = MachineInstr::new(ADDRR)
        .with_reg(x)
        .with_reg(Register::NoRegister)
        .with_reg(y);

    let mapping = info.instr_mapping(&add, &mf);
    assert_eq!(summarize(&mapping), vec![Some((GPR, 32)), None, Some((GPR, 32))]);
    mapping.verify(&add, &mf);
}

#[test]
#[should_panic(expected = "is not in any register class")]
fn test_physical_register_outside_classes_panics() {
    let toy = Toy::new();
    let info = toy.bank_info();
    let mut mf = toy.function("flags");
    let x = mf.reg_info_mut().create_generic_virtual_register(32);
    let copy = MachineInstr::new(Opcode::COPY).with_reg(x).with_reg(toy.flags);
    info.instr_mapping_impl(&copy, &mf);
}

#[test]
#[should_panic(expected = "does not have a size")]
fn test_size_of_no_register_panics() {
    let toy = Toy::new();
    let mf = toy.function("noreg");
    size_in_bits(Register::NoRegister, mf.reg_info(), &toy.regs);
}

#[test]
#[should_panic(expected = "unable to deduce the register class")]
fn test_size_of_sizeless_register_panics() {
    let toy = Toy::new();
    let mut mf = toy.function("sizeless");
    let reg = mf.reg_info_mut().create_generic_virtual_register(0);
    size_in_bits(reg, mf.reg_info(), &toy.regs);
}
