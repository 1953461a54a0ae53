//! Register bank inspector
//!
//! Builds the register banks of a JSON target description and infers the
//! default instruction mapping of every instruction of a JSON function.

use clap::{Parser, Subcommand};
use log::debug;
use rbank_core::{InstructionMapping, RegisterBankInfo, TableRegisterBankInfo};
use rbank_target::{
    FunctionDescription, InstrTable, MachineFunction, MachineInstr, RegClassTable, TargetDescription,
    TargetRegisterInfo,
};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rbk")]
#[command(about = "Register bank inspector")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log bank construction and mapping inference
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the register banks of a target and print what they cover
    Banks {
        /// Target description (JSON)
        #[arg(short, long)]
        target: PathBuf,
    },

    /// Print the mapping of every instruction of a function
    Map {
        /// Target description (JSON)
        #[arg(short, long)]
        target: PathBuf,

        /// Function description (JSON)
        #[arg(short, long)]
        function: PathBuf,

        /// Also print the alternative mappings of each instruction
        #[arg(long)]
        all: bool,
    },
}

/// A target loaded from its description, with its banks built
struct Target {
    reg_info: RegClassTable,
    instr_info: InstrTable,
    banks: TableRegisterBankInfo,
}

impl Target {
    fn from_json(text: &str) -> Result<Self, Box<dyn Error>> {
        let desc = TargetDescription::from_json(text)?;
        let reg_info = desc.build_reg_info()?;
        let instr_info = desc.build_instr_info(&reg_info)?;
        let banks = TableRegisterBankInfo::from_description(&desc, &reg_info)?;
        debug!("Loaded target '{}'", desc.name);
        Ok(Self {
            reg_info,
            instr_info,
            banks,
        })
    }

    fn function(&self, text: &str) -> Result<MachineFunction<'_>, Box<dyn Error>> {
        let desc = FunctionDescription::from_json(text)?;
        Ok(desc.build(&self.reg_info, &self.instr_info, |name| self.banks.bank_id(name))?)
    }

    /// Banks with their coverage, then the bank of every register class
    fn bank_report(&self) -> Vec<String> {
        let tri: &dyn TargetRegisterInfo = &self.reg_info;
        let mut lines: Vec<String> = self
            .banks
            .registry()
            .iter()
            .map(|bank| bank.display_with(tri).to_string())
            .collect();
        for rc in 0..tri.num_reg_classes() {
            let bank = self
                .banks
                .registry()
                .bank_covering(rc)
                .map_or("none", |bank| bank.name());
            lines.push(format!(
                "  {} ({} bits) -> {}",
                tri.reg_class_name(rc),
                tri.reg_class_size_in_bits(rc),
                bank
            ));
        }
        lines
    }

    /// One line per instruction followed by its candidate mappings.
    /// Generic instructions and failed inferences are reported, not mapped.
    fn mapping_report(&self, mf: &MachineFunction<'_>, all: bool) -> Vec<String> {
        let mut lines = vec![format!("{}:", mf.name())];
        for (idx, mi) in mf.instrs().iter().enumerate() {
            lines.push(format!("{}: {}", idx, mi.display(mf.instr_info())));
            if mi.opcode().is_pre_isel_generic() {
                lines.push("  generic opcode, no target mapping".to_string());
                continue;
            }
            let mapping = self.banks.instr_mapping_impl(mi, mf);
            if !mapping.is_valid() {
                lines.push("  no mapping: an operand has no bank".to_string());
                continue;
            }

            let mut candidates = vec![mapping];
            if all {
                candidates.extend(self.banks.instr_alternative_mappings(mi, mf));
            }
            for candidate in &candidates {
                lines.push(describe(candidate, mi, mf));
            }
        }
        lines
    }
}

fn describe(mapping: &InstructionMapping<'_>, mi: &MachineInstr, mf: &MachineFunction<'_>) -> String {
    match mapping.check(mi, mf) {
        Ok(()) => format!("  {}", mapping),
        Err(err) => format!("  {} (invalid: {})", mapping, err),
    }
}

fn banks_command(target_path: &Path) -> Result<(), Box<dyn Error>> {
    let target = Target::from_json(&fs::read_to_string(target_path)?)?;
    for line in target.bank_report() {
        println!("{}", line);
    }
    Ok(())
}

fn map_command(target_path: &Path, function_path: &Path, all: bool) -> Result<(), Box<dyn Error>> {
    let target = Target::from_json(&fs::read_to_string(target_path)?)?;
    let mf = target.function(&fs::read_to_string(function_path)?)?;
    for line in target.mapping_report(&mf, all) {
        println!("{}", line);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::init();
    }

    let result = match &cli.command {
        Commands::Banks { target } => banks_command(target),
        Commands::Map { target, function, all } => map_command(target, function, *all),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
