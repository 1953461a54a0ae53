//! Register class hierarchy
//!
//! The register bank engine never owns the class hierarchy: it only walks it
//! through `TargetRegisterInfo`. `RegClassTable` is a table-driven hierarchy
//! that targets (and tests) can build programmatically or load from a JSON
//! description.

use rbank_common::bitset::mask_contains;
use rbank_common::{PhysReg, RegClassId, RegClassSet, SubRegIdx};

/// Read-only view of a target's register classes
pub trait TargetRegisterInfo {
    fn num_reg_classes(&self) -> u32;

    /// Class name, for diagnostics only
    fn reg_class_name(&self, rc: RegClassId) -> &str;

    fn reg_class_size_in_bits(&self, rc: RegClassId) -> u32;

    /// Chunked mask of every sub-class of `rc`, `rc` itself included
    fn sub_class_mask(&self, rc: RegClassId) -> &[u32];

    /// One chunked mask per sub-register index: the classes whose registers
    /// all have a sub-register, at that index, belonging to `rc`.
    ///
    /// This is the sub-register relation seen from the sub-register side.
    /// It is not the inverse of the sub-class relation.
    fn super_reg_classes<'a>(&'a self, rc: RegClassId) -> Box<dyn Iterator<Item = &'a [u32]> + 'a>;

    /// Smallest class containing the physical register `reg`
    fn minimal_phys_reg_class(&self, reg: PhysReg) -> Option<RegClassId>;

    fn phys_reg_name(&self, _reg: PhysReg) -> Option<&str> {
        None
    }

    /// True if `sub` is `rc` or one of its sub-classes
    fn has_sub_class_eq(&self, rc: RegClassId, sub: RegClassId) -> bool {
        mask_contains(self.sub_class_mask(rc), sub)
    }
}

#[derive(Debug, Clone)]
struct RegClassInfo {
    name: String,
    size_in_bits: u32,
    sub_classes: RegClassSet,
    /// Indexed by sub-register index
    super_reg_classes: Vec<RegClassSet>,
    members: Vec<PhysReg>,
}

/// Table-driven register class hierarchy
#[derive(Debug, Clone, Default)]
pub struct RegClassTable {
    classes: Vec<RegClassInfo>,
    phys_regs: Vec<String>,
}

impl RegClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class of `size_in_bits` bits and return its identifier
    pub fn add_reg_class(&mut self, name: &str, size_in_bits: u32) -> RegClassId {
        let id = self.classes.len() as RegClassId;
        let mut sub_classes = RegClassSet::new(id + 1);
        sub_classes.insert(id);
        self.classes.push(RegClassInfo {
            name: name.to_string(),
            size_in_bits,
            sub_classes,
            super_reg_classes: Vec::new(),
            members: Vec::new(),
        });
        id
    }

    /// Record `sub` as a sub-class of `rc`.
    ///
    /// Sub-class masks stay transitively closed: `sub` and its own
    /// sub-classes join `rc` and every class that already has `rc` as a
    /// sub-class, whatever order the edges are added in.
    pub fn add_sub_class(&mut self, rc: RegClassId, sub: RegClassId) {
        let universe = self.num_reg_classes();
        assert!(rc < universe, "unknown register class {}", rc);
        assert!(sub < universe, "unknown register class {}", sub);
        let mut added = self.classes[sub as usize].sub_classes.clone();
        added.resize(universe);
        for class in &mut self.classes {
            if class.sub_classes.contains(rc) {
                class.sub_classes.resize(universe);
                class.sub_classes.union_with(&added);
            }
        }
    }

    /// Record that every register of `super_rc` has a sub-register at
    /// `idx` that belongs to `sub_rc`.
    pub fn add_sub_reg_class(&mut self, super_rc: RegClassId, idx: SubRegIdx, sub_rc: RegClassId) {
        let universe = self.num_reg_classes();
        assert!(super_rc < universe, "unknown register class {}", super_rc);
        let masks = &mut self.classes[sub_rc as usize].super_reg_classes;
        if masks.len() <= idx as usize {
            masks.resize(idx as usize + 1, RegClassSet::default());
        }
        let set = &mut masks[idx as usize];
        set.resize(universe);
        set.insert(super_rc);
    }

    pub fn add_phys_reg(&mut self, name: &str) -> PhysReg {
        self.phys_regs.push(name.to_string());
        PhysReg(self.phys_regs.len() as u32 - 1)
    }

    /// Make `reg` a member of `rc`
    pub fn add_member(&mut self, rc: RegClassId, reg: PhysReg) {
        assert!(reg.index() < self.phys_regs.len(), "unknown physical register {}", reg);
        let members = &mut self.classes[rc as usize].members;
        if !members.contains(&reg) {
            members.push(reg);
        }
    }

    /// True if `reg` is a member of `rc`
    pub fn contains(&self, rc: RegClassId, reg: PhysReg) -> bool {
        self.classes[rc as usize].members.contains(&reg)
    }

    pub fn reg_class_by_name(&self, name: &str) -> Option<RegClassId> {
        self.classes
            .iter()
            .position(|class| class.name == name)
            .map(|idx| idx as RegClassId)
    }

    pub fn phys_reg_by_name(&self, name: &str) -> Option<PhysReg> {
        self.phys_regs
            .iter()
            .position(|reg| reg == name)
            .map(|idx| PhysReg(idx as u32))
    }

    pub fn num_phys_regs(&self) -> usize {
        self.phys_regs.len()
    }
}

impl TargetRegisterInfo for RegClassTable {
    fn num_reg_classes(&self) -> u32 {
        self.classes.len() as u32
    }

    fn reg_class_name(&self, rc: RegClassId) -> &str {
        &self.classes[rc as usize].name
    }

    fn reg_class_size_in_bits(&self, rc: RegClassId) -> u32 {
        self.classes[rc as usize].size_in_bits
    }

    fn sub_class_mask(&self, rc: RegClassId) -> &[u32] {
        self.classes[rc as usize].sub_classes.as_mask()
    }

    fn super_reg_classes<'a>(&'a self, rc: RegClassId) -> Box<dyn Iterator<Item = &'a [u32]> + 'a> {
        Box::new(
            self.classes[rc as usize]
                .super_reg_classes
                .iter()
                .filter(|set| !set.is_empty())
                .map(|set| set.as_mask()),
        )
    }

    fn minimal_phys_reg_class(&self, reg: PhysReg) -> Option<RegClassId> {
        let mut best: Option<RegClassId> = None;
        for id in 0..self.num_reg_classes() {
            if !self.contains(id, reg) {
                continue;
            }
            // Prefer the candidate if it is a strict sub-class of the best so far.
            if best.map_or(true, |best| best != id && self.has_sub_class_eq(best, id)) {
                best = Some(id);
            }
        }
        best
    }

    fn phys_reg_name(&self, reg: PhysReg) -> Option<&str> {
        self.phys_regs.get(reg.index()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rbank_common::SetBits;

    fn gpr_table() -> (RegClassTable, RegClassId, RegClassId, RegClassId) {
        let mut table = RegClassTable::new();
        let gpr64 = table.add_reg_class("GPR64", 64);
        let gpr32 = table.add_reg_class("GPR32", 32);
        let gpr32_nosp = table.add_reg_class("GPR32noSP", 32);
        table.add_sub_class(gpr32, gpr32_nosp);
        table.add_sub_reg_class(gpr64, 1, gpr32);
        (table, gpr64, gpr32, gpr32_nosp)
    }

    #[test]
    fn test_sub_class_mask_includes_self() {
        let (table, gpr64, gpr32, gpr32_nosp) = gpr_table();
        assert_eq!(SetBits::new(table.sub_class_mask(gpr64)).collect::<Vec<_>>(), vec![gpr64]);
        assert_eq!(
            SetBits::new(table.sub_class_mask(gpr32)).collect::<Vec<_>>(),
            vec![gpr32, gpr32_nosp]
        );
        assert!(table.has_sub_class_eq(gpr32, gpr32_nosp));
        assert!(!table.has_sub_class_eq(gpr32_nosp, gpr32));
    }

    #[test]
    fn test_super_reg_classes_seen_from_sub_register_side() {
        let (table, gpr64, gpr32, gpr32_nosp) = gpr_table();
        let supers: Vec<Vec<RegClassId>> = table
            .super_reg_classes(gpr32)
            .map(|mask| SetBits::new(mask).collect())
            .collect();
        assert_eq!(supers, vec![vec![gpr64]]);
        assert_eq!(table.super_reg_classes(gpr64).count(), 0);
        assert_eq!(table.super_reg_classes(gpr32_nosp).count(), 0);
    }

    #[test]
    fn test_minimal_phys_reg_class() {
        let (mut table, gpr64, gpr32, gpr32_nosp) = gpr_table();
        let w0 = table.add_phys_reg("W0");
        let wsp = table.add_phys_reg("WSP");
        let x0 = table.add_phys_reg("X0");
        table.add_member(gpr32, w0);
        table.add_member(gpr32, wsp);
        table.add_member(gpr32_nosp, w0);
        table.add_member(gpr64, x0);

        assert_eq!(table.minimal_phys_reg_class(w0), Some(gpr32_nosp));
        assert_eq!(table.minimal_phys_reg_class(wsp), Some(gpr32));
        assert_eq!(table.minimal_phys_reg_class(x0), Some(gpr64));
        assert_eq!(table.phys_reg_name(wsp), Some("WSP"));
        assert_eq!(table.phys_reg_by_name("X0"), Some(x0));
    }

    #[test]
    fn test_sub_class_mask_is_transitive() {
        // Declared out of hierarchy order: WIDE > MID > NARROW.
        let mut table = RegClassTable::new();
        let wide = table.add_reg_class("WIDE", 64);
        let narrow = table.add_reg_class("NARROW", 16);
        let mid = table.add_reg_class("MID", 32);
        table.add_sub_class(wide, mid);
        table.add_sub_class(mid, narrow);

        assert!(table.has_sub_class_eq(wide, narrow));
        assert_eq!(
            SetBits::new(table.sub_class_mask(wide)).collect::<Vec<_>>(),
            vec![wide, narrow, mid]
        );
        assert!(!table.has_sub_class_eq(narrow, mid));

        let r = table.add_phys_reg("R");
        for rc in [wide, narrow, mid] {
            table.add_member(rc, r);
        }
        assert!(table.contains(narrow, r));
        assert_eq!(table.minimal_phys_reg_class(r), Some(narrow));
        assert_eq!(table.reg_class_size_in_bits(narrow), 16);
    }

    #[test]
    fn test_sub_class_edges_close_in_any_order() {
        let mut table = RegClassTable::new();
        let wide = table.add_reg_class("WIDE", 64);
        let mid = table.add_reg_class("MID", 32);
        let narrow = table.add_reg_class("NARROW", 16);
        table.add_sub_class(mid, narrow);
        table.add_sub_class(wide, mid);

        assert_eq!(
            SetBits::new(table.sub_class_mask(wide)).collect::<Vec<_>>(),
            vec![wide, mid, narrow]
        );
        assert_eq!(
            SetBits::new(table.sub_class_mask(mid)).collect::<Vec<_>>(),
            vec![mid, narrow]
        );
    }

    #[test]
    fn test_lookup_by_name() {
        let (table, _, gpr32, _) = gpr_table();
        assert_eq!(table.reg_class_by_name("GPR32"), Some(gpr32));
        assert_eq!(table.reg_class_by_name("FPR32"), None);
        assert_eq!(table.reg_class_name(gpr32), "GPR32");
        assert_eq!(table.reg_class_size_in_bits(gpr32), 32);
    }
}
