//! Dense bit sets over register class identifiers
//!
//! Register class relations (sub-classes, super-classes reachable through a
//! sub-register index) are handed out by targets as masks broken into `u32`
//! chunks. `SetBits` walks the set bits of such a mask and `RegClassSet` is
//! the owned, growable counterpart used to record bank coverage.

use crate::types::RegClassId;
use std::fmt;

const CHUNK_BITS: u32 = u32::BITS;

fn chunks_for(universe: u32) -> usize {
    universe.div_ceil(CHUNK_BITS) as usize
}

/// Iterator over the set bits of a chunked class mask, lowest bit first.
#[derive(Debug, Clone)]
pub struct SetBits<'a> {
    chunks: std::slice::Iter<'a, u32>,
    current: u32,
    base: u32,
}

impl<'a> SetBits<'a> {
    pub fn new(mask: &'a [u32]) -> Self {
        let mut chunks = mask.iter();
        let current = chunks.next().copied().unwrap_or(0);
        Self { chunks, current, base: 0 }
    }
}

impl Iterator for SetBits<'_> {
    type Item = RegClassId;

    fn next(&mut self) -> Option<RegClassId> {
        loop {
            if self.current != 0 {
                let offset = self.current.trailing_zeros();
                // Clear the lowest set bit.
                self.current &= self.current - 1;
                return Some(self.base + offset);
            }
            self.current = *self.chunks.next()?;
            self.base += CHUNK_BITS;
        }
    }
}

/// Test a single bit of a chunked class mask without iterating it.
pub fn mask_contains(mask: &[u32], id: RegClassId) -> bool {
    mask.get((id / CHUNK_BITS) as usize)
        .is_some_and(|chunk| chunk & (1 << (id % CHUNK_BITS)) != 0)
}

/// Set of register classes drawn from a universe of `universe()` classes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RegClassSet {
    chunks: Vec<u32>,
    universe: u32,
}

impl RegClassSet {
    /// Empty set able to hold classes `0..universe`
    pub fn new(universe: u32) -> Self {
        Self {
            chunks: vec![0; chunks_for(universe)],
            universe,
        }
    }

    /// Number of classes this set can describe (not the number of members)
    pub fn universe(&self) -> u32 {
        self.universe
    }

    /// Grow or shrink the universe; members beyond the new universe are dropped
    pub fn resize(&mut self, universe: u32) {
        self.chunks.resize(chunks_for(universe), 0);
        self.universe = universe;
        let rem = universe % CHUNK_BITS;
        if rem != 0 {
            if let Some(last) = self.chunks.last_mut() {
                *last &= (1 << rem) - 1;
            }
        }
    }

    pub fn contains(&self, id: RegClassId) -> bool {
        id < self.universe && mask_contains(&self.chunks, id)
    }

    /// Add `id`, returning true if it was not already a member.
    ///
    /// Panics if `id` is outside the universe.
    pub fn insert(&mut self, id: RegClassId) -> bool {
        assert!(
            id < self.universe,
            "register class {} is outside a set of {} classes",
            id,
            self.universe
        );
        let chunk = &mut self.chunks[(id / CHUNK_BITS) as usize];
        let bit = 1 << (id % CHUNK_BITS);
        let added = *chunk & bit == 0;
        *chunk |= bit;
        added
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.iter().all(|&chunk| chunk == 0)
    }

    pub fn count(&self) -> u32 {
        self.chunks.iter().map(|chunk| chunk.count_ones()).sum()
    }

    /// Add every member of `other`.
    ///
    /// Panics if `other` has a member outside this set's universe.
    pub fn union_with(&mut self, other: &RegClassSet) {
        for id in other {
            self.insert(id);
        }
    }

    pub fn iter(&self) -> SetBits<'_> {
        SetBits::new(&self.chunks)
    }

    /// Raw chunked mask, in the same layout targets use for class relations
    pub fn as_mask(&self) -> &[u32] {
        &self.chunks
    }
}

impl<'a> IntoIterator for &'a RegClassSet {
    type Item = RegClassId;
    type IntoIter = SetBits<'a>;

    fn into_iter(self) -> SetBits<'a> {
        self.iter()
    }
}

impl fmt::Display for RegClassSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}
