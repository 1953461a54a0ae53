//! Arbitrary-width bit masks
//!
//! A `BitMask` selects the bits of a value that a partial mapping places in
//! one register bank. Its width is the width of the mapped value, which can
//! exceed 64 bits (vector and wide scalar values).

use std::fmt;
use std::ops::BitOrAssign;

const WORD_BITS: u32 = u64::BITS;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitMask {
    width: u32,
    /// Little-endian words; bits at and above `width` are always zero.
    words: Vec<u64>,
}

impl BitMask {
    /// All-zero mask of `width` bits
    pub fn zero(width: u32) -> Self {
        Self {
            width,
            words: vec![0; width.div_ceil(WORD_BITS) as usize],
        }
    }

    /// All-ones mask of `width` bits
    pub fn all_ones(width: u32) -> Self {
        let mut mask = Self {
            width,
            words: vec![u64::MAX; width.div_ceil(WORD_BITS) as usize],
        };
        mask.clear_unused_bits();
        mask
    }

    /// Mask of `width` bits with `len` ones starting at bit `lo`
    pub fn range(width: u32, lo: u32, len: u32) -> Self {
        assert!(
            lo.checked_add(len).is_some_and(|hi| hi <= width),
            "bit range {}..{} does not fit in {} bits",
            lo,
            lo.saturating_add(len),
            width
        );
        let mut mask = Self::zero(width);
        for bit in lo..lo + len {
            mask.set_bit(bit);
        }
        mask
    }

    /// Mask of `width` bits holding the low bits of `value`
    pub fn from_u64(width: u32, value: u64) -> Self {
        let mut mask = Self::zero(width);
        if let Some(first) = mask.words.first_mut() {
            *first = value;
        }
        mask.clear_unused_bits();
        mask
    }

    fn clear_unused_bits(&mut self) {
        let rem = self.width % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn bit(&self, index: u32) -> bool {
        index < self.width && self.words[(index / WORD_BITS) as usize] & (1 << (index % WORD_BITS)) != 0
    }

    pub fn set_bit(&mut self, index: u32) {
        assert!(index < self.width, "bit {} out of range for a {}-bit mask", index, self.width);
        self.words[(index / WORD_BITS) as usize] |= 1 << (index % WORD_BITS);
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    pub fn is_all_ones(&self) -> bool {
        *self == Self::all_ones(self.width)
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    /// Number of zero bits below the lowest set bit (`width` for a zero mask)
    pub fn trailing_zeros(&self) -> u32 {
        for (i, &word) in self.words.iter().enumerate() {
            if word != 0 {
                return i as u32 * WORD_BITS + word.trailing_zeros();
            }
        }
        self.width
    }

    /// Number of zero bits above the highest set bit (`width` for a zero mask)
    pub fn leading_zeros(&self) -> u32 {
        let last = self.words.len().saturating_sub(1);
        let mut zeros = 0;
        for (i, &word) in self.words.iter().enumerate().rev() {
            let bits_in_word = if i == last && self.width % WORD_BITS != 0 {
                self.width % WORD_BITS
            } else {
                WORD_BITS
            };
            if word == 0 {
                zeros += bits_in_word;
                continue;
            }
            return zeros + word.leading_zeros() - (WORD_BITS - bits_in_word);
        }
        zeros
    }

    /// Bits spanned from the lowest to the highest set bit, inclusive.
    ///
    /// A zero mask spans nothing.
    pub fn active_width(&self) -> u32 {
        if self.is_zero() {
            return 0;
        }
        self.width - self.leading_zeros() - self.trailing_zeros()
    }
}

impl BitOrAssign<&BitMask> for BitMask {
    fn bitor_assign(&mut self, rhs: &BitMask) {
        assert_eq!(self.width, rhs.width, "cannot combine masks of different widths");
        for (lhs, rhs) in self.words.iter_mut().zip(&rhs.words) {
            *lhs |= rhs;
        }
    }
}

impl fmt::Display for BitMask {
    /// Binary C literal, most significant set bit first (`0b0` when empty)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0b")?;
        if self.is_zero() {
            return write!(f, "0");
        }
        let top = self.width - self.leading_zeros();
        for bit in (0..top).rev() {
            write!(f, "{}", if self.bit(bit) { '1' } else { '0' })?;
        }
        Ok(())
    }
}
