//! Packed vectors of 4-state logic values used as signal values.
//!
//! Bus words are byte-lane oriented: byte `i` of a word occupies bits
//! `8*i .. 8*i+8`, matching a little-endian `tdata` bus.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A vector of 4-state [`Logic`] values packed for efficient storage.
///
/// Each logic value occupies 2 bits (encoding 4 states), with 32 values packed
/// per `u64` word.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    /// Packed storage: 2 bits per logic value, 32 values per u64.
    data: Vec<u64>,
}

/// Number of logic values packed per u64 word.
const VALUES_PER_WORD: u32 = 32;

/// Every 2-bit lane set to the `X` encoding (0b10).
const ALL_X: u64 = 0xAAAA_AAAA_AAAA_AAAA;

impl LogicVec {
    /// Creates a new `LogicVec` of the given width, initialized to all `Zero`.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Creates a `LogicVec` of the given width with every bit unknown.
    pub fn unknown(width: u32) -> Self {
        let mut v = Self {
            width,
            data: vec![ALL_X; word_count(width)],
        };
        v.clear_tail();
        v
    }

    /// Returns the number of logic values in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        Logic::from_bits(self.data[word_idx] >> bit_offset)
    }

    /// Sets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        let mask = !(0b11u64 << bit_offset);
        self.data[word_idx] = (self.data[word_idx] & mask) | ((value as u64) << bit_offset);
    }

    /// Returns the least significant bit, the whole value of a 1-bit signal.
    ///
    /// A zero-width vector reads as `Z`.
    pub fn bit0(&self) -> Logic {
        if self.width == 0 {
            Logic::Z
        } else {
            self.get(0)
        }
    }

    /// Creates a single-bit `LogicVec` from a logic level.
    pub fn from_logic(value: Logic) -> Self {
        let mut v = Self::new(1);
        v.set(0, value);
        v
    }

    /// Creates a single-bit `LogicVec` from a boolean value.
    pub fn from_bool(value: bool) -> Self {
        Self::from_logic(Logic::from_bool(value))
    }

    /// Creates a `LogicVec` from a `u64` value with the given width.
    ///
    /// Bits beyond the given width are ignored.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Converts the `LogicVec` to a `u64`, if all bits are definite (0 or 1).
    ///
    /// Returns `None` if the vector contains X or Z values, or if the width
    /// exceeds 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut result = 0u64;
        for i in 0..self.width {
            match self.get(i) {
                Logic::Zero => {}
                Logic::One => result |= 1 << i,
                Logic::X | Logic::Z => return None,
            }
        }
        Some(result)
    }

    /// Packs bytes into a word of `bytes.len() * 8` bits, byte 0 in the low lane.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut v = Self::new((bytes.len() * 8) as u32);
        for (lane, byte) in bytes.iter().enumerate() {
            for bit in 0..8 {
                if (byte >> bit) & 1 != 0 {
                    v.set(lane as u32 * 8 + bit, Logic::One);
                }
            }
        }
        v
    }

    /// Unpacks the vector into bytes, low lane first.
    ///
    /// Returns `None` if any bit is X or Z, or the width is not a whole number
    /// of bytes.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        if self.width % 8 != 0 {
            return None;
        }
        let mut bytes = Vec::with_capacity((self.width / 8) as usize);
        for lane in 0..self.width / 8 {
            let mut byte = 0u8;
            for bit in 0..8 {
                match self.get(lane * 8 + bit) {
                    Logic::Zero => {}
                    Logic::One => byte |= 1 << bit,
                    Logic::X | Logic::Z => return None,
                }
            }
            bytes.push(byte);
        }
        Some(bytes)
    }

    /// Returns true if no bit is X or Z.
    pub fn is_known(&self) -> bool {
        (0..self.width).all(|i| self.get(i).is_known())
    }

    /// Returns a copy resized to `width`, truncating high bits or zero-extending.
    pub fn resized(&self, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(self.width) {
            v.set(i, self.get(i));
        }
        v
    }

    /// Parses a binary string like `"10XZ"` into a `LogicVec`.
    ///
    /// The leftmost character is the most significant bit (highest index).
    /// Returns `None` if the string contains invalid characters.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let width = s.len() as u32;
        let mut v = Self::new(width);
        for (i, c) in s.chars().rev().enumerate() {
            let val = Logic::from_char(c)?;
            v.set(i as u32, val);
        }
        Some(v)
    }

    /// Zeroes the unused lanes of the last storage word so equality stays structural.
    fn clear_tail(&mut self) {
        let used = self.width % VALUES_PER_WORD;
        if used != 0 {
            if let Some(last) = self.data.last_mut() {
                *last &= (1u64 << (used * 2)) - 1;
            }
        }
    }
}

impl From<Logic> for LogicVec {
    fn from(value: Logic) -> Self {
        Self::from_logic(value)
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({self})")
    }
}

/// Returns the number of u64 words needed to store `width` logic values.
fn word_count(width: u32) -> usize {
    width.div_ceil(VALUES_PER_WORD) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_initializes_to_zero() {
        let v = LogicVec::new(8);
        assert_eq!(v.width(), 8);
        assert_eq!(v.to_u64(), Some(0));
    }

    #[test]
    fn set_get_roundtrip() {
        let mut v = LogicVec::new(4);
        v.set(0, Logic::One);
        v.set(1, Logic::X);
        v.set(3, Logic::Z);
        assert_eq!(v.get(0), Logic::One);
        assert_eq!(v.get(1), Logic::X);
        assert_eq!(v.get(2), Logic::Zero);
        assert_eq!(v.get(3), Logic::Z);
    }

    #[test]
    fn unknown_is_all_x() {
        let v = LogicVec::unknown(40);
        assert!((0..40).all(|i| v.get(i) == Logic::X));
        assert!(!v.is_known());
        assert_eq!(v.to_bytes(), None);
    }

    #[test]
    fn unknown_equality_ignores_unused_lanes() {
        let mut built = LogicVec::new(3);
        for i in 0..3 {
            built.set(i, Logic::X);
        }
        assert_eq!(built, LogicVec::unknown(3));
    }

    #[test]
    fn bytes_map_to_little_endian_lanes() {
        let v = LogicVec::from_bytes(&[0x01, 0x80]);
        assert_eq!(v.width(), 16);
        assert_eq!(v.get(0), Logic::One);
        assert_eq!(v.get(15), Logic::One);
        assert_eq!(v.to_u64(), Some(0x8001));
        assert_eq!(v.to_bytes(), Some(vec![0x01, 0x80]));
    }

    #[test]
    fn to_bytes_rejects_partial_lanes() {
        assert_eq!(LogicVec::from_u64(3, 4).to_bytes(), None);
    }

    #[test]
    fn wide_word_spanning_storage_words() {
        let bytes: Vec<u8> = (0..16).collect();
        let v = LogicVec::from_bytes(&bytes);
        assert_eq!(v.width(), 128);
        assert_eq!(v.to_bytes(), Some(bytes));
        assert_eq!(v.to_u64(), None);
    }

    #[test]
    fn bit0_and_single_bit_constructors() {
        assert_eq!(LogicVec::from_bool(true).bit0(), Logic::One);
        assert_eq!(LogicVec::from(Logic::X).bit0(), Logic::X);
        assert_eq!(LogicVec::new(0).bit0(), Logic::Z);
    }

    #[test]
    fn resized_truncates_and_extends() {
        let v = LogicVec::from_u64(0b1011, 4);
        assert_eq!(v.resized(2).to_u64(), Some(0b11));
        assert_eq!(v.resized(8).to_u64(), Some(0b1011));
    }

    #[test]
    fn from_binary_str_and_display() {
        let v = LogicVec::from_binary_str("10XZ").unwrap();
        assert_eq!(v.width(), 4);
        assert_eq!(v.to_string(), "10XZ");
        assert!(LogicVec::from_binary_str("10a").is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let v = LogicVec::from_binary_str("1X0Z").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
