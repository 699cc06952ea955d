//! Fixed-length binary words.
//!
//! A [`BitWord`] is an ordered run of bits whose length is fixed when it is
//! built. Bit 0 is the least significant bit, which is also the leftmost bit
//! when a word is written out: the SSEM drew its numbers with the low-order
//! digit on the left, and every textual form in this crate follows suit.
//!
//! Signed values use two's complement over the full word, so the sign is
//! carried by the highest index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bits::GlyphStyle;

/// A fixed-length bit sequence (index 0 = least significant bit).
///
/// The length never changes after construction. Mutation happens only
/// through [`BitWord::set_bit`] and [`BitWord::engrave`], or by replacing the
/// whole word.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BitWord {
    /// Bits stored from least significant (index 0) to most significant.
    bits: Vec<bool>,
}

impl BitWord {
    /// Create a word of `len` clear bits.
    pub fn zero(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Create a word from bits given least significant first.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self {
            bits: bits.into_iter().collect(),
        }
    }

    /// Encode a signed integer as `len`-bit two's complement.
    ///
    /// Values in `[-2^(len-1), 2^(len-1) - 1]` round-trip exactly through
    /// [`BitWord::to_int`]. Anything outside that range wraps: only the low
    /// `len` bits of the two's-complement value are kept. Widths above 64
    /// bits are sign-extended.
    pub fn from_int(value: i64, len: usize) -> Self {
        let bits = (0..len).map(|i| (value >> i.min(63)) & 1 == 1).collect();
        Self { bits }
    }

    /// Encode an unsigned integer on `len` bits, wrapping modulo `2^len`.
    pub fn from_unsigned(value: u64, len: usize) -> Self {
        let bits = (0..len).map(|i| i < 64 && (value >> i) & 1 == 1).collect();
        Self { bits }
    }

    /// Parse a string of `0` and `1`, optionally prefixed with `0b`.
    ///
    /// The first character is bit 0, matching the rendering order.
    pub fn parse(s: &str) -> Result<Self, BitError> {
        let s = s.trim();
        let s = s.strip_prefix("0b").unwrap_or(s);

        let bits = s
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(BitError::InvalidChar(c)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { bits })
    }

    /// Number of bits in the word.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True for a zero-length word.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The underlying bits, least significant first.
    #[inline]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Iterate over the bits, least significant first.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    /// Get a single bit, or `None` past the end.
    #[inline]
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.bits.get(index).copied()
    }

    /// Set a single bit.
    pub fn set_bit(&mut self, index: usize, value: bool) -> Result<(), BitError> {
        let width = self.len();
        let slot = self.bits.get_mut(index).ok_or(BitError::OutOfRange {
            start: index as isize,
            end: index as isize + 1,
            width,
        })?;
        *slot = value;
        Ok(())
    }

    /// Check if every bit is clear.
    pub fn is_zero(&self) -> bool {
        self.bits.iter().all(|b| !b)
    }

    /// Copy bits `[start, start + len)` into a new word.
    pub fn slice(&self, start: usize, len: usize) -> Result<Self, BitError> {
        let end = start.checked_add(len).filter(|end| *end <= self.len());
        match end {
            Some(end) => Ok(Self {
                bits: self.bits[start..end].to_vec(),
            }),
            None => Err(BitError::OutOfRange {
                start: start as isize,
                end: start.saturating_add(len) as isize,
                width: self.len(),
            }),
        }
    }

    /// Overwrite bits starting at `index` with the bits of `other`.
    ///
    /// A negative `index` counts back from the end of the word and the write
    /// carries on from bit 0 once it passes the end of the word, so
    /// `engrave(-1, w)` writes the top bit then bits 0, 1, ... The target
    /// range must start in `[-len, len)` and cover at most `len` bits, so no
    /// bit is written twice; otherwise nothing is written.
    pub fn engrave(&mut self, index: isize, other: &BitWord) -> Result<(), BitError> {
        let width = self.len() as isize;
        let end = index + other.len() as isize;
        if index < -width || end > width || other.len() > self.len() {
            return Err(BitError::OutOfRange {
                start: index,
                end,
                width: self.len(),
            });
        }

        for (offset, bit) in other.iter().enumerate() {
            let position = index + offset as isize;
            let position = if position < 0 { position + width } else { position };
            self.bits[position as usize] = bit;
        }
        Ok(())
    }

    /// Interpret the whole word as two's complement (sign = highest bit).
    ///
    /// Words wider than 64 bits are read from their low 64 bits.
    pub fn to_int(&self) -> i64 {
        let len = self.len();
        let raw = self.to_unsigned_int();
        if len == 0 || len >= 64 {
            return raw as i64;
        }
        if self.bits[len - 1] {
            (raw as i128 - (1i128 << len)) as i64
        } else {
            raw as i64
        }
    }

    /// Interpret the whole word as an unsigned integer.
    ///
    /// Words wider than 64 bits are read from their low 64 bits.
    pub fn to_unsigned_int(&self) -> u64 {
        self.bits
            .iter()
            .take(64)
            .enumerate()
            .fold(0u64, |acc, (i, bit)| acc | ((*bit as u64) << i))
    }

    /// True when `value` round-trips through a `len`-bit signed word.
    pub fn fits_signed(value: i64, len: usize) -> bool {
        match len {
            0 => value == 0,
            _ if len >= 64 => true,
            _ => {
                let half = 1i64 << (len - 1);
                (-half..half).contains(&value)
            }
        }
    }

    /// True when `value` round-trips through a `len`-bit unsigned word.
    pub fn fits_unsigned(value: u64, len: usize) -> bool {
        len >= 64 || value < (1u64 << len)
    }

    /// Render with the given glyph alphabet, bit 0 first.
    pub fn render(&self, style: GlyphStyle) -> String {
        self.iter().map(|bit| style.glyph(bit)).collect()
    }

    /// Render as `0` and `1`, bit 0 first. This is the form [`BitWord::parse`]
    /// reads back.
    pub fn to_bit_string(&self) -> String {
        self.render(GlyphStyle::Binary)
    }
}

impl fmt::Debug for BitWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitWord({} = {})", self.to_bit_string(), self.to_int())
    }
}

/// Canonical textual form: `_` for a set bit, `.` for a clear bit, bit 0 first.
impl fmt::Display for BitWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(GlyphStyle::Classic))
    }
}

impl FromStr for BitWord {
    type Err = BitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BitWord::parse(s)
    }
}

impl TryFrom<String> for BitWord {
    type Error = BitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BitWord::parse(&value)
    }
}

impl From<BitWord> for String {
    fn from(word: BitWord) -> Self {
        word.to_bit_string()
    }
}

impl FromIterator<bool> for BitWord {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        BitWord::from_bits(iter)
    }
}

/// Errors from bit-level access and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitError {
    #[error("bit range {start}..{end} is outside a {width}-bit word")]
    OutOfRange { start: isize, end: isize, width: usize },

    #[error("invalid bit character: '{0}' (expected 0 or 1)")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> BitWord {
        BitWord::parse(s).unwrap()
    }

    #[test]
    fn test_zero() {
        assert_eq!(BitWord::zero(10).bits(), &[false; 10]);
        assert!(BitWord::zero(0).is_empty());
        assert!(BitWord::zero(32).is_zero());
    }

    #[test]
    fn test_from_int_bit_order() {
        assert_eq!(
            BitWord::from_int(123, 10).bits(),
            &[true, true, false, true, true, true, true, false, false, false]
        );
        assert_eq!(
            BitWord::from_int(-123, 10).bits(),
            &[true, false, true, false, false, false, false, true, true, true]
        );
        assert_eq!(BitWord::from_int(30, 5).bits(), &[false, true, true, true, true]);
        assert_eq!(BitWord::from_int(-1, 10).bits(), &[true; 10]);
        assert_eq!(
            BitWord::from_int(-2, 10).bits(),
            &[false, true, true, true, true, true, true, true, true, true]
        );
    }

    #[test]
    fn test_from_int_wraps_out_of_range() {
        // 33 = 0b100001 keeps its low five bits
        assert_eq!(BitWord::from_int(33, 5).to_unsigned_int(), 1);
        assert_eq!(BitWord::from_int(16, 5).to_int(), -16);
        // wider than 64 bits sign-extends
        let wide = BitWord::from_int(-1, 80);
        assert!(wide.iter().all(|bit| bit));
    }

    #[test]
    fn test_parse() {
        assert_eq!(b("0b01101").bits(), &[false, true, true, false, true]);
        assert_eq!(b("10100").bits(), &[true, false, true, false, false]);
        assert_eq!(BitWord::parse("10x"), Err(BitError::InvalidChar('x')));
        assert!(b("").is_empty());
    }

    #[test]
    fn test_to_int() {
        assert_eq!(BitWord::from_int(123, 16).to_int(), 123);
        assert_eq!(BitWord::from_int(-123, 16).to_int(), -123);
        assert_eq!(BitWord::from_int(0, 16).to_int(), 0);
        assert_eq!(BitWord::from_int(-1, 16).to_int(), -1);
        assert_eq!(BitWord::from_int(-75637, 32).to_int(), -75637);
        assert_eq!(BitWord::from_int(30, 32).to_int(), 30);
        // 30 in five signed bits reads back as -2
        assert_eq!(BitWord::from_int(30, 5).to_int(), -2);
        assert_eq!(BitWord::from_int(i64::MIN, 64).to_int(), i64::MIN);
        assert_eq!(BitWord::from_int(-5, 63).to_int(), -5);
    }

    #[test]
    fn test_to_unsigned_int() {
        assert_eq!(BitWord::from_int(30, 5).to_unsigned_int(), 30);
        assert_eq!(BitWord::from_int(-1, 32).to_unsigned_int(), u32::MAX as u64);
    }

    #[test]
    fn test_slice() {
        let word = b("0110100");
        assert_eq!(word.slice(1, 3).unwrap(), b("110"));
        assert_eq!(word.slice(7, 0).unwrap(), b(""));
        assert!(matches!(word.slice(5, 3), Err(BitError::OutOfRange { .. })));
        assert!(word.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_engrave() {
        let mut x = b("01000000000");
        x.engrave(6, &b("1101")).unwrap();
        assert_eq!(x, b("01000011010"));

        let mut x = b("111111111111");
        x.engrave(6, &b("0101")).unwrap();
        assert_eq!(x, b("111111010111"));

        let mut x = b("111111111111");
        x.engrave(0, &b("0101")).unwrap();
        assert_eq!(x, b("010111111111"));
    }

    #[test]
    fn test_engrave_out_of_bounds_leaves_word_untouched() {
        let mut x = b("111111111111");
        let result = x.engrave(10, &b("0101"));
        assert!(matches!(result, Err(BitError::OutOfRange { .. })));
        assert_eq!(x, b("111111111111"));

        assert!(x.engrave(-13, &b("0")).is_err());
        assert_eq!(x, b("111111111111"));
    }

    #[test]
    fn test_engrave_negative_index_wraps() {
        let mut x = b("111111111111");
        x.engrave(-1, &b("0000")).unwrap();
        assert_eq!(x, b("000111111110"));
    }

    #[test]
    fn test_engrave_negative_index_oversize_fails() {
        let mut x = BitWord::zero(4);
        assert!(x.engrave(-4, &b("101100")).is_err());
        assert_eq!(x, BitWord::zero(4));

        let mut y = b("1111");
        assert!(y.engrave(-2, &b("00000")).is_err());
        assert_eq!(y, b("1111"));
        y.engrave(-2, &b("0000")).unwrap();
        assert_eq!(y, b("0000"));
    }

    #[test]
    fn test_set_bit() {
        let mut x = BitWord::zero(4);
        x.set_bit(2, true).unwrap();
        assert_eq!(x, b("0010"));
        assert!(x.set_bit(4, true).is_err());
        assert_eq!(x.bit(2), Some(true));
        assert_eq!(x.bit(4), None);
    }

    #[test]
    fn test_fits() {
        assert!(BitWord::fits_signed(15, 5));
        assert!(BitWord::fits_signed(-16, 5));
        assert!(!BitWord::fits_signed(16, 5));
        assert!(!BitWord::fits_signed(-17, 5));
        assert!(BitWord::fits_signed(i64::MIN, 64));
        assert!(BitWord::fits_unsigned(31, 5));
        assert!(!BitWord::fits_unsigned(32, 5));
        assert!(BitWord::fits_unsigned(u64::MAX, 64));
    }

    #[test]
    fn test_display() {
        assert_eq!(BitWord::zero(8).to_string(), "........");
        assert_eq!(b("10101010").to_string(), "_._._._.");
        assert_eq!(b("01010101").to_string(), "._._._._");
        assert_eq!(b("11110000").to_string(), "____....");
        assert_eq!(b("").to_string(), "");
        assert_eq!(b("111000111000111000").to_string(), "___...___...___...");
    }

    #[test]
    fn test_serde_as_bit_string() {
        let word = b("1101");
        let json = serde_json::to_string(&word).unwrap();
        assert_eq!(json, "\"1101\"");
        let back: BitWord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, word);
        assert!(serde_json::from_str::<BitWord>("\"12\"").is_err());
    }
}
