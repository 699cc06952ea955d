//! SSEM registers.
//!
//! The SSEM had two programmer-visible registers, each a full word wide:
//! - CI: the control instruction (program counter), read as an unsigned address
//! - A: the accumulator, read as a signed two's-complement number

use serde::{Deserialize, Serialize};

use crate::bits::BitWord;

/// The SSEM register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// CI: address of the instruction executed last; incremented before each fetch
    pub ci: BitWord,

    /// A: accumulator
    pub a: BitWord,
}

impl Registers {
    /// Create a register file with both registers zeroed.
    pub fn new(word_length: usize) -> Self {
        Self {
            ci: BitWord::zero(word_length),
            a: BitWord::zero(word_length),
        }
    }

    /// Reset both registers to zero, keeping their width.
    pub fn reset(&mut self) {
        self.ci = BitWord::zero(self.ci.len());
        self.a = BitWord::zero(self.a.len());
    }

    /// CI read as an unsigned integer.
    #[inline]
    pub fn ci_value(&self) -> u64 {
        self.ci.to_unsigned_int()
    }

    /// A read as a signed integer.
    #[inline]
    pub fn a_value(&self) -> i64 {
        self.a.to_int()
    }

    /// Move CI forward by one, wrapping at the end of the store.
    ///
    /// Returns the new CI value as a store address.
    pub fn advance_ci(&mut self, word_count: usize) -> usize {
        let next = (self.ci_value() as u128 + 1) % word_count.max(1) as u128;
        self.ci = BitWord::from_unsigned(next as u64, self.ci.len());
        next as usize
    }
}
