//! SSEM main store.
//!
//! The original SSEM had 32 words of 32 bits, held as charge spots on a
//! Williams-Kilburn tube. The store here is sized by the machine model.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bits::BitWord;

/// A fixed number of fixed-width words, addressed from zero.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    word_length: usize,
    words: Vec<BitWord>,
}

impl MemoryStore {
    /// Create a store with every word zeroed.
    pub fn new(word_length: usize, word_count: usize) -> Self {
        Self {
            word_length,
            words: vec![BitWord::zero(word_length); word_count],
        }
    }

    /// Size of a word in bits.
    #[inline]
    pub fn word_length(&self) -> usize {
        self.word_length
    }

    /// Number of words in the store.
    #[inline]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Read the word at `address`.
    pub fn get(&self, address: usize) -> Result<&BitWord, StoreError> {
        self.words.get(address).ok_or(StoreError::AddressOutOfRange {
            address,
            word_count: self.words.len(),
        })
    }

    /// Replace the word at `address`.
    ///
    /// The word must be exactly as wide as the store's words; it is never
    /// truncated or padded.
    pub fn set(&mut self, address: usize, word: BitWord) -> Result<(), StoreError> {
        if word.len() != self.word_length {
            return Err(StoreError::WidthMismatch {
                expected: self.word_length,
                got: word.len(),
            });
        }
        let word_count = self.words.len();
        let slot = self
            .words
            .get_mut(address)
            .ok_or(StoreError::AddressOutOfRange { address, word_count })?;
        *slot = word;
        Ok(())
    }

    /// Zero every word; size is unchanged.
    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = BitWord::zero(self.word_length);
        }
    }

    /// Iterate over the words in address order.
    pub fn iter(&self) -> impl Iterator<Item = &BitWord> + '_ {
        self.words.iter()
    }

    /// All words in address order.
    pub fn words(&self) -> &[BitWord] {
        &self.words
    }
}

/// One word per line in address order, `_` for a set bit and `.` for a
/// clear one, bit 0 first.
impl fmt::Display for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (address, word) in self.words.iter().enumerate() {
            if address > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", word)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only count non-zero words
        let non_zero = self.words.iter().filter(|w| !w.is_zero()).count();

        f.debug_struct("MemoryStore")
            .field("word_length", &self.word_length)
            .field("word_count", &self.words.len())
            .field("non_zero_words", &non_zero)
            .finish()
    }
}

/// Errors that can occur during store access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store address {address} out of range (0-{})", .word_count.saturating_sub(1))]
    AddressOutOfRange { address: usize, word_count: usize },

    #[error("word is {got} bits wide, store words are {expected} bits")]
    WidthMismatch { expected: usize, got: usize },
}
