//! Bit-level primitives.
//!
//! This module provides the core types for working with machine words:
//! - [`BitWord`] - A fixed-length bit sequence, index 0 = least significant bit
//! - [`GlyphStyle`] - The two-glyph alphabets used to render words

mod glyph;
mod word;

pub use glyph::GlyphStyle;
pub use word::{BitError, BitWord};
