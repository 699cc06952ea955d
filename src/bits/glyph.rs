//! Glyph alphabets for rendering words.
//!
//! The SSEM displayed its store on a CRT as rows of bright dashes and dim
//! dots. Every style maps a set bit and a clear bit to one character each.

use serde::{Deserialize, Serialize};

/// A two-glyph alphabet used to draw a word, set bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GlyphStyle {
    /// `#` and `.`
    HighContrast,
    /// `−` and `·`, closest to the CRT display
    Fancy,
    /// `_` and `.`, the canonical textual form
    #[default]
    Classic,
    /// `1` and `0`
    Binary,
}

impl GlyphStyle {
    /// All styles in display-cycle order.
    pub const ALL: [GlyphStyle; 4] = [
        GlyphStyle::HighContrast,
        GlyphStyle::Fancy,
        GlyphStyle::Classic,
        GlyphStyle::Binary,
    ];

    /// The `(set, clear)` glyph pair.
    #[inline]
    pub const fn glyphs(self) -> (char, char) {
        match self {
            GlyphStyle::HighContrast => ('#', '.'),
            GlyphStyle::Fancy => ('−', '·'),
            GlyphStyle::Classic => ('_', '.'),
            GlyphStyle::Binary => ('1', '0'),
        }
    }

    /// Glyph for a single bit.
    #[inline]
    pub const fn glyph(self, bit: bool) -> char {
        let (set, clear) = self.glyphs();
        if bit {
            set
        } else {
            clear
        }
    }

    /// The style following this one, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_is_default() {
        assert_eq!(GlyphStyle::default(), GlyphStyle::Classic);
        assert_eq!(GlyphStyle::Classic.glyphs(), ('_', '.'));
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut style = GlyphStyle::HighContrast;
        for expected in GlyphStyle::ALL.iter().skip(1) {
            style = style.next();
            assert_eq!(style, *expected);
        }
        assert_eq!(style.next(), GlyphStyle::HighContrast);
    }
}
