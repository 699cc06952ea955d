//! Program text format detection.
//!
//! Two formats are accepted:
//! ```text
//! ; assembly text: <address> <MNEMONIC> [<operand>]
//! 00 NUM 0
//! 01 LDN 20
//!
//! ; binary dump: <address>: <bits, bit 0 first>
//! 0000: 00000000000000000000000000000000
//! 0001: 00101000000000100000000000000000
//! ```

use serde::{Deserialize, Serialize};

/// The kind of program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramFormat {
    AssemblyText,
    BinaryDump,
    Unknown,
}

/// Strip a trailing `;` comment and surrounding whitespace.
pub(crate) fn clean_line(line: &str) -> &str {
    line.split(';').next().unwrap_or_default().trim()
}

/// Meaningful lines of `source` with their 1-based line numbers.
pub(crate) fn meaningful_lines(source: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, clean_line(line)))
        .filter(|(_, line)| !line.is_empty())
}

/// Detect the format of a program from its first recognizable line.
///
/// Lines matching neither format are skipped; if none matches, the format
/// is [`ProgramFormat::Unknown`].
pub fn detect_format(source: &str) -> ProgramFormat {
    for (_, line) in meaningful_lines(source) {
        if is_assembly_line(line) {
            return ProgramFormat::AssemblyText;
        }
        if is_dump_line(line) {
            return ProgramFormat::BinaryDump;
        }
    }
    ProgramFormat::Unknown
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// `<digits> <word>[ <digits>]`, separated by single spaces.
fn is_assembly_line(line: &str) -> bool {
    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        [address, mnemonic] => is_digits(address) && is_word(mnemonic),
        [address, mnemonic, operand] => {
            is_digits(address) && is_word(mnemonic) && is_digits(operand)
        }
        _ => false,
    }
}

/// `<digits>: <bits>`
fn is_dump_line(line: &str) -> bool {
    match line.split_once(": ") {
        Some((address, bits)) => {
            is_digits(address) && !bits.is_empty() && bits.chars().all(|c| c == '0' || c == '1')
        }
        None => false,
    }
}
