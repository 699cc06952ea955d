//! Binary dump format for SSEM stores.
//!
//! A dump is plain text, one word per line:
//! - `NNNN: bits`, address in decimal, bits as `0`/`1` with bit 0 first
//! - Lines starting with `;` are comments
//! - Blank lines are ignored
//!
//! Dumps are read back by [`Assembler::load`](crate::asm::Assembler::load).

use std::fmt::Write as _;
use std::path::Path;

use crate::asm::LoadError;
use crate::cpu::MemoryStore;

/// Render a store as a binary dump.
pub fn dump_store(store: &MemoryStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "; SSEM store dump");
    let _ = writeln!(
        out,
        "; {} words of {} bits",
        store.word_count(),
        store.word_length()
    );
    for (address, word) in store.iter().enumerate() {
        let _ = writeln!(out, "{:04}: {}", address, word.to_bit_string());
    }
    out
}

/// Save a store as a binary dump file.
pub fn save_dump<P: AsRef<Path>>(path: P, store: &MemoryStore) -> Result<(), LoadError> {
    let path = path.as_ref();
    std::fs::write(path, dump_store(store))
        .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), "store dumped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{detect_format, Assembler, ProgramFormat};
    use crate::bits::BitWord;
    use crate::cpu::MachineModel;

    #[test]
    fn test_dump_format() {
        let mut store = MemoryStore::new(4, 2);
        store.set(1, BitWord::parse("1100").unwrap()).unwrap();
        assert_eq!(
            dump_store(&store),
            "; SSEM store dump\n; 2 words of 4 bits\n0000: 0000\n0001: 1100\n"
        );
    }

    #[test]
    fn test_dump_reloads() {
        let model = MachineModel::ssem();
        let mut store = MemoryStore::new(32, 32);
        Assembler::new(&model)
            .load("00 NUM -3\n01 LDN 0\n02 STP", &mut store)
            .unwrap();

        let text = dump_store(&store);
        assert_eq!(detect_format(&text), ProgramFormat::BinaryDump);

        let mut reloaded = MemoryStore::new(32, 32);
        Assembler::new(&model).load(&text, &mut reloaded).unwrap();
        assert_eq!(reloaded, store);
    }
}
