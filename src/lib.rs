//! # SSEM Emulator
//!
//! An emulator of the Manchester Small-Scale Experimental Machine (1948),
//! better known as the "Manchester Baby".
//!
//! The Baby was the first electronic stored-program computer to run a
//! program. This crate models it at the instruction level: a store of
//! fixed-width words, the CI and A registers, and its seven instructions.
//! Program text is loaded by an all-or-nothing assembler.
//!
//! ```
//! use ssem::{Machine, Ssem};
//!
//! let mut ssem = Ssem::default();
//! ssem.load_program("00 NUM 0\n01 LDN 4\n02 STO 5\n03 STP\n04 NUM 12").unwrap();
//! ssem.run_to_halt(100).unwrap();
//! assert_eq!(ssem.store.get(5).unwrap().to_int(), -12);
//! # ssem.clear_memory();
//! ```

pub mod bits;
pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use bits::{BitError, BitWord, GlyphStyle};
pub use cpu::{
    Controls, Instruction, LastInstruction, Machine, MachineError, MachineModel, MachineSnapshot,
    MachineState, MemoryStore, Mnemonic, Registers, Ssem,
};
pub use asm::{detect_format, disassemble, Assembler, LoadError, ProgramFormat};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
