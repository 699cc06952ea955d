//! Assembler, loader and disassembler for SSEM programs.
//!
//! This module provides:
//! - Format detection for assembly text and binary dumps
//! - An all-or-nothing program loader (text → store)
//! - A binary dump writer (store → text)
//! - A best-effort disassembler (store → assembly text)

pub mod assembler;
pub mod disasm;
pub mod dump;
pub mod format;

pub use assembler::{AsmErrorKind, Assembler, LineDiagnostic, LoadError};
pub use disasm::{disassemble, disassemble_word};
pub use dump::{dump_store, save_dump};
pub use format::{detect_format, ProgramFormat};
