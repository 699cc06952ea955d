//! CPU emulation for the Small-Scale Experimental Machine.
//!
//! This module implements the SSEM (1948) architecture:
//! - a store of fixed-width words, 32 words of 32 bits on the real machine
//! - 2 registers: CI (control instruction) and A (accumulator)
//! - a 7-instruction set with two encodings of SUB
//!
//! Layout and opcode table come from a [`MachineModel`], so variants of the
//! machine can be described without code changes.

pub mod model;
pub mod store;
pub mod registers;
pub mod decode;
pub mod control;
pub mod execute;

pub use model::{MachineModel, ModelError, ModelSpec, Mnemonic, OpcodeSpec};
pub use store::{MemoryStore, StoreError};
pub use registers::Registers;
pub use decode::{DecodeError, EncodeError, Instruction};
pub use control::Controls;
pub use execute::{LastInstruction, Machine, MachineError, MachineSnapshot, MachineState, Ssem};
