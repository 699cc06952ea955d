//! Disassembler for SSEM stores.
//!
//! Instructions and data words share one store, so telling them apart is
//! guesswork. A word is shown as an instruction when re-encoding it gives
//! back the exact same bits, otherwise as a `NUM`. Output of this module
//! loads again, but a `NUM` may come back as an instruction and vice versa.

use crate::bits::BitWord;
use crate::cpu::decode::{decode, encode, Instruction};
use crate::cpu::{MachineModel, MemoryStore};

/// Disassemble a single word to text, without the address.
pub fn disassemble_word(word: &BitWord, model: &MachineModel) -> String {
    match as_instruction(word, model) {
        Some(instr) => format_instruction(&instr, model),
        None => format!("NUM {}", word.to_int()),
    }
}

/// Disassemble a whole store to assembly text.
pub fn disassemble(store: &MemoryStore, model: &MachineModel) -> String {
    let mut output = String::new();
    output.push_str("; SSEM Disassembly\n");
    output.push_str("; ----------------\n\n");

    for (addr, word) in store.iter().enumerate() {
        let line = disassemble_word(word, model);
        output.push_str(&format!("{:02} {}\n", addr, line));
    }

    output
}

/// The instruction a word encodes exactly, if any.
fn as_instruction(word: &BitWord, model: &MachineModel) -> Option<Instruction> {
    // All-zero words are far more often data than JMP 0
    if word.is_zero() {
        return None;
    }
    let instr = decode(word, model).ok()?;
    let canonical = encode(instr, model).ok()?;
    (canonical == *word).then_some(instr)
}

fn format_instruction(instr: &Instruction, model: &MachineModel) -> String {
    if model.needs_operand(instr.mnemonic) {
        format!("{} {}", instr.mnemonic, instr.operand)
    } else {
        instr.mnemonic.to_string()
    }
}
