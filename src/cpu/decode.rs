//! Instruction encoder and decoder.
//!
//! An instruction word carries an opcode pattern in the model's opcode field
//! and an unsigned operand in its address field. All other bits are ignored
//! on decode and left clear on encode. A NUM word instead holds a signed
//! number spread over the whole word.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bits::{BitError, BitWord};
use crate::cpu::model::{MachineModel, Mnemonic};

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    /// Contents of the address field, read unsigned.
    pub operand: usize,
}

impl Instruction {
    pub fn new(mnemonic: Mnemonic, operand: usize) -> Self {
        Self { mnemonic, operand }
    }
}

/// Decode a word into its mnemonic and operand.
///
/// Fails if the opcode pattern is not in the model's table, if the word is
/// too short to hold either field, or if the operand does not fit a `usize`
/// on this target.
pub fn decode(word: &BitWord, model: &MachineModel) -> Result<Instruction, DecodeError> {
    let truncated = |_| DecodeError::Truncated {
        width: word.len(),
        needed: (model.opcode_start() + model.opcode_length())
            .max(model.address_start() + model.address_length()),
    };

    let pattern = word
        .slice(model.opcode_start(), model.opcode_length())
        .map_err(truncated)?;
    let operand = word
        .slice(model.address_start(), model.address_length())
        .map_err(truncated)?
        .to_unsigned_int();

    let mnemonic = model
        .lookup(&pattern)
        .ok_or_else(|| DecodeError::UnknownOpcode(pattern.to_bit_string()))?;

    let operand = usize::try_from(operand).map_err(|_| DecodeError::OperandTooWide { operand })?;

    Ok(Instruction { mnemonic, operand })
}

/// Encode an instruction word using the mnemonic's canonical opcode pattern.
pub fn encode(instr: Instruction, model: &MachineModel) -> Result<BitWord, EncodeError> {
    let pattern = model
        .opcode(instr.mnemonic)
        .ok_or(EncodeError::NoOpcode(instr.mnemonic))?;

    let operand = instr.operand as u64;
    if !BitWord::fits_unsigned(operand, model.address_length()) {
        return Err(EncodeError::OperandTooLarge {
            operand,
            bits: model.address_length(),
        });
    }

    let mut word = BitWord::zero(model.word_length());
    word.engrave(
        model.address_start() as isize,
        &BitWord::from_unsigned(operand, model.address_length()),
    )?;
    word.engrave(model.opcode_start() as isize, pattern)?;
    Ok(word)
}

/// Encode a NUM word: the value as two's complement over the whole word.
pub fn encode_number(value: i64, model: &MachineModel) -> Result<BitWord, EncodeError> {
    if !BitWord::fits_signed(value, model.word_length()) {
        return Err(EncodeError::ValueTooLarge {
            value,
            bits: model.word_length(),
        });
    }
    Ok(BitWord::from_int(value, model.word_length()))
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("opcode '{0}' not recognized")]
    UnknownOpcode(String),

    #[error("{width}-bit word is too short for the instruction fields ({needed} bits needed)")]
    Truncated { width: usize, needed: usize },

    #[error("operand {operand} does not fit a host address")]
    OperandTooWide { operand: u64 },
}

/// Errors that can occur while building an instruction word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{0} has no opcode on this machine")]
    NoOpcode(Mnemonic),

    #[error("operand {operand} does not fit the {bits}-bit address field")]
    OperandTooLarge { operand: u64, bits: usize },

    #[error("value {value} does not fit a {bits}-bit word")]
    ValueTooLarge { value: i64, bits: usize },

    #[error(transparent)]
    Bits(#[from] BitError),
}
