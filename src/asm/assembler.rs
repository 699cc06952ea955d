//! Program loader for SSEM-class machines.
//!
//! Syntax of assembly text:
//! ```text
//! ; Comment
//! 00 NUM 0        ; data word, signed, fills the whole word
//! 01 LDN 20       ; A := -store[20]
//! 02 SUB 21       ; A := A - store[21]
//! 03 CMP          ; skip the next instruction if A < 0
//! 04 STP          ; halt
//! ```
//!
//! Every line's address must equal the count of meaningful lines before it.
//! A load either succeeds completely or leaves the target store untouched:
//! lines are assembled into a scratch store, and every problem found on the
//! way is collected before anything is committed.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::asm::format::{detect_format, meaningful_lines, ProgramFormat};
use crate::bits::{BitError, BitWord};
use crate::cpu::decode::{self, DecodeError, EncodeError, Instruction};
use crate::cpu::{MachineModel, MemoryStore, Mnemonic};

/// Loads program text into a store according to a machine model.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'m> {
    model: &'m MachineModel,
}

impl<'m> Assembler<'m> {
    pub fn new(model: &'m MachineModel) -> Self {
        Self { model }
    }

    /// Detect the format of `source` and load it into `store`.
    ///
    /// On any error `store` is left unchanged.
    pub fn load(&self, source: &str, store: &mut MemoryStore) -> Result<(), LoadError> {
        if store.word_length() != self.model.word_length() {
            return Err(LoadError::StoreWidth {
                store: store.word_length(),
                model: self.model.word_length(),
            });
        }

        let format = detect_format(source);
        tracing::debug!(?format, "detected program format");

        let scratch = match format {
            ProgramFormat::AssemblyText => self.assemble(source, store)?,
            ProgramFormat::BinaryDump => self.read_dump(source, store)?,
            ProgramFormat::Unknown => return Err(LoadError::UnknownFormat),
        };

        *store = scratch;
        tracing::info!(words = store.word_count(), "program loaded");
        Ok(())
    }

    /// Read a program file and load it into `store`.
    pub fn load_file<P: AsRef<Path>>(&self, path: P, store: &mut MemoryStore) -> Result<(), LoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;
        self.load(&source, store)
    }

    /// Decode a word into its mnemonic and operand.
    pub fn decode_instruction(&self, word: &BitWord) -> Result<Instruction, DecodeError> {
        decode::decode(word, self.model)
    }

    /// Encode an instruction word.
    pub fn encode_instruction(&self, instr: Instruction) -> Result<BitWord, EncodeError> {
        decode::encode(instr, self.model)
    }

    /// Assemble text into a scratch store shaped like `target`.
    fn assemble(&self, source: &str, target: &MemoryStore) -> Result<MemoryStore, LoadError> {
        let mut scratch = MemoryStore::new(target.word_length(), target.word_count());
        let mut diagnostics = Vec::new();

        for (counter, (line, text)) in meaningful_lines(source).enumerate() {
            let mut report = |kind: AsmErrorKind| {
                tracing::warn!(line, "{}", kind);
                diagnostics.push(LineDiagnostic { line, text: text.to_string(), kind });
            };
            let mut parts = text.split_whitespace();

            // Address
            let address = parts.next().unwrap_or_default();
            if address.parse::<usize>().ok() != Some(counter) {
                report(AsmErrorKind::UnexpectedAddress {
                    expected: counter,
                    found: address.to_string(),
                });
            }

            // Mnemonic
            let mnemonic = match parts.next() {
                None => {
                    report(AsmErrorKind::MissingMnemonic);
                    continue;
                }
                Some(name) => match name.parse::<Mnemonic>() {
                    Ok(m) if self.model.knows(m) => m,
                    _ => {
                        report(AsmErrorKind::UnknownMnemonic(name.to_string()));
                        continue;
                    }
                },
            };

            // Operand
            let operand = if self.model.needs_operand(mnemonic) {
                match self.parse_operand(mnemonic, parts.next(), scratch.word_count()) {
                    Ok(value) => value,
                    Err(kind) => {
                        report(kind);
                        continue;
                    }
                }
            } else {
                0
            };

            let word = match self.build_word(mnemonic, operand) {
                Ok(word) => word,
                Err(e) => {
                    report(AsmErrorKind::Encode(e));
                    continue;
                }
            };

            if scratch.set(counter, word).is_err() {
                report(AsmErrorKind::TooManyWords {
                    highest: scratch.word_count().saturating_sub(1),
                });
            }
        }

        if diagnostics.is_empty() {
            Ok(scratch)
        } else {
            Err(LoadError::Rejected(diagnostics))
        }
    }

    fn parse_operand(
        &self,
        mnemonic: Mnemonic,
        token: Option<&str>,
        word_count: usize,
    ) -> Result<i64, AsmErrorKind> {
        let token = token.ok_or(AsmErrorKind::MissingOperand(mnemonic))?;
        let value = token.parse::<i64>().map_err(|_| AsmErrorKind::InvalidOperand {
            mnemonic,
            operand: token.to_string(),
        })?;

        if self.model.operand_is_address(mnemonic)
            && !(0..word_count as i128).contains(&(value as i128))
        {
            return Err(AsmErrorKind::AddressOutOfRange {
                mnemonic,
                operand: value,
                highest: word_count.saturating_sub(1),
            });
        }
        Ok(value)
    }

    fn build_word(&self, mnemonic: Mnemonic, operand: i64) -> Result<BitWord, EncodeError> {
        if mnemonic == Mnemonic::Num {
            return decode::encode_number(operand, self.model);
        }
        let operand = u64::try_from(operand).map_err(|_| EncodeError::OperandTooLarge {
            operand: operand as u64,
            bits: self.model.address_length(),
        })?;
        decode::encode(Instruction::new(mnemonic, operand as usize), self.model)
    }

    /// Read a binary dump into a scratch store shaped like `target`.
    fn read_dump(&self, source: &str, target: &MemoryStore) -> Result<MemoryStore, LoadError> {
        let mut scratch = MemoryStore::new(target.word_length(), target.word_count());
        let mut diagnostics = Vec::new();

        for (counter, (line, text)) in meaningful_lines(source).enumerate() {
            let mut report = |kind: AsmErrorKind| {
                tracing::warn!(line, "{}", kind);
                diagnostics.push(LineDiagnostic { line, text: text.to_string(), kind });
            };

            let Some((address, bits)) = text.split_once(": ") else {
                report(AsmErrorKind::MalformedDumpLine);
                continue;
            };

            if address.trim().parse::<usize>().ok() != Some(counter) {
                report(AsmErrorKind::UnexpectedAddress {
                    expected: counter,
                    found: address.to_string(),
                });
            }

            let word = match BitWord::parse(bits.trim()) {
                Ok(word) => word,
                Err(e) => {
                    report(AsmErrorKind::InvalidBits(e));
                    continue;
                }
            };
            if word.len() != scratch.word_length() {
                report(AsmErrorKind::WordLength {
                    expected: scratch.word_length(),
                    found: word.len(),
                });
                continue;
            }

            if scratch.set(counter, word).is_err() {
                report(AsmErrorKind::TooManyWords {
                    highest: scratch.word_count().saturating_sub(1),
                });
            }
        }

        if diagnostics.is_empty() {
            Ok(scratch)
        } else {
            Err(LoadError::Rejected(diagnostics))
        }
    }
}

/// What is wrong with one program line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    #[error("invalid address '{found}', expected {expected:02}")]
    UnexpectedAddress { expected: usize, found: String },

    #[error("missing mnemonic")]
    MissingMnemonic,

    #[error("invalid mnemonic '{0}'")]
    UnknownMnemonic(String),

    #[error("missing operand for '{0}' instruction")]
    MissingOperand(Mnemonic),

    #[error("'{mnemonic}' operand '{operand}' is not an integer")]
    InvalidOperand { mnemonic: Mnemonic, operand: String },

    #[error("'{mnemonic}' instruction requires a valid address (from 0 to {highest}), got {operand}")]
    AddressOutOfRange { mnemonic: Mnemonic, operand: i64, highest: usize },

    #[error("not enough space to store value: {0}")]
    Encode(EncodeError),

    #[error("too many words for this machine (highest address is {highest})")]
    TooManyWords { highest: usize },

    #[error("expected '<address>: <bits>'")]
    MalformedDumpLine,

    #[error("invalid bit string: {0}")]
    InvalidBits(BitError),

    #[error("word has {found} bits, expected {expected}")]
    WordLength { expected: usize, found: usize },
}

/// A problem found on one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    /// 1-based line number in the source text.
    pub line: usize,
    /// The line with its comment stripped.
    pub text: String,
    pub kind: AsmErrorKind,
}

impl fmt::Display for LineDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}\n    {}", self.line, self.kind, self.text)
    }
}

/// Errors that can occur while loading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("unrecognized program format")]
    UnknownFormat,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("store holds {store}-bit words but the machine uses {model}-bit words")]
    StoreWidth { store: usize, model: usize },

    #[error("{}", rejected_report(.0))]
    Rejected(Vec<LineDiagnostic>),
}

/// The error count, then one block per offending line.
fn rejected_report(diagnostics: &[LineDiagnostic]) -> String {
    let mut report = format!("{} error(s) found in program", diagnostics.len());
    for diagnostic in diagnostics {
        report.push('\n');
        report.push_str(&diagnostic.to_string());
    }
    report
}

impl LoadError {
    /// Per-line problems, empty unless the program was rejected.
    pub fn diagnostics(&self) -> &[LineDiagnostic] {
        match self {
            LoadError::Rejected(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}
