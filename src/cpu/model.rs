//! Machine variant descriptions.
//!
//! A [`MachineModel`] fixes everything that differs between Manchester-style
//! machines: word size, store size, where the address and opcode fields sit
//! inside a word, and which opcode bit patterns map to which [`Mnemonic`].
//! Models are immutable once built, so several variants can live side by side.
//!
//! Besides the built-in [`MachineModel::ssem`], a model can be read from JSON:
//!
//! ```json
//! {
//!   "word_length": 32, "word_count": 32,
//!   "address_start": 0, "address_length": 5,
//!   "opcode_start": 13, "opcode_length": 3,
//!   "typical_speed": 700,
//!   "opcodes": [ { "pattern": "000", "mnemonic": "JMP" }, ... ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bits::BitWord;

/// Symbolic instruction names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mnemonic {
    /// Indirect jump: CI := S
    Jmp,
    /// Relative jump: CI := CI + S
    Jrp,
    /// Load negated: A := -S
    Ldn,
    /// Store: S := A
    Sto,
    /// Subtract: A := A - S
    Sub,
    /// Skip the next instruction if A < 0
    Cmp,
    /// Stop
    Stp,
    /// Raw number filling a whole word (assembler only, never executed)
    Num,
}

impl Mnemonic {
    /// Every mnemonic, in the order the SSEM documentation lists them.
    pub const ALL: [Mnemonic; 8] = [
        Mnemonic::Jmp,
        Mnemonic::Jrp,
        Mnemonic::Ldn,
        Mnemonic::Sto,
        Mnemonic::Sub,
        Mnemonic::Cmp,
        Mnemonic::Stp,
        Mnemonic::Num,
    ];

    /// Assembly-text name.
    pub const fn name(self) -> &'static str {
        match self {
            Mnemonic::Jmp => "JMP",
            Mnemonic::Jrp => "JRP",
            Mnemonic::Ldn => "LDN",
            Mnemonic::Sto => "STO",
            Mnemonic::Sub => "SUB",
            Mnemonic::Cmp => "CMP",
            Mnemonic::Stp => "STP",
            Mnemonic::Num => "NUM",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mnemonic {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Mnemonic::ALL
            .into_iter()
            .find(|m| m.name() == upper)
            .ok_or_else(|| ModelError::UnknownMnemonic(s.to_string()))
    }
}

/// One row of the opcode table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeSpec {
    /// Opcode field contents, bit 0 first.
    pub pattern: BitWord,
    pub mnemonic: Mnemonic,
}

/// Serializable form of a [`MachineModel`], validated on conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub word_length: usize,
    pub word_count: usize,
    pub address_start: usize,
    pub address_length: usize,
    pub opcode_start: usize,
    pub opcode_length: usize,
    #[serde(default = "default_speed")]
    pub typical_speed: u32,
    pub opcodes: Vec<OpcodeSpec>,
    /// Mnemonics that take an operand.
    #[serde(default = "default_with_operand")]
    pub with_operand: Vec<Mnemonic>,
    /// Mnemonics whose operand must be a store address.
    #[serde(default = "default_address_operand")]
    pub address_operand: Vec<Mnemonic>,
}

fn default_speed() -> u32 {
    MachineModel::SSEM_SPEED
}

fn default_with_operand() -> Vec<Mnemonic> {
    vec![
        Mnemonic::Jmp,
        Mnemonic::Jrp,
        Mnemonic::Ldn,
        Mnemonic::Sto,
        Mnemonic::Sub,
        Mnemonic::Num,
    ]
}

fn default_address_operand() -> Vec<Mnemonic> {
    vec![
        Mnemonic::Jmp,
        Mnemonic::Jrp,
        Mnemonic::Ldn,
        Mnemonic::Sto,
        Mnemonic::Sub,
    ]
}

/// Immutable description of a machine variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ModelSpec", into = "ModelSpec")]
pub struct MachineModel {
    word_length: usize,
    word_count: usize,
    address_start: usize,
    address_length: usize,
    opcode_start: usize,
    opcode_length: usize,
    typical_speed: u32,
    /// Opcode table in declaration order; several patterns may share a mnemonic.
    opcodes: Vec<OpcodeSpec>,
    decode_table: HashMap<BitWord, Mnemonic>,
    /// First pattern declared for each mnemonic.
    encode_table: HashMap<Mnemonic, BitWord>,
    with_operand: HashSet<Mnemonic>,
    address_operand: HashSet<Mnemonic>,
}

impl MachineModel {
    /// Typical SSEM speed in instructions per second.
    pub const SSEM_SPEED: u32 = 700;

    /// The original Small-Scale Experimental Machine.
    ///
    /// 32 words of 32 bits, a 5-bit address in bits 0-4 and a 3-bit opcode
    /// in bits 13-15. Patterns `001` and `101` both mean SUB.
    pub fn ssem() -> Self {
        Self::build(Self::ssem_spec())
    }

    /// The description [`MachineModel::ssem`] is built from.
    pub fn ssem_spec() -> ModelSpec {
        let pattern = |bits: [bool; 3]| BitWord::from_bits(bits);
        let opcodes = [
            ([false, false, false], Mnemonic::Jmp),
            ([true, false, false], Mnemonic::Jrp),
            ([false, true, false], Mnemonic::Ldn),
            ([true, true, false], Mnemonic::Sto),
            ([false, false, true], Mnemonic::Sub),
            ([true, false, true], Mnemonic::Sub),
            ([false, true, true], Mnemonic::Cmp),
            ([true, true, true], Mnemonic::Stp),
        ]
        .into_iter()
        .map(|(bits, mnemonic)| OpcodeSpec {
            pattern: pattern(bits),
            mnemonic,
        })
        .collect();

        ModelSpec {
            word_length: 32,
            word_count: 32,
            address_start: 0,
            address_length: 5,
            opcode_start: 13,
            opcode_length: 3,
            typical_speed: Self::SSEM_SPEED,
            opcodes,
            with_operand: default_with_operand(),
            address_operand: default_address_operand(),
        }
    }

    /// Validate a description and build the model.
    pub fn from_spec(spec: ModelSpec) -> Result<Self, ModelError> {
        Self::validate(&spec)?;
        Ok(Self::build(spec))
    }

    /// Read and validate a JSON model description.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ModelError::Io(e.to_string()))?;
        let model = serde_json::from_str(&text).map_err(|e| ModelError::Json(e.to_string()))?;
        Ok(model)
    }

    fn validate(spec: &ModelSpec) -> Result<(), ModelError> {
        if !(1..=64).contains(&spec.word_length) {
            return Err(ModelError::WordLength(spec.word_length));
        }
        if spec.word_count == 0 {
            return Err(ModelError::EmptyStore);
        }

        let fields = [
            ("address", spec.address_start, spec.address_length),
            ("opcode", spec.opcode_start, spec.opcode_length),
        ];
        for (field, start, length) in fields {
            if length == 0 || start + length > spec.word_length {
                return Err(ModelError::FieldOutOfWord {
                    field,
                    start,
                    length,
                    word_length: spec.word_length,
                });
            }
        }
        let address_end = spec.address_start + spec.address_length;
        let opcode_end = spec.opcode_start + spec.opcode_length;
        if spec.address_start < opcode_end && spec.opcode_start < address_end {
            return Err(ModelError::FieldsOverlap);
        }

        let mut seen = HashSet::new();
        for entry in &spec.opcodes {
            if entry.mnemonic == Mnemonic::Num {
                return Err(ModelError::NumHasOpcode);
            }
            if entry.pattern.len() != spec.opcode_length {
                return Err(ModelError::PatternWidth {
                    pattern: entry.pattern.to_bit_string(),
                    expected: spec.opcode_length,
                });
            }
            if !seen.insert(&entry.pattern) {
                return Err(ModelError::DuplicatePattern(entry.pattern.to_bit_string()));
            }
        }

        if let Some(m) = spec
            .address_operand
            .iter()
            .find(|m| !spec.with_operand.contains(*m))
        {
            return Err(ModelError::AddressWithoutOperand(*m));
        }

        Ok(())
    }

    fn build(spec: ModelSpec) -> Self {
        let mut decode_table = HashMap::new();
        let mut encode_table = HashMap::new();
        for entry in &spec.opcodes {
            decode_table.insert(entry.pattern.clone(), entry.mnemonic);
            encode_table
                .entry(entry.mnemonic)
                .or_insert_with(|| entry.pattern.clone());
        }

        Self {
            word_length: spec.word_length,
            word_count: spec.word_count,
            address_start: spec.address_start,
            address_length: spec.address_length,
            opcode_start: spec.opcode_start,
            opcode_length: spec.opcode_length,
            typical_speed: spec.typical_speed,
            opcodes: spec.opcodes,
            decode_table,
            encode_table,
            with_operand: spec.with_operand.into_iter().collect(),
            address_operand: spec.address_operand.into_iter().collect(),
        }
    }

    /// Size of a word in bits.
    #[inline]
    pub fn word_length(&self) -> usize {
        self.word_length
    }

    /// Number of words in the store.
    #[inline]
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    /// First bit of the address field.
    #[inline]
    pub fn address_start(&self) -> usize {
        self.address_start
    }

    /// Width of the address field in bits.
    #[inline]
    pub fn address_length(&self) -> usize {
        self.address_length
    }

    /// First bit of the opcode field.
    #[inline]
    pub fn opcode_start(&self) -> usize {
        self.opcode_start
    }

    /// Width of the opcode field in bits.
    #[inline]
    pub fn opcode_length(&self) -> usize {
        self.opcode_length
    }

    /// Typical execution speed in instructions per second.
    #[inline]
    pub fn typical_speed(&self) -> u32 {
        self.typical_speed
    }

    /// The opcode table in declaration order.
    pub fn opcodes(&self) -> &[OpcodeSpec] {
        &self.opcodes
    }

    /// Mnemonic for an opcode field pattern.
    pub fn lookup(&self, pattern: &BitWord) -> Option<Mnemonic> {
        self.decode_table.get(pattern).copied()
    }

    /// Canonical opcode pattern for a mnemonic (the first one declared).
    pub fn opcode(&self, mnemonic: Mnemonic) -> Option<&BitWord> {
        self.encode_table.get(&mnemonic)
    }

    /// True if the assembler accepts this mnemonic for this model.
    pub fn knows(&self, mnemonic: Mnemonic) -> bool {
        mnemonic == Mnemonic::Num || self.encode_table.contains_key(&mnemonic)
    }

    /// True if the mnemonic takes an operand.
    pub fn needs_operand(&self, mnemonic: Mnemonic) -> bool {
        self.with_operand.contains(&mnemonic)
    }

    /// True if the operand must be a valid store address.
    pub fn operand_is_address(&self, mnemonic: Mnemonic) -> bool {
        self.address_operand.contains(&mnemonic)
    }
}

impl Default for MachineModel {
    fn default() -> Self {
        Self::ssem()
    }
}

impl TryFrom<ModelSpec> for MachineModel {
    type Error = ModelError;

    fn try_from(spec: ModelSpec) -> Result<Self, Self::Error> {
        MachineModel::from_spec(spec)
    }
}

impl From<MachineModel> for ModelSpec {
    fn from(model: MachineModel) -> Self {
        let order = |set: &HashSet<Mnemonic>| {
            Mnemonic::ALL
                .into_iter()
                .filter(|m| set.contains(m))
                .collect::<Vec<_>>()
        };
        ModelSpec {
            word_length: model.word_length,
            word_count: model.word_count,
            address_start: model.address_start,
            address_length: model.address_length,
            opcode_start: model.opcode_start,
            opcode_length: model.opcode_length,
            typical_speed: model.typical_speed,
            with_operand: order(&model.with_operand),
            address_operand: order(&model.address_operand),
            opcodes: model.opcodes,
        }
    }
}

/// Errors in a machine description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("word length must be between 1 and 64 bits, got {0}")]
    WordLength(usize),

    #[error("store must hold at least one word")]
    EmptyStore,

    #[error("{field} field {start}+{length} does not fit a {word_length}-bit word")]
    FieldOutOfWord {
        field: &'static str,
        start: usize,
        length: usize,
        word_length: usize,
    },

    #[error("address and opcode fields overlap")]
    FieldsOverlap,

    #[error("opcode pattern {pattern} is not {expected} bits wide")]
    PatternWidth { pattern: String, expected: usize },

    #[error("opcode pattern {0} is declared twice")]
    DuplicatePattern(String),

    #[error("NUM is a pseudo-op and cannot have an opcode")]
    NumHasOpcode,

    #[error("{0} has an address operand but is not listed as taking an operand")]
    AddressWithoutOperand(Mnemonic),

    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),

    #[error("cannot read model: {0}")]
    Io(String),

    #[error("invalid model description: {0}")]
    Json(String),
}
