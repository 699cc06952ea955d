//! WebAssembly bindings for the SSEM emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;

use crate::asm::disasm::disassemble_word;
use crate::bits::GlyphStyle;
use crate::cpu::{Machine, MachineModel, Ssem};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    ssem: Ssem,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a halted SSEM with an empty store.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            ssem: Ssem::new(MachineModel::ssem()),
        }
    }

    /// Load a program from assembly text or a binary dump.
    ///
    /// The error message lists every rejected line.
    #[wasm_bindgen]
    pub fn load(&mut self, source: &str) -> Result<(), JsError> {
        self.ssem
            .load_program(source)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Step one instruction. Returns the executed instruction as text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let last = self.ssem.step().map_err(|e| JsError::new(&e.to_string()))?;
        Ok(last.to_string())
    }

    /// Run until STP or `max_cycles`. Returns the executed cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u32, JsError> {
        let executed = self
            .ssem
            .run_to_halt(max_cycles as u64)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(executed as u32)
    }

    #[wasm_bindgen]
    pub fn clear_memory(&mut self) {
        self.ssem.clear_memory();
    }

    #[wasm_bindgen]
    pub fn clear_registers(&mut self) {
        self.ssem.clear_registers();
    }

    /// Check if the machine is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.ssem.is_halted()
    }

    /// CI as an unsigned number.
    #[wasm_bindgen]
    pub fn ci(&self) -> f64 {
        self.ssem.regs.ci_value() as f64
    }

    /// A as a signed number.
    #[wasm_bindgen]
    pub fn a(&self) -> f64 {
        self.ssem.regs.a_value() as f64
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> f64 {
        self.ssem.cycles() as f64
    }

    /// The store as CRT-style rows, one word per line.
    #[wasm_bindgen]
    pub fn store_text(&self, style: &str) -> String {
        let style = match style {
            "#" | "high-contrast" => GlyphStyle::HighContrast,
            "fancy" => GlyphStyle::Fancy,
            "binary" => GlyphStyle::Binary,
            _ => GlyphStyle::Classic,
        };
        self.ssem
            .store
            .iter()
            .map(|word| word.render(style))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Disassembly of a single store word.
    #[wasm_bindgen]
    pub fn disassemble_at(&self, address: usize) -> Result<String, JsError> {
        let word = self
            .ssem
            .store
            .get(address)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(disassemble_word(word, self.ssem.model()))
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.ssem.snapshot()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Full machine state as a JavaScript object.
    #[wasm_bindgen]
    pub fn state(&self) -> Result<JsValue, JsError> {
        let json = self.state_json()?;
        js_sys::JSON::parse(&json).map_err(|_| JsError::new("machine state is not valid JSON"))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}
