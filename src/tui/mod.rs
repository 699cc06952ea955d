//! TUI debugger for the SSEM emulator.
//!
//! Provides an interactive terminal-based front panel with:
//! - The store drawn as CRT rows, with the CI slot marked
//! - CI and A with their numeric values
//! - Run/stop, single step and speed controls
//! - Switchable glyph styles

mod app;
mod ui;

pub use app::{run_debugger, speed_down, speed_up, DebuggerApp};
