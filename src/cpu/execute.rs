//! CPU execution engine for the SSEM.
//!
//! Implements the instruction cycle, the throttled run loop and all
//! instruction behaviors.

use std::fmt;
use std::path::Path;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asm::{Assembler, LoadError};
use crate::bits::BitWord;
use crate::cpu::decode::{self, DecodeError, Instruction};
use crate::cpu::{Controls, MachineModel, MemoryStore, Mnemonic, Registers, StoreError};

/// How long the run loop sleeps between checks while halted.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Minimum time between two snapshots while running.
const PUBLISH_INTERVAL: Duration = Duration::from_millis(16);

/// The operations every emulated machine provides to a control surface.
pub trait Machine {
    /// Execute one instruction cycle: advance CI, fetch, decode, execute.
    fn step(&mut self) -> Result<LastInstruction, MachineError>;

    /// Run cycles while running, idle while halted, return on cancellation.
    ///
    /// Runtime errors end the loop and are returned; cancellation is not an
    /// error. The cancellation request is consumed on return.
    fn run_until_halt_or_cancel(&mut self) -> Result<(), MachineError>;

    /// Zero the whole store.
    fn clear_memory(&mut self);

    /// Zero the registers; the store and the run/halt flag are untouched.
    fn clear_registers(&mut self);
}

/// Run/halt state as seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Executing instructions.
    Running,
    /// Stopped by STP or by the control surface.
    Halted,
}

/// The most recently executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastInstruction {
    /// Store address the instruction was fetched from.
    pub address: usize,
    pub mnemonic: Mnemonic,
    pub operand: usize,
}

impl fmt::Display for LastInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02} {} {:02}", self.address, self.mnemonic, self.operand)
    }
}

/// A copy of everything a renderer shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub regs: Registers,
    pub store: MemoryStore,
    pub cycles: u64,
    pub state: MachineState,
    pub speed: u32,
    pub last_instruction: Option<LastInstruction>,
}

/// The Small-Scale Experimental Machine.
pub struct Ssem {
    model: MachineModel,
    /// CI and A.
    pub regs: Registers,
    /// Main store.
    pub store: MemoryStore,
    controls: Arc<Controls>,
    /// Instruction count since creation.
    cycles: u64,
    last_instr: Option<LastInstruction>,
    observer: Option<SyncSender<MachineSnapshot>>,
    last_publish: Option<Instant>,
}

impl Ssem {
    /// Create a halted machine with zeroed registers and store.
    pub fn new(model: MachineModel) -> Self {
        let controls = Arc::new(Controls::new(model.typical_speed()));
        Self {
            regs: Registers::new(model.word_length()),
            store: MemoryStore::new(model.word_length(), model.word_count()),
            model,
            controls,
            cycles: 0,
            last_instr: None,
            observer: None,
            last_publish: None,
        }
    }

    /// Assemble program text into the store.
    ///
    /// On error the store is left unchanged.
    pub fn load_program(&mut self, source: &str) -> Result<(), LoadError> {
        Assembler::new(&self.model).load(source, &mut self.store)
    }

    /// Read and assemble a program file into the store.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        Assembler::new(&self.model).load_file(path, &mut self.store)
    }

    /// The machine description.
    pub fn model(&self) -> &MachineModel {
        &self.model
    }

    /// Shared control inputs; clone the `Arc` to drive the machine from
    /// another thread.
    pub fn controls(&self) -> &Arc<Controls> {
        &self.controls
    }

    /// Number of instruction cycles executed.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The instruction executed last.
    pub fn last_instruction(&self) -> Option<LastInstruction> {
        self.last_instr
    }

    /// Current run/halt state.
    pub fn state(&self) -> MachineState {
        if self.controls.is_running() {
            MachineState::Running
        } else {
            MachineState::Halted
        }
    }

    /// Check if the machine is halted.
    pub fn is_halted(&self) -> bool {
        self.state() == MachineState::Halted
    }

    /// Send snapshots to `observer` from the run loop.
    ///
    /// While running, at most one snapshot per 16 ms is taken, plus one on
    /// every halt. While halted, one is sent per idle tick and per single
    /// step. Snapshots are offered with `try_send`: when the receiver lags
    /// behind, they are dropped rather than blocking the machine.
    pub fn set_observer(&mut self, observer: SyncSender<MachineSnapshot>) {
        self.observer = Some(observer);
    }

    /// Copy the observable state.
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            regs: self.regs.clone(),
            store: self.store.clone(),
            cycles: self.cycles,
            state: self.state(),
            speed: self.controls.speed(),
            last_instruction: self.last_instr,
        }
    }

    /// Run without throttling until STP, a runtime error, or `max_cycles`.
    ///
    /// A cancellation left over from an earlier run is discarded. Returns the
    /// number of instructions executed.
    pub fn run_to_halt(&mut self, max_cycles: u64) -> Result<u64, MachineError> {
        let start_cycles = self.cycles;
        self.controls.reset_cancel();
        self.controls.set_running(true);

        while self.controls.is_running()
            && !self.controls.is_cancelled()
            && self.cycles - start_cycles < max_cycles
        {
            if let Err(e) = self.step() {
                self.controls.set_running(false);
                return Err(e);
            }
        }

        Ok(self.cycles - start_cycles)
    }

    fn publish(&mut self) {
        if let Some(observer) = &self.observer {
            let _ = observer.try_send(self.snapshot());
            self.last_publish = Some(Instant::now());
        }
    }

    fn publish_due(&self) -> bool {
        self.observer.is_some()
            && self
                .last_publish
                .map_or(true, |at| at.elapsed() >= PUBLISH_INTERVAL)
    }

    /// The body of `run_until_halt_or_cancel`.
    fn run_loop(&mut self) -> Result<(), MachineError> {
        while !self.controls.is_cancelled() {
            if !self.controls.is_running() {
                if self.controls.take_step_request() {
                    self.step()?;
                } else {
                    thread::sleep(IDLE_POLL);
                }
                self.publish();
                continue;
            }

            let started = Instant::now();
            self.step()?;

            if !self.controls.is_running() {
                self.publish();
                tracing::info!(cycles = self.cycles, "machine halted");
                continue;
            }
            if self.publish_due() {
                self.publish();
            }
            if self.controls.is_cancelled() {
                break;
            }

            let period = Duration::from_secs_f64(1.0 / self.controls.speed() as f64);
            if let Some(rest) = period.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        Ok(())
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<(), MachineError> {
        let width = self.model.word_length();
        let s = instr.operand;

        match instr.mnemonic {
            Mnemonic::Jmp => {
                // The whole word becomes CI, bit for bit
                self.regs.ci = self.store.get(s)?.clone();
            }

            Mnemonic::Jrp => {
                let offset = self.store.get(s)?.to_int();
                let target = self.regs.ci.to_int().wrapping_add(offset);
                self.regs.ci = BitWord::from_int(target, width);
            }

            Mnemonic::Ldn => {
                let value = self.store.get(s)?.to_int();
                self.regs.a = BitWord::from_int(value.wrapping_neg(), width);
            }

            Mnemonic::Sto => {
                self.store.set(s, self.regs.a.clone())?;
            }

            Mnemonic::Sub => {
                let value = self.store.get(s)?.to_int();
                let result = self.regs.a.to_int().wrapping_sub(value);
                self.regs.a = BitWord::from_int(result, width);
            }

            Mnemonic::Cmp => {
                if self.regs.a.to_int() < 0 {
                    self.regs.advance_ci(self.model.word_count());
                }
            }

            Mnemonic::Stp => {
                self.controls.set_running(false);
            }

            Mnemonic::Num => return Err(MachineError::NotExecutable(instr.mnemonic)),
        }

        Ok(())
    }
}

impl Machine for Ssem {
    fn step(&mut self) -> Result<LastInstruction, MachineError> {
        // Fetch
        let address = self.regs.advance_ci(self.model.word_count());

        // Decode
        let instr = decode::decode(self.store.get(address)?, &self.model)?;

        // Execute
        self.execute(instr)?;

        let last = LastInstruction {
            address,
            mnemonic: instr.mnemonic,
            operand: instr.operand,
        };
        self.cycles += 1;
        self.last_instr = Some(last);
        tracing::trace!(cycle = self.cycles, instruction = %last, a = self.regs.a.to_int(), "executed");

        Ok(last)
    }

    fn run_until_halt_or_cancel(&mut self) -> Result<(), MachineError> {
        self.controls.set_running(true);
        tracing::info!(speed = self.controls.speed(), "machine started");

        let result = self.run_loop();
        self.controls.set_running(false);
        self.controls.reset_cancel();
        // the final state always goes out, error or not
        self.publish();

        match &result {
            Ok(()) => tracing::info!(cycles = self.cycles, "machine stopped"),
            Err(e) => tracing::error!("runtime error after {} cycles: {}", self.cycles, e),
        }
        result
    }

    fn clear_memory(&mut self) {
        self.store.clear();
    }

    fn clear_registers(&mut self) {
        self.regs.reset();
    }
}

impl Default for Ssem {
    fn default() -> Self {
        Self::new(MachineModel::ssem())
    }
}

impl fmt::Debug for Ssem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ssem")
            .field("state", &self.state())
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("out of bound store access: {0}")]
    Store(#[from] StoreError),

    #[error("{0} cannot be executed")]
    NotExecutable(Mnemonic),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{encode, encode_number};
    use std::sync::mpsc;

    fn word(value: i64) -> BitWord {
        BitWord::from_int(value, 32)
    }

    fn instr(mnemonic: Mnemonic, operand: usize) -> BitWord {
        encode(Instruction::new(mnemonic, operand), &MachineModel::ssem()).unwrap()
    }

    /// Wait for a condition on a machine running in another thread.
    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_ldn_then_sto() {
        let mut ssem = Ssem::default();
        ssem.store.set(5, word(7)).unwrap();
        ssem.regs.ci = word(4);

        ssem.execute(Instruction::new(Mnemonic::Ldn, 5)).unwrap();
        assert_eq!(ssem.regs.a.to_int(), -7);

        ssem.execute(Instruction::new(Mnemonic::Sto, 6)).unwrap();
        assert_eq!(ssem.store.get(6).unwrap(), &word(-7));
    }

    #[test]
    fn test_ldn_fetched_from_store() {
        let mut ssem = Ssem::default();
        ssem.store.set(5, instr(Mnemonic::Ldn, 20)).unwrap();
        ssem.store.set(20, word(7)).unwrap();
        ssem.regs.ci = word(4);

        let last = ssem.step().unwrap();
        assert_eq!(
            last,
            LastInstruction { address: 5, mnemonic: Mnemonic::Ldn, operand: 20 }
        );
        assert_eq!(ssem.regs.a.to_int(), -7);
        assert_eq!(ssem.cycles(), 1);
    }

    #[test]
    fn test_both_sub_patterns_subtract() {
        let mut first = instr(Mnemonic::Sub, 5);
        let mut second = first.clone();
        first.engrave(13, &BitWord::parse("001").unwrap()).unwrap();
        second.engrave(13, &BitWord::parse("101").unwrap()).unwrap();

        let mut results = Vec::new();
        for sub in [first, second] {
            let mut ssem = Ssem::default();
            ssem.store.set(1, sub).unwrap();
            ssem.store.set(5, word(3)).unwrap();
            ssem.regs.a = word(10);
            let last = ssem.step().unwrap();
            assert_eq!(last.mnemonic, Mnemonic::Sub);
            results.push(ssem.regs.a.to_int());
        }
        assert_eq!(results, vec![7, 7]);
    }

    #[test]
    fn test_cmp_skips_when_negative() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Cmp, 0)).unwrap();
        ssem.store.set(3, instr(Mnemonic::Stp, 0)).unwrap();
        ssem.regs.a = word(-1);

        ssem.step().unwrap();
        let next = ssem.step().unwrap();
        assert_eq!(next.address, 3);
        assert!(ssem.is_halted());
    }

    #[test]
    fn test_cmp_does_not_skip_when_positive() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Cmp, 0)).unwrap();
        ssem.store.set(2, instr(Mnemonic::Stp, 0)).unwrap();
        ssem.regs.a = word(0);

        ssem.step().unwrap();
        assert_eq!(ssem.step().unwrap().address, 2);
    }

    #[test]
    fn test_cmp_skip_wraps() {
        let mut ssem = Ssem::default();
        ssem.store.set(31, instr(Mnemonic::Cmp, 0)).unwrap();
        ssem.regs.ci = word(30);
        ssem.regs.a = word(-5);

        ssem.step().unwrap();
        assert_eq!(ssem.regs.ci.to_unsigned_int(), 0);
        assert_eq!(ssem.step().unwrap().address, 1);
    }

    #[test]
    fn test_jrp_relative_jump() {
        let mut ssem = Ssem::default();
        ssem.store.set(10, instr(Mnemonic::Jrp, 20)).unwrap();
        ssem.store.set(20, word(-1)).unwrap();
        ssem.regs.ci = word(9);

        ssem.step().unwrap();
        assert_eq!(ssem.regs.ci.to_unsigned_int(), 9);
        // the loop comes straight back to the same instruction
        assert_eq!(ssem.step().unwrap().address, 10);
    }

    #[test]
    fn test_jrp_executed_with_ci_ten() {
        let mut ssem = Ssem::default();
        ssem.store.set(10, word(-1)).unwrap();
        ssem.regs.ci = word(10);

        ssem.execute(Instruction::new(Mnemonic::Jrp, 10)).unwrap();
        assert_eq!(ssem.regs.ci_value(), 9);
    }

    #[test]
    fn test_jmp_copies_the_whole_word() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Jmp, 7)).unwrap();
        ssem.store.set(7, word(-1)).unwrap();

        ssem.step().unwrap();
        assert_eq!(ssem.regs.ci, word(-1));
        assert_eq!(ssem.regs.ci.to_unsigned_int(), u32::MAX as u64);
        // (2^32 - 1) + 1 wraps to address 0
        assert_eq!(ssem.step().unwrap().address, 0);
    }

    #[test]
    fn test_ci_wraps_at_store_end() {
        let mut ssem = Ssem::default();
        ssem.store.set(0, instr(Mnemonic::Stp, 0)).unwrap();
        ssem.regs.ci = word(31);

        assert_eq!(ssem.step().unwrap().address, 0);
    }

    #[test]
    fn test_accumulator_wraps_on_overflow() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Sub, 5)).unwrap();
        ssem.store.set(5, word(1)).unwrap();
        ssem.regs.a = word(i32::MIN as i64);

        ssem.step().unwrap();
        assert_eq!(ssem.regs.a.to_int(), i32::MAX as i64);
    }

    #[test]
    fn test_self_modifying_program() {
        let stp = instr(Mnemonic::Stp, 0).to_int();
        let mut source = String::from("00 NUM 0\n01 LDN 10\n02 STO 3\n03 JMP 0 ; replaced by STP\n");
        for address in 4..10 {
            source.push_str(&format!("{:02} NUM 0\n", address));
        }
        source.push_str(&format!("10 NUM {}\n", -stp));

        let mut ssem = Ssem::default();
        ssem.load_program(&source).unwrap();
        let executed = ssem.run_to_halt(100).unwrap();

        assert_eq!(executed, 3);
        assert!(ssem.is_halted());
        assert_eq!(ssem.store.get(3).unwrap(), &instr(Mnemonic::Stp, 0));
    }

    #[test]
    fn test_subtract_program() {
        let mut ssem = Ssem::default();
        ssem.load_program(include_str!("../../programs/subtract.asm")).unwrap();

        assert_eq!(ssem.run_to_halt(100).unwrap(), 6);
        assert_eq!(ssem.store.get(10).unwrap().to_int(), 7);
        assert_eq!(ssem.last_instruction().unwrap().mnemonic, Mnemonic::Stp);
    }

    #[test]
    fn test_countdown_program() {
        let mut ssem = Ssem::default();
        ssem.load_program(include_str!("../../programs/countdown.asm")).unwrap();

        // three full passes of 7 instructions, then 6 more and STP
        assert_eq!(ssem.run_to_halt(1000).unwrap(), 28);
        assert_eq!(ssem.store.get(20).unwrap().to_int(), -1);
        assert_eq!(ssem.last_instruction().unwrap().address, 8);
    }

    #[test]
    fn test_run_to_halt_respects_limit() {
        // 01 JMP 0 with store[0] = 0 loops forever
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Jmp, 0)).unwrap();

        assert_eq!(ssem.run_to_halt(50).unwrap(), 50);
        assert_eq!(ssem.cycles(), 50);
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let mut spec = MachineModel::ssem_spec();
        spec.opcodes.retain(|entry| entry.pattern != BitWord::parse("101").unwrap());
        let mut ssem = Ssem::new(MachineModel::from_spec(spec).unwrap());

        let mut bad = BitWord::zero(32);
        bad.engrave(13, &BitWord::parse("101").unwrap()).unwrap();
        ssem.store.set(1, bad).unwrap();

        let result = ssem.run_to_halt(10);
        assert!(matches!(result, Err(MachineError::Decode(DecodeError::UnknownOpcode(_)))));
        assert!(ssem.is_halted());
        assert_eq!(ssem.cycles(), 0);
    }

    #[test]
    fn test_out_of_range_operand_is_a_store_error() {
        // 8-word store with a 5-bit address field
        let mut spec = MachineModel::ssem_spec();
        spec.word_count = 8;
        let mut ssem = Ssem::new(MachineModel::from_spec(spec).unwrap());
        ssem.store.set(1, instr(Mnemonic::Ldn, 20)).unwrap();

        assert!(matches!(
            ssem.step(),
            Err(MachineError::Store(StoreError::AddressOutOfRange { address: 20, .. }))
        ));
    }

    #[test]
    fn test_clear_memory_and_registers() {
        let mut ssem = Ssem::default();
        ssem.store.set(3, word(42)).unwrap();
        ssem.regs.ci = word(3);
        ssem.regs.a = word(-3);
        ssem.controls().set_running(true);

        ssem.clear_registers();
        assert_eq!(ssem.regs, Registers::new(32));
        assert_eq!(ssem.store.get(3).unwrap(), &word(42));
        assert!(!ssem.is_halted());

        ssem.clear_memory();
        assert!(ssem.store.iter().all(BitWord::is_zero));
    }

    #[test]
    fn test_run_loop_stops_on_cancel() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Jmp, 0)).unwrap();
        let controls = Arc::clone(ssem.controls());
        controls.set_speed(Controls::MAX_SPEED);

        let handle = thread::spawn(move || {
            let result = ssem.run_until_halt_or_cancel();
            (ssem, result)
        });
        thread::sleep(Duration::from_millis(50));
        controls.cancel();

        let (ssem, result) = handle.join().unwrap();
        assert_eq!(result, Ok(()));
        assert!(ssem.cycles() > 0);
        assert!(ssem.is_halted());
    }

    #[test]
    fn test_run_loop_idles_after_stp_and_single_steps() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Stp, 0)).unwrap();
        let controls = Arc::clone(ssem.controls());
        let (tx, rx) = mpsc::sync_channel(1);
        ssem.set_observer(tx);

        let handle = thread::spawn(move || ssem.run_until_halt_or_cancel());

        let mut latest = None;
        wait_for(|| {
            if let Ok(snapshot) = rx.try_recv() {
                latest = Some(snapshot);
            }
            matches!(&latest, Some(s) if s.cycles == 1 && s.state == MachineState::Halted)
        });

        // store[2] is zero, i.e. JMP 0
        controls.request_step();
        wait_for(|| {
            if let Ok(snapshot) = rx.try_recv() {
                latest = Some(snapshot);
            }
            matches!(&latest, Some(s) if s.cycles == 2)
        });
        let snapshot = latest.unwrap();
        assert_eq!(snapshot.last_instruction.unwrap().address, 2);
        assert_eq!(snapshot.state, MachineState::Halted);

        controls.cancel();
        assert_eq!(handle.join().unwrap(), Ok(()));
    }

    #[test]
    fn test_machine_runs_again_after_cancel() {
        let mut ssem = Ssem::default();
        ssem.load_program("00 NUM 0\n01 STP").unwrap();

        ssem.controls().cancel();
        assert_eq!(ssem.run_until_halt_or_cancel(), Ok(()));
        assert_eq!(ssem.cycles(), 0);
        assert!(!ssem.controls().is_cancelled());

        ssem.clear_registers();
        assert_eq!(ssem.run_to_halt(10), Ok(1));
        assert!(ssem.is_halted());
    }

    #[test]
    fn test_run_to_halt_discards_a_stale_cancel() {
        let mut ssem = Ssem::default();
        ssem.load_program("00 NUM 0\n01 STP").unwrap();
        ssem.controls().cancel();

        assert_eq!(ssem.run_to_halt(10), Ok(1));
    }

    #[test]
    fn test_fault_while_single_stepping_is_published() {
        let mut spec = MachineModel::ssem_spec();
        spec.opcodes.retain(|entry| entry.pattern != BitWord::parse("101").unwrap());
        let mut ssem = Ssem::new(MachineModel::from_spec(spec).unwrap());
        ssem.store.set(1, instr(Mnemonic::Stp, 0)).unwrap();
        let mut bad = BitWord::zero(32);
        bad.engrave(13, &BitWord::parse("101").unwrap()).unwrap();
        ssem.store.set(2, bad).unwrap();

        let controls = Arc::clone(ssem.controls());
        let (tx, rx) = mpsc::sync_channel(256);
        ssem.set_observer(tx);
        let handle = thread::spawn(move || ssem.run_until_halt_or_cancel());

        wait_for(|| matches!(rx.try_recv(), Ok(s) if s.state == MachineState::Halted));
        controls.request_step();

        let result = handle.join().unwrap();
        assert!(matches!(result, Err(MachineError::Decode(DecodeError::UnknownOpcode(_)))));
        let last = rx.try_iter().last().unwrap();
        // CI moved on to the faulting word before decode failed
        assert_eq!(last.regs.ci_value(), 2);
        assert_eq!(last.cycles, 1);
        assert_eq!(last.state, MachineState::Halted);
    }

    #[test]
    fn test_snapshots_are_rate_limited_while_running() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, instr(Mnemonic::Jmp, 0)).unwrap();
        let controls = Arc::clone(ssem.controls());
        controls.set_speed(Controls::MAX_SPEED);
        let (tx, rx) = mpsc::sync_channel(100_000);
        ssem.set_observer(tx);

        let handle = thread::spawn(move || {
            let result = ssem.run_until_halt_or_cancel();
            (ssem, result)
        });
        thread::sleep(Duration::from_millis(300));
        controls.cancel();

        let (ssem, result) = handle.join().unwrap();
        assert_eq!(result, Ok(()));
        let snapshots: Vec<_> = rx.try_iter().collect();
        assert!((snapshots.len() as u64) < ssem.cycles());
        let last = snapshots.last().unwrap();
        assert_eq!(last.cycles, ssem.cycles());
        assert_eq!(last.state, MachineState::Halted);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut ssem = Ssem::default();
        ssem.store.set(1, encode_number(5, ssem.model()).unwrap()).unwrap();
        let json = serde_json::to_string(&ssem.snapshot()).unwrap();
        let back: MachineSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ssem.snapshot());
    }

    #[test]
    fn test_last_instruction_display() {
        let last = LastInstruction { address: 3, mnemonic: Mnemonic::Ldn, operand: 7 };
        assert_eq!(last.to_string(), "03 LDN 07");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn random_stores_never_panic(words in prop::collection::vec(any::<u32>(), 32)) {
            let mut ssem = Ssem::default();
            for (address, value) in words.into_iter().enumerate() {
                ssem.store.set(address, BitWord::from_unsigned(value as u64, 32)).unwrap();
            }
            // every 3-bit pattern decodes and every 5-bit address exists
            let executed = ssem.run_to_halt(500).unwrap();
            prop_assert!(executed <= 500);
            prop_assert_eq!(ssem.cycles(), executed);
        }
    }
}
