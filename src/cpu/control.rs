//! Control inputs shared between the machine thread and a control surface.
//!
//! The machine thread owns the registers and the store outright. Another
//! thread may only touch these inputs, each an independent atomic:
//! - cancel: end the current run loop
//! - running: the run/halt flag (pause, resume, STP)
//! - speed: desired instructions per second
//! - step requests: single cycles to execute while halted

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Atomic control inputs for a running machine.
#[derive(Debug)]
pub struct Controls {
    cancel: AtomicBool,
    running: AtomicBool,
    speed: AtomicU32,
    pending_steps: AtomicU32,
}

impl Controls {
    /// Upper bound for the desired speed.
    pub const MAX_SPEED: u32 = 10_000_000;

    /// Create halted, uncancelled controls with the given speed.
    pub fn new(speed: u32) -> Self {
        Self {
            cancel: AtomicBool::new(false),
            running: AtomicBool::new(false),
            speed: AtomicU32::new(speed.clamp(1, Self::MAX_SPEED)),
            pending_steps: AtomicU32::new(0),
        }
    }

    /// Ask the run loop to exit before its next cycle.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Withdraw a cancellation request so the machine can be run again.
    pub fn reset_cancel(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Check the run/halt flag.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Set the run/halt flag.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Flip the run/halt flag, returning the new state.
    pub fn toggle_running(&self) -> bool {
        !self.running.fetch_xor(true, Ordering::SeqCst)
    }

    /// Desired speed in instructions per second (at least 1).
    pub fn speed(&self) -> u32 {
        self.speed.load(Ordering::Relaxed)
    }

    /// Set the desired speed, clamped to `1..=MAX_SPEED`.
    pub fn set_speed(&self, speed: u32) {
        self.speed
            .store(speed.clamp(1, Self::MAX_SPEED), Ordering::Relaxed);
    }

    /// Queue one single-step request.
    pub fn request_step(&self) {
        self.pending_steps.fetch_add(1, Ordering::SeqCst);
    }

    /// Consume one queued single-step request, if any.
    pub fn take_step_request(&self) -> bool {
        self.pending_steps
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(crate::cpu::MachineModel::SSEM_SPEED)
    }
}
