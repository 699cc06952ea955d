//! Debugger application state and logic.
//!
//! The machine runs on its own thread. The debugger only touches the shared
//! [`Controls`] and reads the snapshots the machine publishes after each
//! cycle.

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::bits::GlyphStyle;
use crate::cpu::{Controls, Machine, MachineError, MachineModel, MachineSnapshot, MachineState, Ssem};

/// Screen refreshes per second.
const REFRESH_RATE: u64 = 30;

/// Snapshots buffered between the machine and the screen.
const SNAPSHOT_BUFFER: usize = 8;

/// Next desired speed after a speed-up key press.
pub fn speed_up(speed: u32) -> u32 {
    let next = if speed < 10 {
        speed + 1
    } else if speed < 100 {
        speed + 10
    } else if speed < Controls::MAX_SPEED {
        speed + 100
    } else {
        speed
    };
    next.min(Controls::MAX_SPEED)
}

/// Next desired speed after a speed-down key press.
pub fn speed_down(speed: u32) -> u32 {
    if speed <= 10 {
        speed.saturating_sub(1).max(1)
    } else if speed <= 100 {
        speed - 10
    } else {
        speed - 100
    }
}

/// Debugger application state.
pub struct DebuggerApp {
    /// Control inputs of the machine thread.
    pub controls: Arc<Controls>,
    /// Layout of the machine, for disassembly.
    pub model: MachineModel,
    /// Latest state published by the machine.
    pub snapshot: MachineSnapshot,
    /// Glyphs used to draw words.
    pub style: GlyphStyle,
    /// Store view scroll offset.
    pub scroll: usize,
    /// Should we quit?
    pub should_quit: bool,
    /// Runtime error that stopped the machine, if any.
    pub fault: Option<String>,
    /// Instructions per second over the last second.
    pub measured_speed: u64,
    snapshots: Receiver<MachineSnapshot>,
    worker: Option<JoinHandle<Result<(), MachineError>>>,
    sample_time: Instant,
    sample_cycles: u64,
}

impl DebuggerApp {
    /// Start `ssem` on a worker thread and attach to it.
    pub fn new(mut ssem: Ssem) -> Self {
        let (tx, rx) = mpsc::sync_channel(SNAPSHOT_BUFFER);
        ssem.set_observer(tx);
        let controls = Arc::clone(ssem.controls());
        let snapshot = ssem.snapshot();
        let model = ssem.model().clone();

        let worker = thread::spawn(move || ssem.run_until_halt_or_cancel());

        Self {
            controls,
            model,
            sample_cycles: snapshot.cycles,
            snapshot,
            style: GlyphStyle::default(),
            scroll: 0,
            should_quit: false,
            fault: None,
            measured_speed: 0,
            snapshots: rx,
            worker: Some(worker),
            sample_time: Instant::now(),
        }
    }

    /// Toggle between running and stopped.
    pub fn toggle_run(&self) {
        self.controls.toggle_running();
    }

    /// Stop the machine and execute exactly one cycle.
    pub fn step(&self) {
        self.controls.set_running(false);
        self.controls.request_step();
    }

    pub fn speed_up(&self) {
        self.controls.set_speed(speed_up(self.controls.speed()));
    }

    pub fn speed_down(&self) {
        self.controls.set_speed(speed_down(self.controls.speed()));
    }

    /// Switch to the next glyph style.
    pub fn cycle_style(&mut self) {
        self.style = self.style.next();
    }

    pub fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    /// Scroll down while rows remain below a view of `visible_rows`.
    pub fn scroll_down(&mut self, visible_rows: usize) {
        let rows = self.snapshot.store.word_count() + 3;
        if self.scroll + visible_rows < rows {
            self.scroll += 1;
        }
    }

    /// Check if the machine is running.
    pub fn is_running(&self) -> bool {
        self.snapshot.state == MachineState::Running
    }

    /// Pull pending snapshots and refresh the speed measurement.
    pub fn tick(&mut self) {
        if let Some(latest) = self.snapshots.try_iter().last() {
            self.snapshot = latest;
        }

        let elapsed = self.sample_time.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let executed = self.snapshot.cycles.saturating_sub(self.sample_cycles);
            self.measured_speed = (executed as f64 / elapsed.as_secs_f64()) as u64;
            self.sample_cycles = self.snapshot.cycles;
            self.sample_time = Instant::now();
        }

        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            self.collect_worker();
        }
    }

    /// Cancel the machine thread and wait for it.
    pub fn shutdown(&mut self) {
        self.controls.cancel();
        self.collect_worker();
    }

    fn collect_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.fault = Some(e.to_string()),
            Err(_) => self.fault = Some("machine thread panicked".into()),
        }
    }
}

/// Run the debugger on a loaded machine.
pub fn run_debugger(ssem: Ssem) -> io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(ssem);
    let frame_time = Duration::from_millis(1000 / REFRESH_RATE);

    // Main loop
    let result = loop {
        app.tick();

        let mut visible_rows = 0;
        if let Err(e) = terminal.draw(|frame| {
            visible_rows = super::ui::store_rows(frame.area());
            super::ui::draw(frame, &app);
        }) {
            break Err(e);
        }

        // Handle input
        match event::poll(frame_time) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') => app.should_quit = true,
                    KeyCode::Char('p') => app.toggle_run(),
                    KeyCode::F(10) | KeyCode::Char('s') => app.step(),
                    KeyCode::Char('i') => app.speed_up(),
                    KeyCode::Char('k') => app.speed_down(),
                    KeyCode::Char('d') => app.cycle_style(),
                    KeyCode::Up => app.scroll_up(),
                    KeyCode::Down => app.scroll_down(visible_rows),
                    _ => {}
                },
                Ok(_) => {}
                Err(e) => break Err(e),
            },
            Ok(false) => {}
            Err(e) => break Err(e),
        }

        if app.should_quit {
            break Ok(());
        }
    };

    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    if let Some(fault) = &app.fault {
        tracing::error!("machine stopped: {}", fault);
    }
    result
}
