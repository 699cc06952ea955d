//! SSEM Emulator - CLI Entry Point
//!
//! Commands:
//! - `ssem-emu run <program>` - Run an assembly or binary dump file
//! - `ssem-emu debug <program>` - Interactive front panel
//! - `ssem-emu dump <program>` - Write the loaded store as a binary dump
//! - `ssem-emu disasm <program>` - Disassemble the loaded store

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

use ssem::asm::{disassemble, dump_store, save_dump};
use ssem::{GlyphStyle, Machine, MachineModel, Ssem};

#[derive(Parser)]
#[command(name = "ssem-emu")]
#[command(version)]
#[command(about = "An emulator of the Manchester Small-Scale Experimental Machine (1948)")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the assembly or binary dump file to execute
        program: PathBuf,
        /// Maximum number of cycles to run
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Print every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// JSON machine description (default: the SSEM)
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Interactive front panel
    Debug {
        /// Path to the program to debug
        program: PathBuf,
        /// Desired speed in instructions per second
        #[arg(short, long)]
        speed: Option<u32>,
        /// JSON machine description (default: the SSEM)
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Load a program and write the store as a binary dump
    Dump {
        /// Path to the program
        program: PathBuf,
        /// Output file (default: standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON machine description (default: the SSEM)
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Load a program and print a best-effort disassembly
    Disasm {
        /// Path to the program
        program: PathBuf,
        /// JSON machine description (default: the SSEM)
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // The front panel owns the terminal, so it only logs to a file
    let interactive = matches!(cli.command, Commands::Debug { .. });
    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref(), interactive) {
        eprintln!("❌ Failed to open log file: {}", e);
        std::process::exit(1);
    }

    match cli.command {
        Commands::Run { program, max_cycles, trace, model } => {
            run_program(&program, model.as_deref(), max_cycles, trace);
        }
        Commands::Debug { program, speed, model } => {
            debug_program(&program, model.as_deref(), speed);
        }
        Commands::Dump { program, output, model } => {
            dump_program(&program, model.as_deref(), output.as_deref());
        }
        Commands::Disasm { program, model } => {
            disassemble_program(&program, model.as_deref());
        }
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>, interactive: bool) -> io::Result<()> {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let file_format = tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(level);
            tracing_subscriber::registry().with(file_format).init();
        }
        None if interactive => {}
        None => {
            let stderr_format = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(level);
            tracing_subscriber::registry().with(stderr_format).init();
        }
    }
    Ok(())
}

/// Build a machine from an optional model file and load a program into it.
fn load_machine(program: &Path, model_path: Option<&Path>) -> Ssem {
    let model = match model_path {
        Some(path) => match MachineModel::load(path) {
            Ok(model) => model,
            Err(e) => {
                eprintln!("❌ Invalid machine model {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => MachineModel::ssem(),
    };

    let mut machine = Ssem::new(model);
    if let Err(e) = machine.load_file(program) {
        eprintln!("❌ Failed to load {}: {}", program.display(), e);
        std::process::exit(1);
    }
    machine
}

fn run_program(path: &Path, model: Option<&Path>, max_cycles: u64, trace: bool) {
    let mut machine = load_machine(path, model);

    println!("🔧 Running: {}", path.display());

    let executed = if trace {
        println!();
        println!("━━━ Execution ━━━");
        machine.controls().set_running(true);

        let mut executed = 0u64;
        while !machine.is_halted() && executed < max_cycles {
            match machine.step() {
                Ok(last) => {
                    println!("{}  A={}", last, machine.regs.a_value());
                    executed += 1;
                }
                Err(e) => {
                    eprintln!("❌ Runtime error at CI={}: {}", machine.regs.ci_value(), e);
                    std::process::exit(1);
                }
            }
        }
        executed
    } else {
        match machine.run_to_halt(max_cycles) {
            Ok(executed) => executed,
            Err(e) => {
                eprintln!("❌ Runtime error at CI={}: {}", machine.regs.ci_value(), e);
                std::process::exit(1);
            }
        }
    };

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", executed);
    println!("State: {:?}", machine.state());
    println!("CI: {} ({})", machine.regs.ci.render(GlyphStyle::Classic), machine.regs.ci_value());
    println!("A:  {} ({})", machine.regs.a.render(GlyphStyle::Classic), machine.regs.a_value());
    println!();
    println!("{}", machine.store);

    if !machine.is_halted() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &Path, model: Option<&Path>, speed: Option<u32>) {
    let machine = load_machine(path, model);
    if let Some(speed) = speed {
        machine.controls().set_speed(speed);
    }

    if let Err(e) = ssem::run_debugger(machine) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &Path, _model: Option<&Path>, _speed: Option<u32>) {
    eprintln!("❌ This build has no front panel; rebuild with the `tui` feature");
    std::process::exit(1);
}

fn dump_program(path: &Path, model: Option<&Path>, output: Option<&Path>) {
    let machine = load_machine(path, model);

    match output {
        Some(out_path) => {
            if let Err(e) = save_dump(out_path, &machine.store) {
                eprintln!("❌ Failed to save dump: {}", e);
                std::process::exit(1);
            }
            println!("✓ Saved to {}", out_path.display());
        }
        None => print!("{}", dump_store(&machine.store)),
    }
}

fn disassemble_program(path: &Path, model: Option<&Path>) {
    let machine = load_machine(path, model);
    print!("{}", disassemble(&machine.store, machine.model()));
}
