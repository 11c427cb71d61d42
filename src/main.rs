//! Command-line entry point
//!
//! `rv32i-sim <image-path>` loads a flat binary image at address 0,
//! initialises a single hart with its stack pointer at the top of
//! memory, and runs it to completion. This binary is a thin shell
//! around the library: argument parsing, image loading, and printing
//! the termination summary. None of the architectural semantics live
//! here.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use clap_num::maybe_hex;

use rv32i_sim::driver::{format_summary, run};
use rv32i_sim::hart::Hart;
use rv32i_sim::memory::{ImageError, Memory};

/// Simulate a flat RV32I binary image
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the flat binary image to load at address 0
    image: Option<PathBuf>,

    /// Print a disassembly and trace annotation for every executed
    /// instruction
    #[arg(short, long)]
    trace: bool,

    /// Print the full register file before every executed instruction
    #[arg(short, long)]
    regs: bool,

    /// Stop after this many instructions even if the hart has not
    /// halted (0 means unlimited)
    #[arg(short, long, default_value_t = 0, value_parser=maybe_hex::<u64>)]
    limit: u64,

    /// Size in bytes of the hart's memory, rounded up to a multiple
    /// of 16
    #[arg(long, default_value_t = 1 << 20, value_parser=maybe_hex::<usize>)]
    mem_size: usize,

    /// Hart identifier used only in diagnostic headers
    #[arg(long, default_value_t = 0)]
    mhartid: u32,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let Some(image_path) = args.image else {
        eprintln!("Missing file argument");
        std::process::exit(1);
    };

    let mut memory = Memory::new(args.mem_size);
    match memory.load_image(&image_path) {
        Ok(()) => {}
        Err(ImageError::TooBig { .. }) => println!("Program too big"),
        Err(e @ ImageError::Open { .. }) => println!("{e}"),
    }

    let sp_init = memory.size() as u32;
    let mut hart = Hart::new(&mut memory, args.mhartid);
    hart.registers.set(2, sp_init);
    hart.show_instructions = args.trace;
    hart.show_registers = args.regs;

    let mut stdout = io::stdout();
    let summary = run(&mut hart, args.limit, &mut stdout);
    println!("{}", format_summary(&summary));
}
