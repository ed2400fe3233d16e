use clap::Parser;
use statio_core::{Bios, System};

use std::path::PathBuf;
use std::process::ExitCode;

/// Playstation 1 emulator.
#[derive(Parser)]
#[command(name = "statio", version, about)]
struct Args {
    /// Path to a 512 KiB BIOS image.
    bios: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    let bios = match Bios::from_file(&args.bios) {
        Ok(bios) => bios,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut system = System::new(bios);

    log::info!("booting from {}", args.bios.display());

    // Run until the machine hits something the core can't do yet.
    loop {
        if let Err(fault) = system.tick(&mut ()) {
            eprintln!("{fault}");
            return ExitCode::FAILURE;
        }
    }
}
