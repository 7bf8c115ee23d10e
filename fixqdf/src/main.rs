//! fixqdf - repair a QDF file after hand editing.
//!
//! Reads a QDF-mode PDF whose stream lengths, object streams or
//! cross-reference data were perturbed by edits and writes a
//! self-consistent file back out. All of the repair logic lives in the
//! `qdffix` library; this binary only wires up the files.

use clap::Parser;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

/// Repair stream lengths and cross-reference data in a QDF-mode PDF.
#[derive(Parser)]
#[command(name = "fixqdf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input QDF file; standard input when omitted
    input: Option<PathBuf>,

    /// Output file; standard output when omitted
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{}", e);
        process::exit(2);
    }
}

fn run(cli: &Cli) -> qdffix::Result<()> {
    let (name, input) = match &cli.input {
        Some(path) => (path.display().to_string(), fs::read(path)?),
        None => {
            let mut buffer = Vec::new();
            io::stdin().lock().read_to_end(&mut buffer)?;
            ("standard input".to_string(), buffer)
        }
    };
    match &cli.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            qdffix::repair(&name, &input, &mut out)?;
            out.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            qdffix::repair(&name, &input, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}
