use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use png_validator_rs::prelude::*;

#[derive(Parser)]
#[command(name = "png_validator_rs")]
#[command(about = "Finds fake or corrupted PNG atlases in a Celeste Mods folder", long_about = None)]
struct Cli {
    /// Absolute path to the "Mods" folder (prompted for when omitted)
    mods_dir: Option<PathBuf>,

    /// Number of parallel worker threads (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Also write the results to this file (.json for JSON, text otherwise)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run in batch mode (no interactive prompts, no progress bar)
    #[arg(long)]
    batch: bool,

    /// Print report lines without colors
    #[arg(long)]
    no_color: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let interactive = cli.mods_dir.is_none();
    let mods_dir = match &cli.mods_dir {
        Some(path) => validate_mods_root(path)?,
        None if cli.batch => bail!("A Mods folder path is required in batch mode"),
        None => match prompt_mods_dir()? {
            Some(path) => path,
            None => return Ok(()),
        },
    };

    // Set up graceful cancellation
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\n⚠️  Cancellation requested. Abandoning images in flight...");
        handler_token.cancel();
    })
    .context("Error setting Ctrl-C handler")?;

    println!();
    println!("Searching for invalid PNGs...");
    println!();

    let progress = if cli.batch {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} mods {msg}")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        pb
    };

    let console = ConsoleReporter::stdout(!cli.no_color).with_progress(progress.clone());
    let sink = (console, EventLog::new());
    let options = ScanOptions { workers: cli.workers };

    let summary = run_scan(&mods_dir, &options, &sink, &cancel, &progress)?;
    progress.finish_and_clear();

    if let Some(output) = &cli.output {
        write_report_auto(output, &sink.1.events(), &summary)?;
        println!("Detailed report saved to: {:?}", output);
    }

    if interactive {
        println!("Press Enter to exit.");
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
    }

    Ok(())
}

/// Ask for the Mods folder until a valid one is given. `None` on end of input.
fn prompt_mods_dir() -> Result<Option<PathBuf>> {
    println!("Enter the path to your Celeste \"Mods\" folder.");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match validate_mods_root(Path::new(input)) {
            Ok(path) => return Ok(Some(path)),
            Err(e) => eprintln!("{e}"),
        }
    }
}
