//! share - NFS share database tool
//!
//! Entry point for the CLI application.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use sharedb::config::{CliArgs, ShareConfig};
use sharedb::CommandProcessor;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Usage errors exit 1, help and version exit 0
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(e) = setup_logging(args.verbose, args.debug) {
        eprintln!("share: Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config = ShareConfig::from_args(args).context("Invalid arguments")?;

    if config.verbose > 0 {
        info!("[share, version {}]", env!("CARGO_PKG_VERSION"));
    }
    debug!(action = ?config.action, intent = ?config.open_intent(), "Running share command");

    let processor = CommandProcessor::new(config);
    let config = processor.config();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let outcome = processor.run(&mut out)?;
    out.flush().context("Failed to write listing")?;

    if config.verbose > 0 {
        if let Some(listing) = outcome.listing {
            info!(
                "[{}: {} exported mountpoints]",
                config.db_path.display(),
                listing.records
            );
        }
    }

    Ok(())
}

fn setup_logging(verbose: u8, debug: u8) -> Result<()> {
    let filter = if debug > 0 {
        EnvFilter::new("sharedb=trace,share=trace,warn")
    } else if verbose > 0 {
        EnvFilter::new("sharedb=debug,share=debug,warn")
    } else {
        EnvFilter::new("sharedb=info,share=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow!(e))
}
