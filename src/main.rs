//! Batch repair of a notebook's table of contents.
//!
//! Pipeline: scan the pages directory and load the cached TOC, reconcile
//! the two, and, after an interactive confirmation, quarantine unparsable
//! files, rewrite the TOC, and renumber page files to match the canonical
//! order. All fatal conditions propagate as `RunError` up to `main`, which
//! is the single place an exit code is produced.
use clap::Parser;
use std::process::ExitCode;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

mod cli;
mod doc;
mod entry;
mod mutate;
mod notebook;
mod reconcile;
mod scan;

use mutate::Confirm;
use notebook::{PAGES_DIRNAME, TOC_FILENAME};

/// How a completed (non-error) run ended.
#[derive(Debug)]
enum Outcome {
    /// The TOC already matched the directory; nothing was touched.
    Clean,
    /// The repair ran to completion.
    Repaired,
    /// The operator declined the confirmation prompt; nothing was touched.
    Declined,
}

/// Fatal conditions, classified by whether the filesystem may have been
/// touched. Setup errors exit 1 with the tree as found; mutation errors
/// exit 2 and may leave partial state for manual inspection.
#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Setup(anyhow::Error),
    #[error(transparent)]
    Mutation(anyhow::Error),
}

fn main() -> ExitCode {
    // clap's default exit code for usage errors is 2, which is reserved here
    // for mutation-phase failures; translate at the same spot as every other
    // exit code.
    let args = match cli::Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                // --help and --version land here.
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing(args.verbose);

    match run(&args, &mut mutate::StdinConfirm) {
        Ok(Outcome::Clean) => {
            println!("The TOC matches the directory structure.");
            println!("No action required.");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Repaired) => ExitCode::SUCCESS,
        Ok(Outcome::Declined) => {
            println!("Not confirmed. Terminating without action.");
            ExitCode::from(1)
        }
        Err(RunError::Setup(err)) => {
            tracing::error!("{err:#}");
            ExitCode::from(1)
        }
        Err(RunError::Mutation(err)) => {
            tracing::error!("{err:#}");
            tracing::error!("aborting; inspect the pages directory before retrying");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(args: &cli::Args, confirm: &mut dyn Confirm) -> Result<Outcome, RunError> {
    let root = notebook::resolve_root(args.notebookdir.as_deref()).map_err(RunError::Setup)?;
    let pages_dir = root.join(PAGES_DIRNAME);
    let toc_path = root.join(TOC_FILENAME);

    let scan::ScanOutcome { pages, unparsable } =
        scan::scan_pages(&pages_dir).map_err(RunError::Setup)?;
    let toc = scan::load_toc(&toc_path, &pages_dir);
    let recon = reconcile::reconcile(pages, toc);
    if recon.is_clean() {
        return Ok(Outcome::Clean);
    }

    let renames = reconcile::plan_renames(&recon.entries);
    println!("The TOC file will be rebuilt.");
    if !renames.is_empty() {
        println!("In addition, {} file(s) will be renumbered.", renames.len());
    }
    if !unparsable.is_empty() {
        println!(
            "In addition, {} unparsable file(s) will be quarantined.",
            unparsable.len()
        );
    }
    if !confirm.confirm("Press Enter to proceed") {
        return Ok(Outcome::Declined);
    }

    mutate::apply(&pages_dir, &toc_path, &recon.entries, &renames, &unparsable)
        .map_err(RunError::Mutation)?;
    Ok(Outcome::Repaired)
}
