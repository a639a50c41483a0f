//! CLI argument parsing.
//!
//! The surface is deliberately tiny: one flag and one optional positional.
//! Everything interesting happens in the pipeline, which takes these as
//! plain values so it can be driven from tests without a process boundary.
use clap::Parser;
use std::path::PathBuf;

/// Repair a notebook's table of contents.
#[derive(Parser, Debug)]
#[command(
    name = "tocrepair",
    version,
    about = "Rebuild a notebook's toc.json from its page files, renumbering pages as needed",
    after_help = "With no NOTEBOOKDIR, the unique *.nb directory in the current directory is used.\nExit codes: 0 clean or repaired, 1 setup error or declined confirmation,\n2 failure while mutating (partial state is reported, never rolled back)."
)]
pub struct Args {
    /// Log every per-file decision, not just the ones that change something
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Notebook directory to repair
    #[arg(value_name = "NOTEBOOKDIR")]
    pub notebookdir: Option<PathBuf>,
}
