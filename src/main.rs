//! QC metric reports for RDPC SONG studies.
//!
//! `fetch` pulls analyses from a SONG server, flattens the per-file QC
//! metrics of each tool into tables and writes TSV reports together with
//! sample-level comparison plots. `variant-calling` summarises tumour and
//! matched-normal QC from a SONG dump with donor-level plots.

mod cli;
mod config;
mod io;
mod metadata;
mod metrics;
mod pipeline;
mod song;
mod stats;
mod utils;
mod variant_calling;
mod visualization;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::debug;

use cli::{run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
    debug!("Parsed arguments: {:?}", cli);

    run_cli(cli)
}
