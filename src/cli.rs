use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use crate::config::ReportConfig;
use crate::pipeline::{FetchOptions, MetricsProcessor};
use crate::song::{AnalysisState, ExperimentalStrategy};
use crate::variant_calling::{self, VariantCallingOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "QC metric reports for RDPC SONG studies", long_about = None)]
pub struct Cli {
    /// JSON file overriding report defaults (plot size, percentiles, genome sizes)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query SONG and write per-tool QC metric tables and plots
    Fetch {
        /// Study/project codes to query
        #[arg(short, long, required = true, num_args = 1..)]
        project: Vec<String>,

        /// SONG base URL
        #[arg(short, long)]
        url: String,

        /// Directory the reports are written to
        #[arg(short, long, default_value = ".")]
        output_directory: PathBuf,

        /// Analysis ids left out of the metric tables
        #[arg(short = 'x', long, num_args = 0..)]
        exclude_analyses: Vec<String>,

        /// Experiment types to report
        #[arg(short, long, required = true, num_args = 1..)]
        experiment: Vec<ExperimentalStrategy>,

        /// Analysis states to query
        #[arg(short, long, num_args = 1.., default_value = "PUBLISHED")]
        state: Vec<AnalysisState>,

        /// Only write figure descriptions, skip SVG rendering
        #[arg(long)]
        no_plot: bool,
    },

    /// Summarise tumour/matched-normal QC from a SONG dump
    VariantCalling {
        /// SONG dump, one analysis per line
        #[arg(short, long, default_value = "data/rdpc-song.jsonl")]
        dump_path: PathBuf,

        /// Directory of downloaded QC tarballs, laid out as {studyId}/{fileName}
        #[arg(short, long)]
        qc_metrics_dir: Option<PathBuf>,

        /// Directory the summary is written to
        #[arg(short, long, default_value = "report")]
        report_dir: PathBuf,

        /// Study id used in output names; defaults to the study of the first analysis
        #[arg(long)]
        study: Option<String>,

        /// Only write figure descriptions, skip SVG rendering
        #[arg(long)]
        no_plot: bool,
    },
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };

    match cli.command {
        Commands::Fetch {
            project,
            url,
            output_directory,
            exclude_analyses,
            experiment,
            state,
            no_plot,
        } => {
            let options = FetchOptions {
                projects: project,
                url,
                output_directory,
                exclude_analyses,
                experiments: experiment,
                states: state,
                plot: !no_plot,
            };
            info!("Reporting {:?} for {:?}", options.experiments, options.projects);
            MetricsProcessor::new(options, config)?.run()
        }
        Commands::VariantCalling {
            dump_path,
            qc_metrics_dir,
            report_dir,
            study,
            no_plot,
        } => {
            let options = VariantCallingOptions {
                dump_path,
                qc_metrics_dir,
                report_dir,
                study,
                plot: !no_plot,
            };
            let today = chrono::Local::now().date_naive();
            let report_dir = variant_calling::run(&options, &config, today)
                .with_context(|| format!("Failed to summarise {}", options.dump_path.display()))?;
            info!("Report written to {}", report_dir.display());
            Ok(())
        }
    }
}
