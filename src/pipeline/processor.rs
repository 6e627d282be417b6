//! The `fetch` run: query SONG, flatten, aggregate, plot and write reports.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use super::report::{NamedFigure, ReportWriter};
use crate::config::ReportConfig;
use crate::metadata::build_file_table;
use crate::metrics::{aggregate, reports_for, MetricTable, ToolReport};
use crate::song::{Analysis, AnalysisState, ExperimentalStrategy, SongClient};
use crate::visualization::{figure_name, sample_figure};

/// Everything the `fetch` command was asked to do.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub projects: Vec<String>,
    pub url: String,
    pub output_directory: PathBuf,
    pub exclude_analyses: Vec<String>,
    pub experiments: Vec<ExperimentalStrategy>,
    pub states: Vec<AnalysisState>,
    pub plot: bool,
}

pub struct MetricsProcessor {
    client: SongClient,
    options: FetchOptions,
    config: ReportConfig,
}

impl MetricsProcessor {
    pub fn new(options: FetchOptions, config: ReportConfig) -> Result<Self> {
        let client = SongClient::new(&options.url, config.timeout_secs)
            .context("Failed to create SONG client")?;
        Ok(MetricsProcessor {
            client,
            options,
            config,
        })
    }

    /// Query every `(project, state)` once and report each requested
    /// experiment from the response.
    pub fn run(&self) -> Result<()> {
        for project in &self.options.projects {
            for state in &self.options.states {
                let analyses = self
                    .client
                    .fetch_analyses(project, *state)
                    .with_context(|| format!("Failed to fetch {} analyses for {}", state, project))?;

                for experiment in &self.options.experiments {
                    self.report_experiment(project, *state, *experiment, &analyses)
                        .with_context(|| {
                            format!("Failed to report {} {} {}", state, project, experiment)
                        })?;
                }
            }
        }
        Ok(())
    }

    fn report_experiment(
        &self,
        project: &str,
        state: AnalysisState,
        experiment: ExperimentalStrategy,
        analyses: &[Analysis],
    ) -> Result<()> {
        let writer = ReportWriter::create(
            &self.options.output_directory,
            state,
            project,
            experiment,
            self.options.plot,
        )?;

        let files = build_file_table(analyses, experiment);
        writer.write_file_table("fileIDs", &files)?;

        let selected: Vec<Analysis> = analyses
            .iter()
            .filter(|a| a.strategy() == Some(experiment))
            .cloned()
            .collect();

        let mut plots = Vec::new();
        for (group, report) in reports_for(experiment, &self.config).iter().enumerate() {
            let table = aggregate(
                report.aggregator.as_ref(),
                &selected,
                &self.options.exclude_analyses,
            );
            writer.write_metric_table(report.tsv_suffix, &table)?;
            if table.is_empty() {
                warn!(
                    "No {} metrics for {} {}, skipping plots",
                    report.tsv_suffix, project, experiment
                );
                continue;
            }
            plots.extend(self.tool_figures(project, experiment, group + 1, report, &table));
        }

        writer.save_plots(&plots)?;
        Ok(())
    }

    fn tool_figures(
        &self,
        project: &str,
        experiment: ExperimentalStrategy,
        group: usize,
        report: &ToolReport,
        table: &MetricTable,
    ) -> Vec<NamedFigure> {
        report
            .plotted
            .iter()
            .enumerate()
            .map(|(idx, metric)| {
                let title = format!("{} {} {}", project, experiment, metric);
                info!("Generating plot for {}", title);
                NamedFigure {
                    name: figure_name(group, idx + 1, &title),
                    figure: sample_figure(table, &report.pipelines, metric, &title, &self.config),
                }
            })
            .collect()
    }
}
