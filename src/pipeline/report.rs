//! Report directory layout and plot output.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::io::{self, ReportError};
use crate::metadata::FileRecord;
use crate::metrics::MetricTable;
use crate::song::{AnalysisState, ExperimentalStrategy};
use crate::utils::parallel_process;
use crate::visualization::{render_svg, Figure};

/// A named figure ready to be saved.
#[derive(Debug, Clone)]
pub struct NamedFigure {
    pub name: String,
    pub figure: Figure,
}

/// Save `plots` below `dir`: every figure as `json/{name}.json`, and when
/// `render` is set also as `svg/{name}.svg`.
pub fn save_plots(dir: &Path, plots: &[NamedFigure], render: bool) -> Result<(), ReportError> {
    info!("Saving plots...");
    let json_dir = dir.join("json");
    fs::create_dir_all(&json_dir)?;
    for plot in plots {
        let file = File::create(json_dir.join(format!("{}.json", plot.name)))?;
        serde_json::to_writer(BufWriter::new(file), &plot.figure)?;
    }

    if render {
        let svg_dir = dir.join("svg");
        fs::create_dir_all(&svg_dir)?;
        parallel_process(
            plots,
            |plot| -> Result<(), ReportError> {
                debug!("Rendering {}", plot.name);
                render_svg(&plot.figure, &svg_dir.join(format!("{}.svg", plot.name)))?;
                Ok(())
            },
            None,
        )?;
    }
    info!("Saving plots...Complete ({} figures)", plots.len());
    Ok(())
}

/// Output location for one `(state, project, experiment)` combination:
/// `{out}/{state}_{project}_{experiment}/{tsv,json,svg}`.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    prefix: String,
    write_dir: PathBuf,
    render: bool,
}

impl ReportWriter {
    pub fn create(
        output_directory: &Path,
        state: AnalysisState,
        project: &str,
        experiment: ExperimentalStrategy,
        render: bool,
    ) -> Result<Self, ReportError> {
        let prefix = format!("{}_{}_{}", state, project, experiment);
        let write_dir = output_directory.join(&prefix);
        fs::create_dir_all(write_dir.join("tsv"))?;
        fs::create_dir_all(write_dir.join("json"))?;
        if render {
            fs::create_dir_all(write_dir.join("svg"))?;
        }
        Ok(ReportWriter {
            prefix,
            write_dir,
            render,
        })
    }

    /// `tsv/{state}_{project}_{experiment}_{suffix}.tsv`
    pub fn table_path(&self, suffix: &str) -> PathBuf {
        self.write_dir
            .join("tsv")
            .join(format!("{}_{}.tsv", self.prefix, suffix))
    }

    pub fn write_metric_table(&self, suffix: &str, table: &MetricTable) -> Result<PathBuf, ReportError> {
        let path = self.table_path(suffix);
        io::write_metric_table(table, &path)?;
        info!("Wrote {} rows to {}", table.len(), path.display());
        Ok(path)
    }

    pub fn write_file_table(&self, suffix: &str, rows: &[FileRecord]) -> Result<PathBuf, ReportError> {
        let path = self.table_path(suffix);
        io::write_file_table(rows, &path)?;
        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }

    pub fn save_plots(&self, plots: &[NamedFigure]) -> Result<(), ReportError> {
        save_plots(&self.write_dir, plots, self.render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::visualization::{donor_figure, DonorPair};
    use tempfile::tempdir;

    fn figure() -> Figure {
        let pairs = vec![DonorPair {
            donor: "DO1".into(),
            tumour: Some(1.0),
            normal: Some(2.0),
        }];
        donor_figure(&pairs, "error_rate", "TEST-CA WGS error_rate", &ReportConfig::default())
    }

    #[test]
    fn test_report_writer_layout() {
        let dir = tempdir().unwrap();
        let writer = ReportWriter::create(
            dir.path(),
            AnalysisState::Published,
            "TEST-CA",
            ExperimentalStrategy::RnaSeq,
            false,
        )
        .unwrap();

        let expected = dir.path().join("PUBLISHED_TEST-CA_RNA-Seq");
        assert!(expected.join("tsv").is_dir());
        assert!(expected.join("json").is_dir());
        assert!(!expected.join("svg").exists());
        assert_eq!(
            writer.table_path("fileIDs"),
            expected.join("tsv").join("PUBLISHED_TEST-CA_RNA-Seq_fileIDs.tsv")
        );

        let path = writer.write_file_table("fileIDs", &[]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_plots_json_and_svg() {
        let dir = tempdir().unwrap();
        let plots = vec![NamedFigure {
            name: "fig.1.1.TEST-CA_WGS_error_rate".into(),
            figure: figure(),
        }];

        save_plots(dir.path(), &plots, false).unwrap();
        let json = dir.path().join("json/fig.1.1.TEST-CA_WGS_error_rate.json");
        let restored: Figure = serde_json::from_reader(File::open(&json).unwrap()).unwrap();
        assert_eq!(restored, plots[0].figure);
        assert!(!dir.path().join("svg").exists());

        save_plots(dir.path(), &plots, true).unwrap();
        assert!(dir
            .path()
            .join("svg/fig.1.1.TEST-CA_WGS_error_rate.svg")
            .exists());
    }
}
