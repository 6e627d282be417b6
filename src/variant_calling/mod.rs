//! Tumour / matched-normal QC summary built from a SONG dump.
//!
//! Writes `{study}.variant_calling_stats.json` with every record,
//! `{study}.{date}.qc.tsv` with the flattened summary and donor-level
//! comparison plots into the report directory.

pub mod archive;
pub mod collect;
pub mod fields;
pub mod record;

pub use archive::QcArchiveStore;
pub use collect::{StatsCollector, VariantCallingStats};
pub use record::DonorRecord;

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;

use chrono::NaiveDate;
use log::info;
use serde_json::Value;
use thiserror::Error;

use crate::config::ReportConfig;
use crate::io::{write_rows, ReportError};
use crate::pipeline::{save_plots, NamedFigure};
use crate::song::{load_dump, SongError};
use crate::visualization::{donor_figure, figure_name, DonorPair};

#[derive(Error, Debug)]
pub enum VariantCallingError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to load SONG dump: {0}")]
    DumpError(#[from] SongError),

    #[error("Failed to read QC tarball {path}: {source}")]
    Archive { path: PathBuf, source: io::Error },

    #[error("Invalid extra_info.json in {path}: {source}")]
    ExtraInfo {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Report error: {0}")]
    ReportError(#[from] ReportError),

    #[error("No study id given and the dump is empty")]
    MissingStudy,
}

/// Alignment metrics compared between tumour and matched normal.
pub const DONOR_PLOTTED: [&str; 6] = [
    "error_rate",
    "duplicate_rate",
    "pairs_on_different_chromosomes_rate",
    "oxoQ_score",
    "average_insert_size",
    "estimated_coverage",
];

/// Everything the `variant-calling` command was asked to do.
#[derive(Debug, Clone)]
pub struct VariantCallingOptions {
    pub dump_path: PathBuf,
    pub qc_metrics_dir: Option<PathBuf>,
    pub report_dir: PathBuf,
    pub study: Option<String>,
    pub plot: bool,
}

pub fn run(
    options: &VariantCallingOptions,
    config: &ReportConfig,
    date: NaiveDate,
) -> Result<PathBuf, VariantCallingError> {
    let analyses = load_dump(&options.dump_path)?;
    let study = options
        .study
        .clone()
        .or_else(|| analyses.first().map(|a| a.study_id.clone()))
        .ok_or(VariantCallingError::MissingStudy)?;

    let store = QcArchiveStore::new(options.qc_metrics_dir.clone());
    let stats = StatsCollector::new(&store, config).collect(&analyses)?;

    fs::create_dir_all(&options.report_dir)?;
    write_report(&stats, options, &study, date)?;

    let plots = donor_figures(&stats, &study, config);
    save_plots(&options.report_dir, &plots, options.plot)?;
    Ok(options.report_dir.clone())
}

fn write_report(
    stats: &VariantCallingStats,
    options: &VariantCallingOptions,
    study: &str,
    date: NaiveDate,
) -> Result<(), VariantCallingError> {
    let json_path = options
        .report_dir
        .join(format!("{}.variant_calling_stats.json", study));
    let file = File::create(&json_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), stats)?;
    info!("Wrote {}", json_path.display());

    let rows = stats
        .values()
        .map(|record| serde_json::to_value(record).map(|value| fields::row(&value)))
        .collect::<Result<Vec<_>, _>>()?;
    let tsv_path = options
        .report_dir
        .join(format!("{}.{}.qc.tsv", study, date.format("%Y-%m-%d")));
    write_rows(&fields::header(), rows, &tsv_path)?;
    info!("Wrote {} rows to {}", stats.len(), tsv_path.display());
    Ok(())
}

fn alignment_value(metrics: &record::Metrics, metric: &str) -> Option<f64> {
    metrics.get(metric).and_then(Value::as_f64)
}

/// One tumour vs matched-normal chart per strategy and metric.
pub fn donor_figures(stats: &VariantCallingStats, study: &str, config: &ReportConfig) -> Vec<NamedFigure> {
    let mut strategies: Vec<&str> = stats
        .values()
        .map(|r| r.experimental_strategy.as_str())
        .collect();
    strategies.sort_unstable();
    strategies.dedup();

    let mut plots = Vec::new();
    for (group, strategy) in strategies.iter().enumerate() {
        let records: Vec<&DonorRecord> = stats
            .values()
            .filter(|r| r.experimental_strategy == *strategy)
            .collect();
        for (idx, metric) in DONOR_PLOTTED.iter().enumerate() {
            let pairs: Vec<DonorPair> = records
                .iter()
                .map(|r| DonorPair {
                    donor: r.donor_label().to_string(),
                    tumour: alignment_value(&r.tumour.alignment, metric),
                    normal: alignment_value(&r.normal.alignment, metric),
                })
                .collect();
            let title = format!("{} {} {}", study, strategy, metric);
            plots.push(NamedFigure {
                name: figure_name(group + 1, idx + 1, &title),
                figure: donor_figure(&pairs, metric, &title, config),
            });
        }
    }
    plots
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::tempdir;

    fn dump_line(id: &str, kind: &str, sample: Value, files: Value) -> String {
        json!({
            "analysisId": id,
            "studyId": "TEST-CA",
            "analysisState": "PUBLISHED",
            "analysisType": {"name": kind},
            "experiment": {"experimental_strategy": "WXS"},
            "workflow": {"workflow_short_name": "dna-seq-alignment"},
            "samples": [sample],
            "files": files
        })
        .to_string()
    }

    fn write_dump(path: &std::path::Path) {
        let tumour = json!({
            "sampleId": "SA_T1", "submitterSampleId": "t1", "matchedNormalSubmitterSampleId": "n1",
            "specimen": {"tumourNormalDesignation": "Tumour"},
            "donor": {"donorId": "DO1", "submitterDonorId": "donor-1"}
        });
        let normal = json!({
            "sampleId": "SA_N1", "submitterSampleId": "n1",
            "specimen": {"tumourNormalDesignation": "Normal"},
            "donor": {"donorId": "DO1", "submitterDonorId": "donor-1"}
        });
        let oxog = |score: f64| {
            json!([{"fileName": "x.oxog.tgz", "info": {"data_subtypes": ["OxoG Metrics"], "metrics": {"oxoQ_score": score}}}])
        };
        let mut file = File::create(path).unwrap();
        writeln!(file, "{}", dump_line("A1", "qc_metrics", tumour, oxog(40.0))).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", dump_line("A2", "qc_metrics", normal, oxog(45.0))).unwrap();
    }

    #[test]
    fn test_run_writes_json_tsv_and_plots() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("rdpc-song.jsonl");
        write_dump(&dump);
        let options = VariantCallingOptions {
            dump_path: dump,
            qc_metrics_dir: None,
            report_dir: dir.path().join("report"),
            study: None,
            plot: false,
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let report_dir = run(&options, &ReportConfig::default(), date).unwrap();

        let json: Value = serde_json::from_reader(
            File::open(report_dir.join("TEST-CA.variant_calling_stats.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["WXS_SA_T1"]["normal"]["alignment"]["oxoQ_score"], json!(45.0));

        let tsv = fs::read_to_string(report_dir.join("TEST-CA.2024-03-01.qc.tsv")).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("study_id\tdonor_id\tsubmitter_donor_id"));
        let row: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(row[0], "TEST-CA");
        assert_eq!(row[14], "45.0");
        assert_eq!(row[25], "40.0");

        assert!(report_dir
            .join("json/fig.1.4.TEST-CA_WXS_oxoQ_score.json")
            .exists());
    }

    #[test]
    fn test_run_requires_study_for_empty_dump() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("empty.jsonl");
        File::create(&dump).unwrap();
        let options = VariantCallingOptions {
            dump_path: dump,
            qc_metrics_dir: None,
            report_dir: dir.path().join("report"),
            study: None,
            plot: false,
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = run(&options, &ReportConfig::default(), date).unwrap_err();
        assert!(matches!(err, VariantCallingError::MissingStudy));
    }

    #[test]
    fn test_donor_figures_per_strategy() {
        let mut stats = VariantCallingStats::new();
        for (key, strategy, donor) in [("WGS_SA1", "WGS", "d1"), ("WXS_SA2", "WXS", "d2")] {
            let mut record = DonorRecord {
                experimental_strategy: strategy.to_string(),
                submitter_donor_id: donor.to_string(),
                ..Default::default()
            };
            record.tumour.alignment.insert("error_rate".into(), json!(0.01));
            stats.insert(key.to_string(), record);
        }

        let plots = donor_figures(&stats, "TEST-CA", &ReportConfig::default());
        assert_eq!(plots.len(), 2 * DONOR_PLOTTED.len());
        assert_eq!(plots[0].name, "fig.1.1.TEST-CA_WGS_error_rate");
        assert_eq!(plots[6].name, "fig.2.1.TEST-CA_WXS_error_rate");
        assert_eq!(plots[0].figure.panels[0].labels, vec!["d1"]);
        assert!(plots[1].figure.panels[0].labels.is_empty());
    }
}
