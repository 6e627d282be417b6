//! Per-tool QC metric aggregation.
//!
//! Each SONG file is tagged with the tool that produced it
//! (`info.analysis_tools[0]`). An aggregator picks out the files of its tool
//! and flattens their metrics into one [`MetricTable`].

pub mod genotype;
pub mod mark_duplicates;
pub mod oxog;
pub mod quality_yield;
pub mod rnaseq;
pub mod samtools;
pub mod table;

pub use genotype::{CompareBamGenotypes, VerifyBamHomChk};
pub use mark_duplicates::MarkDuplicates;
pub use oxog::OxoGMetrics;
pub use quality_yield::QualityYield;
pub use rnaseq::RnaSeqMetrics;
pub use samtools::SamtoolsStats;
pub use table::{Cell, MetricTable, Pipeline, PIPELINE_COLUMN, SAMPLE_COLUMN};

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::ReportConfig;
use crate::song::{Analysis, ExperimentalStrategy, FileEntry, Sample};

/// Everything an aggregator may look at for one matching file.
pub struct FileContext<'a> {
    pub analysis: &'a Analysis,
    pub sample: &'a Sample,
    pub file: &'a FileEntry,
}

impl FileContext<'_> {
    /// Metric value at a JSON pointer below `info.metrics`, e.g. `/oxoQ_score`.
    pub fn metric(&self, pointer: &str) -> Option<&Value> {
        self.file.info.metrics.pointer(pointer)
    }

    /// Copy the metric at `pointer` into `column`, warning when it is absent.
    pub fn copy_metric(&self, table: &mut MetricTable, row_id: &str, column: &str, pointer: &str) {
        match self.metric(pointer).and_then(Cell::from_json) {
            Some(cell) => table.set(row_id, column, cell),
            None => {
                table.add_column(column);
                warn!(
                    "Missing metric {} in file {} of analysis {}",
                    pointer.trim_start_matches('/'),
                    self.file.file_name,
                    self.analysis.analysis_id
                );
            }
        }
    }
}

/// Flattens the files of one QC tool into a table.
pub trait MetricAggregator {
    /// Tool tag matched against `info.analysis_tools[0]`.
    fn tool(&self) -> &'static str;

    fn index_name(&self) -> &'static str {
        "analysisId"
    }

    /// Only consider files that carry a non-empty `info.metrics`.
    fn requires_metrics(&self) -> bool {
        false
    }

    fn row_id(&self, ctx: &FileContext) -> String {
        ctx.analysis.analysis_id.clone()
    }

    /// Write the file's metrics into `row_id`.
    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str);

    /// Derived columns computed once all files are in.
    fn finalize(&self, _table: &mut MetricTable) {}
}

/// Run `aggregator` over `analyses`, skipping excluded analysis ids.
pub fn aggregate(
    aggregator: &dyn MetricAggregator,
    analyses: &[Analysis],
    exclude: &[String],
) -> MetricTable {
    info!("Aggregating metrics from : {}", aggregator.tool());
    let mut table = MetricTable::new(aggregator.index_name());
    table.add_column(SAMPLE_COLUMN);
    table.add_column(PIPELINE_COLUMN);

    for (count, analysis) in analyses.iter().enumerate() {
        if count % 50 == 0 {
            debug!("{}: {}/{} analyses", aggregator.tool(), count, analyses.len());
        }
        if exclude.iter().any(|id| id == &analysis.analysis_id) {
            continue;
        }
        let Some(sample) = analysis.primary_sample() else {
            continue;
        };

        for file in &analysis.files {
            if file.primary_tool() != Some(aggregator.tool()) {
                continue;
            }
            if aggregator.requires_metrics() && file.metrics().is_none() {
                continue;
            }
            let ctx = FileContext {
                analysis,
                sample,
                file,
            };
            let row_id = aggregator.row_id(&ctx);
            table.set_text(&row_id, SAMPLE_COLUMN, &sample.sample_id);
            table.set_text(
                &row_id,
                PIPELINE_COLUMN,
                Pipeline::from_file_name(&file.file_name).as_str(),
            );
            aggregator.extract(&ctx, &mut table, &row_id);
        }
    }

    aggregator.finalize(&mut table);
    info!(
        "Aggregating metrics from : {}...Complete ({} rows)",
        aggregator.tool(),
        table.len()
    );
    table
}

/// One tool's contribution to an experiment report: which table to build,
/// where to write it and which columns to plot.
pub struct ToolReport {
    pub aggregator: Box<dyn MetricAggregator + Send + Sync>,
    pub tsv_suffix: &'static str,
    pub pipelines: Vec<Pipeline>,
    pub plotted: Vec<&'static str>,
}

/// The tool tables reported for `strategy`, in plot-group order.
pub fn reports_for(strategy: ExperimentalStrategy, config: &ReportConfig) -> Vec<ToolReport> {
    match strategy {
        ExperimentalStrategy::RnaSeq => {
            let rna = vec![Pipeline::Star, Pipeline::Hisat2];
            vec![
                ToolReport {
                    aggregator: Box::new(MarkDuplicates),
                    tsv_suffix: "libraryMetrics",
                    pipelines: rna.clone(),
                    plotted: mark_duplicates::PLOTTED.to_vec(),
                },
                ToolReport {
                    aggregator: Box::new(RnaSeqMetrics),
                    tsv_suffix: "rnaMetrics",
                    pipelines: rna,
                    plotted: rnaseq::PLOTTED.to_vec(),
                },
            ]
        }
        ExperimentalStrategy::Wgs | ExperimentalStrategy::Wxs => {
            let dna = vec![Pipeline::BwaMem];
            vec![
                ToolReport {
                    aggregator: Box::new(MarkDuplicates),
                    tsv_suffix: "markDupMetrics",
                    pipelines: dna.clone(),
                    plotted: mark_duplicates::PLOTTED.to_vec(),
                },
                ToolReport {
                    aggregator: Box::new(OxoGMetrics),
                    tsv_suffix: "oxoMetrics",
                    pipelines: dna.clone(),
                    plotted: oxog::PLOTTED.to_vec(),
                },
                ToolReport {
                    aggregator: Box::new(SamtoolsStats::new(config.genome_size(strategy))),
                    tsv_suffix: "samtoolsMetrics",
                    pipelines: dna.clone(),
                    plotted: samtools::FIELDS.to_vec(),
                },
                ToolReport {
                    aggregator: Box::new(QualityYield),
                    tsv_suffix: "readGroupMetrics",
                    pipelines: dna.clone(),
                    plotted: quality_yield::PLOTTED.to_vec(),
                },
                ToolReport {
                    aggregator: Box::new(VerifyBamHomChk),
                    tsv_suffix: "verifyBamMetrics",
                    pipelines: dna.clone(),
                    plotted: genotype::VERIFY_BAM_PLOTTED.to_vec(),
                },
                ToolReport {
                    aggregator: Box::new(CompareBamGenotypes),
                    tsv_suffix: "bamGenotypesMetrics",
                    pipelines: dna,
                    plotted: genotype::COMPARE_GENOTYPES_PLOTTED.to_vec(),
                },
            ]
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{json, Value};

    use crate::song::Analysis;

    /// Analysis with one sample and the given files.
    pub fn analysis_with_files(id: &str, sample_id: &str, files: Vec<Value>) -> Analysis {
        serde_json::from_value(json!({
            "analysisId": id,
            "studyId": "TEST-CA",
            "experiment": {"experimental_strategy": "WGS"},
            "samples": [{"sampleId": sample_id, "submitterSampleId": format!("sub-{}", sample_id)}],
            "files": files
        }))
        .unwrap()
    }

    /// A file tagged with `tool` carrying `metrics`.
    pub fn tool_file(tool: &str, file_name: &str, metrics: Value) -> Value {
        json!({
            "objectId": format!("obj-{}", file_name),
            "fileName": file_name,
            "dataType": "Analysis QC",
            "info": {"analysis_tools": [tool], "metrics": metrics}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aggregate_filters_tool_and_excludes() {
        let analyses = vec![
            analysis_with_files(
                "A1",
                "SA1",
                vec![
                    tool_file("GATK:CollectOxoGMetrics", "a1.oxog.tgz", json!({"oxoQ_score": 40.5})),
                    tool_file("Samtools:stats", "a1.bamstat.tgz", json!({"total_reads": 10})),
                ],
            ),
            analysis_with_files(
                "A2",
                "SA2",
                vec![tool_file("GATK:CollectOxoGMetrics", "a2.oxog.tgz", json!({"oxoQ_score": 38.0}))],
            ),
            analysis_with_files(
                "A3",
                "SA3",
                vec![json!({"fileName": "untagged.bam", "info": {}})],
            ),
        ];

        let table = aggregate(&OxoGMetrics, &analyses, &["A2".to_string()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.number("A1", "oxoQ_score"), Some(40.5));
        assert_eq!(table.text("A1", SAMPLE_COLUMN), Some("SA1"));
        assert_eq!(table.text("A1", PIPELINE_COLUMN), Some("BWA-MEM"));
    }

    #[test]
    fn test_missing_metric_leaves_cell_empty() {
        let analyses = vec![analysis_with_files(
            "A1",
            "SA1",
            vec![tool_file("GATK:CollectOxoGMetrics", "a1.oxog.tgz", json!({"other": 1}))],
        )];
        let table = aggregate(&OxoGMetrics, &analyses, &[]);
        assert_eq!(table.len(), 1);
        assert!(table.columns().any(|c| c == "oxoQ_score"));
        assert_eq!(table.get("A1", "oxoQ_score"), None);
    }

    #[test]
    fn test_reports_for_strategies() {
        let config = ReportConfig::default();
        let rna = reports_for(ExperimentalStrategy::RnaSeq, &config);
        assert_eq!(
            rna.iter().map(|r| r.tsv_suffix).collect::<Vec<_>>(),
            vec!["libraryMetrics", "rnaMetrics"]
        );
        assert_eq!(rna[0].pipelines, vec![Pipeline::Star, Pipeline::Hisat2]);

        let wgs = reports_for(ExperimentalStrategy::Wgs, &config);
        assert_eq!(wgs.len(), 6);
        assert!(wgs.iter().all(|r| r.pipelines == vec![Pipeline::BwaMem]));
        assert_eq!(wgs[2].aggregator.tool(), "Samtools:stats");
    }
}
