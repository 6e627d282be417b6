use super::table::Cell;
use super::{FileContext, MetricAggregator, MetricTable};

pub const PLOTTED: [&str; 14] = [
    "median_3prime_bias",
    "median_5prime_bias",
    "median_5prime_to_3prime_bias",
    "median_cv_coverage",
    "pct_coding_bases",
    "pct_correct_strand_reads",
    "pct_intergenic_bases",
    "pct_intronic_bases",
    "pct_mrna_bases",
    "pct_r1_transcript_strand_reads",
    "pct_r2_transcript_strand_reads",
    "pct_ribosomal_bases",
    "pct_usable_bases",
    "pct_utr_bases",
];

/// Picard CollectRnaSeqMetrics. Keeps every percentage and median metric.
pub struct RnaSeqMetrics;

impl MetricAggregator for RnaSeqMetrics {
    fn tool(&self) -> &'static str {
        "Picard:CollectRnaSeqMetrics"
    }

    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str) {
        let Some(metrics) = ctx.file.metrics() else {
            return;
        };
        for (key, value) in metrics {
            if !(key.contains("pct") || key.contains("median")) {
                continue;
            }
            if let Some(cell) = Cell::from_json(value) {
                table.set(row_id, key, cell);
            }
        }
    }
}
