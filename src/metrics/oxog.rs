use super::{FileContext, MetricAggregator, MetricTable};

pub const PLOTTED: [&str; 1] = ["oxoQ_score"];

/// GATK CollectOxoGMetrics.
pub struct OxoGMetrics;

impl MetricAggregator for OxoGMetrics {
    fn tool(&self) -> &'static str {
        "GATK:CollectOxoGMetrics"
    }

    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str) {
        ctx.copy_metric(table, row_id, "oxoQ_score", "/oxoQ_score");
    }
}
