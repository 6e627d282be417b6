use super::{FileContext, MetricAggregator, MetricTable};

pub const PLOTTED: [&str; 3] = ["total_reads", "read_length", "pf_reads"];

/// Picard CollectQualityYieldMetrics, one row per read group.
pub struct QualityYield;

impl QualityYield {
    fn read_group<'a>(ctx: &'a FileContext) -> Option<&'a str> {
        ctx.metric("/read_group_id").and_then(|v| v.as_str())
    }
}

impl MetricAggregator for QualityYield {
    fn tool(&self) -> &'static str {
        "Picard:CollectQualityYieldMetrics"
    }

    fn index_name(&self) -> &'static str {
        "readGroupKey"
    }

    /// `{sampleId}.{read_group_id}`
    fn row_id(&self, ctx: &FileContext) -> String {
        match Self::read_group(ctx) {
            Some(rg) => format!("{}.{}", ctx.sample.sample_id, rg),
            None => format!("{}.{}", ctx.sample.sample_id, ctx.file.object_id),
        }
    }

    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str) {
        ctx.copy_metric(table, row_id, "readGroupId", "/read_group_id");
        table.set_text(row_id, "analysisId", &ctx.analysis.analysis_id);
        table.set_text(row_id, "objectId", &ctx.file.object_id);
        for field in PLOTTED {
            ctx.copy_metric(table, row_id, field, &format!("/{}", field));
        }
    }
}
