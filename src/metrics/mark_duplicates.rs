use log::warn;

use super::table::row_number;
use super::{FileContext, MetricAggregator, MetricTable};
use crate::stats::ratio;

/// Per-library counters summed over `info.metrics.libraries[]`.
pub const LIBRARY_FIELDS: [&str; 6] = [
    "READ_PAIRS_EXAMINED",
    "READ_PAIR_DUPLICATES",
    "READ_PAIR_OPTICAL_DUPLICATES",
    "UNMAPPED_READS",
    "UNPAIRED_READS_EXAMINED",
    "UNPAIRED_READ_DUPLICATES",
];

pub const PLOTTED: [&str; 3] = ["TOTAL_READS", "DUPLICATION_PCT", "MAPPING_PCT"];

/// biobambam2 duplicate marking.
pub struct MarkDuplicates;

impl MetricAggregator for MarkDuplicates {
    fn tool(&self) -> &'static str {
        "biobambam2:bammarkduplicates2"
    }

    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str) {
        let Some(libraries) = ctx.metric("/libraries").and_then(|v| v.as_array()) else {
            warn!(
                "No libraries in duplicate metrics {} of analysis {}",
                ctx.file.file_name, ctx.analysis.analysis_id
            );
            for field in LIBRARY_FIELDS {
                table.add_column(field);
            }
            return;
        };

        for field in LIBRARY_FIELDS {
            let total: f64 = libraries
                .iter()
                .filter_map(|lib| lib.get(field).and_then(|v| v.as_f64()))
                .sum();
            table.set_number(row_id, field, total);
        }
    }

    fn finalize(&self, table: &mut MetricTable) {
        table.derive("TOTAL_READS", |row| {
            Some(
                row_number(row, "READ_PAIRS_EXAMINED")? * 2.0
                    + row_number(row, "UNPAIRED_READS_EXAMINED")?,
            )
        });
        table.derive("DUPLICATION_PCT", |row| {
            let duplicates = row_number(row, "READ_PAIR_DUPLICATES")? * 2.0
                + row_number(row, "UNPAIRED_READ_DUPLICATES")?;
            ratio(duplicates, row_number(row, "TOTAL_READS")?).map(|r| r * 100.0)
        });
        table.derive("MAPPING_PCT", |row| {
            let total = row_number(row, "TOTAL_READS")?;
            ratio(total - row_number(row, "UNMAPPED_READS")?, total).map(|r| r * 100.0)
        });
    }
}
