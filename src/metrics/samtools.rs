use serde_json::{Map, Value};

use super::{FileContext, MetricAggregator, MetricTable};
use crate::stats::{ratio, round_to};

pub const FIELDS: [&str; 12] = [
    "average_insert_size",
    "average_length",
    "duplicated_bases",
    "error_rate",
    "mapped_bases_cigar",
    "mapped_reads",
    "mismatch_bases",
    "paired_reads",
    "pairs_on_different_chromosomes",
    "properly_paired_reads",
    "total_bases",
    "total_reads",
];

/// Rates derived from a samtools stats summary, rounded to 3 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlignmentRates {
    pub duplicate_rate: Option<f64>,
    pub pairs_on_different_chromosomes_rate: Option<f64>,
    pub estimated_coverage: Option<f64>,
}

impl AlignmentRates {
    /// `coverage_bases` names the base count divided by the genome size
    /// (`total_bases` or `mapped_bases_cigar`). Nothing is derived when the
    /// file reports zero reads.
    pub fn from_metrics(
        metrics: &Map<String, Value>,
        genome_size: Option<u64>,
        coverage_bases: &str,
    ) -> Self {
        let get = |key: &str| metrics.get(key).and_then(Value::as_f64);
        let total_reads = get("total_reads").unwrap_or(0.0);
        if total_reads == 0.0 {
            return AlignmentRates::default();
        }

        let duplicate_rate = get("duplicated_bases")
            .zip(get("average_length"))
            .and_then(|(dup, len)| ratio(dup, total_reads * len))
            .map(|r| round_to(r, 3));
        let pairs_on_different_chromosomes_rate = get("pairs_on_different_chromosomes")
            .zip(get("paired_reads").filter(|p| *p > 0.0))
            .and_then(|(diff, paired)| ratio(diff * 2.0, paired))
            .map(|r| round_to(r, 3));
        let estimated_coverage = get(coverage_bases)
            .zip(genome_size)
            .and_then(|(bases, size)| ratio(bases, size as f64))
            .map(|r| round_to(r, 3));

        AlignmentRates {
            duplicate_rate,
            pairs_on_different_chromosomes_rate,
            estimated_coverage,
        }
    }

    pub fn entries(&self) -> [(&'static str, Option<f64>); 3] {
        [
            ("duplicate_rate", self.duplicate_rate),
            (
                "pairs_on_different_chromosomes_rate",
                self.pairs_on_different_chromosomes_rate,
            ),
            ("estimated_coverage", self.estimated_coverage),
        ]
    }
}

/// samtools stats summary numbers plus derived alignment rates.
pub struct SamtoolsStats {
    genome_size: Option<u64>,
}

impl SamtoolsStats {
    pub fn new(genome_size: Option<u64>) -> Self {
        SamtoolsStats { genome_size }
    }
}

impl MetricAggregator for SamtoolsStats {
    fn tool(&self) -> &'static str {
        "Samtools:stats"
    }

    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str) {
        for field in FIELDS {
            ctx.copy_metric(table, row_id, field, &format!("/{}", field));
        }

        let rates = ctx
            .file
            .metrics()
            .map(|m| AlignmentRates::from_metrics(m, self.genome_size, "total_bases"))
            .unwrap_or_default();
        for (column, value) in rates.entries() {
            match value {
                Some(v) => table.set_number(row_id, column, v),
                None => table.add_column(column),
            }
        }
    }
}
