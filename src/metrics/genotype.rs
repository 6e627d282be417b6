use super::table::Cell;
use super::{FileContext, MetricAggregator, MetricTable};

pub const VERIFY_BAM_PLOTTED: [&str; 4] = ["avg_depth", "contamination", "reads_used", "snps_used"];

pub const COMPARE_GENOTYPES_PLOTTED: [&str; 4] = [
    "total_loci_genotype",
    "frac_match_gender",
    "frac_informative_genotype",
    "frac_matched_genotype",
];

/// (column, pointer below `info.metrics`)
const COMPARE_GENOTYPES_FIELDS: [(&str, &str); 7] = [
    ("compared_against", "/compared_against"),
    ("total_loci_gender", "/total_loci_gender"),
    ("total_loci_genotype", "/total_loci_genotype"),
    ("frac_match_gender", "/tumours/0/gender/frac_match_gender"),
    ("gender", "/tumours/0/gender/gender"),
    ("frac_informative_genotype", "/tumours/0/genotype/frac_informative_genotype"),
    ("frac_matched_genotype", "/tumours/0/genotype/frac_matched_genotype"),
];

/// Sanger verifyBamHomChk contamination estimate.
pub struct VerifyBamHomChk;

impl MetricAggregator for VerifyBamHomChk {
    fn tool(&self) -> &'static str {
        "Sanger:verifyBamHomChk"
    }

    fn requires_metrics(&self) -> bool {
        true
    }

    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str) {
        let Some(metrics) = ctx.file.metrics() else {
            return;
        };
        for (key, value) in metrics {
            if key == "sample_id" {
                continue;
            }
            if let Some(cell) = Cell::from_json(value) {
                table.set(row_id, key, cell);
            }
        }
    }
}

/// Sanger compareBamGenotypes tumour/normal concordance.
pub struct CompareBamGenotypes;

impl MetricAggregator for CompareBamGenotypes {
    fn tool(&self) -> &'static str {
        "Sanger:compareBamGenotypes"
    }

    fn requires_metrics(&self) -> bool {
        true
    }

    fn extract(&self, ctx: &FileContext, table: &mut MetricTable, row_id: &str) {
        for (column, pointer) in COMPARE_GENOTYPES_FIELDS {
            ctx.copy_metric(table, row_id, column, pointer);
        }
    }
}
