//! Column layout of the QC summary TSV.

use serde_json::Value;

/// `(column, dotted path into a serialised record)`
pub const FIELD_MAP: [(&str, &str); 36] = [
    ("study_id", "study_id"),
    ("donor_id", "donor_id"),
    ("submitter_donor_id", "submitter_donor_id"),
    ("gender", "gender"),
    (
        "geno_infer_gender_match",
        "tumour.sanger.genotype_inference.frac_match_gender",
    ),
    ("experimental_strategy", "experimental_strategy"),
    ("normal_aligned", "flags.normal_aligned"),
    ("tumour_aligned", "flags.tumour_aligned"),
    ("sanger_called", "flags.sanger_called"),
    ("mutect2_called", "flags.mutect2_called"),
    ("normal_sample_id", "normal.sample_id"),
    ("normal_error_rate", "normal.alignment.error_rate"),
    ("normal_duplicate_rate", "normal.alignment.duplicate_rate"),
    (
        "normal_pairs_on_different_chromosomes_rate",
        "normal.alignment.pairs_on_different_chromosomes_rate",
    ),
    ("normal_oxoQ_score", "normal.alignment.oxoQ_score"),
    ("normal_insert_size_mean", "normal.alignment.average_insert_size"),
    ("normal_avg_depth", "normal.sanger.contamination.avg_depth"),
    ("normal_estimated_coverage", "normal.alignment.estimated_coverage"),
    (
        "normal_sanger_contamination",
        "normal.sanger.contamination.contamination",
    ),
    (
        "normal_mutect2_contamination",
        "normal.mutect2.contamination.contamination",
    ),
    (
        "normal_properly_paired_reads",
        "normal.alignment.properly_paired_reads",
    ),
    ("tumour_sample_id", "tumour.sample_id"),
    ("tumour_error_rate", "tumour.alignment.error_rate"),
    ("tumour_duplicate_rate", "tumour.alignment.duplicate_rate"),
    (
        "tumour_pairs_on_different_chromosomes_rate",
        "tumour.alignment.pairs_on_different_chromosomes_rate",
    ),
    ("tumour_oxoQ_score", "tumour.alignment.oxoQ_score"),
    ("tumour_insert_size_mean", "tumour.alignment.average_insert_size"),
    ("tumour_avg_depth", "tumour.sanger.contamination.avg_depth"),
    ("tumour_estimated_coverage", "tumour.alignment.estimated_coverage"),
    (
        "tumour_sanger_contamination",
        "tumour.sanger.contamination.contamination",
    ),
    (
        "tumour_mutect2_contamination",
        "tumour.mutect2.contamination.contamination",
    ),
    (
        "tumour_properly_paired_reads",
        "tumour.alignment.properly_paired_reads",
    ),
    (
        "ascat_normal_contamination",
        "tumour.sanger.ascat_metrics.NormalContamination",
    ),
    ("ascat_ploidy", "tumour.sanger.ascat_metrics.Ploidy"),
    ("ascat_purity", "tumour.sanger.ascat_metrics.rho"),
    ("mutect2_callable", "tumour.mutect2.callable"),
];

pub fn header() -> Vec<&'static str> {
    FIELD_MAP.iter().map(|(column, _)| *column).collect()
}

/// Follow a dotted path through nested objects.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| current.get(key))
}

/// TSV text of a JSON value; missing and null values are empty.
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One TSV row for a serialised record.
pub fn row(record: &Value) -> Vec<String> {
    FIELD_MAP
        .iter()
        .map(|(_, path)| format_value(lookup(record, path)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_dotted_paths() {
        let record = json!({"tumour": {"alignment": {"error_rate": 0.004}}, "gender": null});
        assert_eq!(
            lookup(&record, "tumour.alignment.error_rate"),
            Some(&json!(0.004))
        );
        assert_eq!(lookup(&record, "tumour.sanger.contamination.avg_depth"), None);
        assert_eq!(format_value(lookup(&record, "gender")), "");
    }

    #[test]
    fn test_row_formats_values() {
        let record = json!({
            "study_id": "TEST-CA",
            "flags": {"normal_aligned": true},
            "tumour": {"mutect2": {"callable": 2800000000u64}}
        });
        let row = row(&record);
        assert_eq!(row.len(), FIELD_MAP.len());
        assert_eq!(row[0], "TEST-CA");
        assert_eq!(row[6], "true");
        assert_eq!(row[7], "");
        assert_eq!(row.last().unwrap(), "2800000000");
        assert_eq!(header()[4], "geno_infer_gender_match");
    }
}
