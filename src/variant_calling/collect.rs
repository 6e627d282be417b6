//! Builds the per tumour sample records from a SONG dump.
//!
//! Pass one walks the published tumour analyses and fills the tumour side of
//! each record. Pass two copies alignment numbers of every referenced matched
//! normal into the records of the tumours pointing at it.

use indexmap::IndexMap;
use log::{debug, info};
use serde_json::Value;

use super::archive::QcArchiveStore;
use super::record::{merge, DonorRecord, Metrics};
use super::VariantCallingError;
use crate::config::ReportConfig;
use crate::metadata::{MatchedNormalIndex, NormalKey};
use crate::metrics::samtools::AlignmentRates;
use crate::song::{Analysis, FileEntry, Sample};
use crate::stats::round_to;

/// Summary fields copied from an alignment QC file.
const ALIGNMENT_FIELDS: [&str; 6] = [
    "error_rate",
    "properly_paired_reads",
    "total_reads",
    "average_insert_size",
    "average_length",
    "pairs_on_different_chromosomes",
];

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Records keyed by `{strategy}_{tumourSampleId}`, in first-seen order.
pub type VariantCallingStats = IndexMap<String, DonorRecord>;

pub fn record_key(strategy: &str, sample_id: &str) -> String {
    format!("{}_{}", strategy, sample_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnalysisKind {
    VariantCalling,
    SequencingAlignment,
    VariantProcessing,
    QcMetrics,
}

impl AnalysisKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "variant_calling" => Some(AnalysisKind::VariantCalling),
            "sequencing_alignment" => Some(AnalysisKind::SequencingAlignment),
            "variant_processing" => Some(AnalysisKind::VariantProcessing),
            "qc_metrics" => Some(AnalysisKind::QcMetrics),
            _ => None,
        }
    }
}

pub struct StatsCollector<'a> {
    store: &'a QcArchiveStore,
    config: &'a ReportConfig,
}

impl<'a> StatsCollector<'a> {
    pub fn new(store: &'a QcArchiveStore, config: &'a ReportConfig) -> Self {
        StatsCollector { store, config }
    }

    pub fn collect(&self, analyses: &[Analysis]) -> Result<VariantCallingStats, VariantCallingError> {
        let published: Vec<Analysis> = analyses
            .iter()
            .filter(|a| a.is_published())
            .cloned()
            .collect();
        let index = MatchedNormalIndex::build(&published);

        info!("Collecting tumour QC metrics...");
        let mut stats = VariantCallingStats::new();
        for analysis in &published {
            self.collect_tumour(analysis, &mut stats)?;
        }

        info!("Collecting matched normal QC metrics...");
        for analysis in &published {
            self.collect_normal(analysis, &index, &mut stats)?;
        }
        for record in stats.values() {
            if index.normal_for_tumour(&record.tumour.sample_id).is_none() {
                debug!(
                    "Tumour {} has no published matched normal",
                    record.tumour.sample_id
                );
            }
        }
        info!("Collected {} tumour samples", stats.len());
        Ok(stats)
    }

    fn genome_size(&self, strategy: &str) -> Option<u64> {
        strategy
            .parse()
            .ok()
            .and_then(|s| self.config.genome_size(s))
    }

    fn collect_tumour(
        &self,
        analysis: &Analysis,
        stats: &mut VariantCallingStats,
    ) -> Result<(), VariantCallingError> {
        let Some(sample) = analysis.primary_sample().filter(|s| s.is_tumour()) else {
            return Ok(());
        };
        let Some(strategy) = analysis.strategy_name() else {
            debug!("Analysis {} has no strategy, skipping", analysis.analysis_id);
            return Ok(());
        };

        let record = stats
            .entry(record_key(strategy, &sample.sample_id))
            .or_insert_with(|| new_record(analysis, sample, strategy));

        match AnalysisKind::from_name(&analysis.analysis_type.name) {
            Some(AnalysisKind::VariantCalling) => {
                match analysis.workflow.workflow_short_name.as_deref() {
                    Some("sanger-wgs") | Some("sanger-wxs") => record.flags.sanger_called = true,
                    Some("gatk-mutect2") => record.flags.mutect2_called = true,
                    _ => {}
                }
            }
            Some(AnalysisKind::SequencingAlignment) => record.flags.tumour_aligned = true,
            Some(AnalysisKind::VariantProcessing) => record.count_open_filter(),
            Some(AnalysisKind::QcMetrics) => {}
            None => return Ok(()),
        }

        for file in &analysis.files {
            self.tumour_file(analysis, sample, strategy, file, record)?;
        }
        Ok(())
    }

    fn tumour_file(
        &self,
        analysis: &Analysis,
        sample: &Sample,
        strategy: &str,
        file: &FileEntry,
        record: &mut DonorRecord,
    ) -> Result<(), VariantCallingError> {
        let study = &analysis.study_id;
        if file.has_subtype("Cross Sample Contamination") {
            let metrics = self.store.extra_info_metrics(study, &file.file_name)?;
            let own = metrics.get("sample_id").and_then(Value::as_str) == Some(sample.sample_id.as_str());
            let (sanger, mutect2) = if own {
                (
                    &mut record.tumour.sanger.contamination,
                    &mut record.tumour.mutect2.contamination,
                )
            } else {
                (
                    &mut record.normal.sanger.contamination,
                    &mut record.normal.mutect2.contamination,
                )
            };
            if file.file_name.contains("sanger") {
                merge(sanger, &metrics);
            } else if file.file_name.contains("gatk-mutect2") {
                merge(mutect2, &metrics);
            }
        } else if file.has_subtype("Ploidy") && file.has_subtype("Tumour Purity") {
            let metrics = self.store.extra_info_metrics(study, &file.file_name)?;
            merge(&mut record.tumour.sanger.ascat_metrics, &metrics);
        } else if file.has_subtype("Genotyping Stats") {
            let metrics = self.store.extra_info_metrics(study, &file.file_name)?;
            if let Some(gender) = Value::Object(metrics)
                .pointer("/tumours/0/gender")
                .and_then(Value::as_object)
            {
                merge(&mut record.tumour.sanger.genotype_inference, gender);
            }
        } else if file.has_subtype("Alignment Metrics") && file.file_name.contains("qc_metrics") {
            if let Some(metrics) =
                self.alignment_metrics(study, strategy, file, "total_bases")?
            {
                merge(&mut record.tumour.alignment, &metrics);
            }
        } else if file.has_subtype("OxoG Metrics") {
            record
                .tumour
                .alignment
                .insert("oxoQ_score".to_string(), oxoq_score(file));
        } else if file.has_subtype("Variant Callable Stats") {
            let metrics = self.store.extra_info_metrics(study, &file.file_name)?;
            record.tumour.mutect2.merge_callable(&metrics);
        } else if file.data_type == "Aligned Reads" {
            record
                .tumour
                .alignment
                .insert("file_size".to_string(), file_size_gib(file));
        }
        Ok(())
    }

    fn collect_normal(
        &self,
        analysis: &Analysis,
        index: &MatchedNormalIndex,
        stats: &mut VariantCallingStats,
    ) -> Result<(), VariantCallingError> {
        if !matches!(
            AnalysisKind::from_name(&analysis.analysis_type.name),
            Some(AnalysisKind::QcMetrics) | Some(AnalysisKind::SequencingAlignment)
        ) {
            return Ok(());
        }
        let Some(sample) = analysis.primary_sample().filter(|s| s.is_normal()) else {
            return Ok(());
        };
        let Some(key) = NormalKey::for_analysis(analysis) else {
            return Ok(());
        };
        if !index.is_referenced(&key) {
            return Ok(());
        }
        let keys: Vec<String> = index
            .tumours_for_normal(&key)
            .iter()
            .map(|tumour| record_key(&key.strategy, tumour))
            .collect();

        for file in &analysis.files {
            if file.has_subtype("Alignment Metrics") && file.file_name.contains("qc_metrics") {
                let Some(metrics) = self.alignment_metrics(
                    &analysis.study_id,
                    &key.strategy,
                    file,
                    "mapped_bases_cigar",
                )?
                else {
                    continue;
                };
                for k in &keys {
                    let Some(record) = stats.get_mut(k) else {
                        continue;
                    };
                    record.normal.sample_id = Some(sample.sample_id.clone());
                    record.normal.submitter_sample_id = Some(sample.submitter_sample_id.clone());
                    merge(&mut record.normal.alignment, &metrics);
                    record.flags.normal_aligned = true;
                }
            } else if file.has_subtype("OxoG Metrics") {
                let score = oxoq_score(file);
                for k in &keys {
                    let Some(record) = stats.get_mut(k) else {
                        continue;
                    };
                    record
                        .normal
                        .alignment
                        .insert("oxoQ_score".to_string(), score.clone());
                }
            } else if file.data_type == "Aligned Reads" {
                let size = file_size_gib(file);
                for k in &keys {
                    let Some(record) = stats.get_mut(k) else {
                        continue;
                    };
                    record
                        .normal
                        .alignment
                        .insert("file_size".to_string(), size.clone());
                }
            }
        }
        Ok(())
    }

    /// Alignment summary of a samtools QC file plus derived rates and the
    /// insert size spread from the tarball. `None` for files reporting zero
    /// reads.
    fn alignment_metrics(
        &self,
        study: &str,
        strategy: &str,
        file: &FileEntry,
        coverage_bases: &str,
    ) -> Result<Option<Metrics>, VariantCallingError> {
        let Some(source) = file.metrics() else {
            return Ok(None);
        };
        let total_reads = source.get("total_reads").and_then(Value::as_f64).unwrap_or(0.0);
        if total_reads == 0.0 {
            debug!("Skipping {} with no reads", file.file_name);
            return Ok(None);
        }

        let mut metrics = Metrics::new();
        for field in ALIGNMENT_FIELDS {
            if let Some(value) = source.get(field) {
                metrics.insert(field.to_string(), value.clone());
            }
        }
        let rates = AlignmentRates::from_metrics(source, self.genome_size(strategy), coverage_bases);
        for (key, value) in rates.entries() {
            if let Some(value) = value.and_then(serde_json::Number::from_f64) {
                metrics.insert(key.to_string(), Value::Number(value));
            }
        }
        merge(&mut metrics, &self.store.bamstat_metrics(study, &file.file_name)?);
        Ok(Some(metrics))
    }
}

fn new_record(analysis: &Analysis, sample: &Sample, strategy: &str) -> DonorRecord {
    let mut record = DonorRecord {
        study_id: analysis.study_id.clone(),
        donor_id: sample.donor.donor_id.clone(),
        submitter_donor_id: sample.donor.submitter_donor_id.clone(),
        gender: sample.donor.gender.clone(),
        experimental_strategy: strategy.to_string(),
        ..Default::default()
    };
    record.tumour.sample_id = sample.sample_id.clone();
    record.tumour.submitter_sample_id = sample.submitter_sample_id.clone();
    record
}

/// `oxoQ_score` of an OxoG file; null when absent.
fn oxoq_score(file: &FileEntry) -> Value {
    file.info
        .metrics
        .get("oxoQ_score")
        .cloned()
        .unwrap_or(Value::Null)
}

fn file_size_gib(file: &FileEntry) -> Value {
    serde_json::Number::from_f64(round_to(file.file_size as f64 / GIB, 3))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::super::archive::test_support::write_tgz;
    use super::super::fields;
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample(sample_id: &str, submitter: &str, designation: &str, matched: Option<&str>) -> Value {
        json!({
            "sampleId": sample_id,
            "submitterSampleId": submitter,
            "matchedNormalSubmitterSampleId": matched,
            "specimen": {"specimenId": "SP", "submitterSpecimenId": "sp", "tumourNormalDesignation": designation},
            "donor": {"donorId": "DO1", "submitterDonorId": "donor-1", "gender": "Female"}
        })
    }

    fn analysis(id: &str, kind: &str, workflow: &str, sample: Value, files: Value) -> Analysis {
        serde_json::from_value(json!({
            "analysisId": id,
            "studyId": "TEST-CA",
            "analysisState": "PUBLISHED",
            "analysisType": {"name": kind},
            "experiment": {"experimental_strategy": "WGS"},
            "workflow": {"workflow_short_name": workflow},
            "samples": [sample],
            "files": files
        }))
        .unwrap()
    }

    fn alignment_file(name: &str, total_reads: u64) -> Value {
        json!({
            "fileName": name,
            "dataType": "Sample QC",
            "info": {
                "data_subtypes": ["Alignment Metrics"],
                "metrics": {
                    "error_rate": 0.004,
                    "properly_paired_reads": 900,
                    "total_reads": total_reads,
                    "average_insert_size": 350,
                    "average_length": 100,
                    "pairs_on_different_chromosomes": 25,
                    "paired_reads": 1000,
                    "duplicated_bases": 5000,
                    "total_bases": 100000,
                    "mapped_bases_cigar": 61765396640u64
                }
            }
        })
    }

    fn tumour() -> Value {
        sample("SA_T1", "t1", "Tumour", Some("n1"))
    }

    fn normal() -> Value {
        sample("SA_N1", "n1", "Normal", None)
    }

    fn dump() -> Vec<Analysis> {
        vec![
            analysis("A1", "variant_calling", "sanger-wgs", tumour(), json!([
                {"fileName": "t1.sanger.contamination.tgz", "info": {"data_subtypes": ["Cross Sample Contamination"]}},
                {"fileName": "n1.sanger.contamination.tgz", "info": {"data_subtypes": ["Cross Sample Contamination"]}},
                {"fileName": "t1.ascat.tgz", "info": {"data_subtypes": ["Ploidy", "Tumour Purity"]}}
            ])),
            analysis("A2", "variant_calling", "gatk-mutect2", tumour(), json!([
                {"fileName": "t1.gatk-mutect2.contamination.tgz", "info": {"data_subtypes": ["Cross Sample Contamination"]}},
                {"fileName": "t1.gatk-mutect2.callable.tgz", "info": {"data_subtypes": ["Variant Callable Stats"]}}
            ])),
            analysis("A7", "variant_calling", "sanger-wgs", tumour(), json!([
                {"fileName": "t1.genotype.tgz", "info": {"data_subtypes": ["Genotyping Stats"]}}
            ])),
            analysis("A3", "sequencing_alignment", "dna-seq-alignment", tumour(), json!([
                {"fileName": "t1.cram", "dataType": "Aligned Reads", "fileSize": 32212254720u64}
            ])),
            analysis("A4", "qc_metrics", "dna-seq-alignment", tumour(), json!([
                alignment_file("t1.qc_metrics.tgz", 1000),
                {"fileName": "t1.oxog.tgz", "info": {"data_subtypes": ["OxoG Metrics"], "metrics": {"oxoQ_score": 41.2}}}
            ])),
            analysis("A5", "qc_metrics", "dna-seq-alignment", normal(), json!([
                alignment_file("n1.qc_metrics.tgz", 2000),
                {"fileName": "n1.oxog.tgz", "info": {"data_subtypes": ["OxoG Metrics"], "metrics": {}}}
            ])),
            analysis("A6", "somatic_mutation", "other", tumour(), json!([
                {"fileName": "x.cram", "dataType": "Aligned Reads", "fileSize": 1}
            ])),
        ]
    }

    #[test]
    fn test_collect_tumour_and_normal() {
        let dir = tempdir().unwrap();
        write_tgz(
            &dir.path().join("TEST-CA/t1.sanger.contamination.tgz"),
            &[("t1.extra_info.json", r#"{"metrics": {"sample_id": "SA_T1", "contamination": 0.01, "avg_depth": 30}}"#)],
        );
        write_tgz(
            &dir.path().join("TEST-CA/n1.sanger.contamination.tgz"),
            &[("n1.extra_info.json", r#"{"metrics": {"sample_id": "SA_N1", "contamination": 0.02}}"#)],
        );
        write_tgz(
            &dir.path().join("TEST-CA/t1.ascat.tgz"),
            &[("t1.extra_info.json", r#"{"metrics": {"Ploidy": 2.1, "rho": 0.6}}"#)],
        );
        write_tgz(
            &dir.path().join("TEST-CA/t1.gatk-mutect2.contamination.tgz"),
            &[("t1.extra_info.json", r#"{"metrics": {"sample_id": "SA_T1", "contamination": 0.03}}"#)],
        );
        write_tgz(
            &dir.path().join("TEST-CA/t1.gatk-mutect2.callable.tgz"),
            &[("t1.extra_info.json", r#"{"metrics": {"callable": 2800000000}}"#)],
        );
        write_tgz(
            &dir.path().join("TEST-CA/t1.genotype.tgz"),
            &[(
                "t1.extra_info.json",
                r#"{"metrics": {"tumours": [{"gender": {"frac_match_gender": 0.98, "gender": "XX"}}]}}"#,
            )],
        );
        write_tgz(
            &dir.path().join("TEST-CA/t1.qc_metrics.tgz"),
            &[("t1.aln.cram.bamstat", "SN\tinsert size standard deviation:\t55.5\n")],
        );
        let store = QcArchiveStore::new(Some(dir.path().to_path_buf()));
        let config = ReportConfig::default();

        let stats = StatsCollector::new(&store, &config).collect(&dump()).unwrap();
        assert_eq!(stats.len(), 1);
        let record = &stats["WGS_SA_T1"];

        assert_eq!(record.submitter_donor_id, "donor-1");
        assert_eq!(record.gender.as_deref(), Some("Female"));
        assert!(record.flags.sanger_called);
        assert!(record.flags.mutect2_called);
        assert!(record.flags.tumour_aligned);
        assert!(record.flags.normal_aligned);
        assert!(!record.flags.open_filter);

        assert_eq!(record.tumour.sanger.contamination["avg_depth"], json!(30));
        assert_eq!(record.normal.sanger.contamination["contamination"], json!(0.02));
        assert_eq!(record.tumour.sanger.ascat_metrics["rho"], json!(0.6));

        let tumour = &record.tumour.alignment;
        assert_eq!(tumour["file_size"], json!(30.0));
        assert_eq!(tumour["oxoQ_score"], json!(41.2));
        assert_eq!(tumour["duplicate_rate"], json!(0.05));
        assert_eq!(tumour["pairs_on_different_chromosomes_rate"], json!(0.05));
        assert_eq!(tumour["insert_size_sd"], json!(55.5));

        let normal = &record.normal.alignment;
        assert_eq!(record.normal.sample_id.as_deref(), Some("SA_N1"));
        assert_eq!(normal["total_reads"], json!(2000));
        assert_eq!(normal["estimated_coverage"], json!(20.0));
        assert_eq!(normal["oxoQ_score"], Value::Null);

        assert_eq!(record.tumour.mutect2.contamination["contamination"], json!(0.03));
        assert!(record.normal.mutect2.contamination.is_empty());
        assert_eq!(record.tumour.sanger.genotype_inference["gender"], json!("XX"));

        let row = fields::row(&serde_json::to_value(record).unwrap());
        let column = |name: &str| {
            let idx = fields::header().iter().position(|c| *c == name).unwrap();
            row[idx].clone()
        };
        assert_eq!(column("geno_infer_gender_match"), "0.98");
        assert_eq!(column("tumour_mutect2_contamination"), "0.03");
        assert_eq!(column("mutect2_callable"), "2800000000");
        assert_eq!(column("normal_sanger_contamination"), "0.02");
    }

    #[test]
    fn test_zero_read_files_and_unpublished_are_skipped() {
        let mut analyses = vec![analysis(
            "A1",
            "qc_metrics",
            "dna-seq-alignment",
            tumour(),
            json!([alignment_file("t1.qc_metrics.tgz", 0)]),
        )];
        let mut hidden = analysis("A2", "variant_calling", "sanger-wgs", tumour(), json!([]));
        hidden.analysis_state = Some("SUPPRESSED".to_string());
        analyses.push(hidden);

        let store = QcArchiveStore::default();
        let config = ReportConfig::default();
        let stats = StatsCollector::new(&store, &config).collect(&analyses).unwrap();

        let record = &stats["WGS_SA_T1"];
        assert!(record.tumour.alignment.is_empty());
        assert!(!record.flags.sanger_called);
    }

    #[test]
    fn test_open_filter_counting() {
        let analyses: Vec<Analysis> = (0..4)
            .map(|i| {
                analysis(
                    &format!("A{}", i),
                    "variant_processing",
                    "open-access-filtering",
                    tumour(),
                    json!([]),
                )
            })
            .collect();
        let store = QcArchiveStore::default();
        let config = ReportConfig::default();
        let stats = StatsCollector::new(&store, &config).collect(&analyses).unwrap();

        let record = &stats["WGS_SA_T1"];
        assert_eq!(record.tumour.open_filter_count, 4);
        assert!(record.flags.open_filter);
    }
}
