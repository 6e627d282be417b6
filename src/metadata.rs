//! Sample metadata flattening.
//!
//! Turns the nested analysis documents into a row-per-file identifier table
//! and resolves tumour samples to their matched normals.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::song::{Analysis, ExperimentalStrategy};

/// One row of the file/identifier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_data_type: String,
    pub object_id: String,
    pub submitter_sample_id: String,
    pub submitter_specimen_id: String,
    pub submitter_donor_id: String,
    pub donor_id: String,
    pub specimen_id: String,
    pub sample_id: String,
    pub analysis_id: String,
    pub run_id: String,
    /// Position of the analysis in the source list; not reported
    #[serde(skip)]
    pub analysis_index: usize,
}

impl FileRecord {
    pub const COLUMNS: [&'static str; 10] = [
        "fileDataType",
        "objectId",
        "submitterSampleId",
        "submitterSpecimenId",
        "submitterDonorId",
        "donorId",
        "specimenId",
        "sampleId",
        "analysisId",
        "runId",
    ];
}

/// Flatten every file of every `strategy` analysis into a [`FileRecord`].
pub fn build_file_table(analyses: &[Analysis], strategy: ExperimentalStrategy) -> Vec<FileRecord> {
    info!("Aggregating Files and IDs...");
    let mut rows = Vec::new();
    for (idx, analysis) in analyses.iter().enumerate() {
        if analysis.strategy() != Some(strategy) {
            continue;
        }
        let Some(sample) = analysis.primary_sample() else {
            warn!("Analysis {} has no samples, skipping", analysis.analysis_id);
            continue;
        };
        let run_id = analysis.workflow.run_id.clone().unwrap_or_default();

        for file in &analysis.files {
            rows.push(FileRecord {
                file_data_type: file.data_type.clone(),
                object_id: file.object_id.clone(),
                submitter_sample_id: sample.submitter_sample_id.clone(),
                submitter_specimen_id: sample.specimen.submitter_specimen_id.clone(),
                submitter_donor_id: sample.donor.submitter_donor_id.clone(),
                donor_id: sample.donor.donor_id.clone(),
                specimen_id: sample.specimen.specimen_id.clone(),
                sample_id: sample.sample_id.clone(),
                analysis_id: analysis.analysis_id.clone(),
                run_id: run_id.clone(),
                analysis_index: idx,
            });
        }
    }
    info!("Aggregating Files and IDs...Complete ({} files)", rows.len());
    rows
}

/// Identifies a normal sample across a study: `(studyId, strategy, submitterSampleId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalKey {
    pub study_id: String,
    pub strategy: String,
    pub submitter_sample_id: String,
}

impl NormalKey {
    pub fn new(study_id: &str, strategy: &str, submitter_sample_id: &str) -> Self {
        NormalKey {
            study_id: study_id.to_string(),
            strategy: strategy.to_string(),
            submitter_sample_id: submitter_sample_id.to_string(),
        }
    }

    /// Key of the normal sample the first sample of `analysis` is matched to
    /// (tumours) or identifies (normals).
    pub fn for_analysis(analysis: &Analysis) -> Option<Self> {
        let sample = analysis.primary_sample()?;
        let strategy = analysis.strategy_name()?;
        let submitter = if sample.is_tumour() {
            sample.matched_normal_submitter_sample_id.as_deref()?
        } else if sample.is_normal() {
            sample.submitter_sample_id.as_str()
        } else {
            return None;
        };
        Some(NormalKey::new(&analysis.study_id, strategy, submitter))
    }
}

/// Tumour → matched-normal linkage resolved by submitter sample id.
#[derive(Debug, Default)]
pub struct MatchedNormalIndex {
    /// key -> tumour sampleIds referencing it, in first-seen order
    key_to_tumours: HashMap<NormalKey, Vec<String>>,
    /// tumour sampleId -> key of its matched normal
    tumour_to_key: HashMap<String, NormalKey>,
    /// key -> normal sampleId
    key_to_normal: HashMap<NormalKey, String>,
}

impl MatchedNormalIndex {
    pub fn build(analyses: &[Analysis]) -> Self {
        let mut index = MatchedNormalIndex::default();
        for analysis in analyses {
            let (Some(sample), Some(key)) =
                (analysis.primary_sample(), NormalKey::for_analysis(analysis))
            else {
                continue;
            };
            if sample.is_tumour() {
                index
                    .tumour_to_key
                    .entry(sample.sample_id.clone())
                    .or_insert_with(|| key.clone());
                let tumours = index.key_to_tumours.entry(key).or_default();
                if !tumours.contains(&sample.sample_id) {
                    tumours.push(sample.sample_id.clone());
                }
            } else {
                index
                    .key_to_normal
                    .entry(key)
                    .or_insert_with(|| sample.sample_id.clone());
            }
        }
        index
    }

    /// sampleId of the normal matched to `tumour_sample_id`, if it was seen.
    pub fn normal_for_tumour(&self, tumour_sample_id: &str) -> Option<&str> {
        self.tumour_to_key
            .get(tumour_sample_id)
            .and_then(|key| self.key_to_normal.get(key))
            .map(String::as_str)
    }

    pub fn tumours_for_normal(&self, key: &NormalKey) -> &[String] {
        self.key_to_tumours
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_referenced(&self, key: &NormalKey) -> bool {
        self.key_to_tumours.contains_key(key)
    }
}
