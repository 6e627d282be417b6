//! Per tumour sample summary records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metrics = Map<String, Value>;

/// Merge `metrics` into `target`, overwriting existing keys.
pub fn merge(target: &mut Metrics, metrics: &Metrics) {
    for (key, value) in metrics {
        target.insert(key.clone(), value.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flags {
    pub normal_aligned: bool,
    pub tumour_aligned: bool,
    pub sanger_called: bool,
    pub mutect2_called: bool,
    pub open_filter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contamination {
    pub contamination: Metrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<String>,
    #[serde(rename = "submitterSampleId", skip_serializing_if = "Option::is_none")]
    pub submitter_sample_id: Option<String>,
    pub alignment: Metrics,
    pub sanger: Contamination,
    pub mutect2: Contamination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SangerMetrics {
    pub contamination: Metrics,
    pub ascat_metrics: Metrics,
    pub genotype_inference: Metrics,
}

/// Mutect2 results: contamination plus whatever the callable stats report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mutect2Metrics {
    pub contamination: Metrics,
    #[serde(flatten)]
    pub callable: Metrics,
}

impl Mutect2Metrics {
    /// Merge callable stats; a `contamination` object is folded into
    /// [`Mutect2Metrics::contamination`].
    pub fn merge_callable(&mut self, metrics: &Metrics) {
        for (key, value) in metrics {
            match (key.as_str(), value) {
                ("contamination", Value::Object(inner)) => merge(&mut self.contamination, inner),
                ("contamination", _) => {}
                _ => {
                    self.callable.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TumourSection {
    pub sample_id: String,
    #[serde(rename = "submitterSampleId")]
    pub submitter_sample_id: String,
    pub alignment: Metrics,
    pub sanger: SangerMetrics,
    pub mutect2: Mutect2Metrics,
    pub open_filter_count: u32,
}

/// Number of open-filter runs after which a tumour counts as filtered.
pub const OPEN_FILTER_RUNS: u32 = 4;

/// Everything known about one tumour sample and its matched normal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonorRecord {
    pub study_id: String,
    pub donor_id: String,
    pub submitter_donor_id: String,
    pub gender: Option<String>,
    pub experimental_strategy: String,
    pub flags: Flags,
    pub normal: NormalSection,
    pub tumour: TumourSection,
}

impl DonorRecord {
    /// Label used on donor-level plots.
    pub fn donor_label(&self) -> &str {
        if self.submitter_donor_id.is_empty() {
            &self.donor_id
        } else {
            &self.submitter_donor_id
        }
    }

    pub fn count_open_filter(&mut self) {
        self.tumour.open_filter_count += 1;
        if self.tumour.open_filter_count == OPEN_FILTER_RUNS {
            self.flags.open_filter = true;
        }
    }
}
