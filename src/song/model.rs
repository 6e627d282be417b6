//! SONG analysis documents.
//!
//! Only the fields the reports read are modelled. Everything defaults when
//! absent so that partially populated analyses still deserialize; callers
//! check for the pieces they need.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Publication state used when querying a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPERCASE")]
pub enum AnalysisState {
    Published,
    Suppressed,
    Unpublished,
}

impl AnalysisState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisState::Published => "PUBLISHED",
            AnalysisState::Suppressed => "SUPPRESSED",
            AnalysisState::Unpublished => "UNPUBLISHED",
        }
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequencing experiment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum ExperimentalStrategy {
    #[serde(rename = "RNA-Seq")]
    #[value(name = "RNA-Seq")]
    RnaSeq,
    #[serde(rename = "WGS")]
    #[value(name = "WGS")]
    Wgs,
    #[serde(rename = "WXS")]
    #[value(name = "WXS")]
    Wxs,
}

impl ExperimentalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperimentalStrategy::RnaSeq => "RNA-Seq",
            ExperimentalStrategy::Wgs => "WGS",
            ExperimentalStrategy::Wxs => "WXS",
        }
    }
}

impl fmt::Display for ExperimentalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentalStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RNA-Seq" => Ok(ExperimentalStrategy::RnaSeq),
            "WGS" => Ok(ExperimentalStrategy::Wgs),
            "WXS" => Ok(ExperimentalStrategy::Wxs),
            other => Err(format!("unknown experimental strategy: {}", other)),
        }
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single analysis as returned by `/studies/{study}/analysis`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analysis {
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub study_id: String,
    pub analysis_state: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_type: AnalysisType,
    #[serde(deserialize_with = "null_as_default")]
    pub experiment: Experiment,
    #[serde(deserialize_with = "null_as_default")]
    pub workflow: Workflow,
    #[serde(deserialize_with = "null_as_default")]
    pub samples: Vec<Sample>,
    #[serde(deserialize_with = "null_as_default")]
    pub files: Vec<FileEntry>,
}

impl Analysis {
    /// The first sample; every report keys off it.
    pub fn primary_sample(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn is_published(&self) -> bool {
        self.analysis_state.as_deref() == Some(AnalysisState::Published.as_str())
    }

    /// `experimental_strategy`, falling back to `library_strategy`.
    pub fn strategy_name(&self) -> Option<&str> {
        self.experiment
            .experimental_strategy
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.experiment.library_strategy.as_deref())
    }

    pub fn strategy(&self) -> Option<ExperimentalStrategy> {
        self.strategy_name().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisType {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experiment {
    pub experimental_strategy: Option<String>,
    pub library_strategy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Workflow {
    pub run_id: Option<String>,
    pub workflow_short_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sample {
    #[serde(deserialize_with = "null_as_default")]
    pub sample_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub submitter_sample_id: String,
    pub matched_normal_submitter_sample_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub specimen: Specimen,
    #[serde(deserialize_with = "null_as_default")]
    pub donor: Donor,
}

impl Sample {
    pub fn is_tumour(&self) -> bool {
        self.specimen.tumour_normal_designation.as_deref() == Some("Tumour")
    }

    pub fn is_normal(&self) -> bool {
        self.specimen.tumour_normal_designation.as_deref() == Some("Normal")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Specimen {
    #[serde(deserialize_with = "null_as_default")]
    pub specimen_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub submitter_specimen_id: String,
    pub tumour_normal_designation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Donor {
    #[serde(deserialize_with = "null_as_default")]
    pub donor_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub submitter_donor_id: String,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub object_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub study_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub file_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub file_size: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub data_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub info: FileInfo,
}

impl FileEntry {
    /// The tool that produced this file, i.e. `info.analysis_tools[0]`.
    pub fn primary_tool(&self) -> Option<&str> {
        self.info.analysis_tools.first().map(String::as_str)
    }

    pub fn has_subtype(&self, subtype: &str) -> bool {
        self.info.data_subtypes.iter().any(|s| s == subtype)
    }

    /// The `info.metrics` object, if it is a non-empty object.
    pub fn metrics(&self) -> Option<&serde_json::Map<String, Value>> {
        self.info.metrics.as_object().filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_tools: Vec<String>,
    pub data_category: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub data_subtypes: Vec<String>,
    pub metrics: Value,
}
