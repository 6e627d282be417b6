//! Report configuration.
//!
//! Every knob has a default matching the standard ARGO reports; a JSON file
//! passed with `--config` may override any subset of them.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::song::ExperimentalStrategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rendered plot width in pixels
    pub plot_width: u32,
    /// Rendered plot height in pixels
    pub plot_height: u32,
    /// Percentiles drawn as dashed reference lines on sample-level plots
    pub sample_percentiles: Vec<f64>,
    /// Lower and upper percentile of the shaded band on donor-level plots
    pub band_percentiles: (f64, f64),
    /// Reference genome size used for WGS coverage estimates
    pub wgs_genome_size: u64,
    /// Target region size used for WXS coverage estimates
    pub wxs_genome_size: u64,
    /// HTTP timeout when calling SONG
    pub timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            plot_width: 1000,
            plot_height: 600,
            sample_percentiles: vec![25.0, 5.0, 75.0],
            band_percentiles: (25.0, 75.0),
            wgs_genome_size: 3_088_269_832,
            wxs_genome_size: 148_544_048,
            timeout_secs: 120,
        }
    }
}

impl ReportConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let config: ReportConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Size used as denominator for coverage estimates; none for RNA-Seq.
    pub fn genome_size(&self, strategy: ExperimentalStrategy) -> Option<u64> {
        match strategy {
            ExperimentalStrategy::Wgs => Some(self.wgs_genome_size),
            ExperimentalStrategy::Wxs => Some(self.wxs_genome_size),
            ExperimentalStrategy::RnaSeq => None,
        }
    }
}
