use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use reqwest::{blocking::Client, header};
use thiserror::Error;

use super::model::{Analysis, AnalysisState};

#[derive(Error, Debug)]
pub enum SongError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Query response failed, return status_code :{0}")]
    Status(u16),

    #[error("Malformed analysis on line {line}: {source}")]
    DumpError {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Blocking client for the SONG metadata service.
pub struct SongClient {
    /// HTTP client
    client: Client,

    /// Base URL of the SONG instance, without trailing slash
    base_url: String,
}

impl SongClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SongError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("rdpc-qc-metrics/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(SongClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn analyses_url(&self, study: &str, state: AnalysisState) -> String {
        format!(
            "{}/studies/{}/analysis?analysisState={}",
            self.base_url, study, state
        )
    }

    /// Fetch every analysis of `study` in `state`. Any non-success status is
    /// an error; there is no retry.
    pub fn fetch_analyses(
        &self,
        study: &str,
        state: AnalysisState,
    ) -> Result<Vec<Analysis>, SongError> {
        info!("Calling Song API...");
        let url = self.analyses_url(study, state);
        debug!("GET {}", url);

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(SongError::Status(response.status().as_u16()));
        }

        let analyses: Vec<Analysis> = response.json()?;
        info!("Calling Song API...Complete ({} analyses)", analyses.len());
        Ok(analyses)
    }
}

/// Read a SONG dump with one analysis JSON document per line.
pub fn load_dump(path: impl AsRef<Path>) -> Result<Vec<Analysis>, SongError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut analyses = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let analysis = serde_json::from_str(&line).map_err(|source| SongError::DumpError {
            line: idx + 1,
            source,
        })?;
        analyses.push(analysis);
    }
    info!(
        "Loaded {} analyses from {}",
        analyses.len(),
        path.as_ref().display()
    );
    Ok(analyses)
}
