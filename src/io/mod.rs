//! TSV output.
//!
//! All report tables are tab separated with a single header row. Missing
//! values are written as empty fields.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use thiserror::Error;

use crate::metadata::FileRecord;
use crate::metrics::MetricTable;
use crate::utils::ParallelError;
use crate::visualization::VisualizationError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Plot error: {0}")]
    PlotError(#[from] VisualizationError),

    #[error("Parallel error: {0}")]
    ParallelError(#[from] ParallelError),
}

type TsvWriter = csv::Writer<BufWriter<File>>;

fn tsv_writer(path: &Path) -> Result<TsvWriter, ReportError> {
    let file = File::create(path)?;
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(BufWriter::new(file)))
}

/// Writes a metric table: the index column first, then every column in
/// insertion order.
pub fn write_metric_table(table: &MetricTable, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let mut writer = tsv_writer(path.as_ref())?;

    let columns: Vec<&str> = table.columns().collect();
    let mut header = Vec::with_capacity(columns.len() + 1);
    header.push(table.index_name());
    header.extend(columns.iter().copied());
    writer.write_record(&header)?;

    for (row_id, row) in table.rows() {
        let mut record = Vec::with_capacity(header.len());
        record.push(row_id.to_string());
        record.extend(
            columns
                .iter()
                .map(|c| row.get(*c).map(|cell| cell.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the per-file identifier table.
pub fn write_file_table(rows: &[FileRecord], path: impl AsRef<Path>) -> Result<(), ReportError> {
    let mut writer = tsv_writer(path.as_ref())?;
    if rows.is_empty() {
        writer.write_record(FileRecord::COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes pre-formatted rows under `header`.
pub fn write_rows<I>(header: &[&str], rows: I, path: impl AsRef<Path>) -> Result<(), ReportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = tsv_writer(path.as_ref())?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
