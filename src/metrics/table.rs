use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

pub const SAMPLE_COLUMN: &str = "sampleId";
pub const PIPELINE_COLUMN: &str = "PIPELINE";

/// A single table value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Numbers and strings map directly, booleans become 0/1; arrays, objects
    /// and nulls have no cell representation.
    pub fn from_json(value: &Value) -> Option<Cell> {
        match value {
            Value::Number(n) => n.as_f64().map(Cell::Number),
            Value::String(s) => Some(Cell::Text(s.clone())),
            Value::Bool(b) => Some(Cell::Number(if *b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) if !n.is_finite() => Ok(()),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Sequencing pipeline a metrics file was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pipeline {
    #[serde(rename = "STAR")]
    Star,
    #[serde(rename = "HISAT2")]
    Hisat2,
    #[serde(rename = "BWA-MEM")]
    BwaMem,
}

impl Pipeline {
    /// Aligner inferred from the file name; DNA files carry no aligner tag.
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_ascii_lowercase();
        if lower.contains("star") {
            Pipeline::Star
        } else if lower.contains("hisat2") {
            Pipeline::Hisat2
        } else {
            Pipeline::BwaMem
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::Star => "STAR",
            Pipeline::Hisat2 => "HISAT2",
            Pipeline::BwaMem => "BWA-MEM",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Row = IndexMap<String, Cell>;

/// Row-keyed table of metrics; columns keep first-insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricTable {
    index_name: String,
    columns: IndexSet<String>,
    rows: IndexMap<String, Row>,
}

impl MetricTable {
    pub fn new(index_name: &str) -> Self {
        MetricTable {
            index_name: index_name.to_string(),
            ..Default::default()
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &Row)> {
        self.rows.iter().map(|(id, row)| (id.as_str(), row))
    }

    /// Make sure `column` is reported even if no row ends up with a value.
    pub fn add_column(&mut self, column: &str) {
        if !self.columns.contains(column) {
            self.columns.insert(column.to_string());
        }
    }

    /// Set a cell, creating the row and column as needed. Existing values are
    /// overwritten.
    pub fn set(&mut self, row_id: &str, column: &str, cell: Cell) {
        self.add_column(column);
        self.rows
            .entry(row_id.to_string())
            .or_default()
            .insert(column.to_string(), cell);
    }

    pub fn set_number(&mut self, row_id: &str, column: &str, value: f64) {
        self.set(row_id, column, Cell::Number(value));
    }

    pub fn set_text(&mut self, row_id: &str, column: &str, value: &str) {
        self.set(row_id, column, Cell::Text(value.to_string()));
    }

    pub fn get(&self, row_id: &str, column: &str) -> Option<&Cell> {
        self.rows.get(row_id).and_then(|row| row.get(column))
    }

    pub fn number(&self, row_id: &str, column: &str) -> Option<f64> {
        self.get(row_id, column).and_then(Cell::as_f64)
    }

    pub fn text(&self, row_id: &str, column: &str) -> Option<&str> {
        self.get(row_id, column).and_then(Cell::as_str)
    }

    /// Compute `column` for every row from the row's existing cells. Rows
    /// for which `f` yields `None` are left without a value.
    pub fn derive<F>(&mut self, column: &str, f: F)
    where
        F: Fn(&Row) -> Option<f64>,
    {
        self.add_column(column);
        for row in self.rows.values_mut() {
            match f(row) {
                Some(value) => {
                    row.insert(column.to_string(), Cell::Number(value));
                }
                None => {
                    row.shift_remove(column);
                }
            }
        }
    }

    /// Rows produced under `pipeline`.
    pub fn rows_for_pipeline(&self, pipeline: Pipeline) -> impl Iterator<Item = (&str, &Row)> {
        self.rows().filter(move |(_, row)| {
            row.get(PIPELINE_COLUMN).and_then(Cell::as_str) == Some(pipeline.as_str())
        })
    }
}

/// Numeric value of `column` in `row`.
pub fn row_number(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(Cell::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pipeline_from_file_name() {
        assert_eq!(
            Pipeline::from_file_name("TEST.SA1.rna-seq.star.bam.qc.tgz"),
            Pipeline::Star
        );
        assert_eq!(Pipeline::from_file_name("x.HISAT2.dup.tgz"), Pipeline::Hisat2);
        assert_eq!(Pipeline::from_file_name("x.aln.cram.bamstat"), Pipeline::BwaMem);
    }

    #[test]
    fn test_cell_from_json() {
        assert_eq!(Cell::from_json(&json!(3)), Some(Cell::Number(3.0)));
        assert_eq!(Cell::from_json(&json!("M")), Some(Cell::Text("M".into())));
        assert_eq!(Cell::from_json(&json!(true)), Some(Cell::Number(1.0)));
        assert_eq!(Cell::from_json(&json!(null)), None);
        assert_eq!(Cell::from_json(&json!([1, 2])), None);
    }

    #[test]
    fn test_set_overwrites_and_orders_columns() {
        let mut table = MetricTable::new("analysisId");
        table.set_text("A1", SAMPLE_COLUMN, "SA1");
        table.set_number("A1", "x", 1.0);
        table.set_number("A2", "y", 2.0);
        table.set_number("A1", "x", 5.0);

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().collect::<Vec<_>>(), vec![SAMPLE_COLUMN, "x", "y"]);
        assert_eq!(table.number("A1", "x"), Some(5.0));
        assert_eq!(table.number("A2", "x"), None);
        assert_eq!(table.text("A1", SAMPLE_COLUMN), Some("SA1"));
    }

    #[test]
    fn test_derive_skips_rows_without_value() {
        let mut table = MetricTable::new("analysisId");
        table.set_number("A1", "a", 2.0);
        table.set_number("A2", "a", 0.0);
        table.derive("inv", |row| {
            row_number(row, "a").and_then(|a| crate::stats::ratio(1.0, a))
        });

        assert_eq!(table.number("A1", "inv"), Some(0.5));
        assert_eq!(table.get("A2", "inv"), None);
        assert!(table.columns().any(|c| c == "inv"));
    }

    #[test]
    fn test_rows_for_pipeline() {
        let mut table = MetricTable::new("analysisId");
        table.set_text("A1", PIPELINE_COLUMN, "STAR");
        table.set_text("A2", PIPELINE_COLUMN, "HISAT2");
        table.set_text("A3", PIPELINE_COLUMN, "STAR");

        let ids: Vec<&str> = table
            .rows_for_pipeline(Pipeline::Star)
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["A1", "A3"]);
    }
}
