//! Chart descriptions.
//!
//! A [`Figure`] holds everything needed to draw a comparison chart: the
//! already sorted points, the percentile reference lines and bands. It is
//! written out as JSON next to the rendered SVG so charts can be re-drawn or
//! restyled without going back to SONG.

use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::metrics::{MetricTable, Pipeline, SAMPLE_COLUMN};
use crate::stats::percentile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FigureKind {
    /// One point per sample, one panel per pipeline
    SampleLevel,
    /// Tumour vs matched normal, one point per donor
    DonorLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub kind: FigureKind,
    pub width: u32,
    pub height: u32,
    pub x_title: String,
    pub panels: Vec<Panel>,
}

/// One subplot. All series share `labels` as categorical x positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub reference_lines: Vec<ReferenceLine>,
    pub bands: Vec<Band>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Series {
    /// `(x index, value)` of every present point.
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
    }
}

/// Horizontal dashed line across the whole panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub label: String,
    pub value: f64,
    /// Index of the series the line summarises
    pub series: usize,
}

/// Shaded horizontal band across the whole panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
    pub series: usize,
}

impl Panel {
    /// Smallest and largest y value drawn in the panel.
    pub fn y_extent(&self) -> Option<(f64, f64)> {
        let values = self
            .series
            .iter()
            .flat_map(|s| s.points().map(|(_, v)| v))
            .chain(self.reference_lines.iter().map(|l| l.value))
            .chain(self.bands.iter().flat_map(|b| [b.lower, b.upper]));
        values.fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

fn percentile_label(q: f64) -> String {
    format!("p{}", q)
}

/// Sample-level comparison of `metric` across `pipelines`.
///
/// Each panel holds the samples of one pipeline sorted ascending by the
/// metric, with dashed lines at the configured percentiles.
pub fn sample_figure(
    table: &MetricTable,
    pipelines: &[Pipeline],
    metric: &str,
    title: &str,
    config: &ReportConfig,
) -> Figure {
    let panels = pipelines
        .iter()
        .map(|pipeline| {
            let mut points: Vec<(String, f64)> = table
                .rows_for_pipeline(*pipeline)
                .filter_map(|(_, row)| {
                    let value = row.get(metric)?.as_f64()?;
                    let sample = row
                        .get(SAMPLE_COLUMN)
                        .and_then(|c| c.as_str())
                        .unwrap_or_default();
                    Some((sample.to_string(), value))
                })
                .collect();
            points.sort_by(|a, b| a.1.total_cmp(&b.1));

            let mut panel = Panel {
                title: pipeline.to_string(),
                ..Default::default()
            };
            if points.is_empty() {
                return panel;
            }

            let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
            panel.reference_lines = config
                .sample_percentiles
                .iter()
                .filter_map(|q| {
                    percentile(&values, *q).map(|value| ReferenceLine {
                        label: percentile_label(*q),
                        value,
                        series: 0,
                    })
                })
                .collect();
            panel.labels = points.iter().map(|(s, _)| s.clone()).collect();
            panel.series = vec![Series {
                name: metric.to_string(),
                values: values.into_iter().map(Some).collect(),
            }];
            panel
        })
        .collect();

    Figure {
        title: title.to_string(),
        kind: FigureKind::SampleLevel,
        width: config.plot_width,
        height: config.plot_height,
        x_title: SAMPLE_COLUMN.to_string(),
        panels,
    }
}

/// A donor's tumour value and the value of its matched normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorPair {
    pub donor: String,
    pub tumour: Option<f64>,
    pub normal: Option<f64>,
}

/// Donor-level tumour vs matched-normal trend.
///
/// Donors are ordered by tumour value; donors with only a normal value go
/// last. Each series gets a shaded band between the configured percentiles
/// and a dashed median line.
pub fn donor_figure(pairs: &[DonorPair], metric: &str, title: &str, config: &ReportConfig) -> Figure {
    let mut pairs: Vec<&DonorPair> = pairs
        .iter()
        .filter(|p| p.tumour.is_some() || p.normal.is_some())
        .collect();
    pairs.sort_by(|a, b| match (a.tumour, b.tumour) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.donor.cmp(&b.donor),
    });

    let mut panel = Panel {
        title: metric.to_string(),
        labels: pairs.iter().map(|p| p.donor.clone()).collect(),
        series: vec![
            Series {
                name: "Tumour".to_string(),
                values: pairs.iter().map(|p| p.tumour).collect(),
            },
            Series {
                name: "Normal".to_string(),
                values: pairs.iter().map(|p| p.normal).collect(),
            },
        ],
        ..Default::default()
    };

    let (lo_q, hi_q) = config.band_percentiles;
    for (idx, series) in panel.series.iter().enumerate() {
        let values: Vec<f64> = series.points().map(|(_, v)| v).collect();
        if let (Some(lower), Some(upper)) = (percentile(&values, lo_q), percentile(&values, hi_q)) {
            panel.bands.push(Band {
                lower,
                upper,
                series: idx,
            });
        }
        if let Some(median) = percentile(&values, 50.0) {
            panel.reference_lines.push(ReferenceLine {
                label: format!("{} median", series.name),
                value: median,
                series: idx,
            });
        }
    }

    Figure {
        title: title.to_string(),
        kind: FigureKind::DonorLevel,
        width: config.plot_width,
        height: config.plot_height,
        x_title: "donor".to_string(),
        panels: vec![panel],
    }
}

/// `fig.{group}.{index}.{title}` with spaces replaced by underscores.
pub fn figure_name(group: usize, index: usize, title: &str) -> String {
    format!("fig.{}.{}.{}", group, index, title.replace(' ', "_"))
}
