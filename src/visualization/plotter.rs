use std::io;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use super::figure::{Figure, Panel};

#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Plot error: {0}")]
    PlotError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl<E> From<DrawingAreaErrorKind<E>> for VisualizationError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        VisualizationError::PlotError(err.to_string())
    }
}

/// Series colours, tumour/primary first.
const SERIES_COLORS: [RGBColor; 2] = [RGBColor(31, 119, 180), RGBColor(214, 39, 40)];

fn series_color(idx: usize) -> RGBColor {
    SERIES_COLORS[idx % SERIES_COLORS.len()]
}

/// Render `figure` as an SVG at `path`.
pub fn render_svg(figure: &Figure, path: &Path) -> Result<(), VisualizationError> {
    let root = SVGBackend::new(path, (figure.width, figure.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(&figure.title, ("sans-serif", 20))?;

    if figure.panels.is_empty() {
        root.present()?;
        return Ok(());
    }

    let areas = root.split_evenly((1, figure.panels.len()));
    for (panel, area) in figure.panels.iter().zip(areas.iter()) {
        draw_panel(panel, area, &figure.x_title)?;
    }

    root.present()?;
    Ok(())
}

fn label_at(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// x extent of the reference lines: first sample to last, or the full
/// axis when there is a single sample.
fn reference_span(len: usize) -> (f64, f64) {
    if len > 1 {
        (0.0, (len - 1) as f64)
    } else {
        (-0.5, 0.5)
    }
}

fn draw_panel<DB: DrawingBackend>(
    panel: &Panel,
    area: &DrawingArea<DB, Shift>,
    x_title: &str,
) -> Result<(), VisualizationError>
where
    DB::ErrorType: 'static,
{
    let n = panel.labels.len().max(1) as f64;
    let (y_min, y_max) = match panel.y_extent() {
        Some((lo, hi)) if hi > lo => {
            let pad = (hi - lo) * 0.05;
            (lo - pad, hi + pad)
        }
        Some((v, _)) => (v - 1.0, v + 1.0),
        None => (0.0, 1.0),
    };
    let x_range = -0.5..(n - 0.5);

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), y_min..y_max)?;

    let labels = &panel.labels;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_title)
        .x_labels(labels.len().clamp(1, 20))
        .x_label_formatter(&|x: &f64| label_at(labels, *x))
        .draw()?;

    for band in &panel.bands {
        let color = series_color(band.series);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x_range.start, band.lower), (x_range.end, band.upper)],
            color.mix(0.12).filled(),
        )))?;
    }

    for line in &panel.reference_lines {
        let color = if panel.bands.is_empty() {
            BLACK.mix(0.3)
        } else {
            series_color(line.series).mix(0.5)
        };
        let (start, end) = reference_span(panel.labels.len());
        chart.draw_series(DashedLineSeries::new(
            vec![(start, line.value), (end, line.value)],
            6,
            4,
            color.stroke_width(1),
        ))?;
    }

    for (idx, series) in panel.series.iter().enumerate() {
        let color = series_color(idx);
        let points: Vec<(f64, f64)> = series.points().map(|(x, y)| (x as f64, y)).collect();

        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(series.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;
    }

    if panel.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}
