pub mod processor;
pub mod report;

pub use processor::{FetchOptions, MetricsProcessor};
pub use report::{save_plots, NamedFigure, ReportWriter};
