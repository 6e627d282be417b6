pub mod figure;
pub mod plotter;

pub use figure::{donor_figure, figure_name, sample_figure, DonorPair, Figure, FigureKind};
pub use plotter::{render_svg, VisualizationError};
