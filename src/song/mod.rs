pub mod client;
pub mod model;

pub use client::{load_dump, SongClient, SongError};
pub use model::{Analysis, AnalysisState, ExperimentalStrategy, FileEntry, Sample};
