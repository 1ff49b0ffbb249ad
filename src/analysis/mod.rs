pub mod interval;
pub mod normalize;

pub use interval::{resolve, IntervalKind, Millis};
pub use normalize::{normalize, AnalysisError, TrackAnalysis};
