//! Turning model output into a review report.

pub mod aggregator;
pub mod extractor;

pub use aggregator::{aggregate, RunInfo, SpecialistOutcome};
