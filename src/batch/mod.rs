//! Bulk queue submission for the long-running searches: robustness
//! seeds and gradient sweeps.

pub mod gradients;
pub mod seeds;

pub use gradients::{gradient_contents, GradientBatch};
pub use seeds::SeedBatch;
