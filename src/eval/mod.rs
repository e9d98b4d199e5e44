//! Test-phase inference, CSV output, and ranking metrics.

mod metrics;
mod predict;
mod writer;

pub use metrics::precision_at_k;
pub use predict::{run_test_phase, Prediction};
pub use writer::{write_label_csv, write_probability_csv, PROBABILITY_FLOOR};
