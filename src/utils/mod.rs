//! Shared utilities: error taxonomy, logging, and metric accumulators.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{DogvisionError, Result};
pub use logging::{init_logging, LogConfig, RunLogger};
pub use metrics::{PhaseMetrics, RunningMetrics};
