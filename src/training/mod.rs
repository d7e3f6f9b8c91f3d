//! Training module: the fine-tuning loop and the test evaluator.
//!
//! The loop alternates a gradient-updating training phase with a
//! measurement-only validation phase each epoch, and stops early on the
//! first epoch without strict validation-loss improvement (and always after
//! the first epoch).

pub mod evaluate;
pub mod trainer;

pub use evaluate::{evaluate_epoch, test, EvalOptions};
pub use trainer::{train, BestLoss, TrainingSummary, LOSS_SENTINEL};
