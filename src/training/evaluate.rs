//! Evaluation passes: one full trip over a feeder with the model held fixed.

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;
use burn::tensor::ElementConversion;

use crate::dataset::BatchFeeder;
use crate::model::BreedClassifier;
use crate::utils::logging::RunLogger;
use crate::utils::metrics::{PhaseMetrics, RunningMetrics};

/// Per-call evaluation settings.
///
/// `track_gradients` records whether the caller leaves learning-signal
/// tracking enabled around the pass: validation runs with it disabled, the
/// final test pass with it enabled. Evaluation itself never updates
/// parameters either way; the flag is carried explicitly and logged so the
/// asymmetry between the two call sites stays visible.
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub track_gradients: bool,
}

impl EvalOptions {
    /// Validation-phase settings: learning-signal tracking disabled.
    pub fn validation() -> Self {
        Self {
            track_gradients: false,
        }
    }

    /// Test-phase settings: learning-signal tracking left enabled.
    pub fn testing() -> Self {
        Self {
            track_gradients: true,
        }
    }
}

/// Number of batch elements whose argmax prediction equals the label.
pub fn count_correct<B: Backend>(output: &Tensor<B, 2>, targets: &Tensor<B, 1, Int>) -> usize {
    let predictions = output.clone().argmax(1).squeeze::<1>(1);
    let correct: i64 = predictions
        .equal(targets.clone())
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

/// One measurement pass: forward and loss per batch, no parameter updates.
/// Loss and accuracy accumulate under the batch-count divisor convention.
pub fn evaluate_epoch<B: Backend>(
    model: &BreedClassifier<B>,
    feeder: &BatchFeeder<B>,
    criterion: &CrossEntropyLossConfig,
    options: EvalOptions,
    phase: &str,
    logger: &RunLogger,
) -> PhaseMetrics {
    logger.eval_mode(phase, options.track_gradients);

    let mut running = RunningMetrics::new();
    for batch in feeder.batches() {
        let output = model.forward(batch.images.clone());
        let loss = criterion
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.into_scalar().elem();

        let correct = count_correct(&output, &batch.targets);
        running.record(loss_value, batch.size(), correct);
    }

    running.finalize()
}

/// Final evaluation over the held-out test feeder. Reports epoch-style loss
/// and accuracy through the logger; the caller consumes nothing but the logs.
pub fn test<B: Backend>(
    model: &BreedClassifier<B>,
    test_feeder: &BatchFeeder<B>,
    criterion: &CrossEntropyLossConfig,
    logger: &RunLogger,
) -> PhaseMetrics {
    let metrics = evaluate_epoch(
        model,
        test_feeder,
        criterion,
        EvalOptions::testing(),
        "test",
        logger,
    );
    logger.test_report(&metrics);
    metrics
}
