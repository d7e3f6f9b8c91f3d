//! Training/validation loop.
//!
//! Each epoch runs a training phase (gradient updates on the head) and a
//! validation phase (measurement only), tracks the best validation loss seen
//! so far, and applies the early-stopping policy: stop as soon as validation
//! loss fails to strictly improve, and always stop after the first epoch.
//! With that policy a run never exceeds two epochs regardless of the epoch
//! budget.
//!
//! After the validation metrics are computed, the validation feeder is
//! iterated a second time with no gradient tracking purely to emit one
//! report line per batch. The pass is redundant but its log cadence is part
//! of the harness's observable behavior, so it is kept.

use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};

use crate::dataset::BatchFeeder;
use crate::model::BreedClassifier;
use crate::training::evaluate::{count_correct, evaluate_epoch, EvalOptions};
use crate::utils::logging::RunLogger;
use crate::utils::metrics::RunningMetrics;

/// Initial best-loss value; any real validation loss improves on it.
pub const LOSS_SENTINEL: f64 = 1e6;

/// Best validation loss seen so far, plus the stall counter driving early
/// stopping. The counter only ever increases and is never reset within a run.
#[derive(Debug, Clone)]
pub struct BestLoss {
    best: f64,
    stalls: usize,
}

impl Default for BestLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl BestLoss {
    pub fn new() -> Self {
        Self {
            best: LOSS_SENTINEL,
            stalls: 0,
        }
    }

    /// Record an epoch's validation loss. Strict improvement updates the
    /// best; anything else increments the stall counter. Returns whether the
    /// loss improved.
    pub fn observe(&mut self, loss: f64) -> bool {
        if loss < self.best {
            self.best = loss;
            true
        } else {
            self.stalls += 1;
            false
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn stalls(&self) -> usize {
        self.stalls
    }
}

/// Outcome of a training run, for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSummary {
    /// Number of epochs actually executed
    pub epochs_run: usize,
    /// Best validation loss observed
    pub best_loss: f64,
    /// Final stall counter value
    pub stalls: usize,
}

/// Fine-tune the classifier head.
///
/// The optimizer steps only parameters that carry gradients; the frozen
/// backbone is never touched. Returns the model with the weights left by the
/// last completed training phase (no rollback to the best epoch) along with
/// a summary of the run.
#[allow(clippy::too_many_arguments)]
pub fn train<B, O>(
    mut model: BreedClassifier<B>,
    train_feeder: &BatchFeeder<B>,
    valid_feeder: &BatchFeeder<B::InnerBackend>,
    criterion: &CrossEntropyLossConfig,
    optimizer: &mut O,
    learning_rate: f64,
    max_epochs: usize,
    logger: &RunLogger,
) -> (BreedClassifier<B>, TrainingSummary)
where
    B: AutodiffBackend,
    O: Optimizer<BreedClassifier<B>, B>,
{
    let mut best = BestLoss::new();
    let mut epochs_run = 0;

    for epoch in 0..max_epochs {
        epochs_run = epoch + 1;
        logger.epoch_start(epoch, max_epochs);

        // Training phase: gradient updates, in-place progress per batch.
        let mut running = RunningMetrics::new();
        let bar = logger.train_bar(train_feeder.num_batches());

        for batch in train_feeder.batches() {
            let output = model.forward(batch.images.clone());
            let loss = criterion
                .init(&output.device())
                .forward(output.clone(), batch.targets.clone());
            let loss_value: f64 = loss.clone().into_scalar().elem();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(learning_rate, model, grads);

            let correct = count_correct(&output, &batch.targets);
            running.record(loss_value, batch.size(), correct);
            logger.train_step(&bar, loss_value);
        }

        let train_metrics = running.finalize();
        logger.train_epoch(bar, &train_metrics);

        // Validation phase: measurement only, on the inner (no-autodiff)
        // model so training-only behavior is disabled.
        let inner_model = model.valid();
        let valid_metrics = evaluate_epoch(
            &inner_model,
            valid_feeder,
            criterion,
            EvalOptions::validation(),
            "valid",
            logger,
        );
        best.observe(valid_metrics.loss);

        // Reporting pass: iterate the validation feeder again, forwarding
        // each batch, and emit one line per batch with the epoch's numbers.
        let inner_criterion = criterion.init(valid_feeder.device());
        for batch in valid_feeder.batches() {
            let output = inner_model.forward(batch.images);
            let _ = inner_criterion.forward(output, batch.targets);
            logger.valid_batch(&valid_metrics, best.best());
        }

        if best.stalls() == 1 {
            logger.early_stop(epoch, best.stalls());
            break;
        }
        // The first epoch always ends the run.
        if epoch == 0 {
            break;
        }
    }

    let summary = TrainingSummary {
        epochs_run,
        best_loss: best.best(),
        stalls: best.stalls(),
    };
    (model, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::optim::AdamConfig;

    use crate::backend::TrainingBackend;
    use crate::dataset::{BatchFeeder, ImageDataset, ImageItem};
    use crate::model::BreedClassifierConfig;

    type B = TrainingBackend;
    type Inner = <B as AutodiffBackend>::InnerBackend;

    const SIZE: usize = 16;
    const CLASSES: usize = 3;

    fn items(count: usize) -> Vec<ImageItem> {
        (0..count)
            .map(|i| {
                let value = 0.1 + 0.2 * (i % 4) as f32;
                ImageItem::from_data(
                    vec![value; 3 * SIZE * SIZE],
                    i % CLASSES,
                    format!("item_{}.jpg", i),
                )
            })
            .collect()
    }

    fn feeders() -> (BatchFeeder<B>, BatchFeeder<Inner>) {
        let train = BatchFeeder::new(
            ImageDataset::from_items(items(4)),
            2,
            SIZE,
            Default::default(),
        );
        let valid = BatchFeeder::new(
            ImageDataset::from_items(items(2)),
            2,
            SIZE,
            Default::default(),
        );
        (train, valid)
    }

    fn model() -> crate::model::BreedClassifier<B> {
        let config = BreedClassifierConfig::new(CLASSES).with_base_filters(2);
        crate::model::BreedClassifier::new(&config, &Default::default()).with_frozen_backbone()
    }

    #[test]
    fn test_best_loss_sentinel() {
        let mut best = BestLoss::new();
        assert_eq!(best.best(), LOSS_SENTINEL);

        // Any finite loss below the sentinel improves, no stall.
        assert!(best.observe(999_999.0));
        assert_eq!(best.stalls(), 0);
    }

    #[test]
    fn test_stall_counter_monotone() {
        let mut best = BestLoss::new();

        assert!(best.observe(1.0));
        assert_eq!(best.stalls(), 0);

        // Equal is not a strict improvement.
        assert!(!best.observe(1.0));
        assert_eq!(best.stalls(), 1);

        assert!(!best.observe(2.0));
        assert_eq!(best.stalls(), 2);

        // Improvement never decrements the counter.
        assert!(best.observe(0.5));
        assert_eq!(best.stalls(), 2);
        assert_eq!(best.best(), 0.5);
    }

    #[test]
    fn test_loop_runs_at_most_two_epochs() {
        let (train_feeder, valid_feeder) = feeders();
        let mut optimizer = AdamConfig::new().init();

        let (_model, summary) = train(
            model(),
            &train_feeder,
            &valid_feeder,
            &CrossEntropyLossConfig::new(),
            &mut optimizer,
            1e-3,
            10,
            &RunLogger::silent(),
        );

        assert!(summary.epochs_run <= 2);
        assert!(summary.epochs_run >= 1);
        // The sentinel guarantees epoch 0 improves, so at most one stall.
        assert!(summary.stalls <= 1);
        assert!(summary.best_loss < LOSS_SENTINEL);
    }

    #[test]
    fn test_zero_epoch_budget() {
        let (train_feeder, valid_feeder) = feeders();
        let mut optimizer = AdamConfig::new().init();

        let (_model, summary) = train(
            model(),
            &train_feeder,
            &valid_feeder,
            &CrossEntropyLossConfig::new(),
            &mut optimizer,
            1e-3,
            0,
            &RunLogger::silent(),
        );

        assert_eq!(summary.epochs_run, 0);
        assert_eq!(summary.best_loss, LOSS_SENTINEL);
    }

    #[test]
    fn test_backbone_frozen_head_trained() {
        let (train_feeder, valid_feeder) = feeders();
        let mut optimizer = AdamConfig::new().init();
        let model = model();

        let backbone_before = model
            .backbone
            .conv1
            .conv
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let head_before = model
            .head
            .fc3
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        let (trained, summary) = train(
            model,
            &train_feeder,
            &valid_feeder,
            &CrossEntropyLossConfig::new(),
            &mut optimizer,
            1e-2,
            1,
            &RunLogger::silent(),
        );
        assert_eq!(summary.epochs_run, 1);

        let backbone_after = trained
            .backbone
            .conv1
            .conv
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let head_after = trained
            .head
            .fc3
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        // Frozen parameters are bit-identical across training steps.
        assert_eq!(backbone_before, backbone_after);
        // Trainable head parameters moved.
        assert_ne!(head_before, head_after);
    }
}
