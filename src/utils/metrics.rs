//! Metric accumulators for training and evaluation phases.
//!
//! Epoch loss and accuracy are both divided by the number of batches in the
//! phase, not the number of samples. This mirrors the reporting convention the
//! harness has always used; changing the divisor changes reported magnitudes.

/// Final loss/accuracy for one completed phase of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseMetrics {
    /// Accumulated `loss * batch_size`, divided by the number of batches.
    pub loss: f64,
    /// Accumulated per-batch accuracy, divided by the number of batches.
    pub accuracy: f64,
}

/// Per-phase scalar accumulators, reset at the start of every (epoch, phase)
/// pair and consumed once the phase finishes.
#[derive(Debug, Default)]
pub struct RunningMetrics {
    loss_sum: f64,
    accuracy_sum: f64,
    batches: usize,
}

impl RunningMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch: the scalar loss, the batch size, and the number of
    /// correct argmax predictions in the batch.
    pub fn record(&mut self, loss: f64, batch_size: usize, correct: usize) {
        self.loss_sum += loss * batch_size as f64;
        self.accuracy_sum += correct as f64 / batch_size.max(1) as f64;
        self.batches += 1;
    }

    /// Accumulated `loss * batch_size` over the phase so far.
    pub fn running_loss(&self) -> f64 {
        self.loss_sum
    }

    /// Number of batches recorded so far.
    pub fn num_batches(&self) -> usize {
        self.batches
    }

    /// Epoch loss: accumulated loss divided by batch count.
    pub fn epoch_loss(&self) -> f64 {
        self.loss_sum / self.batches.max(1) as f64
    }

    /// Epoch accuracy: accumulated per-batch accuracy divided by batch count.
    pub fn epoch_accuracy(&self) -> f64 {
        self.accuracy_sum / self.batches.max(1) as f64
    }

    pub fn finalize(&self) -> PhaseMetrics {
        PhaseMetrics {
            loss: self.epoch_loss(),
            accuracy: self.epoch_accuracy(),
        }
    }
}
