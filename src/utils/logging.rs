//! Logging Module
//!
//! Provides structured logging via the `tracing` crate, plus the `RunLogger`
//! sink that the training loop and evaluator write through. The sink is
//! created per run and passed in explicitly, so nothing inside the core loop
//! talks to process-wide logging state directly.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::utils::metrics::PhaseMetrics;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Verbose config for debugging
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            ansi_colors: true,
        }
    }
}

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Initialize the global tracing subscriber with the given configuration.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level.to_tracing_level())
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Per-run logging sink for the training loop and evaluator.
///
/// Owns the in-place progress line used during the training phase (one line
/// overwritten per batch) and formats the per-batch and per-epoch report
/// lines. A silent variant suppresses the progress bar for tests.
#[derive(Debug, Clone)]
pub struct RunLogger {
    show_progress: bool,
}

impl Default for RunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLogger {
    pub fn new() -> Self {
        Self {
            show_progress: true,
        }
    }

    /// A logger that hides the progress bar; tracing lines still go to
    /// whatever subscriber is installed (usually none in tests).
    pub fn silent() -> Self {
        Self {
            show_progress: false,
        }
    }

    pub fn epoch_start(&self, epoch: usize, max_epochs: usize) {
        tracing::info!("Epoch {}/{}", epoch + 1, max_epochs);
    }

    /// Progress line for the training phase, overwritten in place per batch.
    pub fn train_bar(&self, num_batches: usize) -> ProgressBar {
        let bar = if self.show_progress {
            ProgressBar::new(num_batches as u64)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template("  train [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("=> "));
        bar
    }

    /// Advance the training progress line with the current batch loss.
    pub fn train_step(&self, bar: &ProgressBar, loss: f64) {
        bar.set_message(format!("loss: {:.4}", loss));
        bar.inc(1);
    }

    pub fn train_epoch(&self, bar: ProgressBar, metrics: &PhaseMetrics) {
        bar.finish_and_clear();
        tracing::info!(
            "train loss: {:.4}, acc: {:.4}",
            metrics.loss,
            metrics.accuracy
        );
    }

    /// One line per validation batch during the reporting pass.
    pub fn valid_batch(&self, metrics: &PhaseMetrics, best_loss: f64) {
        tracing::info!(
            "valid loss: {:.4}, acc: {:.4}, best loss: {:.4}",
            metrics.loss,
            metrics.accuracy,
            best_loss
        );
    }

    pub fn eval_mode(&self, phase: &str, track_gradients: bool) {
        tracing::debug!(
            "{} evaluation (learning-signal tracking: {})",
            phase,
            if track_gradients { "yes" } else { "no" }
        );
    }

    pub fn early_stop(&self, epoch: usize, stalls: usize) {
        tracing::warn!(
            "Stopping after epoch {}: {} epoch(s) without validation improvement",
            epoch + 1,
            stalls
        );
    }

    pub fn test_report(&self, metrics: &PhaseMetrics) {
        tracing::info!("Testing Loss: {}", metrics.loss);
        tracing::info!("Testing Accuracy: {}", metrics.accuracy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::parse("Warning"), LogLevel::Warn);
        assert_eq!(LogLevel::parse("unknown"), LogLevel::Info);
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(!config.include_target);
    }

    #[test]
    fn test_silent_logger_hides_bar() {
        let logger = RunLogger::silent();
        let bar = logger.train_bar(10);
        assert!(bar.is_hidden());
        logger.train_step(&bar, 0.5);
        assert_eq!(bar.position(), 1);
    }
}
