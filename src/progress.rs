/*!
 * Progress reporting
 *
 * A run is split into rounds, each round into steps (generate, test), and
 * each step reports ticks. Reporters take `&self` so parallel workers can
 * share one.
 */

use indicatif::{ProgressBar, ProgressStyle};

pub trait ProgressReporter: Send + Sync {
    fn set_total_ticks(&self, total: u64);

    fn report(&self, current: u64, message: &str);

    fn set_round_and_step(&self, total_rounds: u64, round: u64, step: u8);
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn set_total_ticks(&self, _total: u64) {}

    fn report(&self, _current: u64, _message: &str) {}

    fn set_round_and_step(&self, _total_rounds: u64, _round: u64, _step: u8) {}
}

/// Terminal progress bar
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{prefix:.bold} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {eta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░-");
        bar.set_style(style);
        Self { bar }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for TerminalProgress {
    fn set_total_ticks(&self, total: u64) {
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
        }
    }

    fn report(&self, current: u64, message: &str) {
        self.bar.set_position(current);
        self.bar.set_message(message.to_string());
    }

    fn set_round_and_step(&self, total_rounds: u64, round: u64, step: u8) {
        let step_name = match step {
            1 => "generating",
            2 => "testing",
            _ => "working",
        };
        self.bar
            .set_prefix(format!("round {}/{} {}", round, total_rounds, step_name));
        self.bar.set_position(0);
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::ProgressReporter;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Total(u64),
        Report(u64, String),
        RoundAndStep(u64, u64, u8),
    }

    /// Keeps every call for later inspection
    #[derive(Default)]
    pub struct RecordingProgress {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingProgress {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub fn reports(&self) -> Vec<(u64, String)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Report(current, message) => Some((current, message)),
                    _ => None,
                })
                .collect()
        }
    }

    impl ProgressReporter for RecordingProgress {
        fn set_total_ticks(&self, total: u64) {
            self.events.lock().unwrap().push(Event::Total(total));
        }

        fn report(&self, current: u64, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Report(current, message.to_string()));
        }

        fn set_round_and_step(&self, total_rounds: u64, round: u64, step: u8) {
            self.events
                .lock()
                .unwrap()
                .push(Event::RoundAndStep(total_rounds, round, step));
        }
    }
}
