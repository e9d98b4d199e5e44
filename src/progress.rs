//! Terminal progress bar for training epochs and the prediction loop.

use std::io::{self, Write};

/// A simple progress bar rendered in place on stdout.
#[derive(Debug)]
pub struct ProgressBar {
    total: u64,
    current: u64,
    width: usize,
    message: String,
    enabled: bool,
}

impl ProgressBar {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            current: 0,
            width: 40,
            message: String::new(),
            enabled: true,
        }
    }

    /// Disabled bars render nothing; counters still advance.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.render();
    }

    /// Restart for a new pass with a fresh total.
    pub fn reset(&mut self, total: u64) {
        self.total = total;
        self.current = 0;
    }

    pub fn inc(&mut self, amount: u64) {
        self.current = (self.current + amount).min(self.total);
        self.render();
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.current as f64 / self.total as f64) * 100.0
    }

    /// Fill the bar and move to the next line.
    pub fn finish(&mut self) {
        self.current = self.total;
        self.render();
        if self.enabled {
            println!();
        }
    }

    fn render(&self) {
        if !self.enabled {
            return;
        }

        let percentage = self.percentage();
        let filled = (percentage / 100.0 * self.width as f64) as usize;
        let empty = self.width - filled;

        print!(
            "\r[{}{}] {:>5.1}% {}",
            "█".repeat(filled),
            "░".repeat(empty),
            percentage,
            self.message
        );
        let _ = io::stdout().flush();
    }
}
