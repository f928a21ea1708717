//! Progress indicators for torbridge.
//!
//! One spinner per phase; finished phases collapse into a single status line.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::provision::{Phase, ProgressObserver, ProvisionError, Step, StepOutcome};
use crate::ui;

/// Create a spinner with a message
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Renders sequencer progress on the terminal.
pub struct ConsoleProgress {
    quiet: bool,
    verbose: bool,
    current: Option<ProgressBar>,
}

impl ConsoleProgress {
    /// `verbose` also lists every completed step.
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self {
            quiet,
            verbose: verbose && !quiet,
            current: None,
        }
    }

    fn phase_line(phase: Phase) -> String {
        format!(
            "{} {}",
            ui::step_prefix(phase.number(), Phase::COUNT),
            phase.title()
        )
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_phase_start(&mut self, phase: Phase, _steps: usize) {
        self.finish();
        self.current = Some(if self.quiet {
            ProgressBar::hidden()
        } else {
            spinner(Self::phase_line(phase))
        });
    }

    fn on_step_start(&mut self, phase: Phase, step: &Step) {
        if let Some(pb) = &self.current {
            pb.set_message(format!(
                "{} {}",
                Self::phase_line(phase),
                step.label().dimmed()
            ));
        }
    }

    fn on_step_complete(&mut self, _phase: Phase, step: &Step, outcome: StepOutcome) {
        let Some(pb) = &self.current else {
            return;
        };
        match outcome {
            StepOutcome::AlreadyPatched if !self.quiet => {
                pb.suspend(|| ui::dim(&format!("{} (already applied)", step.label())));
            }
            _ if self.verbose => pb.suspend(|| ui::dim(&step.label())),
            _ => {}
        }
    }

    fn on_phase_complete(&mut self, phase: Phase) {
        self.finish();
        if !self.quiet {
            println!("{} {}", "✓".green(), Self::phase_line(phase));
        }
    }

    fn on_phase_failed(&mut self, phase: Phase, _error: &ProvisionError) {
        self.finish();
        if !self.quiet {
            println!("{} {}", "✗".red(), Self::phase_line(phase));
        }
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
