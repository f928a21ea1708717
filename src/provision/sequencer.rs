//! Provisioning sequencer - runs the phases in order against one host
//!
//! Execution is strictly sequential: each step is issued and awaited before
//! the next. The first failing step ends the run; effects of earlier phases
//! stay in place and re-running the whole sequence is the recovery path.

use hostkit::Host;

use super::error::ProvisionError;
use super::files::{PatchOutcome, ensure_patched, patch_text, write_config};
use super::plan::{Phase, PhasePlan, ProvisionParams, Step, build_plan};
use super::validate::{TargetDescriptor, validate};

/// What a completed step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Ran,
    Written,
    Patched { replacements: usize },
    AlreadyPatched,
}

/// Progress callback for a run
///
/// Implement this trait to render progress; the sequencer never prints.
pub trait ProgressObserver {
    /// Called before the first step of a phase
    fn on_phase_start(&mut self, phase: Phase, steps: usize);

    /// Called before each step
    fn on_step_start(&mut self, phase: Phase, step: &Step);

    /// Called after a step succeeds
    fn on_step_complete(&mut self, phase: Phase, step: &Step, outcome: StepOutcome);

    /// Called after every step of a phase succeeded
    fn on_phase_complete(&mut self, phase: Phase);

    /// Called once when a phase fails, before the error is returned
    fn on_phase_failed(&mut self, _phase: Phase, _error: &ProvisionError) {}
}

/// No-op observer
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_phase_start(&mut self, _phase: Phase, _steps: usize) {}
    fn on_step_start(&mut self, _phase: Phase, _step: &Step) {}
    fn on_step_complete(&mut self, _phase: Phase, _step: &Step, _outcome: StepOutcome) {}
    fn on_phase_complete(&mut self, _phase: Phase) {}
}

/// Counts of what a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub commands: usize,
    pub files_written: usize,
    pub files_patched: usize,
    pub already_patched: usize,
}

impl RunSummary {
    pub fn add(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Ran => self.commands += 1,
            StepOutcome::Written => self.files_written += 1,
            StepOutcome::Patched { .. } => self.files_patched += 1,
            StepOutcome::AlreadyPatched => self.already_patched += 1,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub target: TargetDescriptor,
    pub summary: RunSummary,
}

/// What a patch step would do, as seen by a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchPreview {
    WillPatch { replacements: usize },
    AlreadyPatched,
    WouldFail { reason: String },
}

/// A step annotated with the host's current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPreview {
    Run {
        command: String,
    },
    Write {
        path: &'static str,
        current: Option<String>,
        desired: String,
    },
    Patch {
        path: &'static str,
        search: &'static str,
        replace: &'static str,
        result: PatchPreview,
    },
}

/// Read-only view of what a run would do.
#[derive(Debug, Clone)]
pub struct Preview {
    pub target: TargetDescriptor,
    pub phases: Vec<(Phase, Vec<StepPreview>)>,
}

/// Runs the fixed phase sequence against one host.
pub struct Sequencer<'a> {
    host: &'a dyn Host,
}

impl<'a> Sequencer<'a> {
    pub fn new(host: &'a dyn Host) -> Self {
        Self { host }
    }

    /// Run every phase in order, stopping at the first failure.
    pub fn run<O: ProgressObserver>(
        &self,
        params: &ProvisionParams,
        observer: &mut O,
    ) -> Result<RunReport, ProvisionError> {
        observer.on_phase_start(Phase::Validate, 1);
        let target = match validate(self.host) {
            Ok(target) => target,
            Err(e) => {
                let e = e.in_phase(Phase::Validate);
                observer.on_phase_failed(Phase::Validate, &e);
                return Err(e);
            }
        };
        observer.on_phase_complete(Phase::Validate);

        let mut summary = RunSummary::default();
        for phase_plan in build_plan(&target, params) {
            self.run_phase(&phase_plan, &mut summary, observer)?;
        }

        log::info!(
            "provisioned {}: {} commands, {} files written, {} patched, {} already patched",
            self.host.name(),
            summary.commands,
            summary.files_written,
            summary.files_patched,
            summary.already_patched
        );

        Ok(RunReport { target, summary })
    }

    fn run_phase<O: ProgressObserver>(
        &self,
        plan: &PhasePlan,
        summary: &mut RunSummary,
        observer: &mut O,
    ) -> Result<(), ProvisionError> {
        log::info!("phase {}", plan.phase);
        observer.on_phase_start(plan.phase, plan.steps.len());

        for step in &plan.steps {
            observer.on_step_start(plan.phase, step);
            match self.run_step(step) {
                Ok(outcome) => {
                    summary.add(outcome);
                    observer.on_step_complete(plan.phase, step, outcome);
                }
                Err(e) => {
                    let e = e.in_phase(plan.phase);
                    observer.on_phase_failed(plan.phase, &e);
                    return Err(e);
                }
            }
        }

        observer.on_phase_complete(plan.phase);
        Ok(())
    }

    fn run_step(&self, step: &Step) -> Result<StepOutcome, ProvisionError> {
        match step {
            Step::Run { command } => {
                let output = self.host.run(command)?;
                if !output.stdout.trim().is_empty() {
                    log::debug!("{}", output.stdout.trim_end());
                }
                if !output.success() {
                    return Err(ProvisionError::RemoteCommandFailure {
                        command: command.clone(),
                        exit_code: output.exit_code,
                        stderr: output.stderr,
                    });
                }
                Ok(StepOutcome::Ran)
            }
            Step::Write { path, content } => {
                write_config(self.host, path, content)?;
                Ok(StepOutcome::Written)
            }
            Step::Patch {
                path,
                search,
                replace,
            } => Ok(match ensure_patched(self.host, path, search, replace)? {
                PatchOutcome::Patched { replacements } => StepOutcome::Patched { replacements },
                PatchOutcome::AlreadyPatched => StepOutcome::AlreadyPatched,
            }),
        }
    }

    /// Validate and describe the run without changing the host.
    ///
    /// Reads the current content of every file the run would write or patch.
    pub fn preview(&self, params: &ProvisionParams) -> Result<Preview, ProvisionError> {
        let target = validate(self.host).map_err(|e| e.in_phase(Phase::Validate))?;

        let mut phases = Vec::new();
        for plan in build_plan(&target, params) {
            let steps = plan
                .steps
                .into_iter()
                .map(|step| self.preview_step(step))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.in_phase(plan.phase))?;
            phases.push((plan.phase, steps));
        }

        Ok(Preview { target, phases })
    }

    fn preview_step(&self, step: Step) -> Result<StepPreview, ProvisionError> {
        Ok(match step {
            Step::Run { command } => StepPreview::Run { command },
            Step::Write { path, content } => StepPreview::Write {
                path,
                current: self.host.read_file(path)?,
                desired: content,
            },
            Step::Patch {
                path,
                search,
                replace,
            } => {
                let result = match self.host.read_file(path)? {
                    None => PatchPreview::WouldFail {
                        reason: "file does not exist".to_string(),
                    },
                    Some(content) => match patch_text(&content, search, replace) {
                        Some((_, replacements)) => PatchPreview::WillPatch { replacements },
                        None if content.contains(replace) => PatchPreview::AlreadyPatched,
                        None => PatchPreview::WouldFail {
                            reason: format!("{search:?} not found"),
                        },
                    },
                };
                StepPreview::Patch {
                    path,
                    search,
                    replace,
                    result,
                }
            }
        })
    }
}
