//! Bridge relay provisioning
//!
//! Validates the target host, then drives it through a fixed sequence of
//! phases: base update, unattended upgrades, repository trust, core package
//! install, service configuration and activation.

pub mod error;
pub mod files;
pub mod plan;
pub mod sequencer;
pub mod template;
pub mod validate;

pub use error::ProvisionError;
pub use plan::{Phase, ProvisionParams, Step};
pub use sequencer::{
    NoProgress, PatchPreview, Preview, ProgressObserver, RunReport, RunSummary, Sequencer,
    StepOutcome, StepPreview,
};
pub use validate::{SUPPORTED_TARGETS, TargetDescriptor};
