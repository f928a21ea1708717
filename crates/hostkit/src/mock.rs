//! In-memory host for tests.
//!
//! [`MockHost`] keeps an in-memory filesystem, answers identity queries with
//! configured values, and records every call so tests can assert on the
//! exact order of remote operations.

use crate::backend::Host;
use crate::error::{Error, Result};
use crate::types::{CommandOutput, OsRelease};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// A call observed by [`MockHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    /// `run(command)`
    Run(String),
    /// `read_file(path)`
    ReadFile(String),
    /// `write_file(path, content)`
    WriteFile(String, String),
    /// `read_os_release()`
    ReadOsRelease,
    /// `read_architecture()`
    ReadArchitecture,
}

impl HostCall {
    /// Whether this call changes host state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Run(_) | Self::WriteFile(..))
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<HostCall>,
    files: BTreeMap<String, String>,
    failures: Vec<(String, CommandOutput)>,
    outputs: Vec<(String, CommandOutput)>,
    read_only: Vec<String>,
}

/// Recording host backed by memory.
#[derive(Debug)]
pub struct MockHost {
    release: OsRelease,
    architecture: String,
    state: Mutex<State>,
}

impl MockHost {
    /// A host reporting the given identity.
    pub fn new(name: &str, codename: &str, architecture: &str) -> Self {
        Self {
            release: OsRelease {
                name: name.to_string(),
                version_codename: codename.to_string(),
            },
            architecture: architecture.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed a file.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.state()
            .files
            .insert(path.to_string(), content.to_string());
        self
    }

    /// Make commands starting with `prefix` exit with `exit_code`.
    pub fn fail_command(self, prefix: &str, exit_code: i32, stderr: &str) -> Self {
        self.state()
            .failures
            .push((prefix.to_string(), CommandOutput::failed(exit_code, stderr)));
        self
    }

    /// Make commands starting with `prefix` succeed with `stdout`.
    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.state()
            .outputs
            .push((prefix.to_string(), CommandOutput::ok(stdout)));
        self
    }

    /// Make writes to `path` fail with a permission error.
    pub fn read_only(self, path: &str) -> Self {
        self.state().read_only.push(path.to_string());
        self
    }

    /// Every call in order.
    pub fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    /// Only the calls that change host state.
    pub fn mutations(&self) -> Vec<HostCall> {
        self.calls()
            .into_iter()
            .filter(HostCall::is_mutation)
            .collect()
    }

    /// Commands passed to `run`, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Run(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    /// Current content of a file.
    pub fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    /// Forget recorded calls, keeping files.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl Host for MockHost {
    fn name(&self) -> &str {
        "mock"
    }

    fn run(&self, command: &str) -> Result<CommandOutput> {
        let mut state = self.state();
        state.calls.push(HostCall::Run(command.to_string()));

        if let Some((_, output)) = state
            .failures
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
        {
            return Ok(output.clone());
        }
        if let Some((_, output)) = state
            .outputs
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
        {
            return Ok(output.clone());
        }
        Ok(CommandOutput::ok(""))
    }

    fn read_file(&self, path: &str) -> Result<Option<String>> {
        let mut state = self.state();
        state.calls.push(HostCall::ReadFile(path.to_string()));
        Ok(state.files.get(path).cloned())
    }

    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(HostCall::WriteFile(path.to_string(), content.to_string()));

        if state.read_only.iter().any(|p| p == path) {
            return Err(Error::Permission {
                path: path.to_string(),
                message: "Permission denied".to_string(),
            });
        }

        state.files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn read_os_release(&self) -> Result<OsRelease> {
        self.state().calls.push(HostCall::ReadOsRelease);
        Ok(self.release.clone())
    }

    fn read_architecture(&self) -> Result<String> {
        self.state().calls.push(HostCall::ReadArchitecture);
        Ok(self.architecture.clone())
    }
}
