//! The fixed provisioning sequence as data
//!
//! [`build_plan`] is pure: given the validated target and the caller's
//! parameters it returns every step of phases 2..=7 in execution order.
//! Phase 1 (validation) runs before planning because the repository list
//! needs the live codename.

use std::fmt;

use super::template::{bindings, render};
use super::validate::TargetDescriptor;
use crate::templates::{
    AUTO_UPGRADES_PATH, CONFIG_TORRC, CONTACT_INFO, DISTRIBUTION, NICKNAME, OR_PORT,
    TOR_DEFAULT_UNIT_PATH, TOR_INSTANCE_UNIT_PATH, TOR_SOURCES_LIST, TOR_SOURCES_LIST_PATH,
    TORRC_PATH, TRANSPORT_PORT, UNATTENDED_AUTO_CFG, UNATTENDED_UPGRADES_CFG,
    UNATTENDED_UPGRADES_PATH,
};

pub const TOR_KEYRING_PATH: &str = "/usr/share/keyrings/tor-archive-keyring.gpg";
pub const TOR_SIGNING_KEY_URL: &str =
    "https://deb.torproject.org/torproject.org/A3C4F0F979CAA22CDBA8F512EE8CBC9E886DDD89.asc";
pub const OBFS4PROXY_BIN: &str = "/usr/bin/obfs4proxy";

/// Unit file setting that blocks the capability grant from taking effect.
pub const HARDENING_SEARCH: &str = "NoNewPrivileges=yes";
pub const HARDENING_REPLACE: &str = "NoNewPrivileges=no";

/// Caller-supplied parameters for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionParams {
    pub contact_info: String,
    pub or_port: u16,
    pub transport_port: u16,
}

/// Phases of a provisioning run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Validate,
    BaseUpdate,
    UnattendedUpgrades,
    RepositoryTrust,
    CoreInstall,
    ServiceConfig,
    Activation,
}

impl Phase {
    pub const COUNT: usize = 7;

    pub const ALL: [Phase; Self::COUNT] = [
        Phase::Validate,
        Phase::BaseUpdate,
        Phase::UnattendedUpgrades,
        Phase::RepositoryTrust,
        Phase::CoreInstall,
        Phase::ServiceConfig,
        Phase::Activation,
    ];

    /// 1-based position in the sequence.
    pub fn number(self) -> usize {
        self as usize + 1
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::Validate => "validate",
            Phase::BaseUpdate => "base update",
            Phase::UnattendedUpgrades => "unattended-upgrade config",
            Phase::RepositoryTrust => "repository trust",
            Phase::CoreInstall => "core package install",
            Phase::ServiceConfig => "service configuration",
            Phase::Activation => "activation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.number(), Self::COUNT, self.title())
    }
}

/// One unit of remote work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run a shell command; non-zero exit fails the run
    Run { command: String },
    /// Replace a file's contents
    Write { path: &'static str, content: String },
    /// Literal find/replace inside an existing file
    Patch {
        path: &'static str,
        search: &'static str,
        replace: &'static str,
    },
}

impl Step {
    fn run(command: impl Into<String>) -> Self {
        Step::Run {
            command: command.into(),
        }
    }

    fn write(path: &'static str, content: String) -> Self {
        Step::Write { path, content }
    }

    fn patch_hardening(path: &'static str) -> Self {
        Step::Patch {
            path,
            search: HARDENING_SEARCH,
            replace: HARDENING_REPLACE,
        }
    }

    /// Short label for progress output.
    pub fn label(&self) -> String {
        match self {
            Step::Run { command } => format!("$ {command}"),
            Step::Write { path, .. } => format!("write {path}"),
            Step::Patch {
                path,
                search,
                replace,
            } => format!("patch {path} ({search} → {replace})"),
        }
    }
}

/// Steps for one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    pub phase: Phase,
    pub steps: Vec<Step>,
}

/// Build phases 2..=7 for a validated target.
pub fn build_plan(target: &TargetDescriptor, params: &ProvisionParams) -> Vec<PhasePlan> {
    let sources_list = render(
        TOR_SOURCES_LIST,
        &bindings([(DISTRIBUTION, target.codename.as_str())]),
    );

    let torrc = render(
        CONFIG_TORRC,
        &bindings([
            (OR_PORT, params.or_port.to_string()),
            (TRANSPORT_PORT, params.transport_port.to_string()),
            (CONTACT_INFO, params.contact_info.clone()),
        ]),
    );
    if torrc.contains(NICKNAME) {
        log::debug!("torrc keeps {NICKNAME} unbound; the Nickname line stays commented out");
    }

    vec![
        PhasePlan {
            phase: Phase::BaseUpdate,
            steps: vec![
                Step::run("apt-get update"),
                Step::run("apt-get upgrade -y"),
                Step::run("apt-get install -y unattended-upgrades apt-listchanges"),
            ],
        },
        PhasePlan {
            phase: Phase::UnattendedUpgrades,
            steps: vec![
                Step::write(UNATTENDED_UPGRADES_PATH, UNATTENDED_UPGRADES_CFG.to_string()),
                Step::write(AUTO_UPGRADES_PATH, UNATTENDED_AUTO_CFG.to_string()),
            ],
        },
        PhasePlan {
            phase: Phase::RepositoryTrust,
            steps: vec![
                Step::run("apt-get install -y apt-transport-https gpg"),
                Step::write(TOR_SOURCES_LIST_PATH, sources_list),
                Step::run(format!(
                    "wget -qO- {TOR_SIGNING_KEY_URL} | gpg --dearmor | tee {TOR_KEYRING_PATH} >/dev/null"
                )),
                Step::run("apt-get update"),
                Step::run("apt-get install -y tor deb.torproject.org-keyring"),
            ],
        },
        PhasePlan {
            phase: Phase::CoreInstall,
            steps: vec![
                Step::run("apt-get update"),
                Step::run("apt-get install -y tor"),
                Step::run("apt-get install -y obfs4proxy"),
            ],
        },
        PhasePlan {
            phase: Phase::ServiceConfig,
            steps: vec![
                Step::write(TORRC_PATH, torrc),
                Step::run(format!("setcap cap_net_bind_service=+ep {OBFS4PROXY_BIN}")),
                Step::patch_hardening(TOR_DEFAULT_UNIT_PATH),
                Step::patch_hardening(TOR_INSTANCE_UNIT_PATH),
            ],
        },
        PhasePlan {
            phase: Phase::Activation,
            steps: vec![
                Step::run("systemctl daemon-reload"),
                Step::run("systemctl enable --now tor.service"),
                Step::run("systemctl restart tor.service"),
            ],
        },
    ]
}
