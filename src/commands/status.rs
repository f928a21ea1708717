use anyhow::Result;
use colored::Colorize;
use hostkit::Host;
use serde::Serialize;

use crate::Context;
use crate::provision::validate::read_target;
use crate::provision::{ProvisionError, SUPPORTED_TARGETS, TargetDescriptor};
use crate::ui;

/// Service whose state `status` reports
const TOR_SERVICE: &str = "tor.service";

/// What `torbridge status` found on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub host: String,
    pub user: String,
    pub target: Option<TargetDescriptor>,
    pub supported: bool,
    pub tor_service: String,
}

/// Inspect the host. Issues only reads.
///
/// Fails only when the host cannot be reached or `whoami` fails; an
/// unreadable descriptor or an inactive service is reported, not raised.
pub fn inspect(host: &dyn Host) -> Result<StatusReport, ProvisionError> {
    let whoami = host.run("whoami")?;
    if !whoami.success() {
        return Err(ProvisionError::RemoteCommandFailure {
            command: "whoami".to_string(),
            exit_code: whoami.exit_code,
            stderr: whoami.stderr,
        });
    }

    let target = match read_target(host) {
        Ok(target) => Some(target),
        Err(e) => {
            log::warn!("could not identify {}: {e}", host.name());
            None
        }
    };
    let supported = target
        .as_ref()
        .is_some_and(|t| t.is_supported_by(SUPPORTED_TARGETS));

    // `systemctl is-active` exits non-zero for anything but "active"
    let service = host.run(&format!("systemctl is-active {TOR_SERVICE}"))?;
    let tor_service = match service.stdout.trim() {
        "" => "unknown".to_string(),
        state => state.to_string(),
    };

    Ok(StatusReport {
        host: host.name().to_string(),
        user: whoami.stdout.trim().to_string(),
        target,
        supported,
        tor_service,
    })
}

/// `torbridge status`
pub fn run(_ctx: &Context, host: &dyn Host, json: bool) -> Result<()> {
    let report = inspect(host)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ui::header(&format!("Status of {}", report.host));
    ui::kv("User", &report.user);
    match &report.target {
        Some(target) => {
            ui::kv("Distribution", &target.distribution);
            ui::kv("Codename", &target.codename);
            ui::kv("Architecture", &target.architecture);
        }
        None => ui::kv("Distribution", &"unknown".dimmed().to_string()),
    }
    ui::kv(
        "Supported",
        &if report.supported {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        },
    );
    ui::kv(
        TOR_SERVICE,
        &match report.tor_service.as_str() {
            "active" => report.tor_service.green().to_string(),
            other => other.yellow().to_string(),
        },
    );

    Ok(())
}
