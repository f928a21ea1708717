use anyhow::{Result, bail};
use colored::Colorize;
use hostkit::Host;
use std::io::IsTerminal;

use crate::Context;
use crate::cli::RunFlags;
use crate::progress::ConsoleProgress;
use crate::provision::{PatchPreview, Preview, ProvisionParams, RunSummary, Sequencer, StepPreview};
use crate::ui;

/// `torbridge run`: provision the host, or preview with `--dry-run`.
pub fn run(
    ctx: &Context,
    host: &dyn Host,
    params: &ProvisionParams,
    flags: RunFlags,
) -> Result<()> {
    if params.or_port == params.transport_port {
        ui::warn(&format!(
            "OR port and obfs4 port are both {}; tor will fail to bind one of them",
            params.or_port
        ));
    }

    if !ctx.quiet {
        ui::header(&format!("Tor bridge on {}", host.name()));
        ui::kv("Contact", &params.contact_info);
        ui::kv("OR port", &params.or_port.to_string());
        ui::kv("obfs4 port", &params.transport_port.to_string());
        println!();
    }

    let sequencer = Sequencer::new(host);

    if flags.dry_run {
        let preview = sequencer.preview(params)?;
        print_preview(&preview);
        println!();
        ui::info("Dry run: no changes made");
        return Ok(());
    }

    if !flags.yes {
        if !std::io::stdin().is_terminal() {
            bail!("Refusing to provision without confirmation; pass --yes when not on a terminal");
        }
        if !ui::confirm(&format!("Provision {} as a Tor bridge?", host.name()))? {
            ui::info("Aborted");
            return Ok(());
        }
    }

    let report = {
        let mut progress = ConsoleProgress::new(ctx.quiet, ctx.verbose > 0);
        sequencer.run(params, &mut progress)?
    };

    println!();
    ui::success(&format!(
        "Bridge relay provisioned on {} ({} {})",
        host.name(),
        report.target.distribution,
        report.target.codename
    ));
    if !ctx.quiet {
        print_summary(&report.summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    ui::kv("Commands run", &summary.commands.to_string());
    ui::kv("Files written", &summary.files_written.to_string());
    ui::kv("Files patched", &summary.files_patched.to_string());
    if summary.already_patched > 0 {
        ui::kv("Already patched", &summary.already_patched.to_string());
    }
}

fn print_preview(preview: &Preview) {
    ui::success(&format!("Target supported: {}", preview.target));

    for (phase, steps) in &preview.phases {
        ui::section(&phase.to_string());

        for step in steps {
            match step {
                StepPreview::Run { command } => ui::dim(&format!("$ {command}")),
                StepPreview::Write {
                    path,
                    current,
                    desired,
                } => match current {
                    None => {
                        println!("  {} {} {}", "+".green(), path, "(new file)".dimmed());
                        ui::print_diff("", desired);
                    }
                    Some(current) if current == desired => {
                        ui::dim(&format!("= {path} (unchanged)"));
                    }
                    Some(current) => {
                        println!("  {} {}", "~".yellow(), path);
                        ui::print_diff(current, desired);
                    }
                },
                StepPreview::Patch {
                    path,
                    search,
                    replace,
                    result,
                } => match result {
                    PatchPreview::WillPatch { replacements } => println!(
                        "  {} {}: {} → {} ({} occurrence{})",
                        "~".yellow(),
                        path,
                        search.red(),
                        replace.green(),
                        replacements,
                        if *replacements == 1 { "" } else { "s" }
                    ),
                    PatchPreview::AlreadyPatched => {
                        ui::dim(&format!("= {path} (already contains {replace})"));
                    }
                    PatchPreview::WouldFail { reason } => {
                        ui::warn(&format!("{path}: {reason}; the run would stop here"));
                    }
                },
            }
        }
    }
}
