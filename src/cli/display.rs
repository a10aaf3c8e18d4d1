//! Terminal display for rota commands
//!
//! All output goes to stderr so stdout remains clean for `--json`.

use std::collections::HashMap;

use colored::Colorize;

use crate::duty::{DutyKind, Member};
use crate::rotation::assigner::{AssignmentReport, AssignmentStatus, RotationStatus};
use crate::rotation::Assignment;

/// Colored label for a report status
fn status_label(status: AssignmentStatus) -> String {
    match status {
        AssignmentStatus::Assigned => "ASSIGNED".green().bold().to_string(),
        AssignmentStatus::Skipped => "SKIPPED".dimmed().bold().to_string(),
        AssignmentStatus::NoEligibleMembers => "NO MEMBERS".yellow().bold().to_string(),
        AssignmentStatus::InternalFailure => "FAILED".red().bold().to_string(),
    }
}

/// Comma-separated usernames, or a dash for nobody
fn format_usernames(members: &[Member]) -> String {
    if members.is_empty() {
        return "-".to_string();
    }
    members
        .iter()
        .map(|m| m.username.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the result of `rota assign`
pub fn render_report(report: &AssignmentReport) {
    eprintln!(
        "\n{} {}",
        "===".bold().cyan(),
        format!("Duty: {}", report.duty_kind).bold().cyan()
    );
    eprintln!("{}", "─".repeat(50).dimmed());
    eprintln!("  {} {}", status_label(report.status), report.message);

    if let Some(cycle_id) = report.cycle_id {
        let reset = if report.cycle_reset {
            " (new cycle)".yellow().to_string()
        } else {
            String::new()
        };
        eprintln!("  {} {cycle_id}{reset}", "Cycle:".dimmed());
    }

    if report.member.is_some() && report.status != AssignmentStatus::NoEligibleMembers {
        let notified = if report.notified {
            "sent".green()
        } else {
            "not sent".yellow()
        };
        eprintln!("  {} {notified}", "Notification:".dimmed());
    }

    eprintln!();
}

/// Render the result of `rota status`
pub fn render_status(kind: DutyKind, status: &RotationStatus) {
    eprintln!(
        "\n{} {}",
        "===".bold().cyan(),
        format!("Duty: {kind}").bold().cyan()
    );
    eprintln!("{}", "─".repeat(50).dimmed());

    if status.cycle.cycle_id == 0 {
        eprintln!("  {} no assignments yet", "Cycle:".dimmed());
    } else {
        eprintln!("  {} {}", "Cycle:".dimmed(), status.cycle.cycle_id);
    }
    eprintln!("  {} {}", "Done:".dimmed(), format_usernames(&status.done));
    eprintln!("  {} {}", "Due:".dimmed(), format_usernames(&status.due).bold());
    eprintln!();
}

/// Render the result of `rota history`
pub fn render_history(assignments: &[Assignment], roster: &[Member]) {
    if assignments.is_empty() {
        eprintln!("No assignments recorded.");
        return;
    }

    let names: HashMap<u32, &str> = roster
        .iter()
        .map(|m| (m.id, m.username.as_str()))
        .collect();

    for assignment in assignments {
        let who = names.get(&assignment.member_id).map_or_else(
            || format!("#{}", assignment.member_id),
            |name| (*name).to_string(),
        );
        eprintln!(
            "  {} {:<7} {} {}",
            assignment
                .assigned_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed(),
            assignment.duty_kind.to_string(),
            format!("cycle {}", assignment.cycle_id).dimmed(),
            who.bold()
        );
    }
}
