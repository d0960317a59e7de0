use colored::*;
use dastgate_core::alerts::RiskLevel;
use dastgate_core::gate::GateReport;
use dastgate_core::orchestrator::job::PhaseOutcome;
use dastgate_core::orchestrator::PhaseRecord;
use dastgate_core::pipeline::RunSummary;
use std::path::PathBuf;

/// Print the phases a run went through and the artifacts it wrote.
pub fn print_run_summary(summary: &RunSummary, artifacts: &[PathBuf]) {
    println!();
    println!(
        "{}",
        format!(
            " dastgate v{} - Scan of {}",
            env!("CARGO_PKG_VERSION"),
            summary.target
        )
        .bold()
    );
    println!();

    if let Some(session) = &summary.session {
        println!(" {}", "Session".bold().underline());
        println!(" {} Context id: {}", "|-".dimmed(), session.context_id);
        println!(" {} Scanner user id: {}", "|-".dimmed(), session.user_id);
        println!();
    }

    println!(" {}", "Phases".bold().underline());
    if summary.seeded > 0 {
        println!(" {} Seeded {} endpoints", "|-".dimmed(), summary.seeded);
    }
    for record in &summary.phases {
        print_phase(record);
    }
    println!(
        " {} Passive scan drained after {} checks",
        "|-".dimmed(),
        summary.passive_polls
    );
    println!();

    if !summary.seed_scans.is_empty() {
        let completed = summary
            .seed_scans
            .iter()
            .filter(|r| r.outcome.is_completed())
            .count();
        println!(
            " {} ({}/{} completed)",
            "Seed active scans".bold().underline(),
            completed,
            summary.seed_scans.len()
        );
        for record in &summary.seed_scans {
            print_phase(record);
        }
        println!();
    }

    if !artifacts.is_empty() {
        println!(" {}", "Artifacts".bold().underline());
        for path in artifacts {
            println!(" {} {}", "|-".dimmed(), path.display().to_string().cyan());
        }
        println!();
    }
}

fn print_phase(record: &PhaseRecord) {
    let tag = match &record.outcome {
        PhaseOutcome::Completed { .. } => " DONE ".on_green().black().bold().to_string(),
        PhaseOutcome::TimedOut { .. } => " TIME ".on_yellow().black().bold().to_string(),
        PhaseOutcome::Vanished { .. } => " GONE ".on_yellow().black().bold().to_string(),
        PhaseOutcome::NotStarted { .. } => " SKIP ".on_red().white().bold().to_string(),
    };
    let detail = match &record.outcome {
        PhaseOutcome::Completed { polls } => format!("{polls} status reads"),
        PhaseOutcome::TimedOut { elapsed_secs, .. } => format!("stopped waiting after {elapsed_secs}s"),
        PhaseOutcome::Vanished { status, .. } => format!("status '{status}'"),
        PhaseOutcome::NotStarted { handle } => format!("start returned '{handle}'"),
    };
    println!(
        " {} {} {} {}",
        tag,
        record.kind.label().bold(),
        record.target,
        format!("({detail})").dimmed()
    );
}

/// Print the itemised gate result.
pub fn print_gate_report(report: &GateReport) {
    println!();
    println!(
        "{}",
        format!(
            " dastgate Security Gate - fail on {} or above",
            report.threshold.label()
        )
        .bold()
    );
    println!();

    println!(" {}", "Alerts".bold().underline());
    for count in &report.counts {
        let value = if count.count > 0 && count.risk >= report.threshold {
            count.count.to_string().red().bold().to_string()
        } else {
            count.count.to_string()
        };
        println!(
            " {} {:<14} {}",
            "|-".dimmed(),
            risk_label(count.risk),
            value
        );
    }
    println!(" {} {:<14} {}", "|-".dimmed(), "Total", report.total_alerts);
    println!();

    for line in report.failing_lines() {
        println!(" {} {}", " FAIL ".on_red().white().bold(), line);
    }
    if !report.failing.is_empty() {
        println!();
    }

    if report.passed() {
        println!(
            " {} SECURITY GATE {}",
            "PASS".green().bold(),
            report.verdict.symbol().green().bold()
        );
    } else {
        println!(
            " {} SECURITY GATE {} ({} alerts at or above {})",
            "FAIL".red().bold(),
            report.verdict.symbol().red().bold(),
            report.failing.len(),
            report.threshold.label()
        );
    }
    println!();
}

fn risk_label(risk: RiskLevel) -> ColoredString {
    match risk {
        RiskLevel::Critical => risk.label().red().bold(),
        RiskLevel::High => risk.label().red(),
        RiskLevel::Medium => risk.label().yellow(),
        RiskLevel::Low => risk.label().blue(),
        RiskLevel::Informational => risk.label().dimmed(),
    }
}

/// Startup validation failure: name every missing variable.
pub fn print_missing_env(missing: &[String]) {
    eprintln!(
        "{} Missing required environment variables: {}",
        "error:".red().bold(),
        missing.join(", ")
    );
    for name in missing {
        eprintln!("   {} {}", "|".dimmed(), name.yellow());
    }
}

pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "error:".red().bold(), err);
}
