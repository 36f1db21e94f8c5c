//! Report printing

use colored::*;
use qpipe_core::{BatchReport, TaskOutcome, TaskReport};

/// Short label for an outcome
pub fn outcome_label(outcome: &TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Finished => "finished",
        TaskOutcome::Unconfirmed => "unconfirmed",
        TaskOutcome::Terminated => "terminated",
        TaskOutcome::SubmissionFailed { .. } => "not submitted",
    }
}

fn colored_label(outcome: &TaskOutcome) -> ColoredString {
    let label = outcome_label(outcome);
    match outcome {
        TaskOutcome::Finished => label.green(),
        TaskOutcome::Unconfirmed | TaskOutcome::Terminated => label.yellow(),
        TaskOutcome::SubmissionFailed { .. } => label.red(),
    }
}

/// Print a summary of a finished batch
pub fn print_report(report: &BatchReport) {
    let elapsed = report.completed_at - report.started_at;

    println!(
        "{}",
        format!(
            "Batch {} ({}): {}/{} task(s) finished in {}s",
            report.id,
            report.script,
            report.finished_count(),
            report.tasks.len(),
            elapsed.num_seconds()
        )
        .bold()
    );

    for task in &report.tasks {
        print_task(task);
    }
    println!();
}

fn print_task(task: &TaskReport) {
    let id = task
        .job_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());

    println!(
        "  {:<14} {:<12} {:<10} {}",
        colored_label(&task.outcome),
        task.job_name.cyan(),
        id,
        task.task
    );

    if let TaskOutcome::SubmissionFailed { reason } = &task.outcome {
        println!("    {}", reason.dimmed());
    }
}
