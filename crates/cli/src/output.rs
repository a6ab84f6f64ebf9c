//! Output formatting and terminal rendering

use colored::{ColoredString, Colorize};
use hotline::{
    backend::{ConversationScript, Executor},
    call::{CallReport, Speaker},
    CallPhase, CallRecord, CallStats, CategoryRecord, Outcome, Urgency,
};

/// Truncate to `max` characters, marking the cut with an ellipsis
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}

fn urgency_label(urgency: Urgency) -> ColoredString {
    match urgency {
        Urgency::Emergency => "EMERGENCY".bright_red().bold(),
        Urgency::Short => "short".yellow(),
        Urgency::Standard => "standard".normal(),
        Urgency::Info => "info".dimmed(),
    }
}

fn confidence_label(confidence: f64) -> ColoredString {
    let text = format!("{:.0}%", confidence * 100.0);
    if confidence > 0.7 {
        text.bright_green()
    } else {
        text.yellow()
    }
}

/// Print a section header
pub fn print_header(text: &str) {
    println!();
    println!("{}", format!("▶ {}", text).bright_yellow().bold());
    println!("{}", "─".repeat(60).dimmed());
}

pub fn print_success(text: &str) {
    println!("{} {}", "✓".bright_green(), text.bright_white());
}

pub fn print_warning(text: &str) {
    println!("{} {}", "⚠".bright_yellow(), text.yellow());
}

pub fn print_info(text: &str) {
    println!("{} {}", "ℹ".bright_blue(), text);
}

pub fn print_outcome(outcome: &Outcome) {
    println!("  {:<14} {}", "Problem:".dimmed(), outcome.problem);
    println!(
        "  {:<14} {} / {}",
        "Category:".dimmed(),
        outcome.category_type,
        outcome.subtype.bright_white()
    );
    if let Some(location) = &outcome.location {
        println!("  {:<14} {}", "Location:".dimmed(), location);
    }
    println!("  {:<14} {}", "Urgency:".dimmed(), urgency_label(outcome.urgency));
    println!("  {:<14} {}", "Executor:".dimmed(), outcome.executor);
    if outcome.response_time > 0 {
        println!("  {:<14} {} h", "Response in:".dimmed(), outcome.response_time);
    }
    println!(
        "  {:<14} {}",
        "Confidence:".dimmed(),
        confidence_label(outcome.confidence)
    );
    if outcome.needs_operator {
        println!("  {:<14} {}", "Routing:".dimmed(), "operator".bright_magenta());
    }
    println!();
    println!("  {}", outcome.response.italic());
}

pub fn print_catalog(records: &[CategoryRecord]) {
    println!(
        "  {:<4} {:<28} {:<24} {:<10} {}",
        "ID".bold(),
        "SUBTYPE".bold(),
        "EXECUTOR".bold(),
        "URGENCY".bold(),
        "KEYWORDS".bold()
    );
    for record in records {
        println!(
            "  {:<4} {:<28} {:<24} {:<10} {}",
            truncate(&record.id, 4),
            truncate(&record.subtype, 28),
            truncate(record.executor_label(), 24),
            urgency_label(record.urgency),
            truncate(&record.keywords.join(", "), 40).dimmed()
        );
    }
    println!();
    println!("  {} categories", records.len().to_string().bright_white());
}

pub fn print_executors(executors: &[Executor]) {
    for executor in executors {
        let contact = executor
            .phone
            .as_deref()
            .or(executor.email.as_deref())
            .unwrap_or("-");
        let name = if executor.is_active {
            executor.name.bright_white()
        } else {
            executor.name.dimmed()
        };
        println!("  {:<32} {}", name, contact.dimmed());
    }
    println!();
    println!("  {} executors", executors.len().to_string().bright_white());
}

pub fn print_scripts(scripts: &[ConversationScript]) {
    for script in scripts {
        let marker = if script.is_default {
            "default".bright_green()
        } else {
            "".normal()
        };
        println!(
            "  {:<32} {:>2} steps {}",
            truncate(&script.name, 32),
            script.steps.len(),
            marker
        );
    }
    println!();
    println!("  {} scripts", scripts.len().to_string().bright_white());
}

pub fn print_phase(phase: CallPhase) {
    println!("{}", format!("  · {}", phase).dimmed());
}

pub fn print_transcript(report: &CallReport) {
    for turn in &report.turns {
        let who = match turn.speaker {
            Speaker::Caller => "Caller".bright_blue().bold(),
            Speaker::Agent => "Agent ".bright_green().bold(),
        };
        println!(
            "  {} {} {}",
            turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
            who,
            turn.content
        );
    }
}

pub fn print_record(record: &CallRecord) {
    let status = match record.status {
        hotline::call::CallStatus::Resolved => "resolved".bright_green(),
        hotline::call::CallStatus::Escalated => "escalated".bright_magenta(),
    };
    println!(
        "  {} {} → {} ({})",
        status,
        record.category.bright_white(),
        record.executor,
        truncate(&record.query, 40).dimmed()
    );
}

pub fn print_stats(stats: &CallStats) {
    println!(
        "  {} calls · {} resolved by AI ({}%) · {} escalated · avg {:.1}s",
        stats.total_calls.to_string().bright_white(),
        stats.ai_resolved,
        stats.ai_resolved_percent(),
        stats.escalated,
        stats.avg_response_time
    );
}
