// Output formatting and display for CLI

use crate::daemon::DaemonStatus;
use crate::process::{OutputLine, ProcessDetails, ProcessEntry, SigRun};
use crate::state::AutoToggleList;
use chrono::{DateTime, Local};
use colored::*;
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a formatted table of processes
pub fn print_process_table(entries: &[ProcessEntry]) {
    if entries.is_empty() {
        println!("{}", "No matching processes".yellow());
        return;
    }

    println!("\n{}\n", process_table(entries));
    println!(
        "{}",
        format!("Total: {} process(es)", entries.len())
            .dimmed()
            .italic()
    );
}

fn process_table(entries: &[ProcessEntry]) -> Table {
    #[derive(Tabled)]
    struct ProcessRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "PID")]
        pid: u32,
        #[tabled(rename = "User")]
        user: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows: Vec<ProcessRow> = entries
        .iter()
        .map(|e| ProcessRow {
            name: truncate(&e.name, 32),
            pid: e.pid,
            user: e.user.clone(),
            status: format_status_colored(&e.status),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table
}

/// Print detailed view for a single process
pub fn print_process_details(details: &ProcessDetails) {
    println!("\n{}", "Process Details".bold().underline());
    println!();
    println!("  {:<15} {}", "Name:".bold(), details.name.cyan());
    println!("  {:<15} {}", "PID:".bold(), details.pid);
    println!("  {:<15} {}", "User:".bold(), details.user);
    println!(
        "  {:<15} {}",
        "Status:".bold(),
        format_status_colored(&details.status)
    );
    println!("  {:<15} {:.1}%", "CPU Usage:".bold(), details.cpu_percent);
    println!("  {:<15} {:.1}%", "Memory:".bold(), details.memory_percent);

    let command = if details.command.is_empty() {
        "-".dimmed().to_string()
    } else {
        details.command.clone()
    };
    println!("  {:<15} {}", "Command:".bold(), command);
    println!();
}

pub fn print_daemon_status(status: &DaemonStatus) {
    match status.pid {
        Some(pid) if status.running => {
            println!("{}", "✓ Daemon is running".green().bold());
            println!("  {}: {}", "PID".bold(), pid);
            if let Some(since) = status.since {
                println!(
                    "  {}: {} ({})",
                    "Since".bold(),
                    since.format("%Y-%m-%d %H:%M:%S"),
                    format_age(since, Local::now())
                );
            }
        }
        _ => println!("{}", "✗ Daemon is not running".red().bold()),
    }

    println!("  {}: {}", "Lock file".bold(), status.lock_file.display());
    println!("  {}: {}", "PID file".bold(), status.pid_file.display());
}

pub fn print_auto_toggle(list: &AutoToggleList) {
    if list.names().is_empty() {
        println!("{}", "No processes are flagged for auto-toggle".yellow());
        return;
    }

    println!("\n{}", "Auto-toggle".bold().underline());
    for name in list.names() {
        println!("  {} {}", "•".cyan(), name);
    }
    println!();
}

/// Echo one line from the `sig` helper as it arrives
pub fn print_sig_line(line: &OutputLine) {
    match line {
        OutputLine::Stdout(text) => println!("  {}", text),
        OutputLine::Stderr(text) => eprintln!("  {}", text.yellow()),
    }
}

pub fn print_sig_result(run: &SigRun) {
    let command = run.command.join(" ");
    if run.success() {
        println!("{} {}", "✓".green().bold(), command.dimmed());
        return;
    }

    let reason = match run.exit_code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by a signal".to_string(),
    };
    eprintln!("{} {} ({})", "✗".red().bold(), command, reason);
}

/// Color a sysinfo status string
fn format_status_colored(status: &str) -> String {
    match status {
        "Runnable" | "Running" => status.green().to_string(),
        "Sleeping" | "Idle" => status.normal().to_string(),
        "Stopped" | "Tracing" => status.yellow().to_string(),
        "Zombie" | "Dead" => status.red().bold().to_string(),
        _ => status.bright_black().to_string(),
    }
}

/// Time elapsed between `since` and `now`
fn format_age(since: DateTime<Local>, now: DateTime<Local>) -> String {
    let elapsed = (now - since).to_std().unwrap_or_default();
    format!("{} ago", format_duration(&elapsed))
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

/// Truncate to at most `max_len` characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
