//! Terminal display utilities for the spliceio CLI

use console::style;
use spliceio_types::{Completion, TransferPath};
use std::time::Duration;

/// Display a completion record with its transfer statistics
pub fn display_completion(operation: &str, completion: &Completion, elapsed: Duration) {
    println!();
    println!(
        "{}",
        style(format!("{} completion:", capitalize(operation)))
            .bold()
            .underlined()
    );
    println!("  Path: {}", style(path_label(completion.path)).cyan());
    println!(
        "  Requested: {}",
        style(format_bytes(completion.requested as u64)).cyan()
    );
    println!(
        "  Transferred: {}",
        style(format_bytes(completion.transferred as u64)).green()
    );
    if completion.residual > 0 {
        println!(
            "  Residual: {}",
            style(format_bytes(completion.residual as u64)).yellow()
        );
    }

    match completion.error {
        Some(error) => println!(
            "  Error: {}",
            style(format!("{} ({})", error.to_io_error(), error.context)).red()
        ),
        None => println!("  Error: {}", style("none").green()),
    }

    println!("  Duration: {}", style(format_duration(elapsed)).blue());
    if completion.transferred > 0 && elapsed > Duration::ZERO {
        let rate = completion.transferred as f64 / elapsed.as_secs_f64() / 1024.0 / 1024.0;
        println!(
            "  Transfer rate: {} MB/s",
            style(format!("{:.2}", rate)).blue().bold()
        );
    }
}

/// Human-readable name of a transfer path
pub fn path_label(path: TransferPath) -> &'static str {
    match path {
        TransferPath::ZeroCopyRead => "zero-copy read (splice + vmsplice)",
        TransferPath::CopyRead => "copying read (splice + read)",
        TransferPath::StagedWrite => "staged write (vmsplice + splice)",
        TransferPath::Sync => "fsync",
        TransferPath::None => "none",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}
