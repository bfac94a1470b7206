//! Terminal summary for `--summary`.
//!
//! Everything here writes to stderr so the report on stdout stays clean.
//! Uses only the `console` crate.

use console::style;
use std::time::Duration;
use whois_scanner_lib::{ResultStore, ScanConfig, ScanRun, ScannerError};

/// Failure reasons listed in the breakdown before the rest is folded.
const MAX_REASONS: usize = 5;

/// Print a styled header before the run starts.
pub fn print_header(config: &ScanConfig) {
    eprintln!(
        "{} {} {}",
        style("whois-scanner").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("· {}", config.input)).dim(),
    );

    let mut meta_parts = vec![
        format!(
            "Rate limit: {} per {}s",
            config.rate_limit_calls,
            config.rate_limit_period.as_secs()
        ),
        format!("Format: {}", config.format),
    ];
    if let Some(page) = config.page {
        meta_parts.push(format!("Page {} (size {})", page.number, page.size));
    }
    if let Some(output) = &config.output {
        meta_parts.push(format!("Output: {}", output.display()));
    }
    eprintln!("{}", style(meta_parts.join(" · ")).dim());
    eprintln!();
}

/// Print the totals line and the failure breakdown for a finished run.
pub fn print_summary(run: &ScanRun, duration: Duration) {
    let store = &run.store;
    let processed = store.outcome_count();

    eprintln!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    eprintln!(
        "  {} of {} domain{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(processed).bold(),
        run.requested,
        plural(run.requested),
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} succeeded", store.succeeded_count())).green(),
        style("|").dim(),
        style(format!("{} flagged", store.flagged_count())).yellow(),
        style("|").dim(),
        style(format!("{} failed", store.failed_count())).red(),
    );

    for line in failure_breakdown(store) {
        eprintln!("    {}", style(line).dim());
    }

    if let Some(err) = &run.fatal {
        print_error(err);
        eprintln!("  {}", style("Run aborted, no report written").red().bold());
    }
}

/// Print an error that ended the run.
pub fn print_error(err: &ScannerError) {
    eprintln!("{} {}", style("Error:").red().bold(), err);
}

/// One line per failure reason, largest first, capped at [`MAX_REASONS`].
fn failure_breakdown(store: &ResultStore) -> Vec<String> {
    let mut reasons: Vec<(&str, usize)> = store
        .failed()
        .iter()
        .map(|(reason, entries)| (reason.as_str(), entries.len()))
        .collect();
    reasons.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let mut lines: Vec<String> = reasons
        .iter()
        .take(MAX_REASONS)
        .map(|(reason, count)| format!("{} × {}", count, truncate(reason, 60)))
        .collect();

    if reasons.len() > MAX_REASONS {
        let rest: usize = reasons[MAX_REASONS..].iter().map(|(_, count)| count).sum();
        lines.push(format!(
            "{} more in {} other reason{}",
            rest,
            reasons.len() - MAX_REASONS,
            plural(reasons.len() - MAX_REASONS)
        ));
    }

    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars - 1).collect();
        format!("{}…", cut)
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
