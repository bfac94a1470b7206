//! WHOIS Scanner CLI Application
//!
//! Runs a batch WHOIS scan over an input document and reports each domain as
//! succeeded (by registrant country), privacy-flagged or failed. The process
//! exit code is the number of failed domains, or a negative code when the run
//! itself failed.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use whois_scanner_lib::{
    load_env_config, parse_duration_string, ConfigManager, OutputFormat, ScanConfig, Scanner,
    ScannerError,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Log level used when LOGLEVEL is unset.
const DEFAULT_LOG_LEVEL: &str = "error";

/// CLI arguments for whois-scanner
#[derive(Parser, Debug)]
#[command(name = "whois-scanner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch WHOIS scanner: registrant country, privacy flags and failures")]
#[command(
    long_about = "Look up every domain of an input document via WHOIS, flag privacy-protected registrants, bucket the rest by registrant country and write a JSON or CSV report.\n\nExit code: 0 when every lookup succeeded, otherwise the number of failed domains, capped at 127. Negative codes: -1 unreadable input, -2 input fails schema, -4 report not written, -5 invalid settings, -100 unexpected failure."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Zero-based page to process (requires PAGE_SIZE)
    #[arg(value_name = "PAGE_NUM", requires = "page_size", help_heading = "Paging")]
    pub page_num: Option<usize>,

    /// Number of domains per page
    #[arg(value_name = "PAGE_SIZE", value_parser = parse_page_size, help_heading = "Paging")]
    pub page_size: Option<usize>,

    /// Input document: JSON or CSV, local path or http(s) URL [default: input.json]
    #[arg(short = 'i', long = "input", value_name = "PATH|URL", help_heading = "Input")]
    pub input: Option<String>,

    /// Rules file used with a CSV domain list [default: rules.json]
    #[arg(short = 'r', long = "rules", value_name = "PATH", help_heading = "Input")]
    pub rules: Option<PathBuf>,

    /// JSON schema overriding the built-in input schema
    #[arg(long = "schema", value_name = "PATH", help_heading = "Input")]
    pub schema: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH", help_heading = "Output")]
    pub output: Option<PathBuf>,

    /// Report format: json, csv-summary or csv-full [default: csv-summary]
    #[arg(short = 'f', long = "format", value_name = "FORMAT", value_parser = parse_format, help_heading = "Output")]
    pub format: Option<OutputFormat>,

    /// Print a styled run summary to stderr
    #[arg(long = "summary", help_heading = "Output")]
    pub summary: bool,

    /// Maximum lookups per rate-limit window [default: 50]
    #[arg(long = "rate-limit-calls", value_name = "N", help_heading = "Rate Limit")]
    pub rate_limit_calls: Option<u32>,

    /// Rate-limit window, e.g. 60, 60s or 2m [default: 60s]
    #[arg(long = "rate-limit-period", value_name = "DURATION", value_parser = parse_period, help_heading = "Rate Limit")]
    pub rate_limit_period: Option<Duration>,

    /// Use a specific config file instead of discovering one
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Log progress (info level) unless LOGLEVEL says otherwise
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

fn parse_page_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("page size must be greater than 0".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse()
}

fn parse_period(value: &str) -> Result<Duration, String> {
    parse_duration_string(value)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("invalid period '{}', use a format like 60, 60s, 2m", value))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let code = run(args).await;
    process::exit(code);
}

/// Install the stderr log subscriber, filtered by LOGLEVEL.
fn init_logging(verbose: bool) {
    let level = std::env::var("LOGLEVEL").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level.as_deref(), verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn log_filter(level: Option<&str>, verbose: bool) -> EnvFilter {
    let fallback = if verbose { "info" } else { DEFAULT_LOG_LEVEL };
    level
        .map(log_directive)
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

/// Accept level names in any case, including WARNING and CRITICAL.
fn log_directive(level: &str) -> String {
    match level.trim().to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Run one scan and map it to the process exit code.
async fn run(args: Args) -> i32 {
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ui::print_error(&e);
            return e.exit_code();
        }
    };

    tracing::info!(
        "whois-scanner v{} reading {}",
        env!("CARGO_PKG_VERSION"),
        config.input
    );
    if args.summary {
        ui::print_header(&config);
    }

    let started = Instant::now();
    let scanner = Scanner::with_config(config);
    match scanner.run().await {
        Ok(run) => {
            if args.summary {
                ui::print_summary(&run, started.elapsed());
            }
            run.exit_code()
        }
        Err(e) => {
            ui::print_error(&e);
            e.exit_code()
        }
    }
}

/// Resolve settings: defaults < config file < environment < CLI.
fn build_config(args: &Args) -> Result<ScanConfig, ScannerError> {
    let config_manager = ConfigManager::new();
    let env_config = load_env_config();

    let explicit_path = args
        .config
        .clone()
        .or_else(|| env_config.config.as_ref().map(PathBuf::from));

    let file_config = match explicit_path {
        Some(path) => {
            tracing::info!("Using config file {}", path.display());
            config_manager.load_file(&path)?
        }
        None => config_manager.discover_and_load()?,
    };

    let config = file_config.apply(ScanConfig::default());
    let config = env_config.apply(config);
    Ok(apply_cli_args_to_config(config, args))
}

/// Apply CLI arguments to config (highest precedence).
fn apply_cli_args_to_config(mut config: ScanConfig, args: &Args) -> ScanConfig {
    if let Some(input) = &args.input {
        config.input = input.clone();
    }
    if let Some(rules) = &args.rules {
        config.rules = Some(rules.clone());
    }
    if let Some(schema) = &args.schema {
        config.schema = Some(schema.clone());
    }
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if let Some(format) = args.format {
        config = config.with_format(format);
    }
    if let Some(calls) = args.rate_limit_calls {
        config.rate_limit_calls = calls;
    }
    if let Some(period) = args.rate_limit_period {
        config.rate_limit_period = period;
    }
    if let (Some(number), Some(size)) = (args.page_num, args.page_size) {
        config = config.with_page(number, size);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use whois_scanner_lib::Page;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("whois-scanner").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_positional_page() {
        let args = parse(&["2", "25"]);
        let config = apply_cli_args_to_config(ScanConfig::default(), &args);
        assert_eq!(config.page, Some(Page::new(2, 25)));
    }

    #[test]
    fn test_page_num_requires_page_size() {
        assert!(Args::try_parse_from(["whois-scanner", "2"]).is_err());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(Args::try_parse_from(["whois-scanner", "0", "0"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = parse(&[
            "-i",
            "domains.csv",
            "-f",
            "csv-full",
            "--rate-limit-calls",
            "5",
            "--rate-limit-period",
            "2m",
        ]);
        let base = ScanConfig::default().with_input("from-file.json");
        let config = apply_cli_args_to_config(base, &args);

        assert_eq!(config.input, "domains.csv");
        assert_eq!(config.format, OutputFormat::CsvFull);
        assert!(config.record_full_results);
        assert_eq!(config.rate_limit_calls, 5);
        assert_eq!(config.rate_limit_period, Duration::from_secs(120));
        assert_eq!(config.page, None);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let args = parse(&[]);
        let base = ScanConfig::default()
            .with_format(OutputFormat::Json)
            .with_rate_limit(7, Duration::from_secs(9));
        let config = apply_cli_args_to_config(base, &args);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.rate_limit_calls, 7);
        assert_eq!(config.rate_limit_period, Duration::from_secs(9));
    }

    #[test]
    fn test_cli_format_replaces_full_results_mode() {
        let args = parse(&["-f", "json"]);
        let base = ScanConfig::default().with_format(OutputFormat::CsvFull);
        let config = apply_cli_args_to_config(base, &args);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.record_full_results);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Args::try_parse_from(["whois-scanner", "-f", "xml"]).is_err());
    }

    #[test]
    fn test_log_directive() {
        assert_eq!(log_directive("WARNING"), "warn");
        assert_eq!(log_directive("Info"), "info");
        assert_eq!(log_directive("CRITICAL"), "error");
        assert_eq!(log_directive("whois_scanner_lib=debug"), "whois_scanner_lib=debug");
    }
}
