use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{CommandFactory, Parser as ClapParser};
use serde::Deserialize;
use tracing::debug;

use wirelog::{ClientResponse, FilterConfig, FilterableRequest, LogLevel, LoggingFilter, Record, RecordingReporter};

/// wirelog CLI — render a recorded HTTP exchange as report entries.
///
/// Reads an exchange from a file or stdin, runs it through the logging
/// filter and prints what a reporting service would have received.
///
/// The exchange is JSON: `{"request": {...}, "response": {...}}`, where a
/// missing or `null` response stands for a client call that returned none.
#[derive(ClapParser)]
#[command(name = "wirelog-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a JSON exchange. Reads from stdin when omitted.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "markdown", value_enum)]
    format: OutputFormat,

    /// Redact Authorization headers, session cookies and URI passwords.
    #[arg(short, long)]
    sanitize: bool,

    /// Level of the reported entries.
    #[arg(short, long, default_value = "info")]
    level: LogLevel,

    /// Filter order reported in debug output.
    #[arg(long, default_value_t = 0)]
    order: i32,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// Entries separated by horizontal rules
    Markdown,
    /// The recorded reporter calls as JSON
    Json,
}

#[derive(Debug, Deserialize)]
struct Exchange {
    request: FilterableRequest,
    #[serde(default)]
    response: Option<ClientResponse>,
}

fn main() {
    setup_logging();
    let cli = Cli::parse();

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    if data.trim().is_empty() {
        eprintln!("Error: empty input");
        process::exit(1);
    }

    let exchange: Exchange = match serde_json::from_str(&data) {
        Ok(x) => x,
        Err(e) => {
            eprintln!("Malformed exchange: {e}");
            process::exit(2);
        }
    };

    let config = if cli.sanitize {
        FilterConfig::sanitizing()
    } else {
        FilterConfig::default()
    }
    .with_level(cli.level)
    .with_order(cli.order);

    let reporter = Arc::new(RecordingReporter::new());
    let filter = LoggingFilter::new(config, reporter.clone());
    debug!(order = filter.order(), "filter configured");

    let response = exchange.response;
    let result: Result<_, std::convert::Infallible> = filter.intercept(&exchange.request, |_| Ok(response));
    let Ok(response) = result;
    debug!(status = response.map(|r| r.status_code), "exchange replayed");

    let records = reporter.take();
    let output = match cli.format {
        OutputFormat::Markdown => format_markdown(&records),
        OutputFormat::Json => match serde_json::to_string_pretty(&records) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error serializing records: {e}");
                process::exit(1);
            }
        },
    };

    println!("{output}");
}

/// Read the exchange from a file or stdin.
fn read_input(cli: &Cli) -> Result<String, std::io::Error> {
    match &cli.file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Diagnostics go to stderr so stdout carries only the report.
fn setup_logging() {
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn format_markdown(records: &[Record]) -> String {
    let blocks: Vec<String> = records
        .iter()
        .map(|record| match record {
            Record::Log { message, level, .. } if *level >= LogLevel::Error => {
                format!("**{level}** {message}")
            }
            Record::Log { message, .. } => message.clone(),
            Record::Binary {
                message, attachment, ..
            } => {
                let summary = format!(
                    "[attachment: {}, {} bytes]",
                    attachment.mime_type,
                    attachment.data.len()
                );
                if message.is_empty() {
                    summary
                } else {
                    format!("{message}\n\n{summary}")
                }
            }
            Record::OpenStep { title, .. } => format!("▶ {title}"),
            Record::CloseStep => "◀".to_string(),
        })
        .collect();
    blocks.join("\n\n---\n\n")
}
