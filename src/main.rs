mod cli;
mod export;
mod fanout;
mod gemini;
mod markdown;
mod report;
mod session;

pub const USER_AGENT: &str = concat!("qforia/", env!("CARGO_PKG_VERSION"));

use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};

use cli::{Cli, Command, INTERACTIVE_HELP, parse_command};
use fanout::{BatchOptions, BatchOutcome, LookupStatus, Progress, run_batch};
use gemini::GeminiClient;
use session::Session;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Slack on top of the request timeout for prompt building and parsing.
const LOOKUP_TIMEOUT_MARGIN: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("qforia=info".parse()?),
        )
        .init();

    let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
    let request_timeout = Duration::from_secs(cli.timeout);
    let mut gemini = GeminiClient::from_env(http)
        .inspect_err(|e| error!("{e}"))?
        .with_timeout(request_timeout);
    if let Some(model) = &cli.model {
        gemini = gemini.with_model(model);
    }
    info!(model = gemini.model(), "gemini client ready");

    let options = BatchOptions {
        mode: cli.mode,
        variant: cli.variant,
        lookup_timeout: request_timeout + LOOKUP_TIMEOUT_MARGIN,
    };

    if cli.interactive {
        return interactive(&gemini, Session::new(options)).await;
    }

    let lookups = cli.read_lookups().inspect_err(|e| error!("{e}"))?;
    let outcome = run_batch(&gemini, &lookups, &options, print_progress).await;

    if let Some(path) = &cli.csv {
        export::rows_to_path(&outcome, path)?;
    }
    if let Some(path) = &cli.plans_csv {
        export::plans_to_path(&outcome, path)?;
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", report::format_report(&outcome));
    }

    if outcome.all_failed() {
        return Err("every lookup failed".into());
    }
    Ok(())
}

fn print_progress(progress: Progress<'_>) {
    let pct = (progress.fraction() * 100.0).round();
    match progress.status {
        LookupStatus::Succeeded { generated } => eprintln!(
            "[{}/{} {pct}%] processed: {} (generated {generated} queries)",
            progress.completed, progress.total, progress.lookup_query
        ),
        LookupStatus::Failed => eprintln!(
            "[{}/{} {pct}%] failed: {}",
            progress.completed, progress.total, progress.lookup_query
        ),
    }
}

async fn interactive(
    gemini: &GeminiClient,
    mut session: Session,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("{INTERACTIVE_HELP}");

    loop {
        stdout.write_all(b"qforia> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        match command {
            Command::Run(query) => {
                let outcome =
                    run_batch(gemini, &[query], &session.options, print_progress).await;
                stdout
                    .write_all(report::format_report(&outcome).as_bytes())
                    .await?;
                session.replace(outcome);
            }
            Command::SetMode(mode) => {
                session.options.mode = mode;
                eprintln!("mode: {mode}");
            }
            Command::SetVariant(variant) => {
                session.options.variant = variant;
                eprintln!("variant: {variant:?}");
            }
            Command::Export(path) => match session.last_run() {
                Some(outcome) => export_last(outcome, &path),
                None => eprintln!("nothing to export yet"),
            },
            Command::Help => eprintln!("{INTERACTIVE_HELP}"),
            Command::Quit => break,
        }
    }

    info!(runs = session.runs(), "session ended");
    Ok(())
}

fn export_last(outcome: &BatchOutcome, path: &std::path::Path) {
    match export::rows_to_path(outcome, path) {
        Ok(()) => eprintln!("wrote {} rows to {}", outcome.rows.len(), path.display()),
        Err(e) => eprintln!("export failed: {e}"),
    }
}
