use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::fanout::{Mode, PromptVariant};

#[derive(Parser, Debug)]
#[command(
    name = "qforia",
    version,
    about = "Simulate search-engine query fan-out with Gemini"
)]
pub struct Cli {
    /// Query to fan out
    pub query: Option<String>,

    /// Newline-delimited list of lookup queries ("-" reads stdin)
    #[arg(long, short, conflicts_with = "query")]
    pub file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::Complex)]
    pub mode: Mode,

    #[arg(long, value_enum, default_value_t = PromptVariant::Routing)]
    pub variant: PromptVariant,

    /// Gemini model (overrides GEMINI_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Write expanded queries to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write per-lookup generation plans to this CSV file
    #[arg(long)]
    pub plans_csv: Option<PathBuf>,

    /// Print the run as JSON instead of a Markdown report
    #[arg(long)]
    pub json: bool,

    /// Read queries interactively; each one replaces the previous run
    #[arg(
        long,
        short,
        conflicts_with_all = ["query", "file", "csv", "plans_csv", "json"]
    )]
    pub interactive: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Please provide at least one query.")]
    NoLookups,

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Cli {
    /// Lookup queries from the positional argument or `--file`.
    pub fn read_lookups(&self) -> Result<Vec<String>, CliError> {
        let lookups = match (&self.query, &self.file) {
            (_, Some(path)) => {
                let text = read_source(path).map_err(|source| CliError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                parse_lookup_list(&text)
            }
            (Some(query), None) => single_lookup(query),
            (None, None) => Vec::new(),
        };
        if lookups.is_empty() {
            return Err(CliError::NoLookups);
        }
        Ok(lookups)
    }
}

fn read_source(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
    }
}

pub fn single_lookup(query: &str) -> Vec<String> {
    let query = query.trim();
    if query.is_empty() {
        vec![]
    } else {
        vec![query.to_string()]
    }
}

/// One lookup per non-blank line, trimmed, in input order.
pub fn parse_lookup_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// A line entered in interactive mode.
#[derive(Debug, PartialEq)]
pub enum Command {
    Run(String),
    SetMode(Mode),
    SetVariant(PromptVariant),
    Export(PathBuf),
    Help,
    Quit,
}

pub const INTERACTIVE_HELP: &str = "\
Enter a query to fan it out. Commands:
  :mode simple|complex       switch search mode
  :variant standard|routing  switch prompt variant
  :export PATH               write the last run to CSV
  :help                      show this help
  :quit                      exit";

/// `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Some(Command::Run(line.to_string())));
    };

    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((rest, ""));

    let command = match name {
        "mode" => Command::SetMode(Mode::from_str(arg, true)?),
        "variant" => Command::SetVariant(PromptVariant::from_str(arg, true)?),
        "export" if !arg.is_empty() => Command::Export(PathBuf::from(arg)),
        "export" => return Err("usage: :export PATH".to_string()),
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command :{other} (try :help)")),
    };
    Ok(Some(command))
}
