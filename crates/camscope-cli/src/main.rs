//! camscope CLI - G-code toolpath diagnostics
//!
//! Analyzes a CNC program and prints distance, time and segment-length
//! statistics, optionally exporting the per-segment table as CSV.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use camscope_engine::{analyze, AnalysisOutcome, AnalysisResult, CancelToken, Guarded, ProgressSink};
use camscope_report::{write_csv, CsvOptions, Summary, DEFAULT_LOG_LIMIT};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod input;

/// Exit code for a run interrupted with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "camscope")]
#[command(about = "G-code toolpath distance, time and segment-length analyzer", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a G-code program
    Analyze(AnalyzeArgs),
    /// Print the default settings as TOML
    Defaults,
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// G-code program to analyze
    file: PathBuf,
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of ranked bins to keep
    #[arg(long)]
    top: Option<usize>,
    /// Feed (mm/min) assumed where the program declares none
    #[arg(long)]
    default_feed: Option<f64>,
    /// Write the per-segment table to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Prefix the CSV with a UTF-8 byte order mark
    #[arg(long, requires = "csv")]
    bom: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
    /// Maximum anomaly log lines to print
    #[arg(long, default_value_t = DEFAULT_LOG_LIMIT)]
    log_limit: usize,
    /// Suppress the progress display
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Defaults => {
            print!("{}", config::default_settings_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_analyze(args: &AnalyzeArgs) -> Result<ExitCode> {
    let overrides = config::Overrides {
        top: args.top,
        default_feed: args.default_feed,
    };
    let settings = config::load_settings(args.config.as_deref(), overrides)?;

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install Ctrl-C handler")?;

    let mut progress = token.guard(ProgressLine::new(args.quiet));

    let Some(source) = input::read_program(&args.file, &mut progress)? else {
        finish_progress(&progress);
        eprintln!("Cancelled while reading {}", args.file.display());
        return Ok(ExitCode::from(EXIT_CANCELLED));
    };

    let outcome = analyze(&source, &settings, &mut progress)?;
    finish_progress(&progress);

    let result = match outcome {
        AnalysisOutcome::Completed(result) => result,
        AnalysisOutcome::Cancelled(cancelled) => {
            eprintln!("{cancelled}");
            return Ok(ExitCode::from(EXIT_CANCELLED));
        }
    };

    let summary = Summary::new(&result, args.log_limit);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &summary)?;
        writeln!(out)?;
    } else {
        write!(out, "{summary}")?;
    }

    if let Some(path) = &args.csv {
        let rows = export_csv(&result, path, args.bom)?;
        tracing::info!(rows, path = %path.display(), "exported CSV");
        if !args.json {
            writeln!(out, "Exported {rows} rows to {}", path.display())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn export_csv(result: &AnalysisResult, path: &Path, bom: bool) -> Result<usize> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let options = CsvOptions {
        bom,
        ..Default::default()
    };
    let rows = write_csv(result, BufWriter::new(file), &options)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(rows)
}

/// Single-line progress display on stderr.
struct ProgressLine {
    quiet: bool,
    last: Option<(u32, String)>,
}

impl ProgressLine {
    fn new(quiet: bool) -> Self {
        Self { quiet, last: None }
    }
}

impl ProgressSink for ProgressLine {
    fn report(&mut self, percent: f64, message: &str) -> bool {
        if self.quiet {
            return false;
        }
        let whole = percent.floor() as u32;
        let unchanged = self
            .last
            .as_ref()
            .is_some_and(|(p, m)| *p == whole && m == message);
        if !unchanged {
            eprint!("\r\x1b[2K{message}... {whole:>3}%");
            let _ = io::stderr().flush();
            self.last = Some((whole, message.to_owned()));
        }
        false
    }
}

/// End the progress line before other output.
fn finish_progress(progress: &Guarded<ProgressLine>) {
    let line = progress.inner();
    if !line.quiet && line.last.is_some() {
        eprintln!();
    }
}
