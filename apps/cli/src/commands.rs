//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pagesmith_core::{ProgressReporter, RunReport, build_index, run_batch};
use pagesmith_shared::{
    AppConfig, DocumentOutcome, RunConfig, config_dir, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Pagesmith: rebrand, enrich and cross-link HTML integration pages.
#[derive(Parser)]
#[command(
    name = "pagesmith",
    version,
    about = "Rebrand, enrich and cross-link a corpus of HTML integration pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./pagesmith.toml, then ~/.pagesmith/pagesmith.toml).
    #[arg(long, env = "PAGESMITH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Rewrite every page in the corpus.
    Run {
        /// Directory of integration pages (overrides `[input] dir`).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Report what would change without writing any file.
        #[arg(long)]
        dry_run: bool,

        /// Documents transformed at once (overrides `[run] concurrency`).
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        /// Also write the full report as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Build the page index without touching any file.
    Index {
        /// Directory of integration pages (overrides `[input] dir`).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print every indexed record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init {
        /// Directory to write `pagesmith.toml` into (defaults to ~/.pagesmith).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pagesmith=info",
        1 => "pagesmith=debug",
        _ => "pagesmith=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            input,
            dry_run,
            concurrency,
            report,
        } => cmd_run(config_path, input, dry_run, concurrency, report.as_deref()).await,
        Command::Index { input, json } => cmd_index(config_path, input, json),
        Command::Config { action } => match action {
            ConfigAction::Init { dir } => cmd_config_init(dir),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    dry_run: bool,
    concurrency: Option<usize>,
    report_path: Option<&Path>,
) -> Result<()> {
    let app = resolve_config(config_path)?;
    let mut config = RunConfig::from(&app);
    if let Some(input) = input {
        config.input_dir = input;
    }
    if let Some(concurrency) = concurrency {
        config.concurrency = concurrency;
    }
    config.dry_run |= dry_run;

    info!(
        input_dir = %config.input_dir.display(),
        brand = %config.brand_name,
        domain = %config.domain,
        dry_run = config.dry_run,
        concurrency = config.concurrency,
        "starting run"
    );

    let reporter = CliProgress::new();
    let report = run_batch(&config, &reporter).await?;

    println!();
    print!("{}", report.render_text());

    if let Some(path) = report_path {
        report.write_json(path)?;
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}

fn cmd_index(config_path: Option<&Path>, input: Option<PathBuf>, json: bool) -> Result<()> {
    let app = resolve_config(config_path)?;
    let mut config = RunConfig::from(&app);
    if let Some(input) = input {
        config.input_dir = input;
    }

    let build = build_index(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(build.index.records())?);
        return Ok(());
    }

    println!();
    println!("  Pages indexed:    {}", build.index.len());
    println!("  Source services:  {}", build.index.source_count());
    println!("  Target services:  {}", build.index.target_count());
    if !build.failures.is_empty() {
        println!("  Not indexed:      {}", build.failures.len());
        for failure in &build.failures {
            println!("    - {}: {}", failure.file.display(), failure.error);
        }
    }
    println!();

    Ok(())
}

fn cmd_config_init(dir: Option<PathBuf>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => config_dir()?,
    };
    let path = dir.join("pagesmith.toml");
    if path.exists() {
        return Err(eyre!("{} already exists; not overwriting", path.display()));
    }
    let path = init_config(&dir)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner for phases that turns into a bar once the
/// document count is known.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn documents_total(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")
        {
            self.bar.set_style(style);
        }
    }

    fn document_processed(&self, path: &Path, outcome: &DocumentOutcome) {
        let label = match outcome {
            DocumentOutcome::Updated { .. } => "updated",
            DocumentOutcome::Unchanged => "unchanged",
            DocumentOutcome::Skipped => "skipped",
            DocumentOutcome::Failed { .. } => "failed",
        };
        self.bar.set_message(format!("{label}: {}", path.display()));
        self.bar.inc(1);
    }

    fn done(&self, _report: &RunReport) {
        self.bar.finish_and_clear();
    }
}
