//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use waterauditor_core::{AuditOutcome, InputBundleBuilder, ProgressReporter, export_report, generate_report};
use waterauditor_providers::{OpenAiReasoning, SerpApiSearch};
use waterauditor_shared::{
    AppConfig, AuditConfig, Credentials, Stage, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Water Auditor: assess a water sample from a photo.
#[derive(Parser)]
#[command(
    name = "water-auditor",
    version,
    about = "Assess water safety from a photo and produce a Markdown report.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.waterauditor/waterauditor.toml.
    #[arg(long, global = true, env = "WATERAUDITOR_CONFIG")]
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
    /// Analyze a water sample photo and write a safety report.
    Report(ReportArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
pub(crate) struct ReportArgs {
    /// Photo of the water sample (JPEG or PNG).
    #[arg(long)]
    image: PathBuf,

    /// Water source, e.g. well, tap, river.
    #[arg(long)]
    source_type: String,

    /// What the water is used for, e.g. drinking, cooking, irrigation.
    #[arg(long)]
    usage: String,

    /// Surrounding area, e.g. "rural, near farmland".
    #[arg(long)]
    surroundings: String,

    /// Issues noticed, e.g. "cloudy, slight odor".
    #[arg(long)]
    issues: String,

    /// Preferences for recommended solutions, e.g. "low cost".
    #[arg(long)]
    preferences: Option<String>,

    /// How urgent the situation is.
    #[arg(long)]
    urgency: Option<String>,

    /// Output directory (defaults to the config's output dir).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Report file name; the extension is always `.md`.
    #[arg(long)]
    file_name: Option<String>,

    /// Do not print the report to stdout.
    #[arg(long)]
    no_print: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so the report
/// can be piped from stdout.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "waterauditor=info",
        1 => "waterauditor=debug",
        _ => "waterauditor=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    match cli.command {
        Command::Report(args) => cmd_report(cli.config.as_deref(), args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_report(config_path: Option<&Path>, args: ReportArgs) -> Result<()> {
    let config = resolve_config(config_path)?;

    // Keys are checked before the image is even read
    let credentials = Credentials::from_env(&config)?;

    let mut builder = InputBundleBuilder::new()
        .image_from_path(&args.image)?
        .source_type(args.source_type)
        .usage(args.usage)
        .surroundings(args.surroundings)
        .observed_issues(args.issues);
    if let Some(preferences) = args.preferences {
        builder = builder.preferences(preferences);
    }
    if let Some(urgency) = args.urgency {
        builder = builder.urgency(urgency);
    }

    let reasoning = OpenAiReasoning::new(&config.openai, credentials.openai_api_key.as_str())?;
    let search = SerpApiSearch::new(&config.serpapi, credentials.serp_api_key.as_str())?;
    let audit_config = AuditConfig::from(&config);

    info!(image = %args.image.display(), "generating water safety report");

    let reporter = CliProgress::new();
    let outcome = match generate_report(builder, &reasoning, &search, &audit_config, &reporter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    let out_dir = args.out.unwrap_or_else(|| PathBuf::from(&config.output.dir));
    let file_name = args.file_name.unwrap_or_else(|| config.output.file_name.clone());
    let export = export_report(&outcome.report, &out_dir, &file_name)
        .wrap_err("report was generated but could not be saved")?;

    if !args.no_print {
        println!("{}", outcome.report.as_str());
    }

    eprintln!();
    eprintln!("  Water safety report ready!");
    eprintln!("  Request: {}", outcome.request_id);
    eprintln!("  Risks:   {}", outcome.risk_map.labels());
    eprintln!("  Links:   {}", outcome.resources.total_links());
    for warning in outcome.resources.warnings() {
        eprintln!("  Warning: {warning}");
    }
    eprintln!("  Path:    {}", export.path.display());
    eprintln!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());
    eprintln!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.set_length(Stage::ALL.len() as u64);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.abandon_with_message("failed");
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, stage: Stage) {
        let position = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0);
        self.spinner.set_position(position as u64 + 1);
        self.spinner.set_message(stage.label());
    }

    fn done(&self, _outcome: &AuditOutcome) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    println!("API keys are read from the environment variables named in the file.");
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
