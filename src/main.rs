use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use scholar_pubs::config::{find_config_file, load_config, Config, ConfigFile};
use scholar_pubs::parser::RecordParser;
use scholar_pubs::pipeline::{FatalPolicy, Pipeline, PipelineOptions};
use scholar_pubs::sink::{JsonFileSink, Sink};
use scholar_pubs::sources::{connect_source, SourceKind};
use scholar_pubs::ui::{self, RunSpinner, Status};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Scholar Pubs - Extract an author's publication list into normalized JSON
#[derive(Parser, Debug)]
#[command(name = "scholar-pubs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract an author's publication list from a scholar profile into normalized JSON", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Author/profile identifier
    #[arg(long, short = 'a')]
    author_id: Option<String>,

    /// Acquisition strategy
    #[arg(long, short, value_enum)]
    mode: Option<Mode>,

    /// Output file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Fetch abstracts for every publication
    #[arg(long)]
    abstracts: bool,

    /// Include citation counts
    #[arg(long)]
    citations: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Acquisition strategies selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Structured author API (needs an API key)
    Api,
    /// Headless browser over WebDriver
    Browser,
    /// Static profile pages over HTTP
    Html,
}

impl From<Mode> for SourceKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Api => SourceKind::Api,
            Mode::Browser => SourceKind::Browser,
            Mode::Html => SourceKind::Html,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default configuration to a TOML file
    InitConfig {
        /// Destination path
        #[arg(default_value = "scholar-pubs.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::InitConfig { path }) = &cli.command {
        ConfigFile::new(Config::default())
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if !cli.quiet {
            ui::print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", path.display()),
            );
        }
        return Ok(());
    }

    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(config_path.as_deref()).context("failed to load configuration")?;
    apply_overrides(&mut config, &cli);

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    config.validate().context("invalid configuration")?;

    run(&cli, &config).await
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(author_id) = &cli.author_id {
        config.profile.author_id = author_id.clone();
    }
    if let Some(mode) = cli.mode {
        config.acquisition.mode = mode.into();
    }
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }
    if cli.abstracts {
        config.acquisition.fetch_abstracts = true;
    }
    if cli.citations {
        config.acquisition.include_citations = true;
    }
}

/// Logs go to stderr; `RUST_LOG` wins over flags and config
fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scholar_pubs={}", level)),
    );

    let json = config.logging.format.as_deref() == Some("json");
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn run(cli: &Cli, config: &Config) -> Result<()> {
    let author_id = config.profile.author_id.trim();
    let fetching = ui::fetching_message(author_id);
    let spinner = RunSpinner::start(&fetching, cli.quiet);
    if spinner.is_hidden() && !cli.quiet {
        ui::print_status(Status::Info, &fetching);
    }
    let sink = JsonFileSink::new(&config.output.path);

    // Selector errors surface before a browser session exists
    let parser = RecordParser::new(config.fields.clone(), &config.markup)
        .context("invalid parser configuration")?
        .with_citations(config.acquisition.include_citations);

    let source = match connect_source(config).await {
        Ok(source) => source,
        Err(e) => {
            spinner.finish_with_error(&format!(
                "Could not start {} acquisition",
                config.acquisition.mode
            ));
            if config.output.on_fatal == FatalPolicy::Empty {
                sink.emit(&[]).context("failed to write empty output")?;
            }
            return Err(e).context("failed to start acquisition");
        }
    };

    let mut pipeline = Pipeline::new(source, parser, PipelineOptions::from_config(config));
    let outcome = pipeline.run_to_sink(&sink, config.output.on_fatal).await;
    pipeline.shutdown().await;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_with_error("Run failed");
            return Err(e).context(format!("failed to fetch publications for {}", author_id));
        }
    };

    let saved = ui::saved_message(report.records.len(), sink.path());
    spinner.finish_with_success(&saved);
    if !cli.quiet {
        if spinner.is_hidden() {
            ui::print_status(Status::Success, &saved);
        }
        if let Some(summary) = ui::run_summary(&report) {
            ui::print_status(Status::Warning, &summary);
        }
    }

    Ok(())
}
