//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pagelift_core::{Pipeline, PushOutcome, SyncSummary};
use pagelift_imagehost::ObjectStoreClient;
use pagelift_shared::{
    AppConfig, init_config, load_config, resolve_api_key, validate_for_sync,
};
use pagelift_store::StoreClient;
use pagelift_translate::{ImageSync, NoopImageSync, TranslateOptions};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pagelift — publish markdown to a block-based document store.
#[derive(Parser)]
#[command(
    name = "pagelift",
    version,
    about = "Translate markdown files into store pages and keep them in sync.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Sync every markdown file under the content directory.
    Sync {
        /// Directory to scan (defaults to content.base_directory).
        #[arg(short, long)]
        dir: Option<String>,

        /// Push files even when the store copy looks up to date.
        #[arg(long)]
        force: bool,
    },

    /// Push a single markdown file.
    Push {
        /// Path to the markdown file.
        file: String,

        /// Push even when the store copy looks up to date.
        #[arg(long)]
        force: bool,
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
    /// Initialize config file with defaults.
    Init,
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
        0 => "pagelift=info",
        1 => "pagelift=debug",
        _ => "pagelift=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync { dir, force } => cmd_sync(dir.as_deref(), force).await,
        Command::Push { file, force } => cmd_push(&file, force).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Pipeline wiring
// ---------------------------------------------------------------------------

fn store_client(config: &AppConfig) -> Result<StoreClient> {
    let api_key = resolve_api_key(config)?;
    Ok(StoreClient::new(
        &config.store.api_base,
        api_key,
        &config.store.database_id,
    )?)
}

fn translate_options(config: &AppConfig) -> TranslateOptions {
    TranslateOptions {
        image_host_prefix: config
            .images
            .host_configured()
            .then(|| config.images.host_prefix.clone()),
        local_image_dir: PathBuf::from(&config.images.local_dir),
    }
}

fn image_client(config: &AppConfig) -> Result<Option<ObjectStoreClient>> {
    if config.images.endpoint.is_empty() {
        return Ok(None);
    }
    let token = if config.images.auth_token_env.is_empty() {
        None
    } else {
        std::env::var(&config.images.auth_token_env).ok()
    };
    Ok(Some(ObjectStoreClient::new(
        &config.images.endpoint,
        &config.images.bucket,
        &config.images.key_prefix,
        token,
    )?))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sync(dir: Option<&str>, force: bool) -> Result<()> {
    let config = load_config()?;
    validate_for_sync(&config)?;

    let dir = match dir {
        Some(d) => PathBuf::from(d),
        None => PathBuf::from(&config.content.base_directory),
    };

    info!(dir = %dir.display(), force, "starting sync");

    let store = store_client(&config)?;
    let options = translate_options(&config);

    let summary = match image_client(&config)? {
        Some(images) => {
            run_sync(Pipeline::new(store, images, options), &dir, force).await?
        }
        None => run_sync(Pipeline::new(store, NoopImageSync, options), &dir, force).await?,
    };

    println!();
    println!("  Sync complete!");
    println!("  Created: {}", summary.created);
    println!("  Updated: {}", summary.updated);
    println!("  Skipped: {}", summary.skipped);
    println!("  Failed:  {}", summary.failed);
    println!();

    if summary.failed > 0 {
        return Err(eyre!("{} file(s) failed to sync", summary.failed));
    }
    Ok(())
}

async fn run_sync<S: ImageSync + Sync>(
    pipeline: Pipeline<S>,
    dir: &Path,
    force: bool,
) -> Result<SyncSummary> {
    let spinner = sync_spinner(format!("Syncing {}", dir.display()));
    let result = pipeline.run_sync(dir, force).await;
    spinner.finish_and_clear();
    Ok(result?)
}

async fn cmd_push(file: &str, force: bool) -> Result<()> {
    let config = load_config()?;
    validate_for_sync(&config)?;

    let path = PathBuf::from(file);
    if !path.is_file() {
        return Err(eyre!("'{file}' is not a file"));
    }

    let store = store_client(&config)?;
    let options = translate_options(&config);

    let outcome = match image_client(&config)? {
        Some(images) => {
            push_one(Pipeline::new(store, images, options), &path, force).await?
        }
        None => push_one(Pipeline::new(store, NoopImageSync, options), &path, force).await?,
    };

    match outcome {
        PushOutcome::Created { page_id } => println!("Created page {page_id}"),
        PushOutcome::Updated { page_id } => println!("Updated page {page_id}"),
        PushOutcome::Skipped => println!("Already up to date, skipped"),
    }
    Ok(())
}

async fn push_one<S: ImageSync + Sync>(
    pipeline: Pipeline<S>,
    path: &Path,
    force: bool,
) -> Result<PushOutcome> {
    pipeline.ensure_schema().await?;
    let spinner = sync_spinner(format!("Pushing {}", path.display()));
    let result = pipeline.push_file(path, force).await;
    spinner.finish_and_clear();
    Ok(result?)
}

fn sync_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message);
    spinner
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
