//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use carton_core::{AssemblyStore, Composer, StoreResolver, fetch_sources};
use carton_repository::ManagerRegistry;
use carton_shared::{AppConfig, Status, expand_home, init_config, load_config};
use carton_storage::{RecordStore, Storage};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Carton: compose deployable cartons from stored assemblies.
#[derive(Parser)]
#[command(
    name = "carton",
    version,
    about = "Compose stored assemblies into deployable cartons and sync their state.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Record store database (overrides `store.path`).
    #[arg(long, env = "CARTON_DB", global = true)]
    pub db: Option<PathBuf>,

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
    /// Store JSON records (one object or an array) into a bucket.
    Import {
        /// Target bucket, e.g. `assembly` or `components`.
        bucket: String,
        /// JSON file to read.
        file: PathBuf,
    },

    /// List record ids in a bucket (defaults to the assembly bucket).
    List { bucket: Option<String> },

    /// Show an assembly, with its resolved components unless `--raw`.
    Show {
        /// Assembly id.
        id: String,

        /// Skip component resolution.
        #[arg(long)]
        raw: bool,
    },

    /// Compose the carton for an assembly.
    Compose {
        /// Owning assemblies group id.
        assemblies_id: String,
        /// Assembly id.
        assembly_id: String,
    },

    /// Record a new status on an assembly.
    Status {
        /// Assembly id.
        id: String,
        /// New status, e.g. `running`.
        status: String,
    },

    /// Replace output keys on an assembly (`key=value`, repeat keys for lists).
    Outputs {
        /// Assembly id.
        id: String,
        /// `key=value` pairs.
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Delete an assembly record.
    Delete {
        /// Assembly id.
        id: String,
    },

    /// Compose a carton and clone the repositories of its boxes.
    Sources {
        /// Owning assemblies group id.
        assemblies_id: String,
        /// Assembly id.
        assembly_id: String,
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
        0 => "carton=info",
        1 => "carton=debug",
        _ => "carton=trace",
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
    let config = load_config()?;
    let db = match &cli.db {
        Some(path) => path.clone(),
        None => expand_home(&config.store.path)?,
    };

    match cli.command {
        Command::Import { bucket, file } => cmd_import(&db, &bucket, &file).await,
        Command::List { bucket } => {
            let bucket = bucket.unwrap_or_else(|| config.store.assembly_bucket.clone());
            cmd_list(&db, &bucket).await
        }
        Command::Show { id, raw } => cmd_show(&config, &db, &id, raw).await,
        Command::Compose {
            assemblies_id,
            assembly_id,
        } => cmd_compose(&config, &db, &assemblies_id, &assembly_id).await,
        Command::Status { id, status } => cmd_status(&config, &db, &id, &status).await,
        Command::Outputs { id, pairs } => cmd_outputs(&config, &db, &id, &pairs).await,
        Command::Delete { id } => cmd_delete(&config, &db, &id).await,
        Command::Sources {
            assemblies_id,
            assembly_id,
        } => cmd_sources(&config, &db, &assemblies_id, &assembly_id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

/// Open the store for reading only; it must already exist.
async fn open_readonly(db: &Path) -> Result<Storage> {
    if !db.exists() {
        return Err(eyre!(
            "no record store at '{}'; import records first",
            db.display()
        ));
    }
    Ok(Storage::open_readonly(db).await?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_import(db: &Path, bucket: &str, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read '{}': {e}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let records = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let storage = Storage::open(db).await?;
    for record in &records {
        let id = record
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| eyre!("record without an \"id\" in '{}'", file.display()))?;
        storage.store_raw(bucket, id, &record.to_string()).await?;
        info!(bucket, id, "imported record");
    }

    println!("Imported {} record(s) into '{bucket}'", records.len());
    Ok(())
}

async fn cmd_list(db: &Path, bucket: &str) -> Result<()> {
    let storage = open_readonly(db).await?;
    for id in storage.list_ids(bucket).await? {
        println!("{id}");
    }
    Ok(())
}

async fn cmd_show(config: &AppConfig, db: &Path, id: &str, raw: bool) -> Result<()> {
    let storage = open_readonly(db).await?;
    let assemblies = AssemblyStore::with_bucket(&storage, config.store.assembly_bucket.clone());

    if raw {
        let record = assemblies.load_raw(id).await?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let resolver = StoreResolver::new(&storage, config.store.component_bucket.clone());
    let assembly = assemblies.load(id, &resolver).await?;
    let components: Vec<_> = assembly.components().collect();
    let view = serde_json::json!({
        "assembly": assembly.record,
        "components": components,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn cmd_compose(
    config: &AppConfig,
    db: &Path,
    assemblies_id: &str,
    assembly_id: &str,
) -> Result<()> {
    let storage = open_readonly(db).await?;
    let resolver = StoreResolver::new(&storage, config.store.component_bucket.clone());
    let composer = Composer::new(
        AssemblyStore::with_bucket(&storage, config.store.assembly_bucket.clone()),
        &resolver,
    )
    .with_default_hdd(config.defaults.hdd.clone());

    let carton = composer.compose(assemblies_id, assembly_id).await?;
    println!("{}", serde_json::to_string_pretty(&carton)?);
    Ok(())
}

async fn cmd_status(config: &AppConfig, db: &Path, id: &str, status: &str) -> Result<()> {
    let status: Status = status.parse()?;
    let storage = Storage::open(db).await?;
    let assemblies = AssemblyStore::with_bucket(&storage, config.store.assembly_bucket.clone());

    let mut record = assemblies.load_raw(id).await?;
    assemblies.set_status(&mut record, status).await?;
    println!("{id}: {status}");
    Ok(())
}

async fn cmd_outputs(config: &AppConfig, db: &Path, id: &str, pairs: &[String]) -> Result<()> {
    let replacements = parse_outputs(pairs)?;
    let storage = Storage::open(db).await?;
    let assemblies = AssemblyStore::with_bucket(&storage, config.store.assembly_bucket.clone());

    let mut record = assemblies.load_raw(id).await?;
    assemblies
        .nuke_and_set_outputs(&mut record, &replacements)
        .await?;
    println!("{}", serde_json::to_string_pretty(&record.outputs)?);
    Ok(())
}

async fn cmd_delete(config: &AppConfig, db: &Path, id: &str) -> Result<()> {
    let storage = Storage::open(db).await?;
    let assemblies = AssemblyStore::with_bucket(&storage, config.store.assembly_bucket.clone());
    assemblies.delete(id).await?;
    println!("Deleted {id}");
    Ok(())
}

async fn cmd_sources(
    config: &AppConfig,
    db: &Path,
    assemblies_id: &str,
    assembly_id: &str,
) -> Result<()> {
    let registry = ManagerRegistry::with_defaults(&config.repository)?;
    let storage = open_readonly(db).await?;
    let resolver = StoreResolver::new(&storage, config.store.component_bucket.clone());
    let composer = Composer::new(
        AssemblyStore::with_bucket(&storage, config.store.assembly_bucket.clone()),
        &resolver,
    )
    .with_default_hdd(config.defaults.hdd.clone());

    let carton = composer.compose(assemblies_id, assembly_id).await?;
    let fetched = fetch_sources(&carton, &registry)?;

    if fetched.is_empty() {
        println!("No enabled repositories in {assembly_id}");
    }
    for source in fetched {
        println!("{} -> {}", source.box_id, source.path.display());
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

/// Parse `key=value` arguments; repeated keys collect their values in order.
fn parse_outputs(pairs: &[String]) -> Result<BTreeMap<String, Vec<String>>> {
    let mut replacements: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| eyre!("expected key=value, got '{pair}'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(eyre!("empty key in '{pair}'"));
        }
        replacements
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(replacements)
}
