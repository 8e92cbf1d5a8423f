//! Registre - command-line access to the courrier registers
//!
//! Reads and edits the ARRIVE / DEPART registers stored in the Courrier
//! data directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courrier::{Category, CourrierDraft, CourrierId, CourrierStore, KeyValueStore, Settings};
use log::{error, info};

mod fields;

use fields::parse_assignments;

#[derive(Parser)]
#[command(name = "registre")]
#[command(about = "Manage the incoming and outgoing mail registers")]
struct Cli {
    /// Register to operate on (arrive or depart)
    #[arg(short, long, default_value = "arrive")]
    category: Category,

    /// Override the data directory
    #[arg(long, env = "COURRIER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the register as JSON, newest first
    List,

    /// Add a courrier
    Add {
        /// Fields as key=value
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Merge fields into a courrier
    Update {
        id: i64,
        /// Fields as key=value
        #[arg(required = true)]
        fields: Vec<String>,
    },

    /// Set the statut of a courrier
    Status { id: i64, statut: String },

    /// Remove a courrier
    Remove { id: i64 },
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load()?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let storage: Arc<dyn KeyValueStore> = Arc::new(settings.open_storage()?);
    let mut store = CourrierStore::open(cli.category, storage, settings.create_bus());
    info!(
        "Register {} opened from {} ({} courriers)",
        store.category(),
        settings.data_dir.display(),
        store.len()
    );

    println!("{}", execute(&mut store, cli.command)?);
    Ok(())
}

/// Apply a command to the register and render the result as JSON.
///
/// Writes go through the reporting variants so a rejected save fails the
/// command instead of printing the unchanged register.
fn execute(store: &mut CourrierStore, command: Commands) -> Result<String> {
    match command {
        Commands::List => {}
        Commands::Add { fields } => {
            let draft = CourrierDraft::from(parse_assignments(&fields)?);
            let courrier = store.try_add(draft).context("courrier was not saved")?;
            return Ok(serde_json::to_string_pretty(&courrier)?);
        }
        Commands::Update { id, fields } => {
            let id = existing(store, id)?;
            store
                .try_update(id, &parse_assignments(&fields)?)
                .with_context(|| format!("courrier {id} was not updated"))?;
        }
        Commands::Status { id, statut } => {
            let id = existing(store, id)?;
            store
                .try_update_status(id, statut)
                .with_context(|| format!("statut of courrier {id} was not saved"))?;
        }
        Commands::Remove { id } => {
            let id = existing(store, id)?;
            store
                .try_remove(id)
                .with_context(|| format!("courrier {id} could not be removed"))?;
        }
    }

    Ok(serde_json::to_string_pretty(store.courriers())?)
}

fn existing(store: &CourrierStore, id: i64) -> Result<CourrierId> {
    let id = CourrierId::new(id);
    store
        .get(id)
        .map(|c| c.id)
        .with_context(|| format!("no courrier {} in register {}", id, store.category()))
}
