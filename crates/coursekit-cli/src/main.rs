mod draft;
mod publish;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use coursekit_core::AppConfig;
use coursekit_draft::{DraftSession, DraftStore, FileStorage, KeyValueStorage, COURSE_DRAFT_KEY};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::draft::DraftCommands;

#[derive(Debug, Parser)]
#[command(name = "coursekit")]
#[command(about = "Build, preview and publish walking courses")]
struct Cli {
    /// Draft slot to work on
    #[arg(long, global = true, default_value = COURSE_DRAFT_KEY)]
    key: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create and edit the saved course draft
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Show the map preview (centroid and route) of the saved draft
    Geometry {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate, compress images and publish the saved draft
    Publish {
        /// Id of the publishing author
        #[arg(long, env = "COURSEKIT_AUTHOR_ID")]
        author: String,
    },
    /// Print a published course
    ShowCourse {
        /// Public id printed by `publish`
        id: Uuid,
    },
    /// Delete the saved draft
    Discard,
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Run pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = coursekit_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = open_store(&config);
    let result = run(cli, &config, &store).await;

    if !store.flush() {
        tracing::warn!(dir = %config.draft_dir.display(), "pending draft changes could not be saved");
    }
    result
}

fn open_store(config: &AppConfig) -> DraftStore {
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(config.draft_dir.clone()));
    DraftStore::with_debounce(storage, Duration::from_millis(config.draft_debounce_ms))
}

async fn run(cli: Cli, config: &AppConfig, store: &DraftStore) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        let session = DraftSession::resume(store.clone(), cli.key);
        println!("{}", draft::render_summary(&session));
        return Ok(());
    };

    match command {
        Commands::Draft { command } => {
            let mut session = DraftSession::resume(store.clone(), cli.key);
            let output = draft::run_draft_command(&mut session, command, config)?;
            println!("{output}");
        }
        Commands::Geometry { json } => {
            let session = DraftSession::resume(store.clone(), cli.key);
            println!("{}", draft::render_geometry(&session.geometry(), json)?);
        }
        Commands::Publish { author } => {
            let course_id = publish::run_publish(config, store, &cli.key, &author).await?;
            println!("published course {course_id}");
        }
        Commands::ShowCourse { id } => {
            println!("{}", publish::run_show_course(config, id).await?);
        }
        Commands::Discard => {
            let session = DraftSession::resume(store.clone(), cli.key);
            if !session.was_restored() {
                println!("no saved draft");
            } else if session.discard() {
                println!("draft discarded");
            } else {
                anyhow::bail!("draft could not be deleted from {}", config.draft_dir.display());
            }
        }
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                let pool = coursekit_db::connect_pool_from_config(config).await?;
                coursekit_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                let pool = coursekit_db::connect_pool_from_config(config).await?;
                coursekit_db::run_migrations(&pool).await?;
                println!("migrations applied");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests;
