//! # Storebot CLI
//!
//! ```bash
//! storebot --config ./config/storebot.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `storebot init` | Create the SQLite database and run schema migrations |
//! | `storebot seed <file>` | Load a JSON product catalog and reindex |
//! | `storebot ingest` | Build the docs index (`--force` to rebuild) |
//! | `storebot reindex` | Force a full product index rebuild |
//! | `storebot ask "<message>"` | Run a single chat turn from the terminal |
//! | `storebot serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use storebot::app::AppContext;
use storebot::{catalog, chat, config, db, docs, migrate, server};

/// Storebot — a RAG-backed shopping assistant for an e-commerce storefront.
#[derive(Parser)]
#[command(
    name = "storebot",
    about = "RAG-backed shopping assistant: product search, document retrieval, and local-LLM chat",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/storebot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Load a JSON array of products into the catalog and reindex.
    Seed {
        /// Path to the JSON product file.
        file: PathBuf,
    },

    /// Build the knowledge-document index from the configured docs
    /// directory. Skipped when already populated unless --force.
    Ingest {
        /// Delete and rebuild the docs collection.
        #[arg(long)]
        force: bool,
    },

    /// Force a full product index rebuild from the catalog.
    Reindex,

    /// Run one chat turn and print the reply.
    Ask {
        /// The user message.
        message: String,

        /// User identity the turn is logged under.
        #[arg(long, default_value = "cli")]
        user: String,
    },

    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config).unwrap_or_else(|e| {
        if cli.config.exists() {
            // A present-but-broken config is an error; a missing one
            // falls back to defaults for quick local runs.
            eprintln!("{}", e);
            std::process::exit(1);
        }
        config::Config::default()
    });

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Seed { file } => {
            let ctx = AppContext::initialize(cfg).await?;
            let created = catalog::seed_from_file(&ctx.pool, &file).await?;
            let indexed = ctx.reindex().await?;
            println!("Seeded {} products ({} indexed).", created.len(), indexed);
        }
        Commands::Ingest { force } => {
            let ctx = AppContext::initialize(cfg).await?;
            let chunks = docs::build_docs_index_if_missing(
                ctx.store.as_ref(),
                &ctx.config.docs,
                &ctx.config.chunking,
                force,
            )
            .await?;
            if chunks == 0 && !force {
                println!("Docs index already populated; use --force to rebuild.");
            } else {
                println!("Indexed {} document chunks.", chunks);
            }
        }
        Commands::Reindex => {
            let ctx = AppContext::initialize(cfg).await?;
            let indexed = ctx.reindex().await?;
            println!("Product index rebuilt: {} products.", indexed);
        }
        Commands::Ask { message, user } => {
            let ctx = AppContext::initialize(cfg).await?;
            let reply = chat::handle_turn(&ctx, &user, &message).await?;
            println!("{}", reply);
        }
        Commands::Serve => {
            let ctx = AppContext::initialize(cfg).await?;
            server::run_server(ctx).await?;
        }
    }

    Ok(())
}
