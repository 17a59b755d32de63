use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use goalboard::client::GoalboardClient;
use goalboard::config::ServerConfig;
use goalboard::models::{CategoryName, GoalFilter};
use goalboard::store::GoalStore;
use goalboard::{api, db, render, seed};

#[derive(Parser)]
#[command(name = "goalboard")]
#[command(about = "Team goal-tracking board")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the goalboard server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,

        /// SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,

        /// Directory with the built board UI
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Load sample categories and goals into the database
    Seed {
        /// SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print the board from a running server
    List {
        /// Only goals in these categories (repeatable)
        #[arg(short, long)]
        category: Vec<String>,

        /// Only goals with this owner
        #[arg(short, long)]
        owner: Option<String>,

        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Print board totals from a running server
    Summary,
    /// Move a goal to the position of another goal
    Move { active: Uuid, over: Uuid },
    /// List categories and their colors
    Categories,
}

/// Initialize tracing with output to stderr (for client commands) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "goalboard=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Client commands print the board on stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let db = open_database(config.database_path.clone())?;
    let app = api::create_router_with_config(db, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("goalboard server listening on http://{}", config.bind_addr());

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            db,
            static_dir,
        }) => {
            let mut config = ServerConfig::from_env()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if db.is_some() {
                config.database_path = db;
            }
            if static_dir.is_some() {
                config.static_dir = static_dir;
            }
            serve(config).await?;
        }
        Some(Commands::Seed { db }) => {
            let path = db.or(ServerConfig::from_env()?.database_path);
            let db = open_database(path)?;
            let report = seed::seed(&db)?;
            println!("Created {} categories", report.categories_created);
            for title in &report.goals_created {
                println!("  - {}", title);
            }
        }
        Some(Commands::List {
            category,
            owner,
            search,
        }) => {
            let categories = if category.is_empty() {
                None
            } else {
                Some(
                    category
                        .into_iter()
                        .map(CategoryName::new)
                        .collect::<Result<Vec<_>, _>>()?,
                )
            };
            let filter = GoalFilter {
                categories,
                owner,
                search,
            };

            let store = GoalStore::load(GoalboardClient::from_env()).await?;
            print!("{}", render::render_board(&store.visible_goals(&filter)));
            println!("{}", render::render_summary(&store.summary(&filter)));
        }
        Some(Commands::Summary) => {
            let client = GoalboardClient::from_env();
            let summary = client.summary(&GoalFilter::default()).await?;
            println!("{}", render::render_summary(&summary));
            println!("Owners: {}", client.owners().await?.join(", "));
        }
        Some(Commands::Move { active, over }) => {
            let mut store = GoalStore::load(GoalboardClient::from_env()).await?;
            store.reorder(active, over).await?;
            print!("{}", render::render_board(&store.visible_goals(&GoalFilter::default())));
        }
        Some(Commands::Categories) => {
            let store = GoalStore::load(GoalboardClient::from_env()).await?;
            print!("{}", render::render_categories(store.categories()));
        }
        None => {
            serve(ServerConfig::from_env()?).await?;
        }
    }

    Ok(())
}
