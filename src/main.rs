//! git-analytics: turn a repository's history into a tagged dataset
//!
//! # Usage
//! ```bash
//! git-analytics parse-git myrepo --path-to-repo ~/code/myrepo
//! git-analytics prep-data myrepo --src-path src --module-depth 0
//! git-analytics authors suggest myrepo      # Propose author aliases
//! git-analytics stats myrepo --stat module_size
//! git-analytics serve myrepo --open         # JSON API on 127.0.0.1:3001
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_analytics::cache::Dataset;
use git_analytics::config::{ConfigOverrides, Settings};
use git_analytics::error::AppError;
use git_analytics::{pipeline, routes, stats};

/// Git commit-log analytics
#[derive(Parser)]
#[command(name = "git-analytics")]
#[command(about = "Turn a git history into a tagged commit dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding `<codebase>.yaml` and `<codebase>_stats.yaml`
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    /// Directory holding the raw and clean tables
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Export and parse the git log into the raw tables
    ParseGit {
        codebase: String,
        #[arg(long)]
        path_to_repo: Option<PathBuf>,
    },
    /// Build the clean tables (runs parse-git first when needed)
    PrepData {
        codebase: String,
        #[command(flatten)]
        convention: ConventionArgs,
        /// Rebuild every stage from the repository
        #[arg(long)]
        rerun: bool,
    },
    /// Compute aggregation views and print them as JSON
    Stats {
        codebase: String,
        /// Only this view
        #[arg(long)]
        stat: Option<String>,
        /// Use `<config_dir>/<codebase>_stats.yaml` instead of the built-in views
        #[arg(long)]
        custom_stats: bool,
        #[arg(long)]
        rerun: bool,
    },
    /// Author name helpers
    Authors {
        #[command(subcommand)]
        command: AuthorCommands,
    },
    /// Serve the dataset over a JSON API
    Serve {
        codebase: String,
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Open browser automatically after starting
        #[arg(short, long)]
        open: bool,
        #[arg(long)]
        custom_stats: bool,
    },
}

#[derive(Subcommand)]
enum AuthorCommands {
    /// Write an alias document grouping similar author names
    Suggest {
        codebase: String,
        /// Similarity ratio (0-100) above which names are grouped
        #[arg(long, default_value = "80")]
        threshold: u8,
    },
}

#[derive(clap::Args)]
struct ConventionArgs {
    /// Root of the `src` area
    #[arg(long)]
    src_path: Option<String>,
    /// Depth of the module directory below the area root
    #[arg(long)]
    module_depth: Option<usize>,
    /// Component names to look for (repeat or comma-separate)
    #[arg(long, value_delimiter = ',')]
    component_names: Vec<String>,
    /// Depth of the component segment below the area root
    #[arg(long)]
    component_depth: Option<usize>,
}

impl Cli {
    fn settings(&self, codebase: &str, overrides: &ConfigOverrides) -> anyhow::Result<Settings> {
        Ok(Settings::load(codebase, &self.config_dir, &self.data_dir, overrides)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &cli.command {
        Commands::ParseGit { codebase, path_to_repo } => {
            let overrides = ConfigOverrides {
                path_to_repo: path_to_repo.clone(),
                ..Default::default()
            };
            let settings = cli.settings(codebase, &overrides)?;
            let parsed = pipeline::parse_git(&settings)?;
            println!(
                "✓ {} commits, {} commit files parsed",
                parsed.commits.len(),
                parsed.files.len()
            );
        }
        Commands::PrepData { codebase, convention, rerun } => {
            let overrides = ConfigOverrides {
                src_path: convention.src_path.clone(),
                module_depth: convention.module_depth,
                component_names: convention.component_names.clone(),
                component_depth: convention.component_depth,
                ..Default::default()
            };
            let settings = cli.settings(codebase, &overrides)?;
            let (commits, files) = pipeline::prepare_data(&settings, *rerun)?;
            println!("✓ {} commits, {} commit files prepared", commits.len(), files.len());
        }
        Commands::Stats { codebase, stat, custom_stats, rerun } => {
            let settings = cli.settings(codebase, &ConfigOverrides::default())?;
            let (_, files) = pipeline::load_or_prepare(&settings, *rerun)?;

            let has_components = files.iter().any(|f| f.component_nm.is_some());
            let catalog = if *custom_stats {
                stats::load_catalog(&settings.stats_path())?
            } else {
                stats::default_catalog(has_components)
            };

            let results = match stat {
                Some(id) => {
                    let definition = catalog
                        .get(id)
                        .ok_or_else(|| AppError::NotFound(format!("stat '{}'", id)))?;
                    vec![stats::compute(id, definition, &files)?]
                }
                None => stats::compute_all(&catalog, &files)?,
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Authors {
            command: AuthorCommands::Suggest { codebase, threshold },
        } => {
            let settings = cli.settings(codebase, &ConfigOverrides::default())?;
            let (path, document) = pipeline::suggest_author_aliases(&settings, *threshold)?;
            println!("✓ {} alias groups written to {}", document.len(), path.display());
        }
        Commands::Serve { codebase, port, open, custom_stats } => {
            let settings = cli.settings(codebase, &ConfigOverrides::default())?;
            serve(settings, *port, *open, *custom_stats).await?;
        }
    }

    Ok(())
}

async fn serve(settings: Settings, port: u16, open: bool, custom_stats: bool) -> anyhow::Result<()> {
    pipeline::load_or_prepare(&settings, false)?;

    let catalog = if custom_stats {
        Some(stats::load_catalog(&settings.stats_path())?)
    } else {
        None
    };
    let dataset = Arc::new(Dataset::new(
        &settings.codebase_nm,
        pipeline::store_for(&settings),
        catalog,
    ));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(dataset))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to port {}: {} (try --port <PORT>)", port, e))?;

    let url = format!("http://127.0.0.1:{}", port);
    println!();
    println!("  Codebase: {}", settings.codebase_nm);
    println!("  Server:   {}", url);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    if open {
        if let Err(e) = open::that(&url) {
            eprintln!("  Warning: Could not open browser: {}", e);
        }
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
