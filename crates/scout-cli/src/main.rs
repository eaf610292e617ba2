mod cycle;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "scout")]
#[command(about = "Creator profile discovery and scraping pipeline")]
struct Cli {
    /// Discovery file; overrides SCOUT_DISCOVERY_PATH.
    #[arg(long, global = true)]
    discovery: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run discovery cycles until interrupted.
    Run,
    /// Run a single cycle and print its statistics.
    Once {
        /// Keep results in memory instead of writing to Postgres.
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply pending database migrations.
    Migrate,
    /// Show stored creator counts and the largest creators.
    Stats {
        /// Number of top creators to list.
        #[arg(long, default_value_t = 10)]
        top: i64,
        /// Restrict the top list to one platform.
        #[arg(long)]
        platform: Option<scout_core::Platform>,
        /// Restrict the top list to one niche.
        #[arg(long)]
        niche: Option<scout_core::Niche>,
    },
    /// Show recently persisted cycle statistics.
    Cycles {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut config = scout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    if let Some(path) = cli.discovery {
        config.discovery_path = path;
    }
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Run => {
            let shutdown = shutdown_token();
            cycle::run_forever(&config, shutdown).await?;
        }
        Commands::Once { dry_run } => {
            let shutdown = shutdown_token();
            cycle::run_once(&config, dry_run, shutdown).await?;
        }
        Commands::Migrate => {
            let pool = scout_db::connect_from_app_config(&config).await?;
            let applied = scout_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Stats {
            top,
            platform,
            niche,
        } => {
            let pool = scout_db::connect_from_app_config(&config).await?;
            report::print_stats(&pool, top, platform, niche).await?;
        }
        Commands::Cycles { limit } => {
            let pool = scout_db::connect_from_app_config(&config).await?;
            report::print_cycles(&pool, limit).await?;
        }
    }

    Ok(())
}

/// A token cancelled on ctrl-c or SIGTERM.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });
    token
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, finishing current cycle");
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_once_dry_run() {
        let cli = Cli::try_parse_from(["scout", "once", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::Once { dry_run: true }));
        assert!(cli.discovery.is_none());
    }

    #[test]
    fn parses_stats_filters() {
        let cli = Cli::try_parse_from([
            "scout", "stats", "--top", "5", "--platform", "linkedin", "--niche", "tech",
        ])
        .unwrap();
        match cli.command {
            Commands::Stats {
                top,
                platform,
                niche,
            } => {
                assert_eq!(top, 5);
                assert_eq!(platform, Some(scout_core::Platform::Linkedin));
                assert_eq!(niche, Some(scout_core::Niche::Tech));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["scout", "stats", "--platform", "tiktok"]).is_err());
    }

    #[test]
    fn discovery_override_is_global() {
        let cli = Cli::try_parse_from(["scout", "run", "--discovery", "/tmp/d.yaml"]).unwrap();
        assert_eq!(cli.discovery, Some(PathBuf::from("/tmp/d.yaml")));
    }
}
