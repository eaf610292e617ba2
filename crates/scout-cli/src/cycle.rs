//! `run` and `once` command handlers.
//!
//! Both build the same controller; they differ only in how many cycles run
//! and, for `once --dry-run`, which store receives the results.

use std::sync::Arc;

use anyhow::Context;
use scout_core::{load_discovery_config, AppConfig};
use scout_extract::ExtractClient;
use scout_pipeline::{
    Collaborators, CreatorStore, CycleController, CycleSettings, CycleStats, ExtractBrowseSource,
    ExtractProfileFetcher, MemoryStore, PgCreatorStore,
};
use tokio_util::sync::CancellationToken;

fn build_controller(
    config: &AppConfig,
    store: Arc<dyn CreatorStore>,
    shutdown: CancellationToken,
) -> anyhow::Result<CycleController> {
    let discovery = load_discovery_config(&config.discovery_path).with_context(|| {
        format!(
            "failed to load discovery config from {}",
            config.discovery_path.display()
        )
    })?;

    let client = Arc::new(
        ExtractClient::new(
            &config.extract_base_url,
            config.extract_timeout_secs,
            &config.user_agent,
        )
        .context("failed to build extraction client")?
        .with_raw_payloads(config.store_raw),
    );

    let collaborators = Collaborators {
        browse: Arc::new(ExtractBrowseSource::new(Arc::clone(&client))),
        fetcher: Arc::new(ExtractProfileFetcher::new(client)),
        store,
    };

    let controller = CycleController::new(
        collaborators,
        &discovery,
        CycleSettings::from_app_config(config),
        shutdown,
    )?;
    Ok(controller)
}

async fn postgres_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CreatorStore>> {
    let pool = scout_db::connect_from_app_config(config).await?;
    scout_db::run_migrations(&pool).await?;
    Ok(Arc::new(PgCreatorStore::new(pool)))
}

/// Runs cycles until `shutdown` fires.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the database is
/// unreachable at startup. Failures inside cycles are logged, never returned.
pub(crate) async fn run_forever(
    config: &AppConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let store = postgres_store(config).await?;
    let mut controller = build_controller(config, store, shutdown)?;
    let completed = controller.run_forever().await;

    let totals = controller.totals();
    println!(
        "stopped after {completed} cycle(s): {} discovered, {} fetched, {} inserted, {} updated",
        totals.discovered, totals.successes, totals.inserted, totals.updated
    );
    Ok(())
}

/// Runs exactly one cycle and prints its statistics.
///
/// With `dry_run` the results go to an in-memory store and the database is
/// never contacted.
///
/// # Errors
///
/// Same as [`run_forever`].
pub(crate) async fn run_once(
    config: &AppConfig,
    dry_run: bool,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn CreatorStore> = if dry_run {
        Arc::clone(&memory) as Arc<dyn CreatorStore>
    } else {
        postgres_store(config).await?
    };

    let mut controller = build_controller(config, store, shutdown)?;
    let stats = controller.run_cycle().await;
    print_cycle(&stats);

    if dry_run {
        for record in memory.records().await {
            println!(
                "dry-run: {} followers={} niche={}",
                record.profile_url,
                record
                    .follower_count
                    .map_or_else(|| "-".to_string(), |n| n.to_string()),
                record.niche.map_or("-", |n| n.as_str()),
            );
        }
    }
    Ok(())
}

fn print_cycle(stats: &CycleStats) {
    println!(
        "cycle {} ({}): discovered={} filtered_out={} deduped_out={} blocked={} attempts={} \
         successes={} soft_failures={} hard_failures={} inserted={} updated={} rejected={} \
         duration_ms={}",
        stats.cycle,
        stats.public_id,
        stats.discovered,
        stats.filtered_out,
        stats.deduped_out,
        stats.blocked,
        stats.fetch_attempts,
        stats.successes,
        stats.soft_failures,
        stats.hard_failures,
        stats.inserted,
        stats.updated,
        stats.rejected,
        stats.duration.as_millis(),
    );
    for degradation in &stats.degradations {
        println!("  degraded: {degradation}");
    }
}
