//! Read-only `stats` and `cycles` command handlers.

use scout_core::{Niche, Platform};
use sqlx::PgPool;

pub(crate) async fn print_stats(
    pool: &PgPool,
    top: i64,
    platform: Option<Platform>,
    niche: Option<Niche>,
) -> anyhow::Result<()> {
    let stats = scout_db::creator_stats(pool).await?;
    println!("creators: {}", stats.total);
    for row in &stats.by_source {
        println!("  source {:<12} {}", row.label, row.count);
    }
    for row in &stats.by_niche {
        println!("  niche  {:<12} {}", row.label, row.count);
    }

    let creators = scout_db::list_top_creators(
        pool,
        platform.map(Platform::as_str),
        niche.map(Niche::as_str),
        top,
    )
    .await?;
    if creators.is_empty() {
        return Ok(());
    }

    println!("top creators by followers:");
    for creator in creators {
        let engagement = creator
            .engagement_rate
            .map_or_else(|| "-".to_string(), |r| format!("{:.2}%", r * 100.0));
        println!(
            "  {:>10}  {:<9} {:<14} {:>7}  {}",
            creator
                .follower_count
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            creator.source,
            creator.niche.as_deref().unwrap_or("-"),
            engagement,
            creator.profile_url,
        );
    }
    Ok(())
}

pub(crate) async fn print_cycles(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = scout_db::list_recent_cycle_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no cycles recorded yet");
        return Ok(());
    }

    for run in runs {
        let degraded = run.degradations.as_array().map_or(0, Vec::len);
        println!(
            "{}  cycle {:>5}  discovered={} deduped_out={} attempts={} successes={} \
             soft={} hard={} inserted={} updated={} degraded={} ({} ms)",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.cycle_number,
            run.discovered,
            run.deduped_out,
            run.fetch_attempts,
            run.successes,
            run.soft_failures,
            run.hard_failures,
            run.records_inserted,
            run.records_updated,
            degraded,
            run.duration_ms,
        );
    }
    Ok(())
}
