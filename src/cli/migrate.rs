//! CLI `migrate` command: push the whole local store to the remote index.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::HearthConfig;
use crate::sync::{migrate_all, MigrationOptions};

/// Bulk-migrate every memory, showing progress. Ctrl-C stops after the
/// current batch.
pub async fn migrate(
    config: HearthConfig,
    batch_size: Option<usize>,
    delay_ms: Option<u64>,
    force: bool,
) -> Result<()> {
    let mut options = MigrationOptions::from_config(&config.sync);
    if let Some(batch_size) = batch_size {
        options.batch_size = batch_size.max(1);
    }
    if let Some(delay_ms) = delay_ms {
        options.delay = Duration::from_millis(delay_ms);
    }
    options.force = force;

    let service = crate::server::build_service(config).await?;
    let total = service.local().get_stats().await?.total_memories;
    if total == 0 {
        println!("No memories to migrate.");
        return Ok(());
    }

    println!(
        "Migrating {total} memories in batches of {} ({} ms between batches)...",
        options.batch_size,
        options.delay.as_millis()
    );

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")?
            .progress_chars("##-"),
    );

    let (stop_tx, mut stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });

    let report = migrate_all(&service, &options, &mut stop_rx, |progress| {
        pb.set_position(progress.processed as u64);
        pb.set_message(format!("{} failed", progress.failed));
    })
    .await;
    pb.finish_and_clear();
    let report = report?;

    println!("Processed:  {}", report.processed);
    println!("Uploaded:   {}", report.uploaded);
    println!("Skipped:    {} (already in remote index)", report.skipped);
    println!("Failed:     {}", report.failed);
    if report.interrupted {
        println!("Interrupted; run `hearth migrate` again to continue.");
    }

    Ok(())
}
