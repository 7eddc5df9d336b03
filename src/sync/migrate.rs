//! One-shot bulk migration of the whole local store to the remote index.
//!
//! Pages oldest first in small batches with a pause between them, to stay
//! under embedding-provider rate limits. Stops cleanly at a batch boundary
//! when shutdown is signalled.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::retrieval::MemoryService;

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub batch_size: usize,
    /// Pause between batches.
    pub delay: Duration,
    /// Re-upload records the remote already has current copies of.
    pub force: bool,
}

impl MigrationOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.migration_batch_size.max(1),
            delay: Duration::from_millis(config.migration_delay_ms),
            force: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub processed: usize,
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub batches: usize,
    pub interrupted: bool,
}

/// Migrate every local record. `on_batch` sees the running totals after
/// each batch.
///
/// Fails upfront when vector search is not configured, and when the remote
/// cannot answer which ids it already holds.
pub async fn migrate_all<F>(
    service: &MemoryService,
    options: &MigrationOptions,
    shutdown: &mut watch::Receiver<bool>,
    mut on_batch: F,
) -> Result<MigrationReport>
where
    F: FnMut(&MigrationReport),
{
    if !service.vector_search_enabled() {
        bail!("migration needs both an embedding API key and a remote index (SUPABASE_URL / SUPABASE_SERVICE_KEY)");
    }

    let batch_size = options.batch_size.max(1);
    let mut report = MigrationReport::default();
    let mut offset = 0;

    loop {
        let page = service.local().page_for_migration(offset, batch_size).await?;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        let last_page = page.len() < batch_size;

        let existing = if options.force {
            HashSet::new()
        } else {
            let ids: Vec<String> = page.iter().map(|c| c.record.id.clone()).collect();
            service.remote_existing_ids(&ids).await?
        };

        for candidate in page {
            report.processed += 1;
            if !candidate.dirty && existing.contains(&candidate.record.id) {
                report.skipped += 1;
                continue;
            }
            let id = candidate.record.id.clone();
            match service.push_record(candidate.record).await {
                Ok(()) => report.uploaded += 1,
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "migration upload failed");
                    report.failed += 1;
                }
            }
        }
        report.batches += 1;
        on_batch(&report);

        if last_page {
            break;
        }
        if stop_requested(shutdown, options.delay).await {
            report.interrupted = true;
            tracing::info!(processed = report.processed, "migration interrupted at batch boundary");
            break;
        }
    }

    tracing::info!(
        processed = report.processed,
        uploaded = report.uploaded,
        skipped = report.skipped,
        failed = report.failed,
        "migration finished"
    );
    Ok(report)
}

/// Wait out the inter-batch delay. Returns `true` if shutdown was signalled.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // Sender gone: nobody can ask us to stop any more.
                    (&mut sleep).await;
                    return false;
                }
                if *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}
