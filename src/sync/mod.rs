//! Background sync from the local store to the remote vector index.
//!
//! The write path only mirrors best-effort; this daemon is what makes the
//! replica eventually consistent. Each tick takes the rows changed since
//! their last upload plus the newest synced ones, asks the index which ids it
//! already has, and embeds and upserts every changed or missing row. Remote
//! deletes that failed earlier are retried. An unreachable remote just skips
//! the tick.

pub mod migrate;

use anyhow::Result;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::SyncConfig;
use crate::retrieval::MemoryService;
pub use migrate::{migrate_all, MigrationOptions, MigrationReport};

/// Outcome of one sync tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub scanned: usize,
    pub already_synced: usize,
    pub uploaded: usize,
    pub failed: usize,
    /// Queued remote deletes that went through this tick.
    pub remote_deleted: usize,
    /// The index could not be asked which ids it holds; nothing was pushed.
    pub remote_unavailable: bool,
}

pub struct SyncDaemon {
    service: MemoryService,
    interval: Duration,
    batch_size: usize,
}

impl SyncDaemon {
    pub fn new(service: MemoryService, config: &SyncConfig) -> Self {
        Self {
            service,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            batch_size: config.batch_size.max(1),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Tick until `shutdown` becomes `true` (or its sender is dropped).
    ///
    /// Shutdown is only observed between ticks; a running batch finishes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if !self.service.vector_search_enabled() {
            tracing::info!("sync daemon idle: no embedding provider or remote index configured");
            return;
        }

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            batch_size = self.batch_size,
            "sync daemon started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(report) if report.remote_unavailable => {
                            tracing::debug!("remote index unreachable, sync suspended until next tick");
                        }
                        Ok(report) if report.uploaded > 0 || report.failed > 0 || report.remote_deleted > 0 => {
                            tracing::info!(
                                scanned = report.scanned,
                                uploaded = report.uploaded,
                                failed = report.failed,
                                remote_deleted = report.remote_deleted,
                                "sync tick complete"
                            );
                        }
                        Ok(report) => {
                            tracing::debug!(scanned = report.scanned, "sync tick: nothing to upload");
                        }
                        Err(e) => tracing::error!(error = %e, "sync tick failed to read local store"),
                    }
                }
            }
        }

        tracing::info!("sync daemon stopped");
    }

    /// One sync pass. Only a local-store failure is an error.
    pub async fn run_once(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        if self.service.index().is_none() {
            report.remote_unavailable = true;
            return Ok(report);
        }

        let candidates = self.service.local().sync_candidates(self.batch_size).await?;
        report.scanned = candidates.len();

        if !candidates.is_empty() {
            let ids: Vec<String> = candidates.iter().map(|c| c.record.id.clone()).collect();
            let existing = match self.service.remote_existing_ids(&ids).await {
                Ok(existing) => existing,
                Err(e) => {
                    tracing::debug!(error = %e, "remote id lookup failed");
                    report.remote_unavailable = true;
                    return Ok(report);
                }
            };

            for candidate in candidates {
                if !candidate.dirty && existing.contains(&candidate.record.id) {
                    report.already_synced += 1;
                    continue;
                }
                let id = candidate.record.id.clone();
                match self.service.push_record(candidate.record).await {
                    Ok(()) => report.uploaded += 1,
                    Err(e) => {
                        tracing::warn!(id = %id, error = %e, "sync upload failed");
                        report.failed += 1;
                    }
                }
            }
        }

        self.retry_remote_deletes(&mut report).await?;
        Ok(report)
    }

    /// Work through queued remote deletes until one fails.
    async fn retry_remote_deletes(&self, report: &mut SyncReport) -> Result<()> {
        let local = self.service.local();
        for id in local.pending_remote_deletes(self.batch_size).await? {
            if let Err(e) = self.service.delete_remote(&id).await {
                tracing::debug!(id = %id, error = %e, "queued remote delete still failing");
                break;
            }
            report.remote_deleted += 1;
            if !local.clear_remote_delete(&id).await? {
                // Stored again while the delete was in flight.
                local.mark_unsynced(&id).await?;
            }
        }
        Ok(())
    }
}
