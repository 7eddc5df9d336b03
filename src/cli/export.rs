use anyhow::Result;
use serde::Serialize;

use crate::config::HearthConfig;
use crate::memory::list::ListOptions;
use crate::memory::local::LocalStore;
use crate::memory::types::MemoryRecord;

/// Export format: every memory, newest first.
#[derive(Debug, Serialize)]
struct ExportData {
    exported_at: String,
    memories: Vec<MemoryRecord>,
}

/// Export all memories as JSON to stdout.
pub async fn export(config: &HearthConfig, memory_type: Option<String>) -> Result<()> {
    let store = LocalStore::open(config.resolved_db_path())?;
    let memories = store
        .get_all(ListOptions {
            limit: i64::MAX as usize,
            memory_type,
        })
        .await?;

    let data = ExportData {
        exported_at: chrono::Utc::now().to_rfc3339(),
        memories,
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!("Exported {} memories.", data.memories.len());

    Ok(())
}
