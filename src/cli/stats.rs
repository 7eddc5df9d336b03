use anyhow::Result;
use chrono::{TimeZone, Utc};

use crate::config::HearthConfig;
use crate::memory::local::LocalStore;

/// Display memory statistics in the terminal.
pub async fn stats(config: &HearthConfig) -> Result<()> {
    let store = LocalStore::open(config.resolved_db_path())?;
    let response = store.get_stats().await?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Last 24 hours:       {}", response.recent_memories);
    println!("  With embedding:      {}", response.with_embedding);
    println!("  Distinct categories: {}", response.distinct_categories);
    println!();

    println!("By Type ({}):", response.distinct_types);
    for (memory_type, count) in &response.memory_types {
        println!("  {:<16} {}", memory_type, count);
    }
    println!();

    if let Some(oldest) = response.oldest_timestamp.and_then(format_millis) {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(newest) = response.newest_timestamp.and_then(format_millis) {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}

fn format_millis(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms).single().map(|t| t.to_rfc3339())
}
