//! CLI `doctor` command: database diagnostics plus a remote reachability probe.

use anyhow::{Context, Result};

use crate::config::HearthConfig;
use crate::db;
use crate::memory::local::LocalStore;
use crate::remote::supabase::SupabaseIndex;

/// Run diagnostics and print a health report.
pub async fn doctor(config: &HearthConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `hearth serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let store = LocalStore::open(&db_path).context("failed to open database (may be corrupt)")?;
    let report = store.health().await.context("failed to run health check")?;

    println!("Hearth Health Report");
    println!("====================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {} (current {})", report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    println!("SQLite:            v{}", report.sqlite_version);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.embedding.model);
    if report
        .embedding_model
        .as_deref()
        .is_some_and(|stored| stored != config.embedding.model)
    {
        println!("  NOTE: cached vectors are dropped and re-uploaded on next start.");
    }
    let key_present = config.embedding.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
    println!("  API key:         {}", if key_present { "set" } else { "missing (keyword-only)" });
    println!();
    println!("Row counts:");
    println!("  Memories:        {}", report.memory_count);
    println!("  FTS documents:   {}", report.fts_row_count);
    println!("  Embedded:        {}", report.embedded_count);
    println!("  Not yet synced:  {}", report.unsynced_count);
    println!("  Pending deletes: {}", report.pending_delete_count);
    if report.fts_row_count != report.memory_count {
        println!("  WARNING: keyword index is out of step with the memories table.");
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or export what is readable: hearth export > backup.json");
    }
    println!();

    print!("Remote index:      ");
    if !config.remote.is_configured() {
        println!("not configured (set SUPABASE_URL and SUPABASE_SERVICE_KEY)");
        return Ok(());
    }
    let index = SupabaseIndex::from_config(&config.remote)?;
    match index.ping().await {
        Ok(()) => println!("reachable ({})", config.remote.table),
        Err(e) => {
            println!("UNREACHABLE ({e:#})");
            println!("  Semantic search will degrade to keyword results.");
            println!("  If the table is missing, apply `hearth remote-schema` to the database.");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::format_bytes;

    #[test]
    fn formats_sizes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
