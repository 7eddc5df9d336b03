use anyhow::Result;

use crate::config::HearthConfig;
use crate::retrieval::{SearchMode, SearchRequest};

/// Run a search from the terminal.
pub async fn search(config: HearthConfig, query: &str, mode: SearchMode, limit: Option<usize>) -> Result<()> {
    let service = crate::server::build_service(config).await?;

    let request = SearchRequest {
        mode,
        limit,
        ..SearchRequest::default()
    };
    let outcome = service.search(query, &request).await?;

    if outcome.degraded {
        eprintln!("note: semantic search unavailable, showing keyword results");
    }

    if outcome.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s) ({} search)\n", outcome.results.len(), outcome.mode);

    for (i, hit) in outcome.results.iter().enumerate() {
        let sources: Vec<&str> = hit.sources.iter().map(|s| s.as_str()).collect();
        println!(
            "  {}. [{}] {} (score: {:.4}, via {})",
            i + 1,
            hit.memory.memory_type,
            hit.id(),
            hit.score,
            sources.join("+"),
        );
        println!("     {}", super::preview(&hit.memory.content, 120));
        println!();
    }

    Ok(())
}
