//! Hearth: a memory retrieval server for assistant agents.
//!
//! Memories are stored in a local SQLite database with an FTS5 keyword index
//! and mirrored, with OpenAI embeddings, into a remote Postgres + pgvector
//! index. Searches fan out to both and merge the results by a weighted score.
//! The local store is the source of truth; when the remote side or the
//! embedding provider is unavailable, every search still answers with
//! keyword results.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with an external-content FTS5 table, BM25 ranking
//! - **Embeddings**: OpenAI-compatible `/v1/embeddings` (text-embedding-3-small, 1536 dimensions)
//! - **Vector index**: Supabase/PostgREST over pgvector, `match_memories` RPC
//! - **Search**: keyword, semantic, or hybrid (weighted merge, 0.7 / 0.3 by default)
//! - **Sync**: background daemon that embeds and uploads records the index lacks
//! - **Transport**: REST over axum, and MCP over stdio or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`memory`]: Local store: write, keyword search, listing, stats, delete
//! - [`embedding`]: Text-to-vector embedding with a failure-tolerant wrapper
//! - [`remote`]: Remote vector index client and its schema
//! - [`retrieval`]: Hybrid search orchestration and the write path
//! - [`sync`]: Sync daemon and bulk migration
//! - [`routes`], [`tools`], [`server`], [`cli`]: HTTP, MCP, process wiring, and terminal commands

pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod memory;
pub mod remote;
pub mod retrieval;
pub mod routes;
pub mod server;
pub mod sync;
pub mod tools;
