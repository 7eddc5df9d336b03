//! DDL the remote Postgres must carry for semantic search.
//!
//! Printed by `hearth remote-schema`; applying it is an operator task.

pub const REMOTE_SCHEMA_SQL: &str = r#"-- Hearth remote vector index (Postgres + pgvector)
create extension if not exists vector;

create table if not exists memories (
    id          text primary key,
    content     text not null,
    type        text not null default 'general',
    category    text,
    importance  text not null default 'medium',
    metadata    jsonb,
    timestamp   bigint not null,
    embedding   vector(1536),
    created_at  timestamptz not null default now()
);

create index if not exists memories_embedding_idx
    on memories using ivfflat (embedding vector_cosine_ops)
    with (lists = 100);

create or replace function match_memories(
    query_embedding vector(1536),
    match_threshold float,
    match_count int
)
returns table (
    id text,
    content text,
    type text,
    category text,
    importance text,
    metadata jsonb,
    timestamp bigint,
    similarity float
)
language sql stable
as $$
    select
        m.id,
        m.content,
        m.type,
        m.category,
        m.importance,
        m.metadata,
        m.timestamp,
        1 - (m.embedding <=> query_embedding) as similarity
    from memories m
    where m.embedding is not null
      and 1 - (m.embedding <=> query_embedding) >= match_threshold
    order by m.embedding <=> query_embedding
    limit match_count;
$$;
"#;
