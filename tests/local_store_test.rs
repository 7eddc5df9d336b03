mod helpers;

use hearth::memory::list::ListOptions;
use hearth::memory::local::LocalStore;
use hearth::memory::search::SearchOptions;
use hearth::memory::types::{HitSource, Importance, NewMemory};
use hearth::retrieval::{SearchMode, SearchRequest};
use serde_json::json;

async fn seed_noise(store: &LocalStore) {
    for (i, content) in [
        "Grocery list includes oat milk and rye bread",
        "The dentist moved the appointment to Friday",
        "Wifi password for the guest network is on the fridge",
        "Recycling goes out every other Wednesday",
    ]
    .into_iter()
    .enumerate()
    {
        let new = NewMemory {
            timestamp: Some(1_000 + i as i64),
            ..NewMemory::new(content)
        };
        store.store(new).await.unwrap();
    }
}

#[tokio::test]
async fn stored_content_comes_back_first_for_its_own_words() {
    let store = LocalStore::in_memory().unwrap();
    seed_noise(&store).await;

    let content = "Emma's violin lesson is with Mrs. Albrecht on Thursdays";
    let stored = store.store(NewMemory::new(content)).await.unwrap();

    let hits = store
        .search("violin lesson Albrecht", SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(hits[0].id(), stored.id);
    assert_eq!(hits[0].memory.content, content);
    assert_eq!(hits[0].score, 1.0);
    assert_eq!(hits[0].sources, vec![HitSource::Keyword]);
}

#[tokio::test]
async fn record_fields_survive_storage() {
    let store = LocalStore::in_memory().unwrap();
    let metadata = json!({"source": "chat", "tags": ["school", "pickup"], "nested": {"n": 3}});
    let new = NewMemory {
        id: Some("pickup-1".into()),
        content: "School pickup switches to 3:15 in spring".into(),
        memory_type: Some("schedule".into()),
        category: Some("school".into()),
        importance: Some(Importance::High),
        metadata: Some(metadata.clone()),
        timestamp: Some(1_700_000_000_000),
    };
    store.store(new).await.unwrap();

    let record = store.get("pickup-1").await.unwrap().unwrap();
    assert_eq!(record.memory_type, "schedule");
    assert_eq!(record.category.as_deref(), Some("school"));
    assert_eq!(record.importance, Importance::High);
    assert_eq!(record.metadata, Some(metadata));
    assert_eq!(record.timestamp, 1_700_000_000_000);
    assert!(record.embedding.is_none());
}

#[tokio::test]
async fn defaults_apply_when_fields_are_omitted() {
    let store = LocalStore::in_memory().unwrap();
    let result = store.store(NewMemory::new("Bins are collected on Monday")).await.unwrap();
    assert!(!result.id.is_empty());
    assert!(result.timestamp > 0);

    let record = store.get(&result.id).await.unwrap().unwrap();
    assert_eq!(record.memory_type, "general");
    assert_eq!(record.importance, Importance::Medium);
    assert!(record.category.is_none());
}

#[tokio::test]
async fn storing_an_existing_id_replaces_it() {
    let store = LocalStore::in_memory().unwrap();
    for content in ["Thermostat schedule is 19C", "Thermostat schedule is 21C"] {
        let new = NewMemory {
            id: Some("thermo".into()),
            ..NewMemory::new(content)
        };
        store.store(new).await.unwrap();
    }

    let stats = store.get_stats().await.unwrap();
    assert_eq!(stats.total_memories, 1);
    let hits = store.search("thermostat", SearchOptions::default()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.content, "Thermostat schedule is 21C");
}

#[tokio::test]
async fn delete_is_idempotent_and_removes_from_search() {
    let store = LocalStore::in_memory().unwrap();
    let stored = store
        .store(NewMemory::new("Spare house key is under the blue planter"))
        .await
        .unwrap();

    assert!(store.delete_memory(&stored.id).await.unwrap().success);
    assert!(!store.delete_memory(&stored.id).await.unwrap().success);

    let hits = store.search("spare house key planter", SearchOptions::default()).await.unwrap();
    assert!(hits.iter().all(|h| h.id() != stored.id));
    assert!(store.get(&stored.id).await.unwrap().is_none());

    let health = store.health().await.unwrap();
    assert_eq!(health.memory_count, 0);
    assert_eq!(health.fts_row_count, 0);
}

#[tokio::test]
async fn stats_count_every_store() {
    let store = LocalStore::in_memory().unwrap();
    let before = store.get_stats().await.unwrap();
    assert_eq!(before.total_memories, 0);

    store
        .store(NewMemory::new("Car insurance renews in March").with_type("finance"))
        .await
        .unwrap();
    let after = store.get_stats().await.unwrap();
    assert_eq!(after.total_memories, before.total_memories + 1);
    assert_eq!(after.memory_types.get("finance"), Some(&1));
    assert_eq!(after.recent_memories, 1);
}

#[tokio::test]
async fn exact_file_names_rank_first_in_keyword_mode() {
    let service = helpers::keyword_service();
    helpers::put(&service, "cfg", "Deploy config lives in /etc/hearth/settings.yaml on the NAS", 10).await;
    helpers::put(&service, "other-1", "Change the settings on the router before travelling", 20).await;
    helpers::put(&service, "other-2", "The yaml linter complains about tabs", 30).await;

    for weight in [0.0, 0.3, 0.7, 1.0] {
        let request = SearchRequest {
            semantic_weight: Some(weight),
            ..SearchRequest::with_mode(SearchMode::Keyword)
        };
        let outcome = service.search("settings.yaml", &request).await.unwrap();
        assert!(!outcome.degraded);
        assert_eq!(outcome.results[0].id(), "cfg", "semantic weight {weight}");
    }
}

#[tokio::test]
async fn list_is_newest_first_and_filters_by_type() {
    let store = LocalStore::in_memory().unwrap();
    for (id, ty, ts) in [("a", "note", 1), ("b", "task", 2), ("c", "note", 3)] {
        let new = NewMemory {
            id: Some(id.into()),
            timestamp: Some(ts),
            ..NewMemory::new(format!("memory {id}")).with_type(ty)
        };
        store.store(new).await.unwrap();
    }

    let all = store
        .get_all(ListOptions { limit: 10, memory_type: None })
        .await
        .unwrap();
    let ids: Vec<_> = all.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["c", "b", "a"]);

    let notes = store
        .get_all(ListOptions { limit: 10, memory_type: Some("note".into()) })
        .await
        .unwrap();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|m| m.memory_type == "note"));
}

#[tokio::test]
async fn data_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("memory.db");

    let id = {
        let store = LocalStore::open(&path).unwrap();
        store
            .store(NewMemory::new("Passport expires in 2031"))
            .await
            .unwrap()
            .id
    };

    let store = LocalStore::open(&path).unwrap();
    let hits = store.search("passport", SearchOptions::default()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id(), id);
}
