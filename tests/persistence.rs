use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use hackhub_assistant::{
    ChatBackend, ChatError, ChatMessage, ChatRequest, ChatSession, EventBus, KeyValueStore,
    PageView, SessionEvent, SessionLimits, Snapshot, SqliteStore, SNAPSHOT_KEY,
};

struct Canned;

#[async_trait]
impl ChatBackend for Canned {
    async fn send(&self, _request: &ChatRequest) -> Result<String, ChatError> {
        Ok("Bring a charger.".to_string())
    }
}

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    let store = SqliteStore::new(dir.path().join("nested").join("assistant.db"))
        .await
        .expect("store should open");
    store.init().await.expect("schema should initialize");
    Arc::new(store)
}

#[tokio::test]
async fn sqlite_store_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir).await;

    assert_eq!(store.get("k").await.unwrap(), None);
    store.set("k", "one").await.unwrap();
    store.set("k", "two").await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
    store.remove("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn conversation_survives_a_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir).await;

    let first = ChatSession::load(
        Arc::new(Canned),
        store.clone(),
        Arc::new(EventBus::new()),
        SessionLimits::default(),
        PageView::new("/"),
    )
    .await;
    assert!(first.is_empty());
    first.submit("What should I bring to a hackathon?").await;
    first.persist_snapshot().await;
    drop(first);

    let bus = Arc::new(EventBus::new());
    let mut events = bus.subscribe();
    let second = ChatSession::load(
        Arc::new(Canned),
        store,
        bus,
        SessionLimits::default(),
        PageView::new("/"),
    )
    .await;

    let contents: Vec<String> = second.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(
        contents,
        vec!["What should I bring to a hackathon?", "Bring a charger."]
    );
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::HistoryRestored { count: 2 })
    ));
}

#[tokio::test]
async fn snapshot_is_capped_at_twenty_messages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir).await;

    let session = ChatSession::new(
        Arc::new(Canned),
        store.clone(),
        Arc::new(EventBus::new()),
        SessionLimits::default(),
        PageView::new("/"),
    );
    for i in 0..15 {
        session.submit(&format!("question {i}")).await;
    }
    assert_eq!(session.len(), 30);

    let raw = store.get(SNAPSHOT_KEY).await.unwrap().expect("snapshot");
    let snapshot = Snapshot::decode(&raw).unwrap();
    assert_eq!(snapshot.messages.len(), 20);
    assert_eq!(snapshot.messages[0].content, "question 5");
    assert_eq!(snapshot.messages[19].content, "Bring a charger.");
}

#[tokio::test]
async fn stale_snapshot_is_discarded_on_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir).await;

    let stale = Snapshot {
        messages: vec![ChatMessage::user("from last week")],
        timestamp: Utc::now() - Duration::hours(25),
    };
    store
        .set(SNAPSHOT_KEY, &stale.encode().unwrap())
        .await
        .unwrap();

    let session = ChatSession::load(
        Arc::new(Canned),
        store,
        Arc::new(EventBus::new()),
        SessionLimits::default(),
        PageView::new("/"),
    )
    .await;
    assert!(session.is_empty());
}

#[tokio::test]
async fn configured_limits_apply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = sqlite_store(&dir).await;

    let limits = SessionLimits {
        max_retained: 4,
        snapshot_limit: 3,
        snapshot_ttl: Duration::hours(1),
    };
    let session = ChatSession::new(
        Arc::new(Canned),
        store.clone(),
        Arc::new(EventBus::new()),
        limits,
        PageView::new("/"),
    );
    for i in 0..3 {
        session.submit(&format!("q{i}")).await;
    }

    let contents: Vec<String> = session.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(
        contents,
        vec!["q1", "Bring a charger.", "q2", "Bring a charger."]
    );

    let raw = store.get(SNAPSHOT_KEY).await.unwrap().expect("snapshot");
    assert_eq!(Snapshot::decode(&raw).unwrap().messages.len(), 3);
}
