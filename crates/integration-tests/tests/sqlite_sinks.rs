//! Queue processor wired to the SQLite gallery and usage sinks

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use sqlx::SqlitePool;
use studio_core::application::submit::{self, SubmitRequest};
use studio_core::application::{ProcessorConfig, QueueProcessor};
use studio_core::domain::{Artifact, ItemStatus};
use studio_core::error::AppError;
use studio_core::port::generation_service::mocks::{MockBehavior, MockGenerationService};
use studio_core::port::id_provider::UuidProvider;
use studio_core::port::time_provider::SystemTimeProvider;
use studio_core::port::{GallerySink, UsageRecorder};
use studio_infra_sqlite::{create_pool, run_migrations, SqliteGallery, SqliteUsageRecorder};

const WAIT: Duration = Duration::from_secs(5);

struct Stack {
    processor: QueueProcessor,
    gallery: Arc<SqliteGallery>,
    usage: Arc<SqliteUsageRecorder>,
}

fn build(pool: SqlitePool, generation: Arc<MockGenerationService>) -> Stack {
    let time_provider = Arc::new(SystemTimeProvider);
    let gallery = Arc::new(SqliteGallery::new(pool.clone()));
    let usage = Arc::new(SqliteUsageRecorder::new(pool, time_provider.clone()));
    let processor = QueueProcessor::new(
        ProcessorConfig::default(),
        generation,
        gallery.clone(),
        usage.clone(),
        Arc::new(UuidProvider),
        time_provider,
    );
    Stack {
        processor,
        gallery,
        usage,
    }
}

async fn memory_pool() -> SqlitePool {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

// Side effects run after DONE is published, so poll the store
async fn wait_for_gallery(gallery: &SqliteGallery, n: usize) {
    tokio::time::timeout(WAIT, async {
        loop {
            if gallery.recent(100).await.unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for gallery writes");
}

async fn wait_for_usage(usage: &SqliteUsageRecorder, feature: &str, n: i64) {
    tokio::time::timeout(WAIT, async {
        loop {
            if usage.total(feature).await.unwrap() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for usage writes");
}

#[tokio::test]
async fn test_completed_items_land_in_sqlite() {
    let stack = build(memory_pool().await, Arc::new(MockGenerationService::new_success()));

    let mut ids = Vec::new();
    for prompt in ["cat", "dog", "bird"] {
        let req = SubmitRequest::new(format!("  {}  ", prompt), json!({"aspect_ratio": "16:9"}));
        ids.push(submit::execute(&stack.processor, req).unwrap());
    }

    let mut rx = stack.processor.subscribe();
    tokio::time::timeout(WAIT, rx.wait_for(|s| s.count_by_status(ItemStatus::Done) == 3))
        .await
        .unwrap()
        .unwrap();

    wait_for_gallery(&stack.gallery, 3).await;
    wait_for_usage(&stack.usage, "image_generation", 3).await;

    let entries = stack.gallery.recent(10).await.unwrap();
    let mut prompts: Vec<&str> = entries.iter().map(|e| e.prompt.as_str()).collect();
    prompts.sort_unstable();
    assert_eq!(prompts, vec!["bird", "cat", "dog"], "prompts are stored trimmed");
    for entry in &entries {
        assert!(ids.contains(&entry.item_id));
        assert_eq!(entry.artifact.mime_type.as_deref(), Some("image/png"));
    }

    assert_eq!(stack.usage.total("image_generation").await.unwrap(), 3);
}

#[tokio::test]
async fn test_failed_and_empty_results_are_not_recorded() {
    let generation = Arc::new(MockGenerationService::new_success());
    generation
        .push(MockBehavior::Fail("content policy".to_string()))
        .push(MockBehavior::Artifacts(vec![]))
        .push(MockBehavior::Artifacts(vec![Artifact::new("https://img/ok.png")]));
    let stack = build(memory_pool().await, generation);

    for prompt in ["bad", "empty", "ok"] {
        submit::execute(&stack.processor, SubmitRequest::new(prompt, json!({}))).unwrap();
    }

    let mut rx = stack.processor.subscribe();
    tokio::time::timeout(
        WAIT,
        rx.wait_for(|s| s.count_by_status(ItemStatus::Done) == 1 && s.active_id.is_none()),
    )
    .await
    .unwrap()
    .unwrap();
    wait_for_usage(&stack.usage, "image_generation", 1).await;

    let snapshot = stack.processor.snapshot();
    assert_eq!(snapshot.count_by_status(ItemStatus::Error), 2);

    let entries = stack.gallery.recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].prompt, "ok");
    assert_eq!(entries[0].artifact.uri, "https://img/ok.png");
    assert_eq!(stack.usage.total("image_generation").await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_queue() {
    let stack = build(memory_pool().await, Arc::new(MockGenerationService::new_success()));

    let cases = [
        SubmitRequest::new("   ", json!({})),
        SubmitRequest::new("x".repeat(4001), json!({})),
        SubmitRequest::new("cat", json!(["not", "an", "object"])),
        SubmitRequest::new("cat", json!({"aspect_ratio": "21:9"})),
    ];
    for req in cases {
        let err = submit::execute(&stack.processor, req).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);
    }

    assert!(stack.processor.snapshot().items.is_empty());
}

#[tokio::test]
async fn test_gallery_survives_reopen() {
    let path = std::env::temp_dir().join(format!("studio_gallery_{}.db", uuid::Uuid::new_v4()));
    let url = path.to_string_lossy().to_string();

    {
        let stack = build(
            {
                let pool = create_pool(&url).await.unwrap();
                run_migrations(&pool).await.unwrap();
                pool
            },
            Arc::new(MockGenerationService::new_success()),
        );
        submit::execute(&stack.processor, SubmitRequest::new("lighthouse", json!({}))).unwrap();
        wait_for_gallery(&stack.gallery, 1).await;
        wait_for_usage(&stack.usage, "image_generation", 1).await;
    }

    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let entries = SqliteGallery::new(pool.clone()).recent(10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].prompt, "lighthouse");
    let total = SqliteUsageRecorder::new(pool.clone(), Arc::new(SystemTimeProvider))
        .total("image_generation")
        .await
        .unwrap();
    assert_eq!(total, 1);

    pool.close().await;
    let _ = std::fs::remove_file(&path);
}
