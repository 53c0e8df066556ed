//! ShortLinkEngine tests
//!
//! Tests for the engine layer on top of both storage backends.

use std::sync::Arc;
use std::time::Duration;

use shorturl::config::{StorageConfig, StorageKind};
use shorturl::context::OpContext;
use shorturl::errors::ServiceErrorKind;
use shorturl::services::ShortLinkEngine;
use shorturl::storage::{Backend, MemoryBackend, ShortLink, StorageBackend, StorageFactory};
use shorturl::utils::short_id;
use tempfile::TempDir;

// =============================================================================
// Test Setup
// =============================================================================

fn memory_engine() -> ShortLinkEngine<MemoryBackend> {
    ShortLinkEngine::new(Arc::new(MemoryBackend::new()), 8)
}

async fn sqlite_engine() -> (ShortLinkEngine<Backend>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("engine.db");
    let config = StorageConfig {
        backend: StorageKind::Relational,
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };
    let backend = StorageFactory::create(&config)
        .await
        .expect("Failed to create storage");
    (ShortLinkEngine::new(Arc::new(backend), 8), temp_dir)
}

fn urls(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("https://site{}.example/path", i)).collect()
}

// =============================================================================
// Lifecycle
// =============================================================================

async fn check_lifecycle<S: StorageBackend>(engine: &ShortLinkEngine<S>) {
    let ctx = OpContext::background();

    let (link, is_new) = engine.create(&ctx, "u1", "https://example.com").await.unwrap();
    assert!(is_new);
    assert_eq!(link.short_identifier.len(), 8);
    assert!(
        link.short_identifier
            .chars()
            .all(|c| short_id::SHORT_ID_ALPHABET.contains(c))
    );

    let (again, is_new) = engine.create(&ctx, "u1", "https://example.com").await.unwrap();
    assert!(!is_new);
    assert_eq!(again.short_identifier, link.short_identifier);

    let listed = engine.get_all_by_owner(&ctx, "u1").await.unwrap();
    assert_eq!(listed.len(), 1);

    let marked = engine
        .mark_deleted(&ctx, "u1", &[link.short_identifier.clone(), "NOPE0000".to_string()])
        .await
        .unwrap();
    assert_eq!(marked, 1);

    let listed = engine.get_all_by_owner(&ctx, "u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    let fetched = engine
        .get_by_short_identifier(&ctx, &link.short_identifier)
        .await
        .unwrap();
    assert!(fetched.deleted_at.is_some());

    let err = engine.resolve(&ctx, &link.short_identifier).await.unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Gone);

    let marked = engine
        .mark_deleted(&ctx, "u1", &[link.short_identifier.clone()])
        .await
        .unwrap();
    assert_eq!(marked, 0);
    assert_eq!(engine.mark_deleted(&ctx, "u1", &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_lifecycle_memory() {
    check_lifecycle(&memory_engine()).await;
}

#[tokio::test]
async fn test_lifecycle_sqlite() {
    let (engine, _dir) = sqlite_engine().await;
    check_lifecycle(&engine).await;
}

#[tokio::test]
async fn test_identifiers_are_deterministic_across_engines() {
    let ctx = OpContext::background();
    let (a, _) = memory_engine()
        .create(&ctx, "u1", "https://example.com")
        .await
        .unwrap();
    let (sqlite, _dir) = sqlite_engine().await;
    let (b, _) = sqlite.create(&ctx, "u1", "https://example.com").await.unwrap();

    assert_eq!(a.short_identifier, b.short_identifier);
}

#[tokio::test]
async fn test_same_url_different_owners() {
    let ctx = OpContext::background();
    let engine = memory_engine();

    let (a, _) = engine.create(&ctx, "u1", "https://example.com").await.unwrap();
    let (b, is_new) = engine.create(&ctx, "u2", "https://example.com").await.unwrap();

    assert!(is_new);
    assert_ne!(a.short_identifier, b.short_identifier);
    assert_eq!(
        engine
            .get_by_url(&ctx, "u2", "https://example.com")
            .await
            .unwrap()
            .short_identifier,
        b.short_identifier
    );
}

/// Engines with different identifier lengths share one store: the second
/// derives another identifier for the same `(url, owner)` and must still get
/// the stored record back.
async fn check_slot_survives_identifier_change<S: StorageBackend>(engine: &ShortLinkEngine<S>) {
    let ctx = OpContext::background();
    let other = ShortLinkEngine::new(Arc::clone(engine.storage()), 10);

    let (first, is_new) = engine.create(&ctx, "u1", "https://example.com").await.unwrap();
    assert!(is_new);

    let (second, is_new) = other.create(&ctx, "u1", "https://example.com").await.unwrap();
    assert!(!is_new);
    assert_eq!(second.short_identifier, first.short_identifier);
    assert_eq!(engine.get_all_by_owner(&ctx, "u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_slot_survives_identifier_change_memory() {
    check_slot_survives_identifier_change(&memory_engine()).await;
}

#[tokio::test]
async fn test_slot_survives_identifier_change_sqlite() {
    let (engine, _dir) = sqlite_engine().await;
    check_slot_survives_identifier_change(&engine).await;
}

#[tokio::test]
async fn test_identifier_clash_surfaces_as_duplicate() {
    let ctx = OpContext::background();
    let engine = memory_engine();
    let taken = short_id::derive("https://wanted.example", "u1", 8);
    engine
        .storage()
        .create(&ctx, ShortLink::new("https://squatter.example", taken.as_str(), "u9"))
        .await
        .unwrap();

    let err = engine
        .create(&ctx, "u1", "https://wanted.example")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::DuplicateKey);
    assert_eq!(
        engine
            .get_by_short_identifier(&ctx, &taken)
            .await
            .unwrap()
            .url,
        "https://squatter.example"
    );
}

#[tokio::test]
async fn test_missing_identifier_is_not_found() {
    let ctx = OpContext::background();
    let err = memory_engine()
        .get_by_short_identifier(&ctx, "missing1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::RecordNotFound);
}

// =============================================================================
// Batch create
// =============================================================================

async fn check_batch_partial<S: StorageBackend>(engine: &ShortLinkEngine<S>) {
    let ctx = OpContext::background();
    let input = urls(5);
    engine.create(&ctx, "u1", &input[2]).await.unwrap();

    let result = engine.batch_create(&ctx, "u1", &input).await.unwrap();

    assert_eq!(result.outcomes.len(), 5);
    assert_eq!(result.created(), 4);
    assert_eq!(result.duplicates(), 1);
    assert_eq!(result.failed(), 0);
    assert!(result.outcomes[2].is_duplicate());
    for (outcome, url) in result.outcomes.iter().zip(&input) {
        assert_eq!(&outcome.url, url);
        let link = outcome.link.as_ref().expect("every outcome carries a record");
        assert_eq!(link.short_identifier, short_id::derive(url, "u1", 8));
    }
    assert_eq!(engine.get_all_by_owner(&ctx, "u1").await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_batch_partial_memory() {
    check_batch_partial(&memory_engine()).await;
}

#[tokio::test]
async fn test_batch_partial_sqlite() {
    let (engine, _dir) = sqlite_engine().await;
    check_batch_partial(&engine).await;
}

#[tokio::test]
async fn test_batch_empty_input() {
    let ctx = OpContext::background();
    let result = memory_engine().batch_create(&ctx, "u1", &[]).await.unwrap();
    assert!(result.outcomes.is_empty());
}

#[tokio::test]
async fn test_batch_large_sqlite() {
    let ctx = OpContext::background();
    let (engine, _dir) = sqlite_engine().await;
    let input = urls(250);

    let result = engine.batch_create(&ctx, "u1", &input).await.unwrap();
    assert_eq!(result.created(), 250);

    let again = engine.batch_create(&ctx, "u1", &input).await.unwrap();
    assert_eq!(again.duplicates(), 250);
}

// =============================================================================
// Anonymous create
// =============================================================================

#[tokio::test]
async fn test_create_anonymous_sqlite() {
    let ctx = OpContext::background();
    let (engine, _dir) = sqlite_engine().await;

    let (first, is_new) = engine
        .create_anonymous(&ctx, "https://anon.example")
        .await
        .unwrap();
    assert!(is_new);
    assert_eq!(
        first.short_identifier,
        short_id::derive_with_counter("https://anon.example", 1, 8)
    );

    let (second, is_new) = engine
        .create_anonymous(&ctx, "https://anon.example")
        .await
        .unwrap();
    assert!(!is_new);
    assert_eq!(second.short_identifier, first.short_identifier);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancelled_context_rejects_every_operation() {
    let engine = memory_engine();
    let ctx = OpContext::background();
    ctx.cancel();

    let kind = engine.create(&ctx, "u1", "https://a.example").await.unwrap_err().kind();
    assert_eq!(kind, ServiceErrorKind::Cancelled);
    let kind = engine
        .batch_create(&ctx, "u1", &urls(3))
        .await
        .unwrap_err()
        .kind();
    assert_eq!(kind, ServiceErrorKind::Cancelled);
    let kind = engine.get_all_by_owner(&ctx, "u1").await.unwrap_err().kind();
    assert_eq!(kind, ServiceErrorKind::Cancelled);
    let kind = engine
        .mark_deleted(&ctx, "u1", &["abc".to_string()])
        .await
        .unwrap_err()
        .kind();
    assert_eq!(kind, ServiceErrorKind::Cancelled);

    let fresh = OpContext::background();
    assert!(engine.get_all_by_owner(&fresh, "u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expired_deadline_sqlite() {
    let (engine, _dir) = sqlite_engine().await;
    let ctx = OpContext::with_timeout(Duration::ZERO);

    let err = engine.create(&ctx, "u1", "https://late.example").await.unwrap_err();
    assert_eq!(err.kind(), ServiceErrorKind::Cancelled);
    assert!(
        engine
            .get_all_by_owner(&OpContext::background(), "u1")
            .await
            .unwrap()
            .is_empty()
    );
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_single_winner_memory() {
    let engine = memory_engine();
    let mut handles = Vec::new();
    for _ in 0..32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let ctx = OpContext::background();
            engine
                .create(&ctx, "u1", "https://race.example")
                .await
                .unwrap()
                .1
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_single_winner_sqlite() {
    let (engine, _dir) = sqlite_engine().await;
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let ctx = OpContext::background();
            engine
                .create(&ctx, "u1", "https://race.example")
                .await
                .unwrap()
                .1
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(
        engine
            .get_all_by_owner(&OpContext::background(), "u1")
            .await
            .unwrap()
            .len(),
        1
    );
}
