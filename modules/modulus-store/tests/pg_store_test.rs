//! Integration tests for PgMutationStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.
//!
//! Tests share one table, so each scopes its data with a unique submitter id
//! instead of truncating.

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use modulus_store::{
    MutationFilter, MutationStatus, NewMutation, OrderField, OrderKey, PgMutationStore,
};

async fn test_store() -> Option<PgMutationStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgMutationStore::new(pool);
    store.ensure_schema().await.ok()?;
    Some(store)
}

#[tokio::test]
async fn create_get_and_lifecycle_marks() {
    let Some(store) = test_store().await else {
        return;
    };
    let submitter = Uuid::new_v4();

    let record = store
        .create(
            NewMutation::new("billing", "ChargeCard", json!({ "amount": 100 }))
                .with_submitter(submitter)
                .with_correlation_id("req-1")
                .with_label("charge attempt"),
        )
        .await
        .unwrap();
    assert_eq!(record.status, MutationStatus::Received);
    assert!(record.error_detail.is_none());

    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.payload, json!({ "amount": 100 }));
    assert_eq!(loaded.submitted_by, Some(submitter));
    assert_eq!(loaded.correlation_id.as_deref(), Some("req-1"));

    store.mark_pending(record.id).await.unwrap();
    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, MutationStatus::PendingExecution);

    store
        .mark_failed(record.id, json!([{ "message": "declined" }]))
        .await
        .unwrap();
    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, MutationStatus::Failed);
    assert_eq!(loaded.error_detail, Some(json!([{ "message": "declined" }])));

    // Re-marking converges to the last call and clears the detail.
    store.mark_success(record.id).await.unwrap();
    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, MutationStatus::Success);
    assert!(loaded.error_detail.is_none());

    // Terminal records are never demoted back to PendingExecution.
    store.mark_pending(record.id).await.unwrap();
    let loaded = store.get(record.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, MutationStatus::Success);
}

#[tokio::test]
async fn marks_on_unknown_ids_are_errors() {
    let Some(store) = test_store().await else {
        return;
    };

    assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store.mark_success(Uuid::new_v4()).await.is_err());
    assert!(store
        .mark_failed(Uuid::new_v4(), json!([{ "message": "x" }]))
        .await
        .is_err());
    assert!(store.mark_pending(Uuid::new_v4()).await.is_err());
}

#[tokio::test]
async fn query_filters_and_orders() {
    let Some(store) = test_store().await else {
        return;
    };
    let submitter = Uuid::new_v4();

    for (module, handler) in [
        ("billing", "ChargeCard"),
        ("billing", "RefundCard"),
        ("claims", "SubmitClaim"),
    ] {
        store
            .create(NewMutation::new(module, handler, json!({})).with_submitter(submitter))
            .await
            .unwrap();
    }

    let mine = MutationFilter::new().submitted_by(submitter);

    let all = store
        .query(&mine, &[OrderKey::asc(OrderField::CreatedAt)])
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].handler, "ChargeCard");

    let by_module_desc = store
        .query(
            &mine,
            &[
                OrderKey::desc(OrderField::Module),
                OrderKey::asc(OrderField::Handler),
            ],
        )
        .await
        .unwrap();
    assert_eq!(by_module_desc[0].module, "claims");
    assert_eq!(by_module_desc[1].handler, "ChargeCard");

    // Status threshold: nothing terminal yet, then one failure.
    let terminal = mine.clone().status_gte(MutationStatus::Success);
    assert!(store.query(&terminal, &[]).await.unwrap().is_empty());
    store
        .mark_failed(all[0].id, json!([{ "message": "declined" }]))
        .await
        .unwrap();
    assert_eq!(store.query(&terminal, &[]).await.unwrap().len(), 1);

    // The reserved random token returns the same set, store-ordered randomly.
    let random = store.query(&mine, &[OrderKey::Random]).await.unwrap();
    assert_eq!(random.len(), 3);
    let mut expected: Vec<Uuid> = all.iter().map(|r| r.id).collect();
    let mut got: Vec<Uuid> = random.iter().map(|r| r.id).collect();
    expected.sort();
    got.sort();
    assert_eq!(got, expected);
}
