//! RecordStore implementations.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use modulus_store::{MemoryMutationStore, MutationRecord, NewMutation, PgMutationStore};

use crate::traits::RecordStore;

// ---------------------------------------------------------------------------
// PgMutationStore adapter (production — postgres)
// ---------------------------------------------------------------------------

#[async_trait]
impl RecordStore for PgMutationStore {
    async fn create(&self, mutation: NewMutation) -> Result<MutationRecord> {
        PgMutationStore::create(self, mutation).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<MutationRecord>> {
        PgMutationStore::get(self, id).await
    }

    async fn mark_pending(&self, id: Uuid) -> Result<()> {
        PgMutationStore::mark_pending(self, id).await
    }

    async fn mark_success(&self, id: Uuid) -> Result<()> {
        PgMutationStore::mark_success(self, id).await
    }

    async fn mark_failed(&self, id: Uuid, detail: Value) -> Result<()> {
        PgMutationStore::mark_failed(self, id, detail).await
    }
}

// ---------------------------------------------------------------------------
// MemoryMutationStore adapter (tests, embedded deployments)
// ---------------------------------------------------------------------------

#[async_trait]
impl RecordStore for MemoryMutationStore {
    async fn create(&self, mutation: NewMutation) -> Result<MutationRecord> {
        MemoryMutationStore::create(self, mutation)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MutationRecord>> {
        MemoryMutationStore::get(self, id)
    }

    async fn mark_pending(&self, id: Uuid) -> Result<()> {
        MemoryMutationStore::mark_pending(self, id)
    }

    async fn mark_success(&self, id: Uuid) -> Result<()> {
        MemoryMutationStore::mark_success(self, id)
    }

    async fn mark_failed(&self, id: Uuid, detail: Value) -> Result<()> {
        MemoryMutationStore::mark_failed(self, id, detail)
    }
}

// ---------------------------------------------------------------------------
// Arc<S> blanket — lets the coordinator, executor, and tests share one store
// ---------------------------------------------------------------------------

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn create(&self, mutation: NewMutation) -> Result<MutationRecord> {
        (**self).create(mutation).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<MutationRecord>> {
        (**self).get(id).await
    }

    async fn mark_pending(&self, id: Uuid) -> Result<()> {
        (**self).mark_pending(id).await
    }

    async fn mark_success(&self, id: Uuid) -> Result<()> {
        (**self).mark_success(id).await
    }

    async fn mark_failed(&self, id: Uuid, detail: Value) -> Result<()> {
        (**self).mark_failed(id, detail).await
    }
}
