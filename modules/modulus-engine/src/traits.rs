//! Trait seams between the mutation core and its collaborators.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use modulus_common::{ErrorDetail, Principal};
use modulus_store::{MutationRecord, NewMutation};

/// The submission event broadcast to validation subscribers.
#[derive(Debug, Clone, Copy)]
pub struct MutationEvent<'a> {
    pub record_id: Uuid,
    pub module: &'a str,
    pub handler: &'a str,
    pub payload: &'a Value,
    pub principal: Option<&'a Principal>,
}

/// The slice of the mutation store the coordinator and executor need.
///
/// Implemented by `PgMutationStore` (production), `MemoryMutationStore`
/// (tests, embedded use), and blanket `Arc<S>` so the store can be shared.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, mutation: NewMutation) -> Result<MutationRecord>;

    async fn get(&self, id: Uuid) -> Result<Option<MutationRecord>>;

    /// Received → PendingExecution. Never demotes a terminal record.
    async fn mark_pending(&self, id: Uuid) -> Result<()>;

    async fn mark_success(&self, id: Uuid) -> Result<()>;

    async fn mark_failed(&self, id: Uuid, detail: Value) -> Result<()>;
}

/// Module-supplied code implementing a mutation's actual side effect.
///
/// `Ok(None)` signals success; `Ok(Some(detail))` is a business failure that
/// goes into the record's error_detail; `Err` is an unexpected execution
/// fault, caught at the coordinator/executor boundary.
#[async_trait]
pub trait MutationHandler: Send + Sync {
    async fn execute(
        &self,
        principal: Option<&Principal>,
        payload: &Value,
    ) -> Result<Option<ErrorDetail>>;
}

/// A validation callback invoked during submission fan-out.
///
/// An empty vec accepts the mutation; a non-empty vec rejects it with those
/// errors. `Err` is an execution fault, distinct from a rejection.
pub trait MutationSubscriber: Send + Sync {
    fn validate(&self, event: &MutationEvent<'_>) -> Result<Vec<ErrorDetail>>;
}

/// Locale activation hook, delegated to an external collaborator so handler
/// and validation messages localize to the acting principal's language.
pub trait LocaleActivator: Send + Sync {
    fn activate(&self, language: &str);
}

/// Default hook: no localization.
pub struct NoLocale;

impl LocaleActivator for NoLocale {
    fn activate(&self, _language: &str) {}
}

/// Rehydrates a record's weak principal reference into a full principal on
/// the worker side.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Principal>>;
}

/// Default resolver: knows nobody. Deferred mutations run as system.
pub struct NoPrincipals;

#[async_trait]
impl PrincipalResolver for NoPrincipals {
    async fn find(&self, _id: Uuid) -> Result<Option<Principal>> {
        Ok(None)
    }
}

/// Fixed principal set, for tests and single-tenant deployments.
#[derive(Default)]
pub struct StaticPrincipals {
    principals: HashMap<Uuid, Principal>,
}

impl StaticPrincipals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, principal: Principal) -> Self {
        self.principals.insert(principal.id, principal);
        self
    }
}

#[async_trait]
impl PrincipalResolver for StaticPrincipals {
    async fn find(&self, id: Uuid) -> Result<Option<Principal>> {
        Ok(self.principals.get(&id).cloned())
    }
}
