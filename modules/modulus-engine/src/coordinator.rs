//! Coordinator — the mutation lifecycle state machine.
//!
//! Received → (validation fan-out) → Failed on validation errors,
//! PendingExecution when deferred to the queue, or Success/Failed when
//! executed inline. PendingExecution is terminal from the coordinator's
//! perspective; only the task executor advances it further.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use modulus_common::{ErrorDetail, Principal};
use modulus_store::{MutationRecord, NewMutation};

use crate::queue::{MutationTask, TaskQueue};
use crate::registry::HandlerRegistry;
use crate::signals::SignalDispatcher;
use crate::traits::{LocaleActivator, MutationEvent, NoLocale, RecordStore};

/// Whether handlers run on the request path or through the task queue.
/// Fixed per process at startup (`Config::async_mutations`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Inline,
    Deferred,
}

/// A mutation submission from the API layer.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub module: String,
    pub handler: String,
    pub payload: Value,
    pub submitter: Option<Principal>,
    pub correlation_id: Option<String>,
    pub label: Option<String>,
}

impl SubmitRequest {
    pub fn new(
        module: impl Into<String>,
        handler: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            module: module.into(),
            handler: handler.into(),
            payload,
            submitter: None,
            correlation_id: None,
            label: None,
        }
    }

    pub fn with_submitter(mut self, principal: Principal) -> Self {
        self.submitter = Some(principal);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn to_new_mutation(&self) -> NewMutation {
        let mut mutation = NewMutation::new(
            self.module.clone(),
            self.handler.clone(),
            self.payload.clone(),
        );
        if let Some(principal) = &self.submitter {
            mutation = mutation.with_submitter(principal.id);
        }
        if let Some(correlation_id) = &self.correlation_id {
            mutation = mutation.with_correlation_id(correlation_id.clone());
        }
        if let Some(label) = &self.label {
            mutation = mutation.with_label(label.clone());
        }
        mutation
    }
}

/// Returned by `submit`. The caller polls the record for the final outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationHandle {
    pub id: Uuid,
}

pub struct Coordinator<S: RecordStore> {
    store: S,
    signals: Arc<SignalDispatcher>,
    registry: Arc<HandlerRegistry>,
    queue: Option<Arc<dyn TaskQueue>>,
    locale: Arc<dyn LocaleActivator>,
}

impl<S: RecordStore> Coordinator<S> {
    /// Handlers execute on the request path.
    pub fn inline(
        store: S,
        signals: Arc<SignalDispatcher>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            store,
            signals,
            registry,
            queue: None,
            locale: Arc::new(NoLocale),
        }
    }

    /// Handlers execute through the task queue, off the request path.
    pub fn deferred(
        store: S,
        signals: Arc<SignalDispatcher>,
        registry: Arc<HandlerRegistry>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            store,
            signals,
            registry,
            queue: Some(queue),
            locale: Arc::new(NoLocale),
        }
    }

    pub fn with_locale(mut self, locale: Arc<dyn LocaleActivator>) -> Self {
        self.locale = locale;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        if self.queue.is_some() {
            ExecutionMode::Deferred
        } else {
            ExecutionMode::Inline
        }
    }

    /// Submit a mutation.
    ///
    /// The record is persisted before anything else runs; a persistence
    /// fault is the one error the caller sees directly. Every later fault is
    /// absorbed into the record's Failed state, and the handle is returned
    /// regardless of outcome — callers discover the result by querying the
    /// record.
    pub async fn submit(&self, request: SubmitRequest) -> Result<MutationHandle> {
        // 1. Persist-before-process.
        let record = self.store.create(request.to_new_mutation()).await?;

        // 2. Activate the submitter's locale for downstream messages.
        if let Some(language) = request
            .submitter
            .as_ref()
            .and_then(|p| p.language.as_deref())
        {
            self.locale.activate(language);
        }

        if let Err(fault) = self.process(&record, &request).await {
            warn!(
                record_id = %record.id,
                error = format!("{fault:#}"),
                "mutation processing fault"
            );
            if let Err(mark_err) = self.store.mark_failed(record.id, fault_detail(&fault)).await {
                warn!(
                    record_id = %record.id,
                    error = format!("{mark_err:#}"),
                    "could not record processing fault"
                );
            }
        }

        Ok(MutationHandle { id: record.id })
    }

    async fn process(&self, record: &MutationRecord, request: &SubmitRequest) -> Result<()> {
        // 3. Validation fan-out: global scope, then the record's module scope.
        let event = MutationEvent {
            record_id: record.id,
            module: &record.module,
            handler: &record.handler,
            payload: &record.payload,
            principal: request.submitter.as_ref(),
        };
        let results = self.signals.publish(&event)?;

        // 4. Aggregate every subscriber's error list.
        let errors: Vec<ErrorDetail> = results
            .into_iter()
            .flat_map(|(_, errors)| errors)
            .collect();
        if !errors.is_empty() {
            self.store
                .mark_failed(record.id, serde_json::to_value(&errors)?)
                .await?;
            return Ok(());
        }

        // 5. Branch on execution mode.
        match &self.queue {
            Some(queue) => {
                // The task carries ids only; the worker re-reads the payload
                // from the store.
                self.store.mark_pending(record.id).await?;
                queue
                    .enqueue(MutationTask {
                        record_id: record.id,
                        module: record.module.clone(),
                        handler: record.handler.clone(),
                    })
                    .await?;
            }
            None => {
                let handler = self.registry.resolve(&record.module, &record.handler)?;
                match handler
                    .execute(request.submitter.as_ref(), &record.payload)
                    .await?
                {
                    Some(detail) => {
                        self.store
                            .mark_failed(record.id, serde_json::to_value(vec![detail])?)
                            .await?
                    }
                    None => self.store.mark_success(record.id).await?,
                }
            }
        }
        Ok(())
    }
}

/// Serialize a fault into the error_detail shape: a one-element array of
/// `{message}` objects, matching what validation rejections produce.
pub(crate) fn fault_detail(fault: &anyhow::Error) -> Value {
    serde_json::json!([ErrorDetail::new(format!("{fault:#}"))])
}
