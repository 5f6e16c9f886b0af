//! TaskExecutor — deferred mutation execution, outside the request path.

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use modulus_common::MutationError;
use modulus_store::MutationRecord;

use crate::coordinator::fault_detail;
use crate::queue::MutationTask;
use crate::registry::HandlerRegistry;
use crate::traits::{LocaleActivator, NoLocale, NoPrincipals, PrincipalResolver, RecordStore};

pub struct TaskExecutor<S: RecordStore> {
    store: S,
    registry: Arc<HandlerRegistry>,
    principals: Arc<dyn PrincipalResolver>,
    locale: Arc<dyn LocaleActivator>,
}

impl<S: RecordStore> TaskExecutor<S> {
    pub fn new(store: S, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            store,
            registry,
            principals: Arc::new(NoPrincipals),
            locale: Arc::new(NoLocale),
        }
    }

    pub fn with_principals(mut self, principals: Arc<dyn PrincipalResolver>) -> Self {
        self.principals = principals;
        self
    }

    pub fn with_locale(mut self, locale: Arc<dyn LocaleActivator>) -> Self {
        self.locale = locale;
        self
    }

    /// Execute one deferred mutation.
    ///
    /// A missing record is fatal: there is nothing to mark, so it is logged
    /// and raised. Any fault after the record loads is first marked Failed
    /// on the record and then re-raised, so the worker framework's own
    /// retry/alerting observes it. Re-marking an already-failed record on a
    /// later retry is harmless.
    pub async fn run(&self, task: &MutationTask) -> Result<()> {
        let record = match self.store.get(task.record_id).await? {
            Some(record) => record,
            None => {
                warn!(record_id = %task.record_id, "deferred mutation record missing");
                return Err(MutationError::RecordNotFound(task.record_id).into());
            }
        };

        if let Err(fault) = self.execute(task, &record).await {
            if let Err(mark_err) = self.store.mark_failed(record.id, fault_detail(&fault)).await {
                warn!(
                    record_id = %record.id,
                    error = format!("{mark_err:#}"),
                    "could not record execution fault"
                );
            }
            return Err(fault);
        }
        Ok(())
    }

    async fn execute(&self, task: &MutationTask, record: &MutationRecord) -> Result<()> {
        let handler = self.registry.resolve(&task.module, &task.handler)?;

        // Rehydrate the weak principal reference and re-apply locale context,
        // mirroring what the coordinator did on the request path.
        let principal = match record.submitted_by {
            Some(id) => self.principals.find(id).await?,
            None => None,
        };
        if let Some(language) = principal.as_ref().and_then(|p| p.language.as_deref()) {
            self.locale.activate(language);
        }

        match handler.execute(principal.as_ref(), &record.payload).await? {
            Some(detail) => {
                self.store
                    .mark_failed(record.id, serde_json::to_value(vec![detail])?)
                    .await?
            }
            None => self.store.mark_success(record.id).await?,
        }
        Ok(())
    }
}
