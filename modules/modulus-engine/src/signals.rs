//! SignalDispatcher — per-submission validation fan-out.
//!
//! Two subscription scopes: global (every mutation) and per-module (only
//! mutations tagged with that module). The registry is built once at process
//! initialization from an enumerated module list, then shared immutably, so
//! concurrent `publish` calls need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use modulus_common::{ErrorDetail, MutationError};

use crate::traits::{MutationEvent, MutationSubscriber};

type Subscription = (String, Arc<dyn MutationSubscriber>);

pub struct SignalDispatcher {
    global: Vec<Subscription>,
    modules: HashMap<String, Vec<Subscription>>,
}

impl SignalDispatcher {
    /// Build the dispatcher for an enumerated list of module identifiers.
    /// Module-scoped subscriptions outside this list are rejected.
    pub fn new<I, M>(modules: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            global: Vec::new(),
            modules: modules
                .into_iter()
                .map(|module| (module.into(), Vec::new()))
                .collect(),
        }
    }

    /// Register a global-scope subscriber, notified for every mutation.
    pub fn subscribe(&mut self, id: impl Into<String>, subscriber: Arc<dyn MutationSubscriber>) {
        self.global.push((id.into(), subscriber));
    }

    /// Register a module-scoped subscriber, notified only for mutations
    /// tagged with `module`.
    pub fn subscribe_module(
        &mut self,
        module: &str,
        id: impl Into<String>,
        subscriber: Arc<dyn MutationSubscriber>,
    ) -> Result<(), MutationError> {
        let scope = self
            .modules
            .get_mut(module)
            .ok_or_else(|| MutationError::UnknownModule(module.to_string()))?;
        scope.push((id.into(), subscriber));
        Ok(())
    }

    /// Invoke every applicable subscriber — global scope first, then the
    /// event's module scope — in registration order, collecting each returned
    /// error list. Validation errors never short-circuit the fan-out, so the
    /// caller sees the complete picture. A subscriber returning `Err` is an
    /// execution fault and aborts the publish.
    pub fn publish(&self, event: &MutationEvent<'_>) -> Result<Vec<(String, Vec<ErrorDetail>)>> {
        let module_scope = self
            .modules
            .get(event.module)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut results = Vec::new();
        for (id, subscriber) in self.global.iter().chain(module_scope) {
            let errors = subscriber
                .validate(event)
                .with_context(|| format!("subscriber {id} faulted"))?;
            results.push((id.clone(), errors));
        }
        Ok(results)
    }
}
