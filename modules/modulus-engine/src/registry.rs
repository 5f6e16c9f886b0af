//! HandlerRegistry — (module, handler) → implementation lookup.
//!
//! Populated at startup by each business module's own init code; looked up
//! lazily at dispatch time, because not every module is loaded when the core
//! initializes. Resolution is idempotent and side-effect-free.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use modulus_common::MutationError;

use crate::traits::MutationHandler;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<(String, String), Arc<dyn MutationHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a (module, handler_name) pair. Exactly one
    /// handler per pair; a re-registration replaces the previous one.
    pub fn register(
        &mut self,
        module: impl Into<String>,
        handler_name: impl Into<String>,
        handler: Arc<dyn MutationHandler>,
    ) {
        let key = (module.into(), handler_name.into());
        if self.handlers.insert(key.clone(), handler).is_some() {
            warn!(module = %key.0, handler = %key.1, "handler re-registered, replacing previous");
        }
    }

    /// Resolve a handler. An unknown pair is a configuration error for the
    /// record being processed, never a crash of the calling component.
    pub fn resolve(
        &self,
        module: &str,
        handler: &str,
    ) -> Result<Arc<dyn MutationHandler>, MutationError> {
        self.handlers
            .get(&(module.to_string(), handler.to_string()))
            .cloned()
            .ok_or_else(|| MutationError::UnknownHandler {
                module: module.to_string(),
                handler: handler.to_string(),
            })
    }
}
