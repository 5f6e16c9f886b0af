//! Typed errors for the mutation pipeline.

use thiserror::Error;
use uuid::Uuid;

/// Contract and configuration errors raised by the core.
///
/// Validation rejections are NOT errors — subscribers and handlers return
/// `ErrorDetail` lists for those. These variants cover caller contract
/// violations and wiring mistakes.
#[derive(Debug, Error)]
pub enum MutationError {
    /// A `get`/`mark_*` targeted an id that was never created.
    #[error("mutation record not found: {0}")]
    RecordNotFound(Uuid),

    /// No handler registered for this (module, handler) pair.
    #[error("no handler registered for {module}.{handler}")]
    UnknownHandler { module: String, handler: String },

    /// A module-scoped subscription named a module outside the enumerated
    /// module list the dispatcher was built with.
    #[error("unknown module scope: {0}")]
    UnknownModule(String),

    /// An ordering key named a field that is not orderable.
    #[error("invalid order key: {0}")]
    InvalidOrderKey(String),
}
