//! The asynchronous mutation-processing core.
//!
//! Accepts write-operations from the API layer, durably records their intent
//! and lifecycle in the mutation log, fans the submission out to registered
//! validation subscribers, and executes the module-supplied handler either
//! inline or through a background task queue. The record is always created
//! before any validation or execution runs; once it exists, every fault is
//! absorbed into its FAILED state rather than propagated to the caller.
//!
//! Business modules plug in by registering subscribers on the
//! `SignalDispatcher` and handlers in the `HandlerRegistry` at process init.

pub mod coordinator;
pub mod executor;
pub mod persist;
pub mod queue;
pub mod registry;
pub mod signals;
pub mod traits;

pub use coordinator::{Coordinator, ExecutionMode, MutationHandle, SubmitRequest};
pub use executor::TaskExecutor;
pub use queue::{MemoryTaskQueue, MutationTask, TaskQueue, TaskWorker};
pub use registry::HandlerRegistry;
pub use signals::SignalDispatcher;
pub use traits::{
    LocaleActivator, MutationEvent, MutationHandler, MutationSubscriber, NoLocale, NoPrincipals,
    PrincipalResolver, RecordStore, StaticPrincipals,
};
