//! Durable, queryable log of every submitted mutation and its lifecycle state.
//!
//! The record is the single source of truth for a mutation's outcome: it is
//! created before any validation or execution runs, so a crash mid-pipeline
//! always leaves an inspectable trace. Records are never deleted by the core.
//!
//! Two backends share one contract: `PgMutationStore` (Postgres, production)
//! and `MemoryMutationStore` (tests and embedded use).

pub mod memory;
pub mod query;
pub mod record;
pub mod store;

pub use memory::MemoryMutationStore;
pub use query::{MutationFilter, OrderField, OrderKey};
pub use record::{MutationRecord, MutationStatus, NewMutation};
pub use store::PgMutationStore;
