//! Mutation record types. The unit of auditability and recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a mutation record.
///
/// Stored as SMALLINT. The numeric order is part of the contract: the query
/// path supports a `status >= threshold` filter, so "has reached a terminal
/// state" is expressible as `status_gte(Success)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum MutationStatus {
    /// Persisted, not yet validated or executed.
    Received = 0,
    /// Validated and handed to the task queue. Only the task executor
    /// advances a record past this state.
    PendingExecution = 1,
    Success = 2,
    Failed = 3,
}

impl MutationStatus {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Received),
            1 => Some(Self::PendingExecution),
            2 => Some(Self::Success),
            3 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Success and Failed are terminal: a record never re-enters Received or
    /// PendingExecution once it reaches either.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl std::fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::PendingExecution => write!(f, "pending_execution"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A mutation as persisted. Returned by all read methods.
///
/// `payload` is written once at creation and only ever read back; `module`
/// and `handler` identify which registered handler must process the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub module: String,
    pub handler: String,
    pub payload: serde_json::Value,
    /// Weak reference to the acting principal. None for system-initiated
    /// mutations.
    pub submitted_by: Option<Uuid>,
    /// Caller-supplied correlation token. Opaque, not unique-enforced.
    pub correlation_id: Option<String>,
    pub label: Option<String>,
    pub status: MutationStatus,
    /// Populated iff `status == Failed`. Always a JSON array of
    /// `{message, code?}` objects.
    pub error_detail: Option<serde_json::Value>,
}

/// A mutation to be recorded. The caller builds this; the store assigns
/// id, created_at, and the initial Received status.
#[derive(Debug, Clone)]
pub struct NewMutation {
    pub module: String,
    pub handler: String,
    pub payload: serde_json::Value,
    pub submitted_by: Option<Uuid>,
    pub correlation_id: Option<String>,
    pub label: Option<String>,
}

impl NewMutation {
    pub fn new(
        module: impl Into<String>,
        handler: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            module: module.into(),
            handler: handler.into(),
            payload,
            submitted_by: None,
            correlation_id: None,
            label: None,
        }
    }

    pub fn with_submitter(mut self, principal_id: Uuid) -> Self {
        self.submitted_by = Some(principal_id);
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
}
