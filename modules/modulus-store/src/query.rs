//! Query filters and ordering keys for the mutation log read path.
//!
//! The filter/ordering model is backend-neutral: the Postgres store compiles
//! it to SQL, the memory store evaluates it with the pure helpers below.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use modulus_common::MutationError;

use crate::record::{MutationRecord, MutationStatus};

// ---------------------------------------------------------------------------
// MutationFilter
// ---------------------------------------------------------------------------

/// Conjunctive filter over mutation records. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct MutationFilter {
    pub id: Option<Uuid>,
    pub correlation_id: Option<String>,
    pub submitted_by: Option<Uuid>,
    pub status_eq: Option<MutationStatus>,
    /// Threshold filter: matches records at or past this status.
    pub status_gte: Option<MutationStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl MutationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn submitted_by(mut self, principal_id: Uuid) -> Self {
        self.submitted_by = Some(principal_id);
        self
    }

    pub fn status_eq(mut self, status: MutationStatus) -> Self {
        self.status_eq = Some(status);
        self
    }

    pub fn status_gte(mut self, status: MutationStatus) -> Self {
        self.status_gte = Some(status);
        self
    }

    pub fn created_after(mut self, ts: DateTime<Utc>) -> Self {
        self.created_after = Some(ts);
        self
    }

    pub fn created_before(mut self, ts: DateTime<Utc>) -> Self {
        self.created_before = Some(ts);
        self
    }

    /// Evaluate the filter against one record (memory backend).
    pub fn matches(&self, record: &MutationRecord) -> bool {
        if self.id.is_some_and(|id| record.id != id) {
            return false;
        }
        if let Some(cid) = &self.correlation_id {
            if record.correlation_id.as_deref() != Some(cid.as_str()) {
                return false;
            }
        }
        if self.submitted_by.is_some_and(|p| record.submitted_by != Some(p)) {
            return false;
        }
        if self.status_eq.is_some_and(|s| record.status != s) {
            return false;
        }
        if self.status_gte.is_some_and(|s| record.status < s) {
            return false;
        }
        if self.created_after.is_some_and(|t| record.created_at < t) {
            return false;
        }
        if self.created_before.is_some_and(|t| record.created_at > t) {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Fields a caller may order by. The payload is deliberately not orderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Id,
    CreatedAt,
    Module,
    Handler,
    CorrelationId,
    Label,
    SubmittedBy,
    Status,
}

impl OrderField {
    /// Column name in the Postgres schema.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CreatedAt => "created_at",
            Self::Module => "module",
            Self::Handler => "handler",
            Self::CorrelationId => "correlation_id",
            Self::Label => "label",
            Self::SubmittedBy => "submitted_by",
            Self::Status => "status",
        }
    }
}

/// One key in a caller-specified ordering list.
///
/// Parsed from strings: a snake_case field name, optionally prefixed with
/// `-` for descending. The reserved token `"?"` requests store-native random
/// order (`RANDOM()` on Postgres; the memory backend falls back to ordering
/// by record id, which is a uniform random draw for v4 ids).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    Field { field: OrderField, descending: bool },
    Random,
}

impl OrderKey {
    pub fn asc(field: OrderField) -> Self {
        Self::Field {
            field,
            descending: false,
        }
    }

    pub fn desc(field: OrderField) -> Self {
        Self::Field {
            field,
            descending: true,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, MutationError> {
        if raw == "?" {
            return Ok(Self::Random);
        }
        let (name, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        let field = match name {
            "id" => OrderField::Id,
            "created_at" => OrderField::CreatedAt,
            "module" => OrderField::Module,
            "handler" => OrderField::Handler,
            "correlation_id" => OrderField::CorrelationId,
            "label" => OrderField::Label,
            "submitted_by" => OrderField::SubmittedBy,
            "status" => OrderField::Status,
            _ => return Err(MutationError::InvalidOrderKey(raw.to_string())),
        };
        Ok(Self::Field { field, descending })
    }
}

fn compare_by(a: &MutationRecord, b: &MutationRecord, key: &OrderKey) -> Ordering {
    match key {
        // Memory-backend random fallback: v4 ids carry the randomness.
        OrderKey::Random => a.id.cmp(&b.id),
        OrderKey::Field { field, descending } => {
            let ord = match field {
                OrderField::Id => a.id.cmp(&b.id),
                OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
                OrderField::Module => a.module.cmp(&b.module),
                OrderField::Handler => a.handler.cmp(&b.handler),
                OrderField::CorrelationId => a.correlation_id.cmp(&b.correlation_id),
                OrderField::Label => a.label.cmp(&b.label),
                OrderField::SubmittedBy => a.submitted_by.cmp(&b.submitted_by),
                OrderField::Status => a.status.cmp(&b.status),
            };
            if *descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Multi-key stable sort (memory backend). Later keys break ties.
pub fn sort_records(records: &mut [MutationRecord], order: &[OrderKey]) {
    if order.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        order
            .iter()
            .map(|key| compare_by(a, b, key))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(module: &str, status: MutationStatus, minute: u32) -> MutationRecord {
        MutationRecord {
            id: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
            module: module.to_string(),
            handler: "DoThing".to_string(),
            payload: serde_json::json!({}),
            submitted_by: None,
            correlation_id: None,
            label: None,
            status,
            error_detail: None,
        }
    }

    #[test]
    fn parse_accepts_field_names_and_direction() {
        assert_eq!(
            OrderKey::parse("created_at").unwrap(),
            OrderKey::asc(OrderField::CreatedAt)
        );
        assert_eq!(
            OrderKey::parse("-status").unwrap(),
            OrderKey::desc(OrderField::Status)
        );
        assert_eq!(OrderKey::parse("?").unwrap(), OrderKey::Random);
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        assert!(matches!(
            OrderKey::parse("payload"),
            Err(MutationError::InvalidOrderKey(_))
        ));
        assert!(matches!(
            OrderKey::parse("-no_such_field"),
            Err(MutationError::InvalidOrderKey(_))
        ));
    }

    #[test]
    fn status_gte_is_a_threshold() {
        let filter = MutationFilter::new().status_gte(MutationStatus::Success);
        assert!(!filter.matches(&record("a", MutationStatus::Received, 0)));
        assert!(!filter.matches(&record("a", MutationStatus::PendingExecution, 0)));
        assert!(filter.matches(&record("a", MutationStatus::Success, 0)));
        assert!(filter.matches(&record("a", MutationStatus::Failed, 0)));
    }

    #[test]
    fn time_range_is_inclusive_of_bounds() {
        let early = record("a", MutationStatus::Received, 10);
        let late = record("a", MutationStatus::Received, 40);
        let filter = MutationFilter::new()
            .created_after(early.created_at)
            .created_before(late.created_at);
        assert!(filter.matches(&early));
        assert!(filter.matches(&late));

        let before = record("a", MutationStatus::Received, 5);
        assert!(!filter.matches(&before));
    }

    #[test]
    fn correlation_id_matches_exactly() {
        let mut r = record("a", MutationStatus::Received, 0);
        r.correlation_id = Some("req-7".to_string());
        let filter = MutationFilter::new().correlation_id("req-7");
        assert!(filter.matches(&r));
        assert!(!filter.matches(&record("a", MutationStatus::Received, 0)));
    }

    #[test]
    fn multi_key_sort_breaks_ties_with_later_keys() {
        let mut records = vec![
            record("billing", MutationStatus::Failed, 3),
            record("claims", MutationStatus::Received, 1),
            record("billing", MutationStatus::Received, 2),
        ];
        sort_records(
            &mut records,
            &[
                OrderKey::asc(OrderField::Module),
                OrderKey::desc(OrderField::CreatedAt),
            ],
        );
        assert_eq!(records[0].module, "billing");
        assert_eq!(records[0].status, MutationStatus::Failed);
        assert_eq!(records[1].module, "billing");
        assert_eq!(records[1].status, MutationStatus::Received);
        assert_eq!(records[2].module, "claims");
    }
}
