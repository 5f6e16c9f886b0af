//! In-memory mutation store. Same contract as the Postgres backend, no
//! database required. Used by the engine tests and embeddable deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use modulus_common::MutationError;

use crate::query::{sort_records, MutationFilter, OrderKey};
use crate::record::{MutationRecord, MutationStatus, NewMutation};

/// Mutex<HashMap>-backed store. Thread-safe; share via `Arc`.
#[derive(Default)]
pub struct MemoryMutationStore {
    records: Mutex<HashMap<Uuid, MutationRecord>>,
}

impl MemoryMutationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, mutation: NewMutation) -> Result<MutationRecord> {
        let record = MutationRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            module: mutation.module,
            handler: mutation.handler,
            payload: mutation.payload,
            submitted_by: mutation.submitted_by,
            correlation_id: mutation.correlation_id,
            label: mutation.label,
            status: MutationStatus::Received,
            error_detail: None,
        };
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<MutationRecord>> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    /// Transition Received → PendingExecution. A no-op on records that have
    /// already advanced.
    pub fn mark_pending(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or(MutationError::RecordNotFound(id))?;
        if record.status == MutationStatus::Received {
            record.status = MutationStatus::PendingExecution;
        }
        Ok(())
    }

    pub fn mark_success(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or(MutationError::RecordNotFound(id))?;
        record.status = MutationStatus::Success;
        record.error_detail = None;
        Ok(())
    }

    pub fn mark_failed(&self, id: Uuid, detail: serde_json::Value) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or(MutationError::RecordNotFound(id))?;
        record.status = MutationStatus::Failed;
        record.error_detail = Some(detail);
        Ok(())
    }

    /// Filtered, ordered read.
    ///
    /// `OrderKey::Random` falls back to ordering by record id here — v4 ids
    /// are uniformly random, so the draw is random per record even though
    /// repeat queries return the same order.
    pub fn query(&self, filter: &MutationFilter, order: &[OrderKey]) -> Vec<MutationRecord> {
        let records = self.records.lock().unwrap();
        let mut matched: Vec<MutationRecord> = records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        if order.is_empty() {
            // HashMap iteration order is arbitrary; give unordered queries a
            // stable default.
            sort_records(&mut matched, &[OrderKey::asc(crate::query::OrderField::CreatedAt)]);
        } else {
            sort_records(&mut matched, order);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OrderField;
    use serde_json::json;

    fn store_with(n: usize, module: &str) -> (MemoryMutationStore, Vec<Uuid>) {
        let store = MemoryMutationStore::new();
        let ids = (0..n)
            .map(|i| {
                store
                    .create(NewMutation::new(module, "DoThing", json!({ "i": i })))
                    .unwrap()
                    .id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn create_then_get_roundtrips_payload() {
        let store = MemoryMutationStore::new();
        let record = store
            .create(
                NewMutation::new("billing", "ChargeCard", json!({ "amount": 100 }))
                    .with_correlation_id("req-1")
                    .with_label("charge attempt"),
            )
            .unwrap();

        let loaded = store.get(record.id).unwrap().unwrap();
        assert_eq!(loaded.payload, json!({ "amount": 100 }));
        assert_eq!(loaded.status, MutationStatus::Received);
        assert_eq!(loaded.correlation_id.as_deref(), Some("req-1"));
        assert_eq!(loaded.label.as_deref(), Some("charge attempt"));
        assert!(loaded.error_detail.is_none());
    }

    #[test]
    fn mark_calls_converge_to_last_outcome() {
        let (store, ids) = store_with(1, "billing");
        let id = ids[0];

        store.mark_failed(id, json!([{ "message": "boom" }])).unwrap();
        store.mark_failed(id, json!([{ "message": "boom again" }])).unwrap();
        let r = store.get(id).unwrap().unwrap();
        assert_eq!(r.status, MutationStatus::Failed);
        assert_eq!(r.error_detail, Some(json!([{ "message": "boom again" }])));

        store.mark_success(id).unwrap();
        let r = store.get(id).unwrap().unwrap();
        assert_eq!(r.status, MutationStatus::Success);
        assert!(r.error_detail.is_none());
    }

    #[test]
    fn mark_pending_never_demotes_a_terminal_record() {
        let (store, ids) = store_with(1, "billing");
        let id = ids[0];

        store.mark_success(id).unwrap();
        store.mark_pending(id).unwrap();
        assert_eq!(
            store.get(id).unwrap().unwrap().status,
            MutationStatus::Success
        );
    }

    #[test]
    fn mark_on_unknown_id_is_a_contract_violation() {
        let store = MemoryMutationStore::new();
        let err = store.mark_success(Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MutationError>(),
            Some(MutationError::RecordNotFound(_))
        ));
    }

    #[test]
    fn query_filters_by_status_threshold() {
        let (store, ids) = store_with(3, "billing");
        store.mark_success(ids[0]).unwrap();
        store.mark_failed(ids[1], json!([{ "message": "no" }])).unwrap();

        let terminal = store.query(
            &MutationFilter::new().status_gte(MutationStatus::Success),
            &[],
        );
        assert_eq!(terminal.len(), 2);

        let received = store.query(
            &MutationFilter::new().status_eq(MutationStatus::Received),
            &[],
        );
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id, ids[2]);
    }

    #[test]
    fn query_orders_by_requested_keys() {
        let (store, _) = store_with(2, "billing");
        store
            .create(NewMutation::new("claims", "SubmitClaim", json!({})))
            .unwrap();

        let by_module_desc = store.query(
            &MutationFilter::new(),
            &[OrderKey::desc(OrderField::Module)],
        );
        assert_eq!(by_module_desc[0].module, "claims");

        let random = store.query(&MutationFilter::new(), &[OrderKey::Random]);
        assert_eq!(random.len(), 3);
        let ids: Vec<Uuid> = random.iter().map(|r| r.id).collect();
        let sorted = {
            let mut s = ids.clone();
            s.sort();
            s
        };
        // Documented fallback: random order is id order on this backend.
        assert_eq!(ids, sorted);
    }
}
