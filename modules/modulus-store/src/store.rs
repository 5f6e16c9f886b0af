//! PgMutationStore — mutation log backed by Postgres.
//!
//! Every write is committed before the call returns; there is no buffering
//! that could be lost on crash. Distinct records never conflict, so no
//! record-level locking is needed — per-statement atomicity is enough.

use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use modulus_common::MutationError;

use crate::query::{MutationFilter, OrderKey};
use crate::record::{MutationRecord, MutationStatus, NewMutation};

const RECORD_COLUMNS: &str = "id, created_at, module, handler, payload, \
     submitted_by, correlation_id, label, status, error_detail";

/// Durable mutation log. The single source of truth for mutation outcomes.
#[derive(Clone)]
pub struct PgMutationStore {
    pool: PgPool,
}

impl PgMutationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the mutation_log table and its indexes if absent.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mutation_log (
                id             UUID         PRIMARY KEY,
                created_at     TIMESTAMPTZ  NOT NULL DEFAULT now(),
                module         TEXT         NOT NULL,
                handler        TEXT         NOT NULL,
                payload        JSONB        NOT NULL,
                submitted_by   UUID,
                correlation_id TEXT,
                label          TEXT,
                status         SMALLINT     NOT NULL DEFAULT 0,
                error_detail   JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS mutation_log_correlation_idx \
             ON mutation_log (correlation_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS mutation_log_submitted_by_idx \
             ON mutation_log (submitted_by)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist a new record with status Received. Returns the full record
    /// (with the server-assigned created_at).
    pub async fn create(&self, mutation: NewMutation) -> Result<MutationRecord> {
        let id = Uuid::new_v4();
        let record = sqlx::query_as::<_, MutationRecord>(&format!(
            r#"
            INSERT INTO mutation_log (id, module, handler, payload, submitted_by, correlation_id, label, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {RECORD_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(&mutation.module)
        .bind(&mutation.handler)
        .bind(&mutation.payload)
        .bind(mutation.submitted_by)
        .bind(&mutation.correlation_id)
        .bind(&mutation.label)
        .bind(MutationStatus::Received.as_i16())
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    /// Read a single record by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<MutationRecord>> {
        let record = sqlx::query_as::<_, MutationRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM mutation_log WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Transition Received → PendingExecution. A no-op on records that have
    /// already advanced; an error on ids that were never created.
    pub async fn mark_pending(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE mutation_log SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(id)
        .bind(MutationStatus::PendingExecution.as_i16())
        .bind(MutationStatus::Received.as_i16())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.get(id).await?.is_none() {
            return Err(MutationError::RecordNotFound(id).into());
        }
        Ok(())
    }

    /// Mark the record successful and clear any error detail. Idempotent;
    /// converges to the last mark_* call's outcome.
    pub async fn mark_success(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE mutation_log SET status = $2, error_detail = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(MutationStatus::Success.as_i16())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MutationError::RecordNotFound(id).into());
        }
        Ok(())
    }

    /// Mark the record failed with the given detail. Idempotent; converges
    /// to the last mark_* call's outcome.
    pub async fn mark_failed(&self, id: Uuid, detail: serde_json::Value) -> Result<()> {
        let result = sqlx::query(
            "UPDATE mutation_log SET status = $2, error_detail = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(MutationStatus::Failed.as_i16())
        .bind(detail)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MutationError::RecordNotFound(id).into());
        }
        Ok(())
    }

    /// Filtered, ordered read over the log.
    ///
    /// `OrderKey::Random` compiles to `ORDER BY RANDOM()` — the store-native
    /// random order. An empty order list returns rows in storage order.
    pub async fn query(
        &self,
        filter: &MutationFilter,
        order: &[OrderKey],
    ) -> Result<Vec<MutationRecord>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {RECORD_COLUMNS} FROM mutation_log WHERE TRUE",
        ));

        if let Some(id) = filter.id {
            qb.push(" AND id = ").push_bind(id);
        }
        if let Some(cid) = &filter.correlation_id {
            qb.push(" AND correlation_id = ").push_bind(cid.clone());
        }
        if let Some(principal_id) = filter.submitted_by {
            qb.push(" AND submitted_by = ").push_bind(principal_id);
        }
        if let Some(status) = filter.status_eq {
            qb.push(" AND status = ").push_bind(status.as_i16());
        }
        if let Some(status) = filter.status_gte {
            qb.push(" AND status >= ").push_bind(status.as_i16());
        }
        if let Some(ts) = filter.created_after {
            qb.push(" AND created_at >= ").push_bind(ts);
        }
        if let Some(ts) = filter.created_before {
            qb.push(" AND created_at <= ").push_bind(ts);
        }

        if !order.is_empty() {
            qb.push(" ORDER BY ");
            let mut keys = qb.separated(", ");
            for key in order {
                match key {
                    OrderKey::Random => {
                        keys.push("RANDOM()");
                    }
                    OrderKey::Field { field, descending } => {
                        keys.push(field.column());
                        if *descending {
                            keys.push_unseparated(" DESC");
                        }
                    }
                }
            }
        }

        let records = qb
            .build_query_as::<MutationRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for MutationRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;

        let raw_status: i16 = row.try_get("status")?;
        let status = MutationStatus::from_i16(raw_status).ok_or_else(|| {
            sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: format!("invalid mutation status: {raw_status}").into(),
            }
        })?;

        Ok(MutationRecord {
            id: row.try_get("id")?,
            created_at: row.try_get("created_at")?,
            module: row.try_get("module")?,
            handler: row.try_get("handler")?,
            payload: row.try_get("payload")?,
            submitted_by: row.try_get("submitted_by")?,
            correlation_id: row.try_get("correlation_id")?,
            label: row.try_get("label")?,
            status,
            error_detail: row.try_get("error_detail")?,
        })
    }
}
