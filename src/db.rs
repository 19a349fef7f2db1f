use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{Client, CompletionEvent, NewClient, WeeklyCommitment};
use crate::store::{NewCommitment, NewCompletion, TrackerStore};

const CLIENT_COLUMNS: &str = "id, external_ref, name, contract_executed, total_lives, instructions";
const COMMITMENT_COLUMNS: &str = "id, client_id, weekly_qty, start_week, active";
const COMPLETION_COLUMNS: &str = "id, client_id, occurred_on, qty_completed, note";

pub async fn connect(database_url: &str, max_connections: u32) -> TrackerResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> TrackerResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn client_from_row(row: &PgRow) -> Client {
    Client {
        id: row.get("id"),
        external_ref: row.get("external_ref"),
        name: row.get("name"),
        contract_executed: row.get("contract_executed"),
        total_lives: row.get("total_lives"),
        instructions: row.get("instructions"),
    }
}

fn commitment_from_row(row: &PgRow) -> WeeklyCommitment {
    WeeklyCommitment {
        id: row.get("id"),
        client_id: row.get("client_id"),
        weekly_qty: row.get("weekly_qty"),
        start_week: row.get("start_week"),
        active: row.get("active"),
    }
}

fn completion_from_row(row: &PgRow) -> CompletionEvent {
    CompletionEvent {
        id: row.get("id"),
        client_id: row.get("client_id"),
        occurred_on: row.get("occurred_on"),
        qty_completed: row.get("qty_completed"),
        note: row.get("note"),
    }
}

// The partial unique index admits one active commitment per client.
fn commitment_insert_error(err: sqlx::Error) -> TrackerError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => TrackerError::Rejected {
            op: "insert_commitment",
            reason: "client already has an active commitment".to_string(),
        },
        other => TrackerError::Store(other),
    }
}

#[async_trait]
impl TrackerStore for PgStore {
    async fn list_clients(&self) -> TrackerResult<Vec<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM commitment_tracker.clients ORDER BY name");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(client_from_row).collect())
    }

    async fn get_client(&self, id: Uuid) -> TrackerResult<Option<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM commitment_tracker.clients WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(client_from_row))
    }

    async fn upsert_client(&self, client: &NewClient) -> TrackerResult<Client> {
        let query = format!(
            r#"
            INSERT INTO commitment_tracker.clients
            (id, external_ref, name, contract_executed, total_lives, instructions)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_ref) DO UPDATE
            SET name = EXCLUDED.name,
                contract_executed = EXCLUDED.contract_executed,
                total_lives = EXCLUDED.total_lives,
                instructions = EXCLUDED.instructions
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&client.external_ref)
            .bind(&client.name)
            .bind(client.contract_executed)
            .bind(client.total_lives)
            .bind(&client.instructions)
            .fetch_one(&self.pool)
            .await?;
        Ok(client_from_row(&row))
    }

    async fn delete_client(&self, id: Uuid) -> TrackerResult<bool> {
        // Commitments and completions go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM commitment_tracker.clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_commitments(&self, client_id: Option<Uuid>) -> TrackerResult<Vec<WeeklyCommitment>> {
        let mut query = format!("SELECT {COMMITMENT_COLUMNS} FROM commitment_tracker.weekly_commitments");
        if client_id.is_some() {
            query.push_str(" WHERE client_id = $1");
        }
        query.push_str(" ORDER BY start_week");

        let mut rows = sqlx::query(&query);
        if let Some(value) = client_id {
            rows = rows.bind(value);
        }
        let records = rows.fetch_all(&self.pool).await?;
        Ok(records.iter().map(commitment_from_row).collect())
    }

    async fn active_commitment(&self, client_id: Uuid) -> TrackerResult<Option<WeeklyCommitment>> {
        let query = format!(
            "SELECT {COMMITMENT_COLUMNS} FROM commitment_tracker.weekly_commitments \
             WHERE client_id = $1 AND active \
             ORDER BY start_week DESC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(commitment_from_row))
    }

    async fn deactivate_commitment(&self, client_id: Uuid) -> TrackerResult<u64> {
        let result = sqlx::query(
            "UPDATE commitment_tracker.weekly_commitments SET active = FALSE \
             WHERE client_id = $1 AND active",
        )
        .bind(client_id)
        .execute(&self.pool)
        .await?;
        debug!(client = %client_id, rows = result.rows_affected(), "commitment deactivated");
        Ok(result.rows_affected())
    }

    async fn insert_commitment(&self, commitment: &NewCommitment) -> TrackerResult<WeeklyCommitment> {
        let query = format!(
            r#"
            INSERT INTO commitment_tracker.weekly_commitments
            (id, client_id, weekly_qty, start_week, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {COMMITMENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(commitment.client_id)
            .bind(commitment.weekly_qty)
            .bind(commitment.start_week)
            .fetch_one(&self.pool)
            .await
            .map_err(commitment_insert_error)?;
        Ok(commitment_from_row(&row))
    }

    async fn list_completions_since(
        &self,
        since: NaiveDateTime,
        client_id: Option<Uuid>,
    ) -> TrackerResult<Vec<CompletionEvent>> {
        let mut query = format!(
            "SELECT {COMPLETION_COLUMNS} FROM commitment_tracker.completions WHERE occurred_on >= $1"
        );
        if client_id.is_some() {
            query.push_str(" AND client_id = $2");
        }
        query.push_str(" ORDER BY occurred_on");

        let mut rows = sqlx::query(&query).bind(since);
        if let Some(value) = client_id {
            rows = rows.bind(value);
        }
        let records = rows.fetch_all(&self.pool).await?;
        Ok(records.iter().map(completion_from_row).collect())
    }

    async fn insert_completion(&self, completion: &NewCompletion) -> TrackerResult<CompletionEvent> {
        let query = format!(
            r#"
            INSERT INTO commitment_tracker.completions
            (id, client_id, occurred_on, qty_completed, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COMPLETION_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(completion.client_id)
            .bind(completion.occurred_on)
            .bind(completion.qty_completed)
            .bind(&completion.note)
            .fetch_one(&self.pool)
            .await?;
        Ok(completion_from_row(&row))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct ConstraintError(ErrorKind);

    impl fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "constraint violated")
        }
    }

    impl StdError for ConstraintError {}

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    #[test]
    fn second_active_commitment_is_rejected() {
        let err = commitment_insert_error(sqlx::Error::Database(Box::new(ConstraintError(
            ErrorKind::UniqueViolation,
        ))));
        assert!(matches!(err, TrackerError::Rejected { op: "insert_commitment", .. }));
        assert!(err.to_string().contains("already has an active commitment"));
    }

    #[test]
    fn other_insert_failures_stay_store_errors() {
        let err = commitment_insert_error(sqlx::Error::Database(Box::new(ConstraintError(ErrorKind::Other))));
        assert!(matches!(err, TrackerError::Store(_)));
        assert!(matches!(
            commitment_insert_error(sqlx::Error::RowNotFound),
            TrackerError::Store(sqlx::Error::RowNotFound)
        ));
    }
}
