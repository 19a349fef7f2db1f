//! Table-style access to clients, commitments and completions.
//!
//! The engine only ever sees plain rows; everything a backend needs to offer
//! is a handful of equality and range filters plus single-row writes.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::error::TrackerResult;
use crate::models::{Client, CompletionEvent, NewClient, WeeklyCommitment};

#[derive(Debug, Clone, PartialEq)]
pub struct NewCommitment {
    pub client_id: Uuid,
    pub weekly_qty: i64,
    pub start_week: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCompletion {
    pub client_id: Uuid,
    pub occurred_on: NaiveDateTime,
    pub qty_completed: i64,
    pub note: Option<String>,
}

#[async_trait]
pub trait TrackerStore: Send + Sync {
    async fn list_clients(&self) -> TrackerResult<Vec<Client>>;

    async fn get_client(&self, id: Uuid) -> TrackerResult<Option<Client>>;

    /// Insert or update by `external_ref`, returning the stored row.
    async fn upsert_client(&self, client: &NewClient) -> TrackerResult<Client>;

    /// Removes the client with its commitments and completions.
    /// Returns false when no such client existed.
    async fn delete_client(&self, id: Uuid) -> TrackerResult<bool>;

    async fn list_commitments(&self, client_id: Option<Uuid>) -> TrackerResult<Vec<WeeklyCommitment>>;

    async fn active_commitment(&self, client_id: Uuid) -> TrackerResult<Option<WeeklyCommitment>>;

    /// Flips the client's active commitment to inactive. Returns rows changed.
    async fn deactivate_commitment(&self, client_id: Uuid) -> TrackerResult<u64>;

    async fn insert_commitment(&self, commitment: &NewCommitment) -> TrackerResult<WeeklyCommitment>;

    async fn list_completions_since(
        &self,
        since: NaiveDateTime,
        client_id: Option<Uuid>,
    ) -> TrackerResult<Vec<CompletionEvent>>;

    async fn insert_completion(&self, completion: &NewCompletion) -> TrackerResult<CompletionEvent>;
}
