use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{Client, CompletionEvent, NewClient, WeeklyCommitment};
use crate::store::{NewCommitment, NewCompletion, TrackerStore};

#[derive(Default)]
struct Tables {
    clients: Vec<Client>,
    commitments: Vec<WeeklyCommitment>,
    completions: Vec<CompletionEvent>,
}

/// In-process store with the same contract as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub fail_commitment_inserts: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryStore {
    pub async fn commitments_for(&self, client_id: Uuid) -> Vec<WeeklyCommitment> {
        self.tables
            .lock()
            .await
            .commitments
            .iter()
            .filter(|c| c.client_id == client_id)
            .cloned()
            .collect()
    }

    pub async fn completion_count(&self) -> usize {
        self.tables.lock().await.completions.len()
    }

    fn check_reads(&self, op: &'static str) -> TrackerResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TrackerError::Rejected {
                op,
                reason: "reads disabled".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TrackerStore for MemoryStore {
    async fn list_clients(&self) -> TrackerResult<Vec<Client>> {
        self.check_reads("list_clients")?;
        Ok(self.tables.lock().await.clients.clone())
    }

    async fn get_client(&self, id: Uuid) -> TrackerResult<Option<Client>> {
        self.check_reads("get_client")?;
        Ok(self
            .tables
            .lock()
            .await
            .clients
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn upsert_client(&self, client: &NewClient) -> TrackerResult<Client> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables
            .clients
            .iter_mut()
            .find(|c| c.external_ref.as_deref() == Some(client.external_ref.as_str()))
        {
            existing.name = client.name.clone();
            existing.contract_executed = client.contract_executed;
            existing.total_lives = client.total_lives;
            existing.instructions = client.instructions.clone();
            return Ok(existing.clone());
        }

        let row = Client {
            id: Uuid::new_v4(),
            external_ref: Some(client.external_ref.clone()),
            name: client.name.clone(),
            contract_executed: client.contract_executed,
            total_lives: client.total_lives,
            instructions: client.instructions.clone(),
        };
        tables.clients.push(row.clone());
        Ok(row)
    }

    async fn delete_client(&self, id: Uuid) -> TrackerResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.clients.len();
        tables.clients.retain(|c| c.id != id);
        if tables.clients.len() == before {
            return Ok(false);
        }
        tables.commitments.retain(|c| c.client_id != id);
        tables.completions.retain(|c| c.client_id != id);
        Ok(true)
    }

    async fn list_commitments(&self, client_id: Option<Uuid>) -> TrackerResult<Vec<WeeklyCommitment>> {
        self.check_reads("list_commitments")?;
        Ok(self
            .tables
            .lock()
            .await
            .commitments
            .iter()
            .filter(|c| client_id.map_or(true, |id| c.client_id == id))
            .cloned()
            .collect())
    }

    async fn active_commitment(&self, client_id: Uuid) -> TrackerResult<Option<WeeklyCommitment>> {
        self.check_reads("active_commitment")?;
        Ok(self
            .tables
            .lock()
            .await
            .commitments
            .iter()
            .find(|c| c.client_id == client_id && c.active)
            .cloned())
    }

    async fn deactivate_commitment(&self, client_id: Uuid) -> TrackerResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut changed = 0;
        for commitment in tables
            .commitments
            .iter_mut()
            .filter(|c| c.client_id == client_id && c.active)
        {
            commitment.active = false;
            changed += 1;
        }
        Ok(changed)
    }

    async fn insert_commitment(&self, commitment: &NewCommitment) -> TrackerResult<WeeklyCommitment> {
        if self.fail_commitment_inserts.load(Ordering::SeqCst) {
            return Err(TrackerError::Rejected {
                op: "insert_commitment",
                reason: "injected failure".to_string(),
            });
        }
        let mut tables = self.tables.lock().await;
        if !tables.clients.iter().any(|c| c.id == commitment.client_id) {
            return Err(TrackerError::ClientNotFound(commitment.client_id));
        }
        if tables
            .commitments
            .iter()
            .any(|c| c.client_id == commitment.client_id && c.active)
        {
            return Err(TrackerError::Rejected {
                op: "insert_commitment",
                reason: "client already has an active commitment".to_string(),
            });
        }
        let row = WeeklyCommitment {
            id: Uuid::new_v4(),
            client_id: commitment.client_id,
            weekly_qty: commitment.weekly_qty,
            start_week: commitment.start_week,
            active: true,
        };
        tables.commitments.push(row.clone());
        Ok(row)
    }

    async fn list_completions_since(
        &self,
        since: NaiveDateTime,
        client_id: Option<Uuid>,
    ) -> TrackerResult<Vec<CompletionEvent>> {
        self.check_reads("list_completions_since")?;
        Ok(self
            .tables
            .lock()
            .await
            .completions
            .iter()
            .filter(|c| c.occurred_on >= since)
            .filter(|c| client_id.map_or(true, |id| c.client_id == id))
            .cloned()
            .collect())
    }

    async fn insert_completion(&self, completion: &NewCompletion) -> TrackerResult<CompletionEvent> {
        let mut tables = self.tables.lock().await;
        if !tables.clients.iter().any(|c| c.id == completion.client_id) {
            return Err(TrackerError::ClientNotFound(completion.client_id));
        }
        let row = CompletionEvent {
            id: Uuid::new_v4(),
            client_id: completion.client_id,
            occurred_on: completion.occurred_on,
            qty_completed: completion.qty_completed,
            note: completion.note.clone(),
        };
        tables.completions.push(row.clone());
        Ok(row)
    }
}
