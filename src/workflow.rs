//! Write paths: completion logging, commitment management, client removal.
//!
//! Quantities are validated here, before any store call. Nothing in this
//! module caches derived figures; callers re-run the read pass afterwards.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{CompletionEvent, WeeklyCommitment};
use crate::store::{NewCommitment, NewCompletion, TrackerStore};
use crate::week::{monday_of, WorkWeek};

#[derive(Debug, Clone, PartialEq)]
pub enum CommitmentChange {
    /// The active commitment already matched; nothing written.
    Unchanged(WeeklyCommitment),
    Created {
        commitment: WeeklyCommitment,
        retired: u64,
    },
}

/// When a logged completion is dated: this week's Friday, a given day, or `now`.
pub fn completion_instant(now: NaiveDateTime, on: Option<NaiveDate>, friday: bool) -> NaiveDateTime {
    if friday {
        WorkWeek::containing(now.date()).friday().and_time(NaiveTime::MIN)
    } else {
        on.map_or(now, |d| d.and_time(NaiveTime::MIN))
    }
}

pub async fn log_completion(
    store: &dyn TrackerStore,
    client_id: Uuid,
    qty: i64,
    note: Option<String>,
    occurred_on: NaiveDateTime,
) -> TrackerResult<CompletionEvent> {
    if qty <= 0 {
        return Err(TrackerError::InvalidQuantity {
            field: "qty_completed",
            value: qty,
        });
    }
    if store.get_client(client_id).await?.is_none() {
        return Err(TrackerError::ClientNotFound(client_id));
    }

    let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let event = store
        .insert_completion(&NewCompletion {
            client_id,
            occurred_on,
            qty_completed: qty,
            note,
        })
        .await?;
    info!(client = %client_id, qty, occurred_on = %occurred_on, "completion logged");
    Ok(event)
}

/// Makes `qty` per week, effective from the week containing `effective`, the
/// client's active commitment.
///
/// The previous commitment is retired and the new one inserted as two
/// separate store calls. If the insert fails the client is left without an
/// active commitment and reads as quota 0 until the next successful save.
pub async fn save_commitment(
    store: &dyn TrackerStore,
    client_id: Uuid,
    qty: i64,
    effective: NaiveDate,
) -> TrackerResult<CommitmentChange> {
    if qty <= 0 {
        return Err(TrackerError::InvalidQuantity {
            field: "weekly_qty",
            value: qty,
        });
    }
    let start_week = monday_of(effective);

    if let Some(current) = store.active_commitment(client_id).await? {
        if current.weekly_qty == qty && current.start_week == start_week {
            debug!(client = %client_id, qty, %start_week, "commitment unchanged");
            return Ok(CommitmentChange::Unchanged(current));
        }
    } else if store.get_client(client_id).await?.is_none() {
        return Err(TrackerError::ClientNotFound(client_id));
    }

    let retired = store.deactivate_commitment(client_id).await?;
    let commitment = store
        .insert_commitment(&NewCommitment {
            client_id,
            weekly_qty: qty,
            start_week,
        })
        .await
        .inspect_err(|err| {
            if retired > 0 {
                warn!(client = %client_id, error = %err, "commitment retired but replacement insert failed");
            }
        })?;

    info!(client = %client_id, qty, %start_week, retired, "commitment saved");
    Ok(CommitmentChange::Created {
        commitment,
        retired,
    })
}

pub async fn delete_client(store: &dyn TrackerStore, client_id: Uuid) -> TrackerResult<bool> {
    let removed = store.delete_client(client_id).await?;
    if removed {
        info!(client = %client_id, "client deleted with commitments and completions");
    } else {
        debug!(client = %client_id, "delete requested for unknown client");
    }
    Ok(removed)
}
