//! The read pass behind every view: fetch, join in memory, compute.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::accrual::{weekly_figures, StatusPolicy};
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Client, ClientWeek, CompletionEvent, PortfolioKpis, WeeklyCommitment, WeeklyFigures};
use crate::portfolio::{build_roster, due_this_week, portfolio_kpis, ClientFilter};
use crate::store::TrackerStore;
use crate::week::WorkWeek;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub today: NaiveDateTime,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub contracted_only: bool,
    pub kpis: PortfolioKpis,
    pub due: Vec<ClientWeek>,
    pub roster: Vec<ClientWeek>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    pub client: Client,
    pub figures: WeeklyFigures,
    /// Newest first.
    pub commitments: Vec<WeeklyCommitment>,
    /// Last week and this week, oldest first.
    pub completions: Vec<CompletionEvent>,
}

pub async fn load_snapshot(
    store: &dyn TrackerStore,
    filter: ClientFilter,
    today: NaiveDateTime,
    policy: &StatusPolicy,
) -> TrackerResult<DashboardSnapshot> {
    let week = WorkWeek::containing(today.date());
    let since = week.previous().start();

    let (clients, commitments, completions) = tokio::try_join!(
        store.list_clients(),
        store.list_commitments(None),
        store.list_completions_since(since, None),
    )?;
    debug!(
        clients = clients.len(),
        commitments = commitments.len(),
        completions = completions.len(),
        "dashboard rows fetched"
    );

    let roster = build_roster(clients, commitments, completions, filter, today, policy);
    Ok(DashboardSnapshot {
        today,
        week_start: week.monday(),
        week_end: week.friday(),
        contracted_only: filter.contracted_only,
        kpis: portfolio_kpis(&roster),
        due: due_this_week(&roster),
        roster,
    })
}

pub async fn load_client_detail(
    store: &dyn TrackerStore,
    client_id: Uuid,
    today: NaiveDateTime,
    policy: &StatusPolicy,
) -> TrackerResult<ClientDetail> {
    let since = WorkWeek::containing(today.date()).previous().start();
    let (client, mut commitments, mut completions) = tokio::try_join!(
        store.get_client(client_id),
        store.list_commitments(Some(client_id)),
        store.list_completions_since(since, Some(client_id)),
    )?;
    let client = client.ok_or(TrackerError::ClientNotFound(client_id))?;

    let figures = weekly_figures(&commitments, &completions, today, policy);
    commitments.sort_by(|a, b| b.start_week.cmp(&a.start_week).then(b.active.cmp(&a.active)));
    completions.sort_by_key(|c| c.occurred_on);

    Ok(ClientDetail {
        client,
        figures,
        commitments,
        completions,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::{NewClient, Status};
    use crate::workflow::{log_completion, save_commitment};

    fn today() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    async fn add_client(store: &MemoryStore, key: &str, contracted: bool) -> Uuid {
        store
            .upsert_client(&NewClient {
                external_ref: key.to_string(),
                name: key.to_uppercase(),
                contract_executed: contracted,
                total_lives: None,
                instructions: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn snapshot_reflects_logged_work_on_next_read() {
        let store = MemoryStore::default();
        let id = add_client(&store, "alpha", true).await;
        save_commitment(&store, id, 300, today().date()).await.unwrap();

        let filter = ClientFilter {
            contracted_only: true,
        };
        let policy = StatusPolicy::default();
        let before = load_snapshot(&store, filter, today(), &policy).await.unwrap();
        assert_eq!(before.kpis.total_remaining, 300);
        assert_eq!(before.week_start, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(before.week_end, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());

        log_completion(&store, id, 120, None, today()).await.unwrap();
        let after = load_snapshot(&store, filter, today(), &policy).await.unwrap();
        assert_eq!(after.kpis.total_completed, 120);
        assert_eq!(after.kpis.total_remaining, 180);
        assert_eq!(after.due[0].figures.remaining, 180);
    }

    #[tokio::test]
    async fn uncontracted_clients_only_show_when_requested() {
        let store = MemoryStore::default();
        add_client(&store, "signed", true).await;
        add_client(&store, "pending", false).await;

        let policy = StatusPolicy::default();
        let contracted = load_snapshot(&store, ClientFilter { contracted_only: true }, today(), &policy)
            .await
            .unwrap();
        let everyone = load_snapshot(&store, ClientFilter { contracted_only: false }, today(), &policy)
            .await
            .unwrap();
        assert_eq!(contracted.roster.len(), 1);
        assert_eq!(everyone.roster.len(), 2);
        assert!(everyone.due.is_empty());
    }

    #[tokio::test]
    async fn store_failure_yields_no_partial_snapshot() {
        let store = MemoryStore::default();
        add_client(&store, "alpha", true).await;
        store.fail_reads.store(true, Ordering::SeqCst);
        let result = load_snapshot(
            &store,
            ClientFilter {
                contracted_only: false,
            },
            today(),
            &StatusPolicy::default(),
        )
        .await;
        assert!(matches!(result, Err(TrackerError::Rejected { .. })));
    }

    #[tokio::test]
    async fn client_detail_lists_history_newest_first() {
        let store = MemoryStore::default();
        let id = add_client(&store, "alpha", true).await;
        let last_week = today().date() - chrono::Duration::days(7);
        save_commitment(&store, id, 200, last_week).await.unwrap();
        save_commitment(&store, id, 400, today().date()).await.unwrap();
        log_completion(&store, id, 50, Some("first".into()), today() - chrono::Duration::days(6))
            .await
            .unwrap();

        let detail = load_client_detail(&store, id, today(), &StatusPolicy::default())
            .await
            .unwrap();
        assert_eq!(detail.commitments.len(), 2);
        assert_eq!(detail.commitments[0].weekly_qty, 400);
        assert!(detail.commitments[0].active);
        assert!(!detail.commitments[1].active);
        assert_eq!(detail.completions.len(), 1);
        // The retired row no longer counts, so last week reads as quota 0.
        assert_eq!(detail.figures.quota_last_week, 0);
        assert_eq!(detail.figures.carry_in, -50);
        assert_eq!(detail.figures.required, 350);
        assert_eq!(detail.figures.status, Status::Yellow);
    }

    #[tokio::test]
    async fn client_detail_for_unknown_id_fails() {
        let store = MemoryStore::default();
        let err = load_client_detail(&store, Uuid::new_v4(), today(), &StatusPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::ClientNotFound(_)));
    }
}
