use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::accrual::{weekly_figures, StatusPolicy};
use crate::models::{Client, ClientWeek, CompletionEvent, PortfolioKpis, Status, WeeklyCommitment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientFilter {
    pub contracted_only: bool,
}

impl ClientFilter {
    pub fn admits(&self, client: &Client) -> bool {
        !self.contracted_only || client.contract_executed
    }
}

/// Joins rows by client and computes every admitted client's week, sorted by
/// name. Clients without any commitment are kept with zero figures.
pub fn build_roster(
    clients: Vec<Client>,
    commitments: Vec<WeeklyCommitment>,
    completions: Vec<CompletionEvent>,
    filter: ClientFilter,
    today: NaiveDateTime,
    policy: &StatusPolicy,
) -> Vec<ClientWeek> {
    let mut commitments_by_client: HashMap<Uuid, Vec<WeeklyCommitment>> = HashMap::new();
    for commitment in commitments {
        commitments_by_client
            .entry(commitment.client_id)
            .or_default()
            .push(commitment);
    }
    let mut completions_by_client: HashMap<Uuid, Vec<CompletionEvent>> = HashMap::new();
    for completion in completions {
        completions_by_client
            .entry(completion.client_id)
            .or_default()
            .push(completion);
    }

    let mut roster: Vec<ClientWeek> = clients
        .into_iter()
        .filter(|client| filter.admits(client))
        .map(|client| {
            let figures = weekly_figures(
                commitments_by_client.get(&client.id).map(Vec::as_slice).unwrap_or_default(),
                completions_by_client.get(&client.id).map(Vec::as_slice).unwrap_or_default(),
                today,
                policy,
            );
            ClientWeek { client, figures }
        })
        .collect();

    roster.sort_by(|a, b| by_name(&a.client, &b.client));
    roster
}

fn by_name(a: &Client, b: &Client) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.id.cmp(&b.id))
}

pub fn portfolio_kpis(rows: &[ClientWeek]) -> PortfolioKpis {
    let mut kpis = PortfolioKpis::default();
    for row in rows {
        kpis.total_required += row.figures.required;
        kpis.total_completed += row.figures.completed_this_week;
        match row.figures.status {
            Status::Green => kpis.clients_green += 1,
            Status::Yellow => kpis.clients_yellow += 1,
            Status::Red => kpis.clients_red += 1,
        }
    }
    kpis.total_remaining = (kpis.total_required - kpis.total_completed).max(0);
    kpis
}

/// Clients with a positive requirement, most outstanding work first.
pub fn due_this_week(rows: &[ClientWeek]) -> Vec<ClientWeek> {
    let mut due: Vec<ClientWeek> = rows
        .iter()
        .filter(|row| row.figures.required > 0)
        .cloned()
        .collect();
    due.sort_by(|a, b| {
        b.figures
            .remaining
            .cmp(&a.figures.remaining)
            .then_with(|| by_name(&a.client, &b.client))
    });
    due
}

pub fn top_remaining(rows: &[ClientWeek], limit: usize) -> Vec<ClientWeek> {
    let mut due = due_this_week(rows);
    due.truncate(limit);
    due
}
