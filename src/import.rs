use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::NewClient;
use crate::store::TrackerStore;
use crate::workflow::{self, CommitmentChange};
use crate::week::WorkWeek;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub clients_upserted: usize,
    pub commitments_created: usize,
    pub commitments_unchanged: usize,
    pub rows_skipped: usize,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    client_ref: Option<String>,
    #[serde(default)]
    client_name: Option<String>,
    #[serde(default)]
    contract_executed: Option<String>,
    #[serde(default)]
    total_lives: Option<i32>,
    #[serde(default)]
    weekly_qty: Option<i64>,
    #[serde(default)]
    start_week: Option<NaiveDate>,
    #[serde(default)]
    instructions: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "yes" | "y" | "1")
    )
}

pub async fn import_csv(
    store: &dyn TrackerStore,
    csv_path: &Path,
    today: NaiveDate,
) -> anyhow::Result<ImportSummary> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    import_rows(store, file, today).await
}

/// Upserts each row's client and saves its commitment. Re-running the same
/// input creates nothing new.
pub async fn import_rows<R: Read>(
    store: &dyn TrackerStore,
    input: R,
    today: NaiveDate,
) -> anyhow::Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        rows.push(result.with_context(|| format!("invalid CSV row at line {}", index + 2))?);
    }

    let mut summary = ImportSummary::default();
    for row in rows {
        let name = non_blank(row.client_name);
        let external_ref = non_blank(row.client_ref)
            .or_else(|| name.as_ref().map(|n| n.to_lowercase()));
        let Some(external_ref) = external_ref else {
            summary.rows_skipped += 1;
            continue;
        };

        let client = store
            .upsert_client(&NewClient {
                name: name.unwrap_or_else(|| external_ref.clone()),
                external_ref,
                contract_executed: parse_flag(row.contract_executed.as_deref()),
                total_lives: row.total_lives,
                instructions: non_blank(row.instructions),
            })
            .await?;
        summary.clients_upserted += 1;

        match row.weekly_qty {
            Some(qty) if qty > 0 => {
                let effective = row.start_week.unwrap_or(today);
                match workflow::save_commitment(store, client.id, qty, effective).await? {
                    CommitmentChange::Unchanged(_) => summary.commitments_unchanged += 1,
                    CommitmentChange::Created { .. } => summary.commitments_created += 1,
                }
            }
            Some(qty) if qty < 0 => {
                warn!(client = %client.name, qty, "ignoring negative weekly quantity");
            }
            _ => {}
        }
    }

    info!(
        clients = summary.clients_upserted,
        created = summary.commitments_created,
        unchanged = summary.commitments_unchanged,
        skipped = summary.rows_skipped,
        "import finished"
    );
    Ok(summary)
}

/// Loads a handful of clients in different states relative to `today`.
pub async fn seed_demo(store: &dyn TrackerStore, today: NaiveDate) -> anyhow::Result<usize> {
    let this_week = WorkWeek::containing(today);
    let last_week = this_week.previous();

    // (ref, name, contracted, lives, weekly qty, last-week done, this-week done)
    let clients = [
        ("riverside-clinic", "Riverside Clinic", true, Some(4_200), 300, 300, 120),
        ("harbor-family", "Harbor Family Practice", true, Some(1_850), 250, 90, 40),
        ("summit-health", "Summit Health Partners", true, Some(9_600), 600, 640, 0),
        ("lakeside-prospect", "Lakeside Prospect", false, None, 150, 0, 0),
    ];

    for (external_ref, name, contracted, lives, qty, done_last, done_this) in clients {
        let client = store
            .upsert_client(&NewClient {
                external_ref: external_ref.to_string(),
                name: name.to_string(),
                contract_executed: contracted,
                total_lives: lives,
                instructions: None,
            })
            .await?;
        workflow::save_commitment(store, client.id, qty, last_week.monday()).await?;

        // A week that already holds completions was seeded on an earlier run.
        let existing = store
            .list_completions_since(last_week.start(), Some(client.id))
            .await?;
        let seeded = |week: WorkWeek| existing.iter().any(|c| week.contains(c.occurred_on));

        let last_noon = (last_week.monday() + Duration::days(2)).and_time(NaiveTime::MIN) + Duration::hours(12);
        if done_last > 0 && !seeded(last_week) {
            workflow::log_completion(store, client.id, done_last, Some("seed".to_string()), last_noon).await?;
        }
        if done_this > 0 && !seeded(this_week) {
            workflow::log_completion(store, client.id, done_this, Some("seed".to_string()), this_week.start())
                .await?;
        }
    }

    Ok(clients.len())
}
