use std::fmt::Write;

use crate::dashboard::DashboardSnapshot;
use crate::models::ClientWeek;
use crate::portfolio::top_remaining;

pub fn status_line(row: &ClientWeek) -> String {
    let figures = &row.figures;
    format!(
        "{} [{}] required {} (quota {}, carry-in {:+}), done {}, remaining {}",
        row.client.name,
        figures.status,
        figures.required,
        figures.quota_this_week,
        figures.carry_in,
        figures.completed_this_week,
        figures.remaining
    )
}

pub fn build_report(snapshot: &DashboardSnapshot) -> String {
    let mut output = String::new();
    let scope = if snapshot.contracted_only {
        "contracted clients"
    } else {
        "all clients"
    };
    let kpis = &snapshot.kpis;

    let _ = writeln!(output, "# Weekly Commitment Report");
    let _ = writeln!(
        output,
        "Week of {} through {} for {} (as of {})",
        snapshot.week_start,
        snapshot.week_end,
        scope,
        snapshot.today.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(output, "- Required this week: {}", kpis.total_required);
    let _ = writeln!(output, "- Completed so far: {}", kpis.total_completed);
    let _ = writeln!(output, "- Remaining: {}", kpis.total_remaining);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    let _ = writeln!(
        output,
        "- red: {}\n- yellow: {}\n- green: {}",
        kpis.clients_red, kpis.clients_yellow, kpis.clients_green
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Due This Week");

    let due = top_remaining(&snapshot.due, 10);
    if due.is_empty() {
        let _ = writeln!(output, "Nothing due this week.");
    } else {
        let _ = writeln!(output, "| Client | Status | Required | Done | Remaining | Per day |");
        let _ = writeln!(output, "|---|---|---:|---:|---:|---:|");
        for row in due.iter() {
            let f = &row.figures;
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {:.1} |",
                row.client.name, f.status, f.required, f.completed_this_week, f.remaining, f.need_per_day
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Roster");

    if snapshot.roster.is_empty() {
        let _ = writeln!(output, "No clients yet. Import a CSV.");
    } else {
        for row in snapshot.roster.iter() {
            let lives = row
                .client
                .total_lives
                .map_or_else(|| "-".to_string(), |l| l.to_string());
            let _ = writeln!(output, "- {} (lives {})", status_line(row), lives);
        }
    }

    output
}
