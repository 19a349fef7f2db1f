use anyhow::{bail, Context};

use crate::accrual::{StatusPolicy, DEFAULT_YELLOW_NEED_PER_DAY};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub policy: StatusPolicy,
    pub contracted_only: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let max_connections = match lookup("TRACKER_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("TRACKER_DB_MAX_CONNECTIONS is not a number: {raw}"))?,
            None => 5,
        };

        let yellow_need_per_day = match lookup("TRACKER_YELLOW_NEED_PER_DAY") {
            Some(raw) => parse_threshold(&raw)
                .with_context(|| format!("TRACKER_YELLOW_NEED_PER_DAY is invalid: {raw}"))?,
            None => DEFAULT_YELLOW_NEED_PER_DAY,
        };

        let contracted_only = match lookup("TRACKER_CONTRACTED_ONLY") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("TRACKER_CONTRACTED_ONLY must be true or false: {raw}"))?,
            None => true,
        };

        Ok(Self {
            database_url,
            max_connections,
            policy: StatusPolicy {
                yellow_need_per_day,
            },
            contracted_only,
        })
    }
}

pub fn parse_threshold(raw: &str) -> anyhow::Result<f64> {
    let value: f64 = raw.trim().parse()?;
    if !value.is_finite() || value < 0.0 {
        bail!("threshold must be a non-negative number");
    }
    Ok(value)
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised flag value {other}"),
    }
}
