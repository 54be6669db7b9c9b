use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

use crate::calc::model::CalcSettings;

/// Whether saved snapshots may be overwritten in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    /// Every save creates a new snapshot; nothing is ever overwritten.
    #[default]
    Append,
    /// Loaded snapshots may be rewritten by id, guarded by a revision check.
    Update,
}

impl FromStr for SnapshotMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" | "append-only" => Ok(Self::Append),
            "update" | "update-in-place" => Ok(Self::Update),
            other => anyhow::bail!("unknown snapshot mode `{}`", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub calc: CalcSettings,
    pub snapshot_mode: SnapshotMode,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://vaquita.db?mode=rwc".into());
        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let unit_packaging_cost = match std::env::var("PACKAGING_UNIT_COST") {
            Ok(v) => v
                .parse::<f64>()
                .with_context(|| format!("PACKAGING_UNIT_COST is not a number: {}", v))?,
            Err(_) => CalcSettings::default().unit_packaging_cost,
        };
        let calc = CalcSettings::new(unit_packaging_cost).context("PACKAGING_UNIT_COST")?;

        let snapshot_mode = match std::env::var("SNAPSHOT_MODE") {
            Ok(v) => v.parse::<SnapshotMode>()?,
            Err(_) => SnapshotMode::default(),
        };

        Ok(Self {
            database_url,
            max_connections,
            calc,
            snapshot_mode,
        })
    }

    /// Configuration for tests: private in-memory database, default settings.
    pub fn in_memory(snapshot_mode: SnapshotMode) -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            max_connections: 1,
            calc: CalcSettings::default(),
            snapshot_mode,
        }
    }
}
