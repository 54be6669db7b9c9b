use serde::Serialize;

use super::repo_types::SnapshotSummary;
use super::store::SnapshotStore;
use crate::calc::{
    model::{CalcSettings, SlotOutput},
    report::{build_report, Report},
};
use crate::error::CoreError;

/// A stored snapshot recomputed with the current settings.
#[derive(Debug, Serialize)]
pub struct SnapshotReport {
    pub snapshot: SnapshotSummary,
    pub report: Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotDelta {
    pub price: f64,
    pub profit_per_unit: f64,
    pub total_profit: f64,
    pub margin_pct: f64,
}

impl SlotDelta {
    fn between(left: &SlotOutput, right: &SlotOutput) -> Self {
        Self {
            price: right.price - left.price,
            profit_per_unit: right.profit_per_unit - left.profit_per_unit,
            total_profit: right.total_profit - left.total_profit,
            margin_pct: right.margin_pct - left.margin_pct,
        }
    }
}

/// `right - left` for the headline figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub total_cost: f64,
    pub cost_per_unit: f64,
    pub actual: SlotDelta,
    pub suggested: SlotDelta,
}

#[derive(Debug, Serialize)]
pub struct Comparison {
    pub left: SnapshotReport,
    pub right: SnapshotReport,
    pub delta: Delta,
}

pub async fn load_report(
    store: &dyn SnapshotStore,
    settings: &CalcSettings,
    id: i64,
) -> Result<SnapshotReport, CoreError> {
    let snapshot = store.get_snapshot(id).await?;
    let report = build_report(&snapshot.record, settings)?;
    Ok(SnapshotReport {
        snapshot: snapshot.summary(),
        report,
    })
}

pub async fn compare(
    store: &dyn SnapshotStore,
    settings: &CalcSettings,
    left_id: i64,
    right_id: i64,
) -> Result<Comparison, CoreError> {
    let left = load_report(store, settings, left_id).await?;
    let right = load_report(store, settings, right_id).await?;

    let (l, r) = (&left.report.output, &right.report.output);
    let delta = Delta {
        total_cost: r.total_cost - l.total_cost,
        cost_per_unit: r.cost_per_unit - l.cost_per_unit,
        actual: SlotDelta::between(&l.actual, &r.actual),
        suggested: SlotDelta::between(&l.suggested, &r.suggested),
    };
    Ok(Comparison { left, right, delta })
}
