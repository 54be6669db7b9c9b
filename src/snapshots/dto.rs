use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::calc::model::InputRecord;
use crate::calc::report::Report;

use super::repo_types::Snapshot;

#[derive(Debug, Deserialize)]
pub struct SaveSnapshotRequest {
    pub name: String,
    pub record: InputRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavedSnapshotResponse {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSnapshotRequest {
    /// Revision the caller loaded; the update fails if it has moved on.
    pub revision: i64,
    pub record: InputRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedSnapshotResponse {
    pub id: i64,
    pub revision: i64,
}

/// A loaded snapshot with its figures recomputed.
#[derive(Debug, Serialize)]
pub struct SnapshotDetails {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub report: Report,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub left: i64,
    pub right: i64,
}
