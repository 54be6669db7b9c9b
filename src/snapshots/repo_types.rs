use serde::{Deserialize, Serialize};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime, PrimitiveDateTime,
};

use crate::calc::model::InputRecord;
use crate::error::CoreError;

/// Fixed-width UTC timestamp, so text order is time order.
const CREATED_AT_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

// Layouts found in rows written by earlier tools.
const LEGACY_FORMATS: &[&[FormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
];

pub fn format_created_at(ts: OffsetDateTime) -> Result<String, CoreError> {
    ts.to_offset(time::UtcOffset::UTC)
        .format(CREATED_AT_FORMAT)
        .map_err(|e| CoreError::Persistence(format!("format created_at: {}", e)))
}

/// Current UTC time, truncated to the precision `created_at` is stored with.
pub fn stamp_now() -> Result<OffsetDateTime, CoreError> {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .map_err(|e| CoreError::Persistence(format!("stamp created_at: {}", e)))
}

pub fn parse_created_at(raw: &str) -> Result<OffsetDateTime, CoreError> {
    if let Ok(ts) = PrimitiveDateTime::parse(raw, CREATED_AT_FORMAT) {
        return Ok(ts.assume_utc());
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    LEGACY_FORMATS
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(raw, *fmt).ok())
        .map(PrimitiveDateTime::assume_utc)
        .ok_or_else(|| CoreError::Persistence(format!("unreadable created_at `{}`", raw)))
}

/// A saved, named copy of one input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub revision: i64,
    pub schema_version: i64,
    pub record: InputRecord,
}

impl Snapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Listing entry: identity, label and save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: i64,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
