use std::collections::HashSet;

use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    Row, Sqlite, SqlitePool,
};
use time::OffsetDateTime;
use tracing::info;

use super::repo_types::{format_created_at, parse_created_at, Snapshot, SnapshotSummary};
use super::schema::{
    to_columns, FieldKind, FieldSpec, FieldValue, SchemaPlan, SchemaVersion, FIELDS, FIELD_COUNT,
};
use crate::calc::model::InputRecord;
use crate::error::CoreError;

/// SQL text for one [`SchemaPlan`], built once per store.
#[derive(Debug, Clone)]
pub struct Statements {
    select_one: String,
    insert: String,
    update: String,
}

impl Statements {
    pub fn for_plan(plan: &SchemaPlan) -> Self {
        let columns: Vec<&str> = FIELDS.iter().map(|f| f.column).collect();
        let placeholders = vec!["?"; FIELD_COUNT].join(", ");
        let assignments = columns
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            select_one: format!("SELECT {} FROM snapshots WHERE id = ?", plan.select_list()),
            insert: format!(
                "INSERT INTO snapshots (name, created_at, schema_version, revision, {}) \
                 VALUES (?, ?, ?, 0, {})",
                columns.join(", "),
                placeholders
            ),
            update: format!(
                "UPDATE snapshots SET {}, schema_version = ?, revision = revision + 1 \
                 WHERE id = ? AND revision = ?",
                assignments
            ),
        }
    }
}

/// Column names of the `snapshots` table; empty if the table does not exist.
pub async fn table_columns(db: &SqlitePool) -> Result<HashSet<String>, CoreError> {
    let rows = sqlx::query_as::<_, (String,)>("SELECT name FROM pragma_table_info('snapshots')")
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Brings a table adopted from an earlier install up to the current layout.
///
/// Missing record columns are added empty. When the table had no
/// `schema_version`, each row is stamped with the version its columns imply,
/// so values written by a later release of the old tool keep reading back.
pub async fn add_missing_columns(db: &SqlitePool) -> Result<(), CoreError> {
    let columns = table_columns(db).await?;
    if columns.is_empty() {
        return Ok(());
    }
    let plan = SchemaPlan::from_columns(&columns)?;
    if plan.is_current() {
        return Ok(());
    }

    let mut tx = db.begin().await?;
    for spec in FIELDS.iter().filter(|f| !columns.contains(f.column)) {
        let sql_type = match spec.kind {
            FieldKind::Amount => "REAL",
            FieldKind::Units => "INTEGER",
        };
        sqlx::query(&format!(
            "ALTER TABLE snapshots ADD COLUMN {} {}",
            spec.column, sql_type
        ))
        .execute(&mut *tx)
        .await?;
    }
    if !columns.contains("schema_version") {
        sqlx::query(&format!(
            "ALTER TABLE snapshots ADD COLUMN schema_version INTEGER NOT NULL DEFAULT {}",
            SchemaVersion::V1.as_i64()
        ))
        .execute(&mut *tx)
        .await?;
        // The expression only reads columns that existed before this upgrade.
        sqlx::query(&format!(
            "UPDATE snapshots SET schema_version = {}",
            plan.inferred_version_sql()
        ))
        .execute(&mut *tx)
        .await?;
    }
    if !columns.contains("revision") {
        sqlx::query("ALTER TABLE snapshots ADD COLUMN revision INTEGER NOT NULL DEFAULT 0")
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!(existing_columns = columns.len(), "adopted snapshots table upgraded");
    Ok(())
}

fn bind_record<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    record: &InputRecord,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in to_columns(record) {
        query = match value {
            FieldValue::Amount(v) => query.bind(v),
            FieldValue::Units(v) => query.bind(v),
        };
    }
    query
}

/// Inserts a new row in its own transaction and returns the assigned id.
pub async fn insert(
    db: &SqlitePool,
    sql: &Statements,
    name: &str,
    created_at: OffsetDateTime,
    record: &InputRecord,
) -> Result<i64, CoreError> {
    let created_at = format_created_at(created_at)?;
    let query = sqlx::query(&sql.insert)
        .bind(name)
        .bind(created_at)
        .bind(SchemaVersion::CURRENT.as_i64());
    let query = bind_record(query, record);

    let mut tx = db.begin().await?;
    let id = query.execute(&mut *tx).await?.last_insert_rowid();
    tx.commit().await?;
    Ok(id)
}

/// Most recent first; equal timestamps fall back to the higher id.
pub async fn list_summaries(db: &SqlitePool) -> Result<Vec<SnapshotSummary>, CoreError> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        r#"
        SELECT id, name, created_at
          FROM snapshots
         ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    let mut out = rows
        .into_iter()
        .map(|(id, name, created_at)| {
            let created_at = parse_created_at(&created_at).map_err(|e| {
                CoreError::Persistence(format!("snapshot {}: {}", id, e))
            })?;
            Ok(SnapshotSummary {
                id,
                name,
                created_at,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;
    // Legacy rows may use other timestamp layouts, so order on the parsed value.
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(out)
}

pub async fn fetch(
    db: &SqlitePool,
    sql: &Statements,
    plan: &SchemaPlan,
    id: i64,
) -> Result<Option<Snapshot>, CoreError> {
    let row = sqlx::query(&sql.select_one)
        .bind(id)
        .fetch_optional(db)
        .await?;
    row.map(|row| decode_row(plan, &row)).transpose()
}

fn read_field(row: &SqliteRow, spec: &FieldSpec) -> Result<Option<FieldValue>, CoreError> {
    let value = match spec.kind {
        FieldKind::Units => match row.try_get::<Option<i64>, _>(spec.column) {
            Ok(v) => v.map(FieldValue::Units),
            Err(_) => row
                .try_get::<Option<f64>, _>(spec.column)?
                .map(FieldValue::Amount),
        },
        FieldKind::Amount => match row.try_get::<Option<f64>, _>(spec.column) {
            Ok(v) => v.map(FieldValue::Amount),
            Err(_) => row
                .try_get::<Option<i64>, _>(spec.column)?
                .map(FieldValue::Units),
        },
    };
    Ok(value)
}

fn decode_row(plan: &SchemaPlan, row: &SqliteRow) -> Result<Snapshot, CoreError> {
    let version = SchemaVersion::from_i64(row.try_get("schema_version")?)?;

    let mut stored = [None; FIELD_COUNT];
    for (slot, spec) in stored.iter_mut().zip(FIELDS.iter()) {
        *slot = read_field(row, spec)?;
    }

    let created_at: String = row.try_get("created_at")?;
    Ok(Snapshot {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: parse_created_at(&created_at)?,
        revision: row.try_get("revision")?,
        schema_version: version.as_i64(),
        record: plan.decode(version, &stored)?,
    })
}

/// Returns the number of rows removed (0 or 1).
pub async fn delete(db: &SqlitePool, id: i64) -> Result<u64, CoreError> {
    let res = sqlx::query("DELETE FROM snapshots WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

/// Rewrites the body of `id` if its revision is still `expected_revision`.
pub async fn update_if_revision(
    db: &SqlitePool,
    sql: &Statements,
    id: i64,
    expected_revision: i64,
    record: &InputRecord,
) -> Result<i64, CoreError> {
    let query = bind_record(sqlx::query(&sql.update), record)
        .bind(SchemaVersion::CURRENT.as_i64())
        .bind(id)
        .bind(expected_revision);

    let mut tx = db.begin().await?;
    let updated = query.execute(&mut *tx).await?.rows_affected();
    if updated == 0 {
        let current = sqlx::query_as::<_, (i64,)>("SELECT revision FROM snapshots WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.rollback().await?;
        return Err(match current {
            None => CoreError::NotFound(id),
            Some((actual,)) => CoreError::Conflict {
                id,
                expected: expected_revision,
                actual,
            },
        });
    }
    tx.commit().await?;
    Ok(expected_revision + 1)
}
