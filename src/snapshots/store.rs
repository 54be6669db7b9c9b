use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::repo::{self, Statements};
use super::repo_types::{stamp_now, Snapshot, SnapshotSummary};
use super::schema::SchemaPlan;
use crate::calc::model::InputRecord;
use crate::config::SnapshotMode;
use crate::error::CoreError;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Stores a new snapshot and returns its listing entry. Never overwrites.
    async fn create(&self, name: &str, record: &InputRecord) -> Result<SnapshotSummary, CoreError>;

    /// Stores a new snapshot and returns its id.
    async fn save(&self, name: &str, record: &InputRecord) -> Result<i64, CoreError> {
        Ok(self.create(name, record).await?.id)
    }

    /// All snapshots, most recent first.
    async fn list(&self) -> Result<Vec<SnapshotSummary>, CoreError>;

    async fn get_snapshot(&self, id: i64) -> Result<Snapshot, CoreError>;

    async fn get(&self, id: i64) -> Result<InputRecord, CoreError> {
        Ok(self.get_snapshot(id).await?.record)
    }

    async fn delete(&self, id: i64) -> Result<(), CoreError>;

    /// Overwrites a snapshot's record when its revision still matches.
    /// Returns the new revision.
    async fn update(
        &self,
        id: i64,
        expected_revision: i64,
        record: &InputRecord,
    ) -> Result<i64, CoreError>;
}

pub struct SqliteSnapshotStore {
    db: SqlitePool,
    plan: SchemaPlan,
    sql: Statements,
    mode: SnapshotMode,
}

impl SqliteSnapshotStore {
    /// Inspects the table once and prepares statements for what it finds.
    pub async fn open(db: SqlitePool, mode: SnapshotMode) -> Result<Self, CoreError> {
        let columns = repo::table_columns(&db).await?;
        if columns.is_empty() {
            return Err(CoreError::Persistence(
                "snapshots table does not exist; run migrations first".into(),
            ));
        }
        let plan = SchemaPlan::from_columns(&columns)?;
        if plan.is_current() {
            debug!(?mode, "snapshot store opened");
        } else {
            warn!("snapshots table predates the current schema; store is read-only");
        }
        let sql = Statements::for_plan(&plan);
        Ok(Self {
            db,
            plan,
            sql,
            mode,
        })
    }

    fn ensure_writable(&self) -> Result<(), CoreError> {
        if self.plan.is_current() {
            Ok(())
        } else {
            Err(CoreError::Persistence(
                "snapshots table predates the current schema; run migrations".into(),
            ))
        }
    }
}

fn validate_name(name: &str) -> Result<&str, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::invalid("name", "must not be empty"));
    }
    Ok(name)
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn create(
        &self,
        name: &str,
        record: &InputRecord,
    ) -> Result<SnapshotSummary, CoreError> {
        let name = validate_name(name)?;
        record.validate()?;
        self.ensure_writable()?;

        let created_at = stamp_now()?;
        let id = repo::insert(&self.db, &self.sql, name, created_at, record).await?;
        info!(snapshot_id = id, snapshot_name = %name, "snapshot saved");
        Ok(SnapshotSummary {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    async fn list(&self) -> Result<Vec<SnapshotSummary>, CoreError> {
        repo::list_summaries(&self.db).await
    }

    async fn get_snapshot(&self, id: i64) -> Result<Snapshot, CoreError> {
        repo::fetch(&self.db, &self.sql, &self.plan, id)
            .await?
            .ok_or(CoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<(), CoreError> {
        match repo::delete(&self.db, id).await? {
            0 => Err(CoreError::NotFound(id)),
            _ => {
                info!(snapshot_id = id, "snapshot deleted");
                Ok(())
            }
        }
    }

    async fn update(
        &self,
        id: i64,
        expected_revision: i64,
        record: &InputRecord,
    ) -> Result<i64, CoreError> {
        if self.mode != SnapshotMode::Update {
            return Err(CoreError::UpdatesDisabled);
        }
        record.validate()?;
        self.ensure_writable()?;

        let revision =
            repo::update_if_revision(&self.db, &self.sql, id, expected_revision, record).await?;
        info!(snapshot_id = id, revision, "snapshot updated");
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn memory_pool() -> SqlitePool {
        db::connect("sqlite::memory:", 1)
            .await
            .expect("in-memory pool")
    }

    async fn store(mode: SnapshotMode) -> SqliteSnapshotStore {
        let pool = memory_pool().await;
        db::migrate(&pool).await.expect("migrations run");
        SqliteSnapshotStore::open(pool, mode).await.expect("store opens")
    }

    fn record_with_staff() -> InputRecord {
        InputRecord {
            empleado_ventas: 1800.0,
            redes_sociales: 350.25,
            ..InputRecord::baseline()
        }
    }

    #[tokio::test]
    async fn save_then_get_returns_the_same_record() {
        let store = store(SnapshotMode::Append).await;
        let record = record_with_staff();
        let id = store.save("Marzo", &record).await.unwrap();

        assert_eq!(store.get(id).await.unwrap(), record);
        let snap = store.get_snapshot(id).await.unwrap();
        assert_eq!(snap.name, "Marzo");
        assert_eq!(snap.revision, 0);
        assert_eq!(snap.schema_version, 2);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].name, "Marzo");
        assert_eq!(listed[0].created_at, snap.created_at);
    }

    #[tokio::test]
    async fn create_reports_what_was_stored() {
        let store = store(SnapshotMode::Append).await;
        let created = store.create(" Mayo ", &InputRecord::baseline()).await.unwrap();
        assert_eq!(created.name, "Mayo");

        let stored = store.get_snapshot(created.id).await.unwrap();
        assert_eq!(stored.summary(), created);
        assert_eq!(store.list().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn ids_increase_and_list_is_most_recent_first() {
        let store = store(SnapshotMode::Append).await;
        let a = store.save("A", &InputRecord::baseline()).await.unwrap();
        let b = store.save("B", &InputRecord::baseline()).await.unwrap();
        let c = store.save("C", &InputRecord::baseline()).await.unwrap();
        assert!(a < b && b < c);

        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let store = store(SnapshotMode::Append).await;
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let store = store(SnapshotMode::Append).await;
        assert!(matches!(store.get(42).await, Err(CoreError::NotFound(42))));
        assert!(matches!(store.delete(42).await, Err(CoreError::NotFound(42))));
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let store = store(SnapshotMode::Append).await;
        let keep = store.save("keep", &InputRecord::baseline()).await.unwrap();
        let gone = store.save("gone", &record_with_staff()).await.unwrap();

        store.delete(gone).await.unwrap();
        assert!(matches!(store.get(gone).await, Err(CoreError::NotFound(_))));
        let ids: Vec<i64> = store.list().await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![keep]);
        assert_eq!(store.get(keep).await.unwrap(), InputRecord::baseline());

        // ids are never handed out again
        let next = store.save("next", &InputRecord::baseline()).await.unwrap();
        assert!(next > gone);
    }

    #[tokio::test]
    async fn rejects_blank_names_and_invalid_records_without_writing() {
        let store = store(SnapshotMode::Append).await;
        assert!(matches!(
            store.save("   ", &InputRecord::baseline()).await,
            Err(CoreError::InvalidInput { field: "name", .. })
        ));
        let bad = InputRecord {
            total_unidades: 0,
            ..InputRecord::baseline()
        };
        assert!(matches!(
            store.save("bad", &bad).await,
            Err(CoreError::InvalidInput { .. })
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn names_are_trimmed() {
        let store = store(SnapshotMode::Append).await;
        let id = store.save("  Abril  ", &InputRecord::baseline()).await.unwrap();
        assert_eq!(store.get_snapshot(id).await.unwrap().name, "Abril");
    }

    #[tokio::test]
    async fn failed_save_surfaces_persistence_error() {
        let pool = memory_pool().await;
        db::migrate(&pool).await.unwrap();
        let store = SqliteSnapshotStore::open(pool.clone(), SnapshotMode::Append)
            .await
            .unwrap();
        pool.close().await;
        assert!(matches!(
            store.save("late", &InputRecord::baseline()).await,
            Err(CoreError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn opening_without_a_table_fails() {
        let pool = memory_pool().await;
        assert!(matches!(
            SqliteSnapshotStore::open(pool, SnapshotMode::Append).await,
            Err(CoreError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn updates_are_refused_in_append_mode() {
        let store = store(SnapshotMode::Append).await;
        let id = store.save("A", &InputRecord::baseline()).await.unwrap();
        assert!(matches!(
            store.update(id, 0, &record_with_staff()).await,
            Err(CoreError::UpdatesDisabled)
        ));
        assert_eq!(store.get(id).await.unwrap(), InputRecord::baseline());
    }

    #[tokio::test]
    async fn update_checks_the_revision() {
        let store = store(SnapshotMode::Update).await;
        let id = store.save("A", &InputRecord::baseline()).await.unwrap();
        let before = store.get_snapshot(id).await.unwrap();

        let revision = store.update(id, 0, &record_with_staff()).await.unwrap();
        assert_eq!(revision, 1);
        let after = store.get_snapshot(id).await.unwrap();
        assert_eq!(after.record, record_with_staff());
        assert_eq!(after.revision, 1);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.name, "A");

        match store.update(id, 0, &InputRecord::baseline()).await {
            Err(CoreError::Conflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
        assert_eq!(store.get(id).await.unwrap(), record_with_staff());

        assert!(matches!(
            store.update(999, 0, &InputRecord::baseline()).await,
            Err(CoreError::NotFound(999))
        ));
    }

    const LEGACY_V1_TABLE: &str = r#"
        CREATE TABLE snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT, created_at TEXT,
            carne_fresca REAL, sal REAL, sueldo1 REAL, trabajador_adicional REAL,
            corte_carne REAL, luz REAL, agua REAL, fumigacion REAL,
            liquidos_limpieza REAL, otro_liquido REAL, total_unidades INTEGER,
            precio_venta REAL, precio_venta_sugerido REAL
        )
    "#;

    // Layout left by the last release of the old tool: the two newer cost
    // columns sit mid-table and there is no version or revision column.
    const LEGACY_V2_TABLE: &str = r#"
        CREATE TABLE snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT, created_at TEXT,
            carne_fresca REAL, sal REAL, sueldo1 REAL, trabajador_adicional REAL,
            empleado_ventas REAL, redes_sociales REAL,
            corte_carne REAL, luz REAL, agua REAL, fumigacion REAL,
            liquidos_limpieza REAL, otro_liquido REAL, total_unidades INTEGER,
            precio_venta REAL, precio_venta_sugerido REAL
        )
    "#;

    const LEGACY_INSERT: &str = r#"
        INSERT INTO snapshots (name, created_at, carne_fresca, sal, sueldo1,
            trabajador_adicional, corte_carne, luz, agua, fumigacion,
            liquidos_limpieza, otro_liquido, total_unidades, precio_venta,
            precio_venta_sugerido)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#;

    async fn insert_legacy_row(pool: &SqlitePool, name: &str, created_at: &str) -> i64 {
        let r = InputRecord::baseline();
        sqlx::query(LEGACY_INSERT)
            .bind(name)
            .bind(created_at)
            .bind(r.carne_fresca)
            .bind(r.sal)
            .bind(r.sueldo1)
            .bind(r.trabajador_adicional)
            .bind(r.corte_carne)
            .bind(r.luz)
            .bind(r.agua)
            .bind(r.fumigacion)
            .bind(r.liquidos_limpieza)
            .bind(r.otro_liquido)
            .bind(r.total_unidades)
            .bind(r.precio_venta)
            .bind(r.precio_venta_sugerido)
            .execute(pool)
            .await
            .expect("legacy row")
            .last_insert_rowid()
    }

    async fn legacy_pool() -> SqlitePool {
        use sqlx::Executor;

        let pool = memory_pool().await;
        pool.execute(LEGACY_V1_TABLE).await.expect("legacy table");
        insert_legacy_row(&pool, "Enero", "2024-11-30 18:45:10").await;
        pool
    }

    /// Row 1 predates the newer columns (left NULL), row 2 fills them.
    async fn legacy_v2_pool() -> SqlitePool {
        use sqlx::Executor;

        let pool = memory_pool().await;
        pool.execute(LEGACY_V2_TABLE).await.expect("legacy table");
        insert_legacy_row(&pool, "Enero", "2024-11-30 18:45:10").await;
        let id = insert_legacy_row(&pool, "Febrero", "2024-12-31 09:00:00").await;
        sqlx::query("UPDATE snapshots SET empleado_ventas = ?, redes_sociales = ? WHERE id = ?")
            .bind(1800.0)
            .bind(350.25)
            .bind(id)
            .execute(&pool)
            .await
            .expect("newer columns");
        pool
    }

    #[tokio::test]
    async fn legacy_rows_read_with_defaults_after_migration() {
        let pool = legacy_pool().await;
        db::migrate(&pool).await.expect("migrations adopt the legacy table");
        let store = SqliteSnapshotStore::open(pool, SnapshotMode::Append)
            .await
            .unwrap();

        let legacy = store.get_snapshot(1).await.unwrap();
        assert_eq!(legacy.schema_version, 1);
        assert_eq!(legacy.name, "Enero");
        assert_eq!(legacy.record.empleado_ventas, 0.0);
        assert_eq!(legacy.record.redes_sociales, 0.0);
        assert_eq!(legacy.record, InputRecord::baseline());

        let id = store.save("Febrero", &record_with_staff()).await.unwrap();
        assert_eq!(id, 2);
        assert_eq!(store.get(id).await.unwrap(), record_with_staff());

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Febrero".to_string(), "Enero".to_string()]);
    }

    #[tokio::test]
    async fn unmigrated_legacy_table_is_readable_but_not_writable() {
        let pool = legacy_pool().await;
        let store = SqliteSnapshotStore::open(pool, SnapshotMode::Append)
            .await
            .unwrap();

        assert_eq!(store.get(1).await.unwrap(), InputRecord::baseline());
        assert!(matches!(
            store.save("nuevo", &InputRecord::baseline()).await,
            Err(CoreError::Persistence(_))
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn later_legacy_layout_reads_exact_values_before_migration() {
        let store = SqliteSnapshotStore::open(legacy_v2_pool().await, SnapshotMode::Append)
            .await
            .unwrap();

        let older = store.get_snapshot(1).await.unwrap();
        assert_eq!(older.schema_version, 1);
        assert_eq!(older.record, InputRecord::baseline());

        let newer = store.get_snapshot(2).await.unwrap();
        assert_eq!(newer.schema_version, 2);
        assert_eq!(newer.record, record_with_staff());

        assert!(matches!(
            store.save("nuevo", &InputRecord::baseline()).await,
            Err(CoreError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn later_legacy_layout_is_adopted_by_migration() {
        let pool = legacy_v2_pool().await;
        db::migrate(&pool).await.expect("migrations adopt the table");
        db::migrate(&pool).await.expect("adoption is idempotent");
        let store = SqliteSnapshotStore::open(pool, SnapshotMode::Update)
            .await
            .unwrap();

        let older = store.get_snapshot(1).await.unwrap();
        assert_eq!(older.schema_version, 1);
        assert_eq!(older.revision, 0);
        assert_eq!(older.record, InputRecord::baseline());
        let newer = store.get_snapshot(2).await.unwrap();
        assert_eq!(newer.schema_version, 2);
        assert_eq!(newer.record, record_with_staff());

        let id = store.save("Marzo", &record_with_staff()).await.unwrap();
        assert_eq!(id, 3);
        assert_eq!(store.update(1, 0, &record_with_staff()).await.unwrap(), 1);
        let rewritten = store.get_snapshot(1).await.unwrap();
        assert_eq!(rewritten.schema_version, 2);
        assert_eq!(rewritten.record, record_with_staff());

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Marzo", "Febrero", "Enero"]);
    }

    #[tokio::test]
    async fn unreadable_timestamp_fails_the_listing_and_names_the_row() {
        let store = store(SnapshotMode::Append).await;
        store.save("ok", &InputRecord::baseline()).await.unwrap();
        let bad = store.save("bad", &InputRecord::baseline()).await.unwrap();
        sqlx::query("UPDATE snapshots SET created_at = 'yesterday' WHERE id = ?")
            .bind(bad)
            .execute(&store.db)
            .await
            .unwrap();

        match store.list().await {
            Err(CoreError::Persistence(msg)) => {
                assert!(msg.contains(&format!("snapshot {}", bad)));
                assert!(msg.contains("yesterday"));
            }
            other => panic!("expected Persistence error, got {:?}", other),
        }
        assert!(matches!(
            store.get_snapshot(bad).await,
            Err(CoreError::Persistence(_))
        ));
    }
}
