use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::CoreError;
use crate::snapshots::repo;

/// Opens the SQLite pool. The database file is created when missing.
///
/// Connections are kept for the life of the pool so that `sqlite::memory:`
/// databases survive between operations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, CoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Brings the `snapshots` table up to the current schema, adopting a table
/// left by an earlier install.
pub async fn migrate(pool: &SqlitePool) -> Result<(), CoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    repo::add_missing_columns(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_create_the_current_table() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        migrate(&pool).await.unwrap();

        let columns: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info('snapshots')")
                .fetch_all(&pool)
                .await
                .unwrap();
        let columns: Vec<String> = columns.into_iter().map(|(c,)| c).collect();
        for expected in ["empleado_ventas", "redes_sociales", "schema_version", "revision"] {
            assert!(columns.iter().any(|c| c == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();
    }
}
