use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR, DbPool};

    async fn table_count(pool: &DbPool, name: &str) -> i64 {
        sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("query sqlite_master")
        .get::<i64, _>("count")
    }

    async fn schema_signature(pool: &DbPool) -> Vec<(String, String)> {
        let mut signature: Vec<(String, String)> = sqlx::query(
            "SELECT name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index') AND name = 'kv_store'",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .map(|row| (row.get::<String, _>("name"), row.get::<String, _>("sql")))
        .collect();
        signature.sort();
        signature
    }

    #[tokio::test]
    async fn migrations_create_kv_store() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        assert_eq!(table_count(&pool, "kv_store").await, 1);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        assert_eq!(table_count(&pool, "kv_store").await, 0);
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        let initial = schema_signature(&pool).await;
        assert_eq!(initial.len(), 1);

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        assert!(schema_signature(&pool).await.is_empty());

        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(schema_signature(&pool).await, initial);
    }

    #[tokio::test]
    async fn running_twice_is_a_no_op() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");

        assert_eq!(table_count(&pool, "kv_store").await, 1);
    }
}
