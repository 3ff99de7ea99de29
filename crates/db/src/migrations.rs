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
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] =
        &["food_items", "orders", "order_tracking", "idx_orders_order_id"];

    #[tokio::test]
    async fn migrations_create_the_order_store_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master WHERE name = ?",
            )
            .bind(*object)
            .fetch_one(&pool)
            .await
            .expect("query sqlite_master")
            .get::<i64, _>("count");

            assert_eq!(count, 1, "expected schema object `{object}` after migration");
        }

        pool.close().await;
    }

    #[tokio::test]
    async fn menu_is_seeded_with_prices() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let count = sqlx::query("SELECT COUNT(*) AS count FROM food_items")
            .fetch_one(&pool)
            .await
            .expect("count menu rows")
            .get::<i64, _>("count");
        assert_eq!(count, 9);

        let price = sqlx::query("SELECT CAST(price AS TEXT) AS price FROM food_items WHERE name = 'Samosa'")
            .fetch_one(&pool)
            .await
            .expect("fetch samosa price")
            .get::<String, _>("price");
        assert_eq!(price, "20");

        pool.close().await;
    }
}
