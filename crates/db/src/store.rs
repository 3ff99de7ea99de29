use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

/// The durable order store consumed by the commit pipeline and the tracking
/// handler. Writes are forward-only: the service records a completed order
/// once and never updates it afterward.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Allocate the id for the next committed order.
    async fn next_order_id(&self) -> Result<i64, StoreError>;

    /// Record one line item of a committed order.
    async fn insert_order_item(
        &self,
        item: &str,
        quantity: u32,
        order_id: i64,
    ) -> Result<(), StoreError>;

    /// Record the tracking status for a committed order.
    async fn insert_order_tracking(&self, order_id: i64, status: &str) -> Result<(), StoreError>;

    /// Total price of an order's line items against the menu price list.
    async fn total_order_price(&self, order_id: i64) -> Result<Decimal, StoreError>;

    /// Tracking status for an order id, if the store has one.
    async fn order_status(&self, order_id: i64) -> Result<Option<String>, StoreError>;
}

pub struct SqlOrderStore {
    pool: DbPool,
}

impl SqlOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for SqlOrderStore {
    async fn next_order_id(&self) -> Result<i64, StoreError> {
        let next: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(order_id), 0) + 1 FROM orders")
                .fetch_one(&self.pool)
                .await?;
        Ok(next)
    }

    async fn insert_order_item(
        &self,
        item: &str,
        quantity: u32,
        order_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO orders (order_id, item, quantity) VALUES (?, ?, ?)")
            .bind(order_id)
            .bind(item)
            .bind(i64::from(quantity))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_order_tracking(&self, order_id: i64, status: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO order_tracking (order_id, status) VALUES (?, ?)")
            .bind(order_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn total_order_price(&self, order_id: i64) -> Result<Decimal, StoreError> {
        // Prices live in the menu table; items the menu does not know
        // contribute nothing to the total.
        let total_text: String = sqlx::query_scalar(
            r#"
            SELECT CAST(COALESCE(SUM(o.quantity * f.price), 0) AS TEXT)
            FROM orders o
            LEFT JOIN food_items f ON f.name = o.item
            WHERE o.order_id = ?
            "#,
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Decimal::from_str(&total_text)
            .map_err(|error| StoreError::Decode(format!("invalid order total: {error}")))
    }

    async fn order_status(&self, order_id: i64) -> Result<Option<String>, StoreError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM order_tracking WHERE order_id = ?")
                .bind(order_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(status)
    }
}

/// In-memory stand-in for the SQL store.
///
/// Mirrors the contract exactly and adds one knob the commit-abort tests
/// need: [`InMemoryOrderStore::fail_item_writes_after`] makes every line-item
/// insert past the given count fail the way a broken backend would.
#[derive(Default)]
pub struct InMemoryOrderStore {
    inner: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    items: Vec<(i64, String, u32)>,
    tracking: HashMap<i64, String>,
    prices: HashMap<String, Decimal>,
    item_write_budget: Option<usize>,
    item_writes: usize,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_price(&self, item: &str, price: Decimal) {
        self.inner.lock().await.prices.insert(item.to_string(), price);
    }

    /// Allow `budget` successful line-item writes, then reject the rest.
    pub async fn fail_item_writes_after(&self, budget: usize) {
        self.inner.lock().await.item_write_budget = Some(budget);
    }

    pub async fn tracked_orders(&self) -> usize {
        self.inner.lock().await.tracking.len()
    }

    pub async fn line_items_for(&self, order_id: i64) -> Vec<(String, u32)> {
        self.inner
            .lock()
            .await
            .items
            .iter()
            .filter(|(id, _, _)| *id == order_id)
            .map(|(_, item, quantity)| (item.clone(), *quantity))
            .collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn next_order_id(&self) -> Result<i64, StoreError> {
        let state = self.inner.lock().await;
        Ok(state.items.iter().map(|(id, _, _)| *id).max().unwrap_or(0) + 1)
    }

    async fn insert_order_item(
        &self,
        item: &str,
        quantity: u32,
        order_id: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.inner.lock().await;
        if let Some(budget) = state.item_write_budget {
            if state.item_writes >= budget {
                return Err(StoreError::WriteRejected(format!(
                    "line-item write budget of {budget} exhausted"
                )));
            }
        }
        state.item_writes += 1;
        state.items.push((order_id, item.to_string(), quantity));
        Ok(())
    }

    async fn insert_order_tracking(&self, order_id: i64, status: &str) -> Result<(), StoreError> {
        self.inner.lock().await.tracking.insert(order_id, status.to_string());
        Ok(())
    }

    async fn total_order_price(&self, order_id: i64) -> Result<Decimal, StoreError> {
        let state = self.inner.lock().await;
        let total = state
            .items
            .iter()
            .filter(|(id, _, _)| *id == order_id)
            .filter_map(|(_, item, quantity)| {
                state.prices.get(item).map(|price| *price * Decimal::from(*quantity))
            })
            .sum();
        Ok(total)
    }

    async fn order_status(&self, order_id: i64) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().await.tracking.get(&order_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{InMemoryOrderStore, OrderStore, SqlOrderStore, StoreError};
    use crate::{connect_with_settings, migrations};

    async fn sql_store() -> (SqlOrderStore, crate::DbPool) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        (SqlOrderStore::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn sql_store_allocates_sequential_order_ids() {
        let (store, pool) = sql_store().await;

        assert_eq!(store.next_order_id().await.expect("first id"), 1);
        store.insert_order_item("Pizza", 1, 1).await.expect("insert");
        assert_eq!(store.next_order_id().await.expect("second id"), 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_store_totals_line_items_against_the_menu() {
        let (store, pool) = sql_store().await;

        // 2 * 100 + 1 * 20 against the seeded menu.
        store.insert_order_item("Pizza", 2, 1).await.expect("insert pizza");
        store.insert_order_item("Samosa", 1, 1).await.expect("insert samosa");

        let total = store.total_order_price(1).await.expect("total");
        assert_eq!(total, Decimal::from(220));

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_store_total_is_zero_for_unknown_order() {
        let (store, pool) = sql_store().await;

        let total = store.total_order_price(404).await.expect("total");
        assert_eq!(total, Decimal::ZERO);

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_store_round_trips_tracking_status() {
        let (store, pool) = sql_store().await;

        store.insert_order_tracking(7, "in progress").await.expect("insert tracking");

        assert_eq!(store.order_status(7).await.expect("status"), Some("in progress".to_string()));
        assert_eq!(store.order_status(8).await.expect("status"), None);

        pool.close().await;
    }

    #[tokio::test]
    async fn in_memory_store_matches_the_contract() {
        let store = InMemoryOrderStore::new();
        store.set_price("Pizza", Decimal::from(100)).await;

        let order_id = store.next_order_id().await.expect("id");
        store.insert_order_item("Pizza", 2, order_id).await.expect("insert");
        store.insert_order_tracking(order_id, "in progress").await.expect("tracking");

        assert_eq!(store.total_order_price(order_id).await.expect("total"), Decimal::from(200));
        assert_eq!(
            store.order_status(order_id).await.expect("status"),
            Some("in progress".to_string())
        );
    }

    #[tokio::test]
    async fn in_memory_store_rejects_writes_past_the_budget() {
        let store = InMemoryOrderStore::new();
        store.fail_item_writes_after(1).await;

        store.insert_order_item("Pizza", 2, 1).await.expect("first write succeeds");
        let rejected = store.insert_order_item("Samosa", 1, 1).await;

        assert!(matches!(rejected, Err(StoreError::WriteRejected(_))));
        assert_eq!(store.line_items_for(1).await.len(), 1);
    }
}
