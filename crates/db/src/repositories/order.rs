use chrono::NaiveDate;
use sqlx::Row;

use concierge_core::domain::order::{Order, OrderId, OrderItem, OrderStatus};

use super::{OrderStore, RepositoryError};
use crate::DbPool;

pub struct SqlOrderStore {
    pool: DbPool,
}

impl SqlOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn items_for(&self, order_id: &str) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, quantity, unit_price_cents FROM order_items
             WHERE order_id = ? ORDER BY id ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderItem {
                    name: row
                        .try_get("name")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                    quantity: row
                        .try_get::<i64, _>("quantity")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?
                        as u32,
                    unit_price_cents: row
                        .try_get("unit_price_cents")
                        .map_err(|e| RepositoryError::Decode(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn row_to_order(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Order, RepositoryError> {
        let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let email: String =
            row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let status: String =
            row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let total_cents: i64 =
            row.try_get("total_cents").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let order_date: String =
            row.try_get("order_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let estimated_delivery: Option<String> = row
            .try_get("estimated_delivery")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let delivered_date: Option<String> =
            row.try_get("delivered_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let tracking_number: Option<String> =
            row.try_get("tracking_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let carrier: Option<String> =
            row.try_get("carrier").map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let items = self.items_for(&id).await?;
        let order_date = parse_date(&order_date)?;

        Ok(Order {
            id: OrderId(id),
            email,
            status: OrderStatus::parse(&status),
            items,
            total_cents,
            order_date,
            estimated_delivery: estimated_delivery.as_deref().map(parse_date).transpose()?,
            delivered_date: delivered_date.as_deref().map(parse_date).transpose()?,
            tracking_number,
            carrier,
        })
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("invalid date `{value}`: {e}")))
}

const ORDER_COLUMNS: &str = "id, email, status, total_cents, order_date, estimated_delivery, \
                             delivered_date, tracking_number, carrier";

#[async_trait::async_trait]
impl OrderStore for SqlOrderStore {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(self.row_to_order(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE email = ? ORDER BY order_date ASC"
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            orders.push(self.row_to_order(row).await?);
        }
        Ok(orders)
    }
}
