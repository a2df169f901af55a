use chrono::NaiveDate;
use tracing::info;

use concierge_core::domain::order::{Order, OrderId, OrderItem, OrderStatus};
use concierge_core::domain::product::{Product, ProductCategory, ProductId};

use crate::repositories::RepositoryError;
use crate::DbPool;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub products: usize,
    pub orders: usize,
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("fixture dates are valid")
}

fn product(
    id: &str,
    name: &str,
    category: ProductCategory,
    price_cents: i64,
    description: &str,
    size: &str,
    ingredients: &[&str],
    benefits: &[&str],
) -> Product {
    Product {
        id: ProductId(id.to_string()),
        name: name.to_string(),
        category,
        price_cents,
        description: description.to_string(),
        size: size.to_string(),
        ingredients: ingredients.iter().map(|s| (*s).to_string()).collect(),
        benefits: benefits.iter().map(|s| (*s).to_string()).collect(),
    }
}

/// Demo product catalog used by the fixture providers and the sqlite seed.
pub fn demo_products() -> Vec<Product> {
    vec![
        product(
            "prod-001",
            "Daily Care Shampoo",
            ProductCategory::Shampoo,
            1299,
            "Gentle daily shampoo with aloe vera and tea tree oil for all hair types, \
             including dry hair.",
            "16 oz",
            &["Water", "Aloe Vera Extract", "Tea Tree Oil", "Vitamin E"],
            &["Moisturizing", "Scalp-healthy", "Daily use", "Paraben-free"],
        ),
        product(
            "prod-002",
            "Repair Formula Shampoo",
            ProductCategory::Shampoo,
            1599,
            "Intensive repair formula for damaged and color-treated hair with keratin \
             and argan oil.",
            "16 oz",
            &["Water", "Keratin", "Argan Oil", "Biotin"],
            &["Repairs damage", "Color-safe", "Strengthening", "Sulfate-free"],
        ),
        product(
            "prod-003",
            "Scalp Relief Shampoo",
            ProductCategory::Shampoo,
            1499,
            "Clinically proven to control dandruff and soothe an itchy scalp.",
            "16 oz",
            &["Water", "Zinc Pyrithione", "Tea Tree Oil", "Menthol"],
            &["Controls dandruff", "Soothes scalp", "Daily use"],
        ),
        product(
            "prod-004",
            "Sea Breeze Laundry Detergent",
            ProductCategory::Detergent,
            1899,
            "Powerful plant-based laundry detergent with a fresh scent. Works in all \
             machines.",
            "64 loads",
            &["Plant-based surfactants", "Enzymes", "Natural fragrance"],
            &["HE compatible", "Plant-based", "Tough on stains"],
        ),
        product(
            "prod-005",
            "Sensitive Skin Laundry Detergent",
            ProductCategory::Detergent,
            2199,
            "Hypoallergenic formula free of dyes and perfumes.",
            "64 loads",
            &["Plant-based surfactants", "Enzymes", "Water"],
            &["Hypoallergenic", "Fragrance-free", "Dermatologist tested"],
        ),
        product(
            "prod-006",
            "Stain Lifter Spray",
            ProductCategory::Detergent,
            999,
            "Pre-treatment spray for tough stains. Safe on most fabrics and colors.",
            "22 oz",
            &["Water", "Enzymes", "Hydrogen Peroxide"],
            &["Removes tough stains", "Safe for colors", "Works in cold water"],
        ),
        product(
            "prod-007",
            "Gentle Hand Soap",
            ProductCategory::Soap,
            599,
            "Moisturizing hand soap with shea butter and vitamin E.",
            "12 oz",
            &["Water", "Shea Butter", "Vitamin E", "Glycerin"],
            &["Moisturizing", "Gentle formula", "Refillable"],
        ),
        product(
            "prod-008",
            "Citrus Dish Soap",
            ProductCategory::Soap,
            499,
            "Grease-cutting dish soap with a refreshing lemon scent.",
            "24 oz",
            &["Water", "Lemon Extract", "Vitamin E"],
            &["Cuts grease", "Gentle on hands", "Concentrated formula"],
        ),
        product(
            "prod-009",
            "All-Purpose Surface Cleaner",
            ProductCategory::Cleaner,
            899,
            "Versatile cleaner for all surfaces. Cuts through grease and grime.",
            "32 oz",
            &["Water", "Citric Acid", "Plant-based surfactants"],
            &["Multi-surface", "Non-toxic", "Streak-free"],
        ),
        product(
            "prod-010",
            "Bathroom Foam Cleaner",
            ProductCategory::Cleaner,
            999,
            "Tough on soap scum and mildew. Safe for all bathroom surfaces.",
            "32 oz",
            &["Water", "Citric Acid", "Hydrogen Peroxide"],
            &["Removes soap scum", "Fights mildew", "Non-abrasive"],
        ),
    ]
}

/// Demo orders: one shipped (trackable) and one delivered (returnable).
pub fn demo_orders() -> Vec<Order> {
    vec![
        Order {
            id: OrderId("ORD-001".to_string()),
            email: "john@example.com".to_string(),
            status: OrderStatus::Shipped,
            items: vec![
                OrderItem {
                    name: "Daily Care Shampoo".to_string(),
                    quantity: 2,
                    unit_price_cents: 1299,
                },
                OrderItem {
                    name: "Sea Breeze Laundry Detergent".to_string(),
                    quantity: 1,
                    unit_price_cents: 1899,
                },
            ],
            total_cents: 4497,
            order_date: date(2026, 1, 8),
            estimated_delivery: Some(date(2026, 1, 14)),
            delivered_date: None,
            tracking_number: Some("1Z999AA10123456784".to_string()),
            carrier: Some("UPS".to_string()),
        },
        Order {
            id: OrderId("ORD-002".to_string()),
            email: "jane@example.com".to_string(),
            status: OrderStatus::Delivered,
            items: vec![OrderItem {
                name: "Gentle Hand Soap".to_string(),
                quantity: 3,
                unit_price_cents: 599,
            }],
            total_cents: 1797,
            order_date: date(2026, 1, 5),
            estimated_delivery: None,
            delivered_date: Some(date(2026, 1, 10)),
            tracking_number: None,
            carrier: None,
        },
    ]
}

/// Seeds the demo dataset into sqlite. Idempotent: rows already present are
/// left untouched.
pub async fn seed(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let mut summary = SeedSummary::default();

    for product in demo_products() {
        let ingredients = serde_json::to_string(&product.ingredients)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let benefits = serde_json::to_string(&product.benefits)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO products (id, name, category, price_cents, description, size, \
                                   ingredients, benefits)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.price_cents)
        .bind(&product.description)
        .bind(&product.size)
        .bind(&ingredients)
        .bind(&benefits)
        .execute(pool)
        .await?;
        summary.products += result.rows_affected() as usize;
    }

    for order in demo_orders() {
        let result = sqlx::query(
            "INSERT INTO orders (id, email, status, total_cents, order_date, \
                                 estimated_delivery, delivered_date, tracking_number, carrier)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&order.id.0)
        .bind(&order.email)
        .bind(order.status.as_str())
        .bind(order.total_cents)
        .bind(order.order_date.format("%Y-%m-%d").to_string())
        .bind(order.estimated_delivery.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(order.delivered_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&order.tracking_number)
        .bind(&order.carrier)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            continue;
        }
        summary.orders += 1;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, name, quantity, unit_price_cents)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&order.id.0)
            .bind(&item.name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price_cents)
            .execute(pool)
            .await?;
        }
    }

    info!(
        event_name = "db.fixtures.seeded",
        products = summary.products,
        orders = summary.orders,
        "demo dataset seeded"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{demo_orders, seed};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let first = seed(&pool).await.expect("first seed");
        assert_eq!(first.orders, demo_orders().len());
        assert!(first.products > 0);

        let second = seed(&pool).await.expect("second seed");
        assert_eq!(second.products, 0);
        assert_eq!(second.orders, 0);
    }
}
