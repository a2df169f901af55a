use sqlx::Row;

use concierge_core::domain::product::{
    filter_catalog, Product, ProductCategory, ProductId,
};

use super::{ProductCatalog, RepositoryError};
use crate::DbPool;

pub struct SqlProductCatalog {
    pool: DbPool,
}

impl SqlProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, category: Option<ProductCategory>) -> Result<Vec<Product>, RepositoryError> {
        let rows = match category {
            Some(category) => {
                sqlx::query("SELECT * FROM products WHERE category = ? ORDER BY id ASC")
                    .bind(category.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => sqlx::query("SELECT * FROM products ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?,
        };

        rows.iter().map(row_to_product).collect()
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: String =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_cents: i64 =
        row.try_get("price_cents").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let size: String = row.try_get("size").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let ingredients: String =
        row.try_get("ingredients").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let benefits: String =
        row.try_get("benefits").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let category = ProductCategory::parse_filter(&category)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown product category `{category}`")))?;
    let ingredients: Vec<String> = serde_json::from_str(&ingredients)
        .map_err(|e| RepositoryError::Decode(format!("ingredients: {e}")))?;
    let benefits: Vec<String> = serde_json::from_str(&benefits)
        .map_err(|e| RepositoryError::Decode(format!("benefits: {e}")))?;

    Ok(Product {
        id: ProductId(id),
        name,
        category,
        price_cents,
        description,
        size,
        ingredients,
        benefits,
    })
}

#[async_trait::async_trait]
impl ProductCatalog for SqlProductCatalog {
    async fn search(
        &self,
        query: &str,
        category: Option<ProductCategory>,
        top: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let candidates = self.load(category).await?;
        Ok(filter_catalog(&candidates, query, category, top))
    }

    async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        self.load(None).await
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_product(row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::domain::product::ProductCategory;

    use super::SqlProductCatalog;
    use crate::repositories::ProductCatalog;
    use crate::{connect_with_settings, fixtures, migrations};

    async fn catalog() -> SqlProductCatalog {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        fixtures::seed(&pool).await.expect("seed");
        SqlProductCatalog::new(pool)
    }

    #[tokio::test]
    async fn search_matches_keywords_within_a_category() {
        let catalog = catalog().await;
        let results = catalog
            .search("dry hair", Some(ProductCategory::Shampoo), 5)
            .await
            .expect("search");

        assert!(!results.is_empty());
        assert!(results.iter().all(|product| product.category == ProductCategory::Shampoo));
    }

    #[tokio::test]
    async fn empty_matches_fall_back_to_the_category_listing() {
        let catalog = catalog().await;
        let results = catalog
            .search("quantum flux", Some(ProductCategory::Soap), 3)
            .await
            .expect("search");

        assert!(!results.is_empty());
        assert!(results.len() <= 3);
        assert!(results.iter().all(|product| product.category == ProductCategory::Soap));
    }

    #[tokio::test]
    async fn all_returns_the_seeded_catalog() {
        let catalog = catalog().await;
        let all = catalog.all().await.expect("all");
        assert_eq!(all.len(), fixtures::demo_products().len());
    }
}
