use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Shampoo,
    Detergent,
    Soap,
    Cleaner,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shampoo => "shampoo",
            Self::Detergent => "detergent",
            Self::Soap => "soap",
            Self::Cleaner => "cleaner",
        }
    }

    /// `"all"`, empty, and unknown values mean "no category filter".
    pub fn parse_filter(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shampoo" => Some(Self::Shampoo),
            "detergent" => Some(Self::Detergent),
            "soap" => Some(Self::Soap),
            "cleaner" => Some(Self::Cleaner),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: ProductCategory,
    pub price_cents: i64,
    pub description: String,
    pub size: String,
    pub ingredients: Vec<String>,
    pub benefits: Vec<String>,
}

impl Product {
    /// Keyword containment over name, description, ingredients, and benefits.
    /// A product matches when the whole query or any of its words appears in
    /// the searchable text.
    pub fn matches(&self, query: &str) -> bool {
        let searchable = format!(
            "{} {} {} {}",
            self.name,
            self.description,
            self.ingredients.join(" "),
            self.benefits.join(" ")
        )
        .to_lowercase();

        let query = query.to_lowercase();
        searchable.contains(&query) || query.split_whitespace().any(|word| searchable.contains(word))
    }
}

/// Keyword search over a catalog slice with the knowledge-index fallback
/// behavior: when nothing matches, the category listing (or the whole
/// catalog) is returned instead of an empty result, capped at `top`.
pub fn filter_catalog(
    products: &[Product],
    query: &str,
    category: Option<ProductCategory>,
    top: usize,
) -> Vec<Product> {
    let in_category = |product: &&Product| match category {
        Some(category) => product.category == category,
        None => true,
    };

    let mut results: Vec<Product> = products
        .iter()
        .filter(in_category)
        .filter(|product| product.matches(query))
        .cloned()
        .collect();

    if results.is_empty() {
        results = products.iter().filter(in_category).cloned().collect();
    }

    results.truncate(top);
    results
}
