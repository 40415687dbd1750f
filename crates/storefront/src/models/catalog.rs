//! Catalog domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lumen_core::{BrandId, CategoryId, Pricing, ProductId, TagId, VariantId};

use super::review::RatingSummary;

/// Number of products per catalog page.
pub const PAGE_SIZE: u32 = 40;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// A free-form product tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub brand_id: Option<BrandId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    /// Units on hand. Never negative.
    pub stock: i32,
    /// Cumulative units sold.
    pub sold: i32,
    pub available: bool,
    pub featured: bool,
    pub last_sold: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price inputs for this product, optionally in one of its variants.
    #[must_use]
    pub fn pricing(&self, variant: Option<&ProductVariant>) -> Pricing {
        Pricing::new(self.price, self.discount_price)
            .with_variant(variant.and_then(|v| v.additional_price))
    }

    /// Effective price used for catalog filtering and sorting.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }
}

/// A purchasable configuration of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub wattage: Option<u32>,
    pub color: Option<String>,
    pub shape: Option<String>,
    pub size: Option<String>,
    /// Added on top of the product's (discounted) price.
    pub additional_price: Option<Decimal>,
    pub stock: i32,
}

impl ProductVariant {
    /// Display label joining the attributes that are set, e.g. `60W - Warm White`.
    #[must_use]
    pub fn label(&self) -> String {
        let wattage = self.wattage.map(|w| format!("{w}W"));
        [
            wattage.as_deref(),
            self.color.as_deref(),
            self.shape.as_deref(),
            self.size.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" - ")
    }
}

/// A product page: the product with its variants, tags and rating.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub effective_price: Decimal,
    pub discount_percentage: u32,
    pub variants: Vec<ProductVariant>,
    pub tags: Vec<Tag>,
    pub rating: RatingSummary,
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Input for creating a brand.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBrand {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Input for creating a tag.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub category_id: CategoryId,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

/// Input for creating a variant.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub product_id: ProductId,
    #[serde(default)]
    pub wattage: Option<u32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub additional_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
}

const fn default_true() -> bool {
    true
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    PriceLowToHigh,
    PriceHighToLow,
    #[default]
    NewestFirst,
}

/// Filters for product listings. Only available products are listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub brand: Option<BrandId>,
    #[serde(default)]
    pub price_min: Option<Decimal>,
    #[serde(default)]
    pub price_max: Option<Decimal>,
    #[serde(default)]
    pub sort: ProductSort,
    /// 1-based page number.
    #[serde(default)]
    pub page: Option<u32>,
}

impl ProductFilter {
    /// Page number, clamped to at least 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Rows to skip for the current page.
    #[must_use]
    pub fn offset(&self) -> u32 {
        (self.page() - 1).saturating_mul(PAGE_SIZE)
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total: u64,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Build a page from its items and the total row count.
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, total: u64) -> Self {
        let seen = u64::from(page) * u64::from(PAGE_SIZE);
        Self {
            items,
            page,
            total,
            has_next: seen < total,
        }
    }
}
