//! Catalog reads and admin/seed writes.

use rust_decimal::Decimal;
use tracing::instrument;

use lumen_core::{ProductId, slugify};

use crate::db::{RepositoryError, Store};
use crate::error::ShopError;
use crate::models::{
    Brand, Category, NewBrand, NewCategory, NewProduct, NewTag, NewVariant, Page, Product,
    ProductDetail, ProductFilter, ProductVariant, Tag,
};

/// Catalog operations.
pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if there is no such product.
    pub async fn product(&self, id: ProductId) -> Result<Product, ShopError> {
        self.store
            .product(id)
            .await?
            .ok_or(ShopError::NotFound("Product"))
    }

    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if there is no such product.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Product, ShopError> {
        self.store
            .product_by_slug(slug)
            .await?
            .ok_or(ShopError::NotFound("Product"))
    }

    /// Variants of a product, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn variants(&self, product: ProductId) -> Result<Vec<ProductVariant>, ShopError> {
        Ok(self.store.variants(product).await?)
    }

    /// Everything shown on a product page.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` if there is no such product.
    #[instrument(skip(self))]
    pub async fn product_detail(&self, slug: &str) -> Result<ProductDetail, ShopError> {
        let product = self.product_by_slug(slug).await?;
        let variants = self.store.variants(product.id).await?;
        let tags = self.store.product_tags(product.id).await?;
        let rating = self.store.rating_summary(product.id).await?;
        let pricing = product.pricing(None);
        Ok(ProductDetail {
            effective_price: pricing.effective_unit_price(),
            discount_percentage: pricing.discount_percentage(),
            product,
            variants,
            tags,
            rating,
        })
    }

    /// One page of available products.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Validation` if the price bounds are inverted.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, ShopError> {
        if let (Some(min), Some(max)) = (filter.price_min, filter.price_max)
            && min > max
        {
            return Err(ShopError::invalid_field(
                "price_min",
                "Minimum price must not exceed maximum price",
            ));
        }
        Ok(self.store.list_products(filter).await?)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// # Errors
    ///
    /// Returns `ShopError::Validation` for a blank name or a taken slug.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_category(&self, new: &NewCategory) -> Result<Category, ShopError> {
        let slug = slug_for(&new.name, new.slug.as_deref())?;
        self.store
            .insert_category(new, &slug)
            .await
            .map_err(slug_conflict)
    }

    /// # Errors
    ///
    /// Returns `ShopError::Validation` for a blank name or a taken name or slug.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_brand(&self, new: &NewBrand) -> Result<Brand, ShopError> {
        let slug = slug_for(&new.name, new.slug.as_deref())?;
        self.store
            .insert_brand(new, &slug)
            .await
            .map_err(slug_conflict)
    }

    /// # Errors
    ///
    /// Returns `ShopError::Validation` for a blank name or a taken slug.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_tag(&self, new: &NewTag) -> Result<Tag, ShopError> {
        let slug = slug_for(&new.name, new.slug.as_deref())?;
        self.store.insert_tag(new, &slug).await.map_err(slug_conflict)
    }

    /// Create a product, deriving its slug from the name when none is given.
    ///
    /// # Errors
    ///
    /// - `ShopError::Validation` if the price is not positive, the discount is
    ///   not below the price, stock is negative, or the slug is taken
    /// - `ShopError::NotFound` if the category does not exist
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_product(&self, new: &NewProduct) -> Result<Product, ShopError> {
        let slug = slug_for(&new.name, new.slug.as_deref())?;
        if new.price <= Decimal::ZERO {
            return Err(ShopError::invalid_field("price", "Price must be positive"));
        }
        if let Some(discount) = new.discount_price
            && (discount <= Decimal::ZERO || discount >= new.price)
        {
            return Err(ShopError::invalid_field(
                "discount_price",
                "Discount price must be positive and below the price",
            ));
        }
        if new.stock < 0 {
            return Err(ShopError::invalid_field("stock", "Stock cannot be negative"));
        }

        let product = self
            .store
            .insert_product(new, &slug)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ShopError::NotFound("Category"),
                other => slug_conflict(other),
            })?;
        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// - `ShopError::Validation` if stock or the surcharge is negative
    /// - `ShopError::NotFound` if the product does not exist
    #[instrument(skip(self, new), fields(product_id = %new.product_id))]
    pub async fn create_variant(&self, new: &NewVariant) -> Result<ProductVariant, ShopError> {
        if new.stock < 0 {
            return Err(ShopError::invalid_field("stock", "Stock cannot be negative"));
        }
        if new.additional_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(ShopError::invalid_field(
                "additional_price",
                "Additional price cannot be negative",
            ));
        }
        self.store.insert_variant(new).await.map_err(|e| match e {
            RepositoryError::NotFound => ShopError::NotFound("Product"),
            other => other.into(),
        })
    }
}

/// The explicit slug if given, otherwise one derived from the name.
fn slug_for(name: &str, explicit: Option<&str>) -> Result<String, ShopError> {
    if name.trim().is_empty() {
        return Err(ShopError::invalid_field("name", "Name is required"));
    }
    let slug = slugify(explicit.unwrap_or(name));
    if slug.is_empty() {
        return Err(ShopError::invalid_field("slug", "Slug is empty"));
    }
    Ok(slug)
}

fn slug_conflict(err: RepositoryError) -> ShopError {
    match err {
        RepositoryError::Conflict(message) => ShopError::Validation {
            message,
            fields: vec!["slug".to_owned()],
        },
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn new_product(category: lumen_core::CategoryId, name: &str, price: i64) -> NewProduct {
        NewProduct {
            category_id: category,
            brand_id: None,
            name: name.into(),
            slug: None,
            description: String::new(),
            price: Decimal::new(price, 0),
            discount_price: None,
            stock: 10,
            available: true,
            featured: false,
            tag_ids: Vec::new(),
        }
    }

    async fn category(service: &CatalogService<'_>) -> Category {
        service
            .create_category(&NewCategory {
                name: "Smart Bulbs".into(),
                slug: None,
                description: String::new(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_slug_derived_from_name() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let category = category(&service).await;
        assert_eq!(category.slug, "smart-bulbs");

        let product = service
            .create_product(&new_product(category.id, "Edison  Globe 60W!", 12))
            .await
            .unwrap();
        assert_eq!(product.slug, "edison-globe-60w");
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_validation_error() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let category = category(&service).await;
        service
            .create_product(&new_product(category.id, "Globe", 5))
            .await
            .unwrap();

        let err = service
            .create_product(&new_product(category.id, "Globe", 6))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_price_rules() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let category = category(&service).await;

        let free = new_product(category.id, "Free", 0);
        assert!(matches!(
            service.create_product(&free).await,
            Err(ShopError::Validation { .. })
        ));

        let mut discounted = new_product(category.id, "Discounted", 10);
        discounted.discount_price = Some(Decimal::new(10, 0));
        assert!(matches!(
            service.create_product(&discounted).await,
            Err(ShopError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_detail_includes_rating_and_discount() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let category = category(&service).await;
        let mut new = new_product(category.id, "Filament", 100);
        new.discount_price = Some(Decimal::new(75, 0));
        service.create_product(&new).await.unwrap();

        let detail = service.product_detail("filament").await.unwrap();
        assert_eq!(detail.effective_price, Decimal::new(75, 0));
        assert_eq!(detail.discount_percentage, 25);
        assert_eq!(detail.rating.count, 0);
        assert!(detail.variants.is_empty());
    }
}
