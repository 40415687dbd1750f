//! Seed the catalog from a YAML file.
//!
//! Categories, brands and tags are matched by slug and reused when they
//! already exist, so a file can be re-applied after adding products. Products
//! whose slug is taken are skipped.
//!
//! ```yaml
//! categories:
//!   - name: Smart Bulbs
//! brands:
//!   - name: Lumos
//! tags:
//!   - name: Dimmable
//! products:
//!   - name: Edison Globe
//!     category: smart-bulbs
//!     brand: lumos
//!     tags: [dimmable]
//!     price: "12.50"
//!     discount_price: "9.99"
//!     stock: 40
//!     variants:
//!       - wattage: 60
//!         color: Warm White
//!         additional_price: "2.00"
//!         stock: 10
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};

use lumen_core::{BrandId, CategoryId, TagId, slugify};
use lumen_storefront::db::{CatalogRepo, PgStore, Store};
use lumen_storefront::models::{NewBrand, NewCategory, NewProduct, NewTag, NewVariant};
use lumen_storefront::services::CatalogService;

use super::CliError;

/// Top-level seed file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<NewCategory>,
    #[serde(default)]
    pub brands: Vec<NewBrand>,
    #[serde(default)]
    pub tags: Vec<NewTag>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// A product entry; references other entries by slug.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
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
    pub variants: Vec<SeedVariant>,
}

#[derive(Debug, Deserialize)]
pub struct SeedVariant {
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

/// Counts reported after seeding.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub categories: usize,
    pub brands: usize,
    pub tags: usize,
    pub products: usize,
    pub variants: usize,
    pub skipped: usize,
}

fn entry_slug(name: &str, explicit: Option<&str>) -> String {
    slugify(explicit.unwrap_or(name))
}

/// Check cross-references and obvious price mistakes before touching the
/// database. Returns every problem found.
#[must_use]
pub fn validate_seed(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    let categories: HashSet<String> = seed
        .categories
        .iter()
        .map(|c| entry_slug(&c.name, c.slug.as_deref()))
        .collect();
    let brands: HashSet<String> = seed
        .brands
        .iter()
        .map(|b| entry_slug(&b.name, b.slug.as_deref()))
        .collect();
    let tags: HashSet<String> = seed
        .tags
        .iter()
        .map(|t| entry_slug(&t.name, t.slug.as_deref()))
        .collect();

    let mut product_slugs = HashSet::new();
    for product in &seed.products {
        let name = &product.name;
        let slug = entry_slug(name, product.slug.as_deref());
        if slug.is_empty() {
            errors.push(format!("product `{name}`: slug is empty"));
        } else if !product_slugs.insert(slug.clone()) {
            errors.push(format!("product `{name}`: duplicate slug `{slug}`"));
        }
        if !categories.contains(&product.category) {
            errors.push(format!(
                "product `{name}`: unknown category `{}`",
                product.category
            ));
        }
        if let Some(brand) = &product.brand
            && !brands.contains(brand)
        {
            errors.push(format!("product `{name}`: unknown brand `{brand}`"));
        }
        for tag in &product.tags {
            if !tags.contains(tag) {
                errors.push(format!("product `{name}`: unknown tag `{tag}`"));
            }
        }
        if product.price <= Decimal::ZERO {
            errors.push(format!("product `{name}`: price must be positive"));
        }
        if let Some(discount) = product.discount_price
            && discount >= product.price
        {
            errors.push(format!(
                "product `{name}`: discount price must be below the price"
            ));
        }
    }

    errors
}

/// Seed the catalog from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, validation fails,
/// or a database write fails.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(CliError::FileNotFound(file_path.to_owned()).into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;
    info!(
        categories = seed.categories.len(),
        brands = seed.brands.len(),
        tags = seed.tags.len(),
        products = seed.products.len(),
        "Parsed catalog"
    );

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::InvalidSeed(errors.len()).into());
    }
    info!("Catalog validated successfully");

    if dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    let store = PgStore::new(super::connect().await?);
    let result = apply(&store, &seed).await?;

    info!("Seeding complete!");
    info!("  Categories created: {}", result.categories);
    info!("  Brands created: {}", result.brands);
    info!("  Tags created: {}", result.tags);
    info!("  Products created: {}", result.products);
    info!("  Variants created: {}", result.variants);
    info!("  Products skipped (already exist): {}", result.skipped);
    Ok(())
}

/// Write a validated seed through the catalog service.
///
/// # Errors
///
/// Returns the first storage or validation failure.
pub async fn apply(
    store: &dyn Store,
    seed: &CatalogSeed,
) -> Result<SeedResult, Box<dyn std::error::Error>> {
    let service = CatalogService::new(store);
    let mut result = SeedResult::default();

    let mut categories: HashMap<String, CategoryId> = HashMap::new();
    for new in &seed.categories {
        let slug = entry_slug(&new.name, new.slug.as_deref());
        let id = match store.category_by_slug(&slug).await? {
            Some(existing) => existing.id,
            None => {
                result.categories += 1;
                service.create_category(new).await?.id
            }
        };
        categories.insert(slug, id);
    }

    let mut brands: HashMap<String, BrandId> = HashMap::new();
    for new in &seed.brands {
        let slug = entry_slug(&new.name, new.slug.as_deref());
        let id = match store.brand_by_slug(&slug).await? {
            Some(existing) => existing.id,
            None => {
                result.brands += 1;
                service.create_brand(new).await?.id
            }
        };
        brands.insert(slug, id);
    }

    let mut tags: HashMap<String, TagId> = HashMap::new();
    for new in &seed.tags {
        let slug = entry_slug(&new.name, new.slug.as_deref());
        let id = match store.tag_by_slug(&slug).await? {
            Some(existing) => existing.id,
            None => {
                result.tags += 1;
                service.create_tag(new).await?.id
            }
        };
        tags.insert(slug, id);
    }

    for entry in &seed.products {
        let slug = entry_slug(&entry.name, entry.slug.as_deref());
        if store.product_by_slug(&slug).await?.is_some() {
            warn!(slug = %slug, "Product already exists, skipping");
            result.skipped += 1;
            continue;
        }

        let category_id = *categories
            .get(&entry.category)
            .ok_or_else(|| format!("unknown category `{}`", entry.category))?;
        let product = service
            .create_product(&NewProduct {
                category_id,
                brand_id: entry.brand.as_ref().and_then(|b| brands.get(b).copied()),
                name: entry.name.clone(),
                slug: Some(slug),
                description: entry.description.clone(),
                price: entry.price,
                discount_price: entry.discount_price,
                stock: entry.stock,
                available: entry.available,
                featured: entry.featured,
                tag_ids: entry
                    .tags
                    .iter()
                    .filter_map(|t| tags.get(t).copied())
                    .collect(),
            })
            .await?;
        result.products += 1;

        for variant in &entry.variants {
            service
                .create_variant(&NewVariant {
                    product_id: product.id,
                    wattage: variant.wattage,
                    color: variant.color.clone(),
                    shape: variant.shape.clone(),
                    size: variant.size.clone(),
                    additional_price: variant.additional_price,
                    stock: variant.stock,
                })
                .await?;
            result.variants += 1;
        }
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
categories:
  - name: Smart Bulbs
brands:
  - name: Lumos
tags:
  - name: Dimmable
products:
  - name: Edison Globe
    category: smart-bulbs
    brand: lumos
    tags: [dimmable]
    price: "12.50"
    discount_price: "9.99"
    stock: 40
    variants:
      - wattage: 60
        color: Warm White
        additional_price: "2.00"
        stock: 10
"#;

    #[test]
    fn test_sample_parses_and_validates() {
        let seed: CatalogSeed = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(seed.products.len(), 1);
        let product = &seed.products[0];
        assert_eq!(product.price, Decimal::new(1250, 2));
        assert!(product.available);
        assert_eq!(product.variants[0].wattage, Some(60));
        assert!(validate_seed(&seed).is_empty());
    }

    #[test]
    fn test_unknown_references_reported() {
        let mut seed: CatalogSeed = serde_yaml::from_str(SAMPLE).unwrap();
        seed.products[0].category = "lamps".into();
        seed.products[0].tags.push("smart".into());

        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("unknown category `lamps`"));
        assert!(errors[1].contains("unknown tag `smart`"));
    }

    #[test]
    fn test_bad_prices_reported() {
        let mut seed: CatalogSeed = serde_yaml::from_str(SAMPLE).unwrap();
        seed.products[0].discount_price = Some(Decimal::new(20, 0));
        assert_eq!(validate_seed(&seed).len(), 1);

        seed.products[0].price = Decimal::ZERO;
        seed.products[0].discount_price = None;
        assert_eq!(validate_seed(&seed).len(), 1);
    }

    #[test]
    fn test_duplicate_product_slug_reported() {
        let mut seed: CatalogSeed = serde_yaml::from_str(SAMPLE).unwrap();
        let copy: SeedProduct = serde_yaml::from_str(
            "{name: Edison Globe, category: smart-bulbs, price: \"5.00\"}",
        )
        .unwrap();
        seed.products.push(copy);
        let errors = validate_seed(&seed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate slug"));
    }
}
