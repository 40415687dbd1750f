//! Catalog queries.

use async_trait::async_trait;

use lumen_core::{BrandId, CategoryId, ProductId, TagId, VariantId};

use super::{
    PRODUCT_COLUMNS, PgStore, ProductRow, VARIANT_COLUMNS, VariantRow, conflict_on_unique,
};
use crate::db::{CatalogRepo, RepositoryError};
use crate::models::{
    Brand, Category, NewBrand, NewCategory, NewProduct, NewTag, NewVariant, PAGE_SIZE, Page,
    Product, ProductFilter, ProductSort, ProductVariant, Tag,
};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(r: CategoryRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
            description: r.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BrandRow {
    id: BrandId,
    name: String,
    slug: String,
    description: String,
}

impl From<BrandRow> for Brand {
    fn from(r: BrandRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
            description: r.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: TagId,
    name: String,
    slug: String,
}

impl From<TagRow> for Tag {
    fn from(r: TagRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            slug: r.slug,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CountedProductRow {
    #[sqlx(flatten)]
    product: ProductRow,
    total_count: i64,
}

fn wattage_to_i32(wattage: Option<u32>) -> Result<Option<i32>, RepositoryError> {
    wattage
        .map(i32::try_from)
        .transpose()
        .map_err(|_| RepositoryError::Conflict("wattage out of range".to_owned()))
}

#[async_trait]
impl CatalogRepo for PgStore {
    async fn insert_category(
        &self,
        new: &NewCategory,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO shop.categories (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description
            ",
        )
        .bind(&new.name)
        .bind(slug)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category"))?;

        Ok(row.into())
    }

    async fn insert_brand(&self, new: &NewBrand, slug: &str) -> Result<Brand, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(
            r"
            INSERT INTO shop.brands (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description
            ",
        )
        .bind(&new.name)
        .bind(slug)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "brand"))?;

        Ok(row.into())
    }

    async fn insert_tag(&self, new: &NewTag, slug: &str) -> Result<Tag, RepositoryError> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO shop.tags (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(&new.name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "tag"))?;

        Ok(row.into())
    }

    async fn insert_product(
        &self,
        new: &NewProduct,
        slug: &str,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO shop.products
                (category_id, brand_id, name, slug, description, price, discount_price,
                 stock, available, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(new.category_id)
        .bind(new.brand_id)
        .bind(&new.name)
        .bind(slug)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.discount_price)
        .bind(new.stock)
        .bind(new.available)
        .bind(new.featured)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "product"))?;

        for tag in &new.tag_ids {
            sqlx::query("INSERT INTO shop.product_tags (product_id, tag_id) VALUES ($1, $2)")
                .bind(row.id)
                .bind(*tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn insert_variant(&self, new: &NewVariant) -> Result<ProductVariant, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(&format!(
            r"
            INSERT INTO shop.product_variants
                (product_id, wattage, color, shape, size, additional_price, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VARIANT_COLUMNS}
            "
        ))
        .bind(new.product_id)
        .bind(wattage_to_i32(new.wattage)?)
        .bind(&new.color)
        .bind(&new.shape)
        .bind(&new.size)
        .bind(new.additional_price)
        .bind(new.stock)
        .fetch_one(&self.pool)
        .await?;

        ProductVariant::try_from(row)
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, description FROM shop.categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    async fn brand_by_slug(&self, slug: &str) -> Result<Option<Brand>, RepositoryError> {
        let row = sqlx::query_as::<_, BrandRow>(
            "SELECT id, name, slug, description FROM shop.brands WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Brand::from))
    }

    async fn tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepositoryError> {
        let row =
            sqlx::query_as::<_, TagRow>("SELECT id, name, slug FROM shop.tags WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Tag::from))
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    async fn variant(&self, id: VariantId) -> Result<Option<ProductVariant>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM shop.product_variants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProductVariant::try_from).transpose()
    }

    async fn variants(&self, product: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantRow>(&format!(
            "SELECT {VARIANT_COLUMNS} FROM shop.product_variants WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProductVariant::try_from).collect()
    }

    async fn product_tags(&self, product: ProductId) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagRow>(
            r"
            SELECT t.id, t.name, t.slug
            FROM shop.tags t
            JOIN shop.product_tags pt ON pt.tag_id = t.id
            WHERE pt.product_id = $1
            ORDER BY t.name
            ",
        )
        .bind(product)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Page<Product>, RepositoryError> {
        let order_by = match filter.sort {
            ProductSort::PriceLowToHigh => "COALESCE(discount_price, price) ASC, id ASC",
            ProductSort::PriceHighToLow => "COALESCE(discount_price, price) DESC, id ASC",
            ProductSort::NewestFirst => "created_at DESC, id DESC",
        };

        let rows = sqlx::query_as::<_, CountedProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}, COUNT(*) OVER () AS total_count
            FROM shop.products
            WHERE available
              AND ($1::int4 IS NULL OR category_id = $1)
              AND ($2::int4 IS NULL OR brand_id = $2)
              AND ($3::numeric IS NULL OR COALESCE(discount_price, price) >= $3)
              AND ($4::numeric IS NULL OR COALESCE(discount_price, price) <= $4)
            ORDER BY {order_by}
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(filter.category)
        .bind(filter.brand)
        .bind(filter.price_min)
        .bind(filter.price_max)
        .bind(i64::from(PAGE_SIZE))
        .bind(i64::from(filter.offset()))
        .fetch_all(&self.pool)
        .await?;

        let total = match rows.first() {
            Some(row) => u64::try_from(row.total_count).unwrap_or(0),
            // An empty page past the end still needs the true count.
            None => {
                let (count,): (i64,) = sqlx::query_as(
                    r"
                    SELECT COUNT(*)
                    FROM shop.products
                    WHERE available
                      AND ($1::int4 IS NULL OR category_id = $1)
                      AND ($2::int4 IS NULL OR brand_id = $2)
                      AND ($3::numeric IS NULL OR COALESCE(discount_price, price) >= $3)
                      AND ($4::numeric IS NULL OR COALESCE(discount_price, price) <= $4)
                    ",
                )
                .bind(filter.category)
                .bind(filter.brand)
                .bind(filter.price_min)
                .bind(filter.price_max)
                .fetch_one(&self.pool)
                .await?;
                u64::try_from(count).unwrap_or(0)
            }
        };

        let items = rows.into_iter().map(|r| Product::from(r.product)).collect();
        Ok(Page::new(items, filter.page(), total))
    }
}
