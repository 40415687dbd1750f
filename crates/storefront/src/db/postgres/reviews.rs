//! Review queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use lumen_core::{ProductId, Rating, ReviewId, UserId};

use super::{PgStore, conflict_on_unique};
use crate::db::{RepositoryError, ReviewRepo};
use crate::models::{NewReview, RatingSummary, Review};

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::try_from(r.rating).map_err(|e| {
            RepositoryError::DataCorruption(format!("review {}: {e}", r.id))
        })?;
        Ok(Self {
            id: r.id,
            product_id: r.product_id,
            user_id: r.user_id,
            rating,
            comment: r.comment,
            created_at: r.created_at,
        })
    }
}

#[async_trait]
impl ReviewRepo for PgStore {
    async fn insert_review(&self, new: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO shop.reviews (product_id, user_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, user_id, rating, comment, created_at
            ",
        )
        .bind(new.product_id)
        .bind(new.user_id)
        .bind(i16::from(new.rating))
        .bind(&new.comment)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "review"))?;

        Review::try_from(row)
    }

    async fn reviews_for_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r"
            SELECT id, product_id, user_id, rating, comment, created_at
            FROM shop.reviews
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(product)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    async fn rating_summary(&self, product: ProductId) -> Result<RatingSummary, RepositoryError> {
        let (sum, count): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(rating), 0)::int8, COUNT(*) FROM shop.reviews WHERE product_id = $1",
        )
        .bind(product)
        .fetch_one(&self.pool)
        .await?;

        let count = u32::try_from(count)
            .map_err(|_| RepositoryError::DataCorruption(format!("review count {count}")))?;
        Ok(RatingSummary::from_totals(sum, count))
    }
}
