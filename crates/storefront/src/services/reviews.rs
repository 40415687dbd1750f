//! Product reviews.

use chrono::Utc;
use tracing::instrument;

use lumen_core::{ProductId, Rating, UserId};

use crate::db::{RepositoryError, Store};
use crate::error::ShopError;
use crate::models::{NewReview, RatingSummary, Review};

/// Longest accepted review comment, in characters.
pub const MAX_COMMENT_LENGTH: usize = 5000;

/// Review operations.
pub struct ReviewService<'a> {
    store: &'a dyn Store,
}

impl<'a> ReviewService<'a> {
    /// Create a new review service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Add the user's review of a product.
    ///
    /// # Errors
    ///
    /// - `ShopError::Validation` if the rating is outside 1..=5 or the comment is too long
    /// - `ShopError::NotFound` if the product does not exist
    /// - `ShopError::DuplicateReview` if the user already reviewed it
    #[instrument(skip(self, comment))]
    pub async fn add_review(
        &self,
        user: UserId,
        product: ProductId,
        rating: i64,
        comment: &str,
    ) -> Result<Review, ShopError> {
        let rating = Rating::try_from(rating)?;
        let comment = comment.trim();
        if comment.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ShopError::invalid_field(
                "comment",
                format!("Comment must be at most {MAX_COMMENT_LENGTH} characters"),
            ));
        }

        if self.store.product(product).await?.is_none() {
            return Err(ShopError::NotFound("Product"));
        }

        // Uniqueness is left to the store so concurrent submits cannot both win.
        let review = self
            .store
            .insert_review(&NewReview {
                product_id: product,
                user_id: user,
                rating,
                comment: comment.to_owned(),
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ShopError::DuplicateReview,
                other => other.into(),
            })?;

        tracing::info!(review_id = %review.id, rating = rating.stars(), "Review added");
        Ok(review)
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn reviews(&self, product: ProductId) -> Result<Vec<Review>, ShopError> {
        Ok(self.store.reviews_for_product(product).await?)
    }

    /// Average rating and review count.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn rating_summary(&self, product: ProductId) -> Result<RatingSummary, ShopError> {
        Ok(self.store.rating_summary(product).await?)
    }
}
