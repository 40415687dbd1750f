//! Review types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use lumen_core::{ProductId, Rating, ReviewId, UserId};

/// A product review. One per (product, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Values for inserting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate rating for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    /// Mean rating rounded to two places; zero when there are no reviews.
    pub average: Decimal,
    pub count: u32,
}

impl RatingSummary {
    /// Summarise a set of ratings.
    #[must_use]
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_u32, 0_u32), |(sum, count), r| {
                (sum + u32::from(r.stars()), count + 1)
            });
        Self::from_totals(i64::from(sum), count)
    }

    /// Build from a star sum and review count.
    #[must_use]
    pub fn from_totals(sum: i64, count: u32) -> Self {
        let average = if count == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(sum) / Decimal::from(count)).round_dp(2)
        };
        Self { average, count }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let none = RatingSummary::from_ratings([]);
        assert_eq!(none.average, Decimal::ZERO);
        assert_eq!(none.count, 0);

        let ratings = [5_i64, 4, 4].map(|r| Rating::try_from(r).unwrap());
        let summary = RatingSummary::from_ratings(ratings);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Decimal::new(433, 2));
    }
}
