//! Review star rating.

use serde::{Deserialize, Serialize};

/// Error for ratings outside 1..=5.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between 1 and 5 (got {0})")]
pub struct RatingError(pub i64);

/// A 1-5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i16")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// The rating as a number of stars.
    #[must_use]
    pub const fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError(value))
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(Rating::try_from(0_i64).is_err());
        assert_eq!(Rating::try_from(1_i64).map(Rating::stars), Ok(1));
        assert_eq!(Rating::try_from(5_i16).map(Rating::stars), Ok(5));
        assert_eq!(Rating::try_from(6_i64), Err(RatingError(6)));
        assert_eq!(Rating::try_from(-3_i64), Err(RatingError(-3)));
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }
}
