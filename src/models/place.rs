//! Venue candidates sourced from the places index

use serde::{Deserialize, Serialize};

/// Kind of venue looked up for a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    Lodging,
    Dining,
}

impl PlaceCategory {
    /// Type filter understood by the places API
    #[must_use]
    pub fn search_type(self) -> &'static str {
        match self {
            PlaceCategory::Lodging => "lodging",
            PlaceCategory::Dining => "restaurant",
        }
    }

    /// Noun used in free-text queries and prompts
    #[must_use]
    pub fn noun(self) -> &'static str {
        match self {
            PlaceCategory::Lodging => "hotels",
            PlaceCategory::Dining => "restaurants",
        }
    }
}

/// A venue with the signals used for ranking and pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    /// 0-5 stars
    pub rating: Option<f64>,
    /// Ordinal cost level 1-4
    pub price_tier: Option<u8>,
    pub category: PlaceCategory,
}

impl PlaceCandidate {
    /// Map a raw price level onto the 1-4 tier scale. Level 0 ("free") and
    /// anything out of range carry no tier.
    #[must_use]
    pub fn tier_from_level(level: i64) -> Option<u8> {
        match level {
            1..=4 => u8::try_from(level).ok(),
            _ => None,
        }
    }

    /// Keep only ratings on the 0-5 scale
    #[must_use]
    pub fn sanitize_rating(rating: f64) -> Option<f64> {
        (rating.is_finite() && (0.0..=5.0).contains(&rating)).then_some(rating)
    }

    /// "$$"-style label for prompts
    #[must_use]
    pub fn price_label(&self) -> String {
        match self.price_tier {
            Some(tier) => "$".repeat(usize::from(tier)),
            None => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, None)]
    #[case(1, Some(1))]
    #[case(4, Some(4))]
    #[case(5, None)]
    #[case(-2, None)]
    fn test_tier_from_level(#[case] level: i64, #[case] expected: Option<u8>) {
        assert_eq!(PlaceCandidate::tier_from_level(level), expected);
    }

    #[test]
    fn test_sanitize_rating() {
        assert_eq!(PlaceCandidate::sanitize_rating(4.5), Some(4.5));
        assert_eq!(PlaceCandidate::sanitize_rating(7.0), None);
        assert_eq!(PlaceCandidate::sanitize_rating(f64::NAN), None);
    }

    #[test]
    fn test_price_label() {
        let mut candidate = PlaceCandidate {
            place_id: "abc".to_string(),
            name: "Eagle's Nest".to_string(),
            rating: Some(4.6),
            price_tier: Some(3),
            category: PlaceCategory::Lodging,
        };
        assert_eq!(candidate.price_label(), "$$$");
        candidate.price_tier = None;
        assert_eq!(candidate.price_label(), "unknown");
    }
}
