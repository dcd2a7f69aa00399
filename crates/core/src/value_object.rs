//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Postal address used for customers, warehouses and delivery stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    /// ISO 3166 alpha-2 country code.
    pub country: String,
}

impl ValueObject for Address {}

impl Address {
    /// Trim fields, uppercase the country and validate the result.
    pub fn normalized(&self) -> DomainResult<Address> {
        let line1 = self.line1.trim().to_string();
        let city = self.city.trim().to_string();
        let country = self.country.trim().to_uppercase();

        if line1.is_empty() {
            return Err(DomainError::validation("address line1 cannot be empty"));
        }
        if city.is_empty() {
            return Err(DomainError::validation("address city cannot be empty"));
        }
        if !is_country_code(&country) {
            return Err(DomainError::validation(
                "address country must be a 2-letter ISO code",
            ));
        }

        Ok(Address {
            line1,
            line2: non_empty(self.line2.as_deref()),
            city,
            postal_code: non_empty(self.postal_code.as_deref()),
            country,
        })
    }

    /// Single-line rendering used for tracking locations.
    pub fn display_line(&self) -> String {
        format!("{}, {} ({})", self.line1, self.city, self.country)
    }
}

/// True for two ASCII uppercase letters.
pub fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A percentage expressed in basis points (10000 = 100%).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Rate(u32);

impl ValueObject for Rate {}

impl Rate {
    pub const MAX_BASIS_POINTS: u32 = 10_000;
    pub const ZERO: Rate = Rate(0);

    pub fn new(basis_points: u32) -> DomainResult<Self> {
        if basis_points > Self::MAX_BASIS_POINTS {
            return Err(DomainError::validation(format!(
                "rate must be at most {} basis points, got {basis_points}",
                Self::MAX_BASIS_POINTS
            )));
        }
        Ok(Self(basis_points))
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    /// Apply the rate to an amount, rounding half up.
    ///
    /// The result never exceeds `amount`.
    pub fn apply(self, amount: u64) -> u64 {
        let scaled = (amount as u128) * (self.0 as u128) + 5_000;
        (scaled / 10_000) as u64
    }
}

impl TryFrom<u32> for Rate {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Rate::new(value)
    }
}

impl From<Rate> for u32 {
    fn from(value: Rate) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn address() -> Address {
        Address {
            line1: "  12 Dock Road ".to_string(),
            line2: Some("   ".to_string()),
            city: "Rotterdam".to_string(),
            postal_code: Some("3011".to_string()),
            country: "nl".to_string(),
        }
    }

    #[test]
    fn normalized_address_trims_and_uppercases() {
        let a = address().normalized().unwrap();
        assert_eq!(a.line1, "12 Dock Road");
        assert_eq!(a.line2, None);
        assert_eq!(a.country, "NL");
        assert_eq!(a.display_line(), "12 Dock Road, Rotterdam (NL)");
    }

    #[test]
    fn address_requires_country_code() {
        let mut a = address();
        a.country = "Netherlands".to_string();
        assert!(matches!(a.normalized(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rate_rounds_half_up() {
        let r = Rate::new(1_500).unwrap();
        assert_eq!(r.apply(1_000), 150);
        // 0.15 * 3 = 0.45 -> 0
        assert_eq!(r.apply(3), 0);
        // 0.15 * 10 = 1.5 -> 2
        assert_eq!(r.apply(10), 2);
        assert!(Rate::new(10_001).is_err());
    }

    #[test]
    fn rate_rejects_out_of_range_json() {
        let parsed: Result<Rate, _> = serde_json::from_str("20000");
        assert!(parsed.is_err());
        let parsed: Rate = serde_json::from_str("2000").unwrap();
        assert_eq!(parsed.basis_points(), 2_000);
    }

    proptest! {
        #[test]
        fn applied_rate_never_exceeds_amount(amount in 0u64..u64::MAX / 2, bp in 0u32..=10_000u32) {
            let rate = Rate::new(bp).unwrap();
            prop_assert!(rate.apply(amount) <= amount);
        }
    }
}
