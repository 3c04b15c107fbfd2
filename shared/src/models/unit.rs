//! Measurement units and conversion to the canonical basis
//!
//! Mass and volume share one canonical basis: kilograms (a litre is costed like a
//! kilogram). `g` and `ml` are the small forms, 1000 small = 1 large. Discrete
//! items (`unit`) are counted and never converted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Small units per large unit (g per kg, ml per l)
pub const SMALL_PER_LARGE: Decimal = Decimal::ONE_THOUSAND;

/// A measurement unit as stored on ingredients, recipe lines and purchases
///
/// Tags outside the known set are kept verbatim in `Unrecognized` and convert
/// as identity, so malformed records never block data entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    #[default]
    Kilogram,
    Gram,
    Liter,
    Milliliter,
    Piece,
    Unrecognized(String),
}

impl Unit {
    pub fn as_str(&self) -> &str {
        match self {
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Liter => "l",
            Unit::Milliliter => "ml",
            Unit::Piece => "unit",
            Unit::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" => Unit::Kilogram,
            "g" => Unit::Gram,
            "l" => Unit::Liter,
            "ml" => Unit::Milliliter,
            "unit" => Unit::Piece,
            _ => Unit::Unrecognized(s.to_string()),
        }
    }

    /// `g` and `ml`
    pub fn is_small(&self) -> bool {
        matches!(self, Unit::Gram | Unit::Milliliter)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Unit::Unrecognized(_))
    }
}

impl From<String> for Unit {
    fn from(s: String) -> Self {
        Unit::parse(&s)
    }
}

impl From<&str> for Unit {
    fn from(s: &str) -> Self {
        Unit::parse(s)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.as_str().to_string()
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Convert a quantity to kilogram-equivalent (or unit count)
///
/// Conversions saturate at `Decimal::MAX` instead of overflowing.
pub fn to_canonical(quantity: Decimal, unit: &Unit) -> Decimal {
    if unit.is_small() {
        quantity.checked_div(SMALL_PER_LARGE).unwrap_or(Decimal::ZERO)
    } else {
        quantity
    }
}

/// Convert a canonical quantity back out into `unit`
pub fn from_canonical(canonical: Decimal, unit: &Unit) -> Decimal {
    if unit.is_small() {
        canonical.saturating_mul(SMALL_PER_LARGE)
    } else {
        canonical
    }
}

/// Quantity on the fine-grained basis: grams/millilitres for mass and volume,
/// item count for discrete units
pub fn to_base(quantity: Decimal, unit: &Unit) -> Decimal {
    match unit {
        Unit::Kilogram | Unit::Gram | Unit::Liter | Unit::Milliliter => {
            to_canonical(quantity, unit).saturating_mul(SMALL_PER_LARGE)
        }
        Unit::Piece | Unit::Unrecognized(_) => quantity,
    }
}

/// Convert between two units through the canonical basis
pub fn convert(quantity: Decimal, from: &Unit, to: &Unit) -> Decimal {
    if from == to {
        return quantity;
    }
    from_canonical(to_canonical(quantity, from), to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_canonical_small_units() {
        assert_eq!(to_canonical(dec("500"), &Unit::Gram), dec("0.5"));
        assert_eq!(to_canonical(dec("250"), &Unit::Milliliter), dec("0.25"));
    }

    #[test]
    fn test_to_canonical_large_units_identity() {
        assert_eq!(to_canonical(dec("1.5"), &Unit::Kilogram), dec("1.5"));
        assert_eq!(to_canonical(dec("2"), &Unit::Liter), dec("2"));
        assert_eq!(to_canonical(dec("12"), &Unit::Piece), dec("12"));
    }

    #[test]
    fn test_unrecognized_unit_is_identity() {
        let unit = Unit::parse("cup");
        assert_eq!(unit, Unit::Unrecognized("cup".to_string()));
        assert_eq!(to_canonical(dec("3"), &unit), dec("3"));
        assert_eq!(from_canonical(dec("3"), &unit), dec("3"));
        assert_eq!(to_base(dec("3"), &unit), dec("3"));
    }

    #[test]
    fn test_to_base() {
        assert_eq!(to_base(dec("1.5"), &Unit::Kilogram), dec("1500"));
        assert_eq!(to_base(dec("200"), &Unit::Gram), dec("200"));
        assert_eq!(to_base(dec("0.75"), &Unit::Liter), dec("750"));
        assert_eq!(to_base(dec("4"), &Unit::Piece), dec("4"));
    }

    #[test]
    fn test_convert_between_units() {
        assert_eq!(convert(dec("2"), &Unit::Kilogram, &Unit::Gram), dec("2000"));
        assert_eq!(convert(dec("750"), &Unit::Milliliter, &Unit::Liter), dec("0.75"));
        assert_eq!(convert(dec("5"), &Unit::Piece, &Unit::Piece), dec("5"));
    }

    #[test]
    fn test_conversion_saturates_on_huge_quantities() {
        let huge = dec("100000000000000000000000000");
        assert_eq!(to_base(huge, &Unit::Kilogram), Decimal::MAX);
        assert_eq!(convert(huge, &Unit::Liter, &Unit::Milliliter), Decimal::MAX);
        assert_eq!(to_canonical(huge, &Unit::Gram), dec("100000000000000000000000"));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Unit::parse("KG"), Unit::Kilogram);
        assert_eq!(Unit::parse(" ml "), Unit::Milliliter);
        assert_eq!(Unit::parse("unit"), Unit::Piece);
    }

    #[test]
    fn test_serde_round_trips_unrecognized_tag() {
        let unit: Unit = serde_json::from_str("\"pinch\"").unwrap();
        assert_eq!(unit, Unit::Unrecognized("pinch".to_string()));
        assert_eq!(serde_json::to_string(&unit).unwrap(), "\"pinch\"");
        assert_eq!(serde_json::to_string(&Unit::Gram).unwrap(), "\"g\"");
    }
}
