//! Property search criteria.
//!
//! Every predicate is optional (absent = no constraint) except `limit`,
//! which always carries a result-size cap. Equality is structural.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{CoreError, ListingType};

/// Result-size cap applied when the user has not chosen one.
pub const DEFAULT_LIMIT: u32 = 50;

// ─── Fields ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    ListingType,
    PropertyType,
    Location,
    MinPrice,
    MaxPrice,
    Bedrooms,
    MinParkingCount,
    MinConfidence,
    Limit,
}

impl FilterField {
    pub const ALL: [Self; 9] = [
        Self::ListingType,
        Self::PropertyType,
        Self::Location,
        Self::MinPrice,
        Self::MaxPrice,
        Self::Bedrooms,
        Self::MinParkingCount,
        Self::MinConfidence,
        Self::Limit,
    ];

    /// Query-string key used by the backend.
    pub fn key(self) -> &'static str {
        match self {
            Self::ListingType => "listing_type",
            Self::PropertyType => "property_type",
            Self::Location => "location",
            Self::MinPrice => "min_price",
            Self::MaxPrice => "max_price",
            Self::Bedrooms => "bedrooms",
            Self::MinParkingCount => "min_parking_count",
            Self::MinConfidence => "min_confidence",
            Self::Limit => "limit",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .ok_or_else(|| CoreError::UnknownField(s.to_string()))
    }
}

// ─── Values ───────────────────────────────────────────────────────

/// A typed value for one field. `Clear` removes the constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Clear,
    Listing(ListingType),
    Text(String),
    Int(u64),
    Fraction(f64),
}

impl FilterValue {
    /// Parse a raw user string for the given field. Empty input clears.
    ///
    /// `any`/`all` also clear, except on the free-text fields where they are
    /// ordinary search terms.
    pub fn parse(field: FilterField, raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::Clear);
        }
        let free_text = matches!(field, FilterField::PropertyType | FilterField::Location);
        if !free_text && (raw.eq_ignore_ascii_case("any") || raw.eq_ignore_ascii_case("all")) {
            return Ok(Self::Clear);
        }
        match field {
            FilterField::ListingType => raw.parse().map(Self::Listing),
            FilterField::PropertyType | FilterField::Location => Ok(Self::Text(raw.to_string())),
            FilterField::MinPrice
            | FilterField::MaxPrice
            | FilterField::Bedrooms
            | FilterField::MinParkingCount
            | FilterField::Limit => raw.parse::<u64>().map(Self::Int).map_err(|_| {
                CoreError::InvalidValue {
                    field: field.key(),
                    detail: format!("not a non-negative integer: {raw}"),
                }
            }),
            FilterField::MinConfidence => {
                let v = raw.parse::<f64>().map_err(|_| CoreError::InvalidValue {
                    field: field.key(),
                    detail: format!("not a number: {raw}"),
                })?;
                Ok(Self::Fraction(v))
            }
        }
    }
}

/// Split and parse a raw `key=value` pair.
pub fn parse_pair(pair: &str) -> Result<(FilterField, FilterValue), CoreError> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| CoreError::InvalidPair(pair.to_string()))?;
    let field: FilterField = key.parse()?;
    let value = FilterValue::parse(field, raw)?;
    Ok((field, value))
}

// ─── Criteria ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_type: Option<ListingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_parking_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    pub limit: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            listing_type: None,
            property_type: None,
            location: None,
            min_price: None,
            max_price: None,
            bedrooms: None,
            min_parking_count: None,
            min_confidence: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl FilterCriteria {
    /// Set one field. `FilterValue::Clear` removes the constraint
    /// (or restores the default cap for `limit`).
    pub fn set(&mut self, field: FilterField, value: FilterValue) -> Result<(), CoreError> {
        let mismatch = |value: &FilterValue| CoreError::InvalidValue {
            field: field.key(),
            detail: format!("unexpected value {value:?}"),
        };

        match (field, value) {
            (FilterField::ListingType, FilterValue::Clear) => self.listing_type = None,
            (FilterField::ListingType, FilterValue::Listing(t)) => self.listing_type = Some(t),
            (FilterField::PropertyType, FilterValue::Clear) => self.property_type = None,
            (FilterField::PropertyType, FilterValue::Text(s)) => {
                self.property_type = non_empty(s);
            }
            (FilterField::Location, FilterValue::Clear) => self.location = None,
            (FilterField::Location, FilterValue::Text(s)) => self.location = non_empty(s),
            (FilterField::MinPrice, FilterValue::Clear) => self.min_price = None,
            (FilterField::MinPrice, FilterValue::Int(n)) => self.min_price = Some(n),
            (FilterField::MaxPrice, FilterValue::Clear) => self.max_price = None,
            (FilterField::MaxPrice, FilterValue::Int(n)) => self.max_price = Some(n),
            (FilterField::Bedrooms, FilterValue::Clear) => self.bedrooms = None,
            (FilterField::Bedrooms, FilterValue::Int(n)) => {
                self.bedrooms = Some(to_u32(field, n)?);
            }
            (FilterField::MinParkingCount, FilterValue::Clear) => self.min_parking_count = None,
            (FilterField::MinParkingCount, FilterValue::Int(n)) => {
                self.min_parking_count = Some(to_u32(field, n)?);
            }
            (FilterField::MinConfidence, FilterValue::Clear) => self.min_confidence = None,
            (FilterField::MinConfidence, FilterValue::Fraction(v)) => {
                if !(0.0..=1.0).contains(&v) {
                    return Err(CoreError::InvalidValue {
                        field: field.key(),
                        detail: format!("must be within 0..=1, got {v}"),
                    });
                }
                self.min_confidence = Some(v);
            }
            (FilterField::Limit, FilterValue::Clear) => self.limit = DEFAULT_LIMIT,
            (FilterField::Limit, FilterValue::Int(n)) => {
                let n = to_u32(field, n)?;
                if n == 0 {
                    return Err(CoreError::InvalidValue {
                        field: field.key(),
                        detail: "must be at least 1".into(),
                    });
                }
                self.limit = n;
            }
            (_, other) => return Err(mismatch(&other)),
        }
        Ok(())
    }

    /// Copy of `self` with one field changed.
    pub fn with(&self, field: FilterField, value: FilterValue) -> Result<Self, CoreError> {
        let mut next = self.clone();
        next.set(field, value)?;
        Ok(next)
    }

    /// Apply a raw `key=value` pair.
    pub fn apply_pair(&mut self, pair: &str) -> Result<FilterField, CoreError> {
        let (field, value) = parse_pair(pair)?;
        self.set(field, value)?;
        Ok(field)
    }

    /// Query parameters for the present fields, in a stable order.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self.predicate_pairs();
        pairs.push((FilterField::Limit.key(), self.limit.to_string()));
        pairs
    }

    /// Query parameters for an export: every predicate, no result cap.
    pub fn for_export(&self) -> Vec<(&'static str, String)> {
        self.predicate_pairs()
    }

    /// Number of predicates set, not counting `limit`.
    pub fn active_count(&self) -> usize {
        self.predicate_pairs().len()
    }

    fn predicate_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(t) = self.listing_type {
            pairs.push((FilterField::ListingType.key(), t.as_str().to_string()));
        }
        if let Some(ref s) = self.property_type {
            pairs.push((FilterField::PropertyType.key(), s.clone()));
        }
        if let Some(ref s) = self.location {
            pairs.push((FilterField::Location.key(), s.clone()));
        }
        if let Some(n) = self.min_price {
            pairs.push((FilterField::MinPrice.key(), n.to_string()));
        }
        if let Some(n) = self.max_price {
            pairs.push((FilterField::MaxPrice.key(), n.to_string()));
        }
        if let Some(n) = self.bedrooms {
            pairs.push((FilterField::Bedrooms.key(), n.to_string()));
        }
        if let Some(n) = self.min_parking_count {
            pairs.push((FilterField::MinParkingCount.key(), n.to_string()));
        }
        if let Some(v) = self.min_confidence {
            pairs.push((FilterField::MinConfidence.key(), v.to_string()));
        }
        pairs
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

fn to_u32(field: FilterField, n: u64) -> Result<u32, CoreError> {
    u32::try_from(n).map_err(|_| CoreError::InvalidValue {
        field: field.key(),
        detail: format!("out of range: {n}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_only_limit() {
        let c = FilterCriteria::default();
        assert_eq!(c.limit, 50);
        assert_eq!(c.active_count(), 0);
        assert_eq!(c.to_query_pairs(), vec![("limit", "50".to_string())]);
    }

    #[test]
    fn field_parse_accepts_dashes_and_case() {
        assert_eq!(
            "min-parking-count".parse::<FilterField>().expect("parse"),
            FilterField::MinParkingCount
        );
        assert_eq!(
            "Location".parse::<FilterField>().expect("parse"),
            FilterField::Location
        );
        assert!(matches!(
            "colour".parse::<FilterField>(),
            Err(CoreError::UnknownField(_))
        ));
    }

    #[test]
    fn apply_pair_sets_and_clears() {
        let mut c = FilterCriteria::default();
        c.apply_pair("location=Mumbai").expect("location");
        c.apply_pair("bedrooms=3").expect("bedrooms");
        c.apply_pair("listing_type=rental").expect("listing");
        assert_eq!(c.location.as_deref(), Some("Mumbai"));
        assert_eq!(c.bedrooms, Some(3));
        assert_eq!(c.listing_type, Some(ListingType::Rental));
        assert_eq!(c.active_count(), 3);

        c.apply_pair("bedrooms=").expect("clear");
        c.apply_pair("listing_type=all").expect("clear listing");
        assert_eq!(c.bedrooms, None);
        assert_eq!(c.listing_type, None);
        assert_eq!(c.active_count(), 1);
    }

    #[test]
    fn sentinels_only_clear_enumerated_fields() {
        let mut c = FilterCriteria::default();
        c.apply_pair("location=All").expect("location");
        c.apply_pair("property_type=any").expect("property type");
        assert_eq!(c.location.as_deref(), Some("All"));
        assert_eq!(c.property_type.as_deref(), Some("any"));

        c.apply_pair("bedrooms=2").expect("bedrooms");
        c.apply_pair("bedrooms=any").expect("clear bedrooms");
        assert_eq!(c.bedrooms, None);
        assert_eq!(c.active_count(), 2);
    }

    #[test]
    fn apply_pair_rejects_bad_input() {
        let mut c = FilterCriteria::default();
        assert!(matches!(
            c.apply_pair("location"),
            Err(CoreError::InvalidPair(_))
        ));
        assert!(c.apply_pair("min_price=cheap").is_err());
        assert!(c.apply_pair("min_confidence=1.5").is_err());
        assert!(c.apply_pair("limit=0").is_err());
        assert_eq!(c, FilterCriteria::default(), "failed sets leave criteria untouched");
    }

    #[test]
    fn arbitrary_values_beyond_presets() {
        let mut c = FilterCriteria::default();
        c.apply_pair("bedrooms=7").expect("bedrooms");
        c.apply_pair("min_parking_count=12").expect("parking");
        c.apply_pair("min_confidence=0.33").expect("confidence");
        assert_eq!(c.bedrooms, Some(7));
        assert_eq!(c.min_parking_count, Some(12));
        assert_eq!(c.min_confidence, Some(0.33));
    }

    #[test]
    fn set_rejects_mismatched_value_type() {
        let mut c = FilterCriteria::default();
        let err = c
            .set(FilterField::Bedrooms, FilterValue::Text("two".into()))
            .expect_err("mismatch");
        assert!(err.to_string().contains("bedrooms"));
    }

    #[test]
    fn blank_text_clears() {
        let mut c = FilterCriteria::default();
        c.set(FilterField::Location, FilterValue::Text("Pune".into()))
            .expect("set");
        c.set(FilterField::Location, FilterValue::Text("  ".into()))
            .expect("blank");
        assert_eq!(c.location, None);
    }

    #[test]
    fn query_pairs_stable_order_and_limit_last() {
        let mut c = FilterCriteria::default();
        c.apply_pair("min_confidence=0.8").expect("conf");
        c.apply_pair("location=Andheri").expect("loc");
        c.apply_pair("listing_type=sale").expect("type");
        c.apply_pair("limit=20").expect("limit");
        let keys: Vec<&str> = c.to_query_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["listing_type", "location", "min_confidence", "limit"]
        );
    }

    #[test]
    fn export_drops_limit() {
        let mut c = FilterCriteria::default();
        c.apply_pair("location=Thane").expect("loc");
        let pairs = c.for_export();
        assert_eq!(pairs, vec![("location", "Thane".to_string())]);
    }

    #[test]
    fn structural_equality() {
        let a = FilterCriteria::default()
            .with(FilterField::Location, FilterValue::Text("Mumbai".into()))
            .expect("a");
        let b = FilterCriteria::default()
            .with(FilterField::Location, FilterValue::Text("Mumbai".into()))
            .expect("b");
        assert_eq!(a, b);
        let c = b
            .with(FilterField::Bedrooms, FilterValue::Int(2))
            .expect("c");
        assert_ne!(a, c);
    }

    #[test]
    fn clearing_limit_restores_default() {
        let mut c = FilterCriteria::default();
        c.apply_pair("limit=10").expect("limit");
        c.apply_pair("limit=").expect("clear");
        assert_eq!(c.limit, DEFAULT_LIMIT);
    }
}
