use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Listing ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Sale,
    Rental,
    Lease,
}

impl ListingType {
    pub const ALL: [Self; 3] = [Self::Sale, Self::Rental, Self::Lease];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Rental => "rental",
            Self::Lease => "lease",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sale" => Ok(Self::Sale),
            "rental" => Ok(Self::Rental),
            "lease" => Ok(Self::Lease),
            _ => Err(CoreError::InvalidValue {
                field: "listing_type",
                detail: format!("unknown listing type: {s}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Furnishing {
    Furnished,
    SemiFurnished,
    Unfurnished,
}

impl Furnishing {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Furnished => "furnished",
            Self::SemiFurnished => "semi-furnished",
            Self::Unfurnished => "unfurnished",
        }
    }
}

// ─── Property ─────────────────────────────────────────────────────

/// A property record extracted by the backend from a group message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub message_id: String,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    pub listing_type: ListingType,
    /// Price as written in the message ("1.2 Cr", "45k/month").
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub price_numeric: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub area_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub floor_number: Option<i32>,
    #[serde(default)]
    pub total_floors: Option<i32>,
    #[serde(default)]
    pub amenities: Option<Vec<String>>,
    #[serde(default)]
    pub furnishing: Option<Furnishing>,
    #[serde(default)]
    pub parking: Option<bool>,
    #[serde(default)]
    pub parking_count: Option<u32>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub availability_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Extraction confidence in `0.0..=1.0`.
    #[serde(default)]
    pub parsing_confidence: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Property {
    /// Display name, falling back to a placeholder for unnamed listings.
    pub fn display_name(&self) -> &str {
        self.property_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Unnamed Property")
    }

    /// Best available location label: `location`, else `area_name, city`.
    pub fn location_label(&self) -> Option<String> {
        if let Some(loc) = self.location.as_deref().filter(|l| !l.is_empty()) {
            return Some(loc.to_string());
        }
        match (self.area_name.as_deref(), self.city.as_deref()) {
            (Some(area), Some(city)) => Some(format!("{area}, {city}")),
            (Some(area), None) => Some(area.to_string()),
            (None, Some(city)) => Some(city.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Envelope returned by the property query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub data: Vec<Property>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Per-listing-type counts over a result page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyStats {
    pub total: usize,
    pub sale: usize,
    pub rental: usize,
    pub lease: usize,
}

impl PropertyStats {
    pub fn from_properties(properties: &[Property]) -> Self {
        let mut stats = Self {
            total: properties.len(),
            ..Self::default()
        };
        for p in properties {
            match p.listing_type {
                ListingType::Sale => stats.sale += 1,
                ListingType::Rental => stats.rental += 1,
                ListingType::Lease => stats.lease += 1,
            }
        }
        stats
    }
}

/// Rounded percentage for a `0.0..=1.0` confidence fraction.
pub fn confidence_percent(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Default CSV export file name for the given day.
pub fn export_filename(date: NaiveDate) -> String {
    format!("property-listings-{}.csv", date.format("%Y-%m-%d"))
}

// ─── Groups ───────────────────────────────────────────────────────

/// A message group visible to the linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppGroup {
    pub group_id: String,
    pub group_name: String,
    #[serde(default)]
    pub is_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupsResponse {
    #[serde(default)]
    pub groups: Vec<WhatsAppGroup>,
}

/// Monitoring preference for one group, as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPreference {
    pub group_id: String,
    pub group_name: String,
    pub is_enabled: bool,
}

/// Generic `{success, message}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

// ─── Error ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    UnknownField(String),
    InvalidValue { field: &'static str, detail: String },
    InvalidPair(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField(name) => write!(f, "unknown filter field: {name}"),
            Self::InvalidValue { field, detail } => write!(f, "invalid {field}: {detail}"),
            Self::InvalidPair(raw) => write!(f, "expected key=value, got: {raw}"),
        }
    }
}

impl std::error::Error for CoreError {}

// ─── Tests ────────────────────────────────────────────────────────
