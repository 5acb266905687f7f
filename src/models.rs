use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// City used when the source record carries no town.
pub const CITY_NOT_SPECIFIED: &str = "Not specified";

/// Placeholder shown for absent text fields at presentation time.
pub const NOT_AVAILABLE: &str = "Not available";

/// A station record as it appears in the flattened data file.
///
/// Every field is optional and loosely typed: numbers may arrive as strings and
/// text may arrive as numbers. Coercion happens in [`crate::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "ID", default)]
    pub id: Option<Value>,
    #[serde(rename = "Nome", default)]
    pub name: Option<Value>,
    #[serde(rename = "Operador", default)]
    pub operator: Option<Value>,
    #[serde(rename = "Endereço", default)]
    pub address: Option<Value>,
    #[serde(rename = "Cidade", default)]
    pub city: Option<Value>,
    #[serde(rename = "Código Postal", default)]
    pub postal_code: Option<Value>,
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<Value>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<Value>,
    #[serde(rename = "Número de Pontos", default)]
    pub number_of_points: Option<Value>,
    #[serde(rename = "Potência Total (kW)", default)]
    pub total_power_kw: Option<Value>,
    #[serde(rename = "Data Atualização", default)]
    pub last_update: Option<Value>,
}

/// A cleaned station with derived metrics, ready for filtering and export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedStation {
    /// Absent when the source ID is missing or not an integer. Such stations
    /// stay in the dataset but are never exported.
    pub id: Option<i64>,
    pub name: Option<String>,
    pub operator: Option<String>,
    pub address: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub number_of_points: Option<u32>,
    pub total_power_kw: Option<f64>,
    pub last_update: Option<String>,
    pub power_per_point_kw: Option<f64>,
    /// `None` exactly when `total_power_kw` is absent; such stations sit outside
    /// every power range rather than in a made-up bucket.
    pub power_range: Option<PowerRange>,
    pub points_category: PointsCategory,
    pub power_per_point_category: PowerPerPointCategory,
}

/// Total station power bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerRange {
    #[serde(rename = "0-50")]
    UpTo50,
    #[serde(rename = "51-100")]
    UpTo100,
    #[serde(rename = "100+")]
    Above100,
}

impl PowerRange {
    pub const ALL: [PowerRange; 3] = [PowerRange::UpTo50, PowerRange::UpTo100, PowerRange::Above100];

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerRange::UpTo50 => "0-50",
            PowerRange::UpTo100 => "51-100",
            PowerRange::Above100 => "100+",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == label.trim())
    }
}

/// Number-of-points bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PointsCategory {
    #[serde(rename = "1 point")]
    One,
    #[serde(rename = "2 points")]
    Two,
    #[serde(rename = "3-4 points")]
    ThreeToFour,
    #[serde(rename = "5+ points")]
    FivePlus,
}

impl PointsCategory {
    pub const ALL: [PointsCategory; 4] = [
        PointsCategory::One,
        PointsCategory::Two,
        PointsCategory::ThreeToFour,
        PointsCategory::FivePlus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PointsCategory::One => "1 point",
            PointsCategory::Two => "2 points",
            PointsCategory::ThreeToFour => "3-4 points",
            PointsCategory::FivePlus => "5+ points",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label.trim())
    }
}

/// Per-connector charging speed class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PowerPerPointCategory {
    #[serde(rename = "N/A")]
    NotAvailable,
    #[serde(rename = "<7kW")]
    Below7,
    #[serde(rename = "7-22kW")]
    SevenTo22,
    #[serde(rename = "23-50kW")]
    TwentyThreeTo50,
    #[serde(rename = ">50kW")]
    Above50,
}

impl PowerPerPointCategory {
    pub const ALL: [PowerPerPointCategory; 5] = [
        PowerPerPointCategory::NotAvailable,
        PowerPerPointCategory::Below7,
        PowerPerPointCategory::SevenTo22,
        PowerPerPointCategory::TwentyThreeTo50,
        PowerPerPointCategory::Above50,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerPerPointCategory::NotAvailable => "N/A",
            PowerPerPointCategory::Below7 => "<7kW",
            PowerPerPointCategory::SevenTo22 => "7-22kW",
            PowerPerPointCategory::TwentyThreeTo50 => "23-50kW",
            PowerPerPointCategory::Above50 => ">50kW",
        }
    }

    /// Chart label including the AC/DC charging class.
    pub fn description(&self) -> &'static str {
        match self {
            PowerPerPointCategory::NotAvailable => "N/A",
            PowerPerPointCategory::Below7 => "< 7 kW",
            PowerPerPointCategory::SevenTo22 => "7-22kW (AC Normal/Fast)",
            PowerPerPointCategory::TwentyThreeTo50 => "23-50kW (DC Fast)",
            PowerPerPointCategory::Above50 => "> 50kW (DC Ultra-Fast)",
        }
    }
}

impl fmt::Display for PowerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PointsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PowerPerPointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text for an optional field, falling back to [`NOT_AVAILABLE`].
pub fn display_or_not_available(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}
