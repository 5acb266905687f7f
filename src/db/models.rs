use crate::models::NormalizedStation;
use sqlx::FromRow;

/// A row of the `stations` table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StationRow {
    pub id: i64,
    pub name: Option<String>,
    pub operator: Option<String>,
    pub address: Option<String>,
    pub city: String,
    pub postal_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub number_of_points: Option<i32>,
    pub total_power_kw: Option<f64>,
    pub last_update: Option<String>,
    pub power_per_point_kw: Option<f64>,
}

impl StationRow {
    /// Build the row for a station, or `None` when it has no ID to key on.
    pub fn from_station(station: &NormalizedStation) -> Option<Self> {
        Some(Self {
            id: station.id?,
            name: station.name.clone(),
            operator: station.operator.clone(),
            address: station.address.clone(),
            city: station.city.clone(),
            postal_code: station.postal_code.clone(),
            latitude: station.latitude,
            longitude: station.longitude,
            number_of_points: station.number_of_points.and_then(|n| i32::try_from(n).ok()),
            total_power_kw: station.total_power_kw,
            last_update: station.last_update.clone(),
            power_per_point_kw: station.power_per_point_kw,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportResult {
    pub inserted: usize,
    /// Stations without an ID, plus those whose ID was already present in the
    /// table or earlier in the same export.
    pub skipped: usize,
}
