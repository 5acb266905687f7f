pub mod city;
pub mod coerce;
pub mod metrics;

pub use city::normalize_city;
pub use metrics::{points_category, power_per_point, power_per_point_category, power_range};

use crate::models::{NormalizedStation, StationRecord};
use coerce::{coerce_count, coerce_f64, coerce_i64, coerce_non_negative_f64, coerce_text};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub input_records: usize,
    pub output_records: usize,
    pub missing_coordinates: usize,
    /// Kept records whose ID is missing or not an integer.
    pub missing_id: usize,
    pub duplicate_ids: usize,
}

impl NormalizeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped(&self) -> usize {
        self.missing_coordinates + self.duplicate_ids
    }
}

/// Why a single record did not make it into the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingCoordinates,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingCoordinates => f.write_str("missing or invalid coordinates"),
        }
    }
}

pub struct Normalizer;

impl Normalizer {
    /// Turn raw records into the enriched dataset.
    ///
    /// Records without usable coordinates are dropped, and a repeated ID keeps
    /// the first record seen. Every other data problem, a missing ID included,
    /// degrades the affected field to `None`.
    pub fn normalize(records: &[StationRecord]) -> (Vec<NormalizedStation>, NormalizeStats) {
        let mut stations = Vec::with_capacity(records.len());
        let mut stats = NormalizeStats::new();
        let mut seen_ids = HashSet::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            stats.input_records += 1;

            match Self::normalize_record(record) {
                Ok(station) => {
                    match station.id {
                        Some(id) if !seen_ids.insert(id) => {
                            stats.duplicate_ids += 1;
                            debug!("Skipping record {}: duplicate ID {}", index, id);
                            continue;
                        }
                        Some(_) => {}
                        None => {
                            stats.missing_id += 1;
                            debug!("Record {} has no usable ID", index);
                        }
                    }
                    stations.push(station);
                }
                Err(rejection) => {
                    match rejection {
                        Rejection::MissingCoordinates => stats.missing_coordinates += 1,
                    }
                    debug!("Skipping record {}: {}", index, rejection);
                }
            }
        }

        stats.output_records = stations.len();

        info!(
            "Normalized {} of {} station records ({} without coordinates, {} duplicate IDs, {} kept without ID)",
            stats.output_records,
            stats.input_records,
            stats.missing_coordinates,
            stats.duplicate_ids,
            stats.missing_id
        );

        (stations, stats)
    }

    pub fn normalize_record(record: &StationRecord) -> Result<NormalizedStation, Rejection> {
        let latitude = coerce_f64(record.latitude.as_ref());
        let longitude = coerce_f64(record.longitude.as_ref());
        let (latitude, longitude) = match (latitude, longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Err(Rejection::MissingCoordinates),
        };

        let number_of_points = coerce_count(record.number_of_points.as_ref());
        let total_power_kw = coerce_non_negative_f64(record.total_power_kw.as_ref());
        let power_per_point_kw = power_per_point(total_power_kw, number_of_points);
        let city = coerce_text(record.city.as_ref());

        Ok(NormalizedStation {
            id: coerce_i64(record.id.as_ref()),
            name: coerce_text(record.name.as_ref()),
            operator: coerce_text(record.operator.as_ref()),
            address: coerce_text(record.address.as_ref()),
            city: normalize_city(city.as_deref()),
            postal_code: coerce_text(record.postal_code.as_ref()),
            latitude,
            longitude,
            number_of_points,
            total_power_kw,
            last_update: coerce_text(record.last_update.as_ref()),
            power_per_point_kw,
            power_range: total_power_kw.map(power_range),
            points_category: points_category(number_of_points),
            power_per_point_category: power_per_point_category(power_per_point_kw),
        })
    }
}
