//! Plain-text rendering of a filtered dataset for the `summary` command.

use crate::dataset::{Dataset, StationFilter};
use crate::models::{display_or_not_available, NormalizedStation};
use std::fmt;

const TOP_CITIES: usize = 5;
const HISTOGRAM_BINS: usize = 20;

pub fn render_summary(dataset: &Dataset, filter: &StationFilter) -> String {
    SummaryReport { dataset, filter }.to_string()
}

/// Detail card for one station, with "Not available" for missing text.
pub fn render_station(station: &NormalizedStation) -> String {
    StationCard(station).to_string()
}

/// Dashboard statistics for the stations matching a filter.
pub struct SummaryReport<'a> {
    pub dataset: &'a Dataset,
    pub filter: &'a StationFilter,
}

impl fmt::Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filtered = self.dataset.filter(self.filter);

        match &self.filter.city {
            Some(city) => writeln!(f, "Showing stats for: {}", city)?,
            None => writeln!(f, "Showing overall stats for Portugal")?,
        }

        if filtered.is_empty() {
            return writeln!(f, "No stations match the selected filters.");
        }

        let summary = filtered.summary();
        writeln!(f)?;
        writeln!(f, "Overall Statistics")?;
        writeln!(f, "  Total Stations:                  {}", summary.total_stations)?;
        writeln!(f, "  Total Charging Points:           {}", summary.total_points)?;
        writeln!(f, "  Total Available Power (kW):      {:.2}", summary.total_power_kw)?;
        writeln!(
            f,
            "  Average Power per Station (kW):  {}",
            format_optional(summary.avg_power_per_station_kw)
        )?;
        writeln!(
            f,
            "  Average Power per Point (kW):    {}",
            format_optional(summary.avg_power_per_point_kw)
        )?;

        let view = filtered.map_view(self.filter.city.is_some());
        writeln!(
            f,
            "  Map centre:                      {:.5}, {:.5} (zoom {})",
            view.center_lat, view.center_lon, view.zoom
        )?;

        writeln!(f)?;
        writeln!(f, "Top Cities")?;
        for (city, count) in filtered.top_cities(TOP_CITIES) {
            writeln!(f, "  {:<30} {}", city, count)?;
        }

        writeln!(f)?;
        writeln!(f, "Points Distribution")?;
        for (category, count) in filtered.points_distribution() {
            writeln!(f, "  {:<30} {}", category.as_str(), count)?;
        }

        writeln!(f)?;
        writeln!(f, "Total Power Distribution (kW)")?;
        for (range, count) in filtered.power_range_distribution() {
            writeln!(f, "  {:<30} {}", range.as_str(), count)?;
        }

        let by_points = filtered.avg_power_by_points();
        writeln!(f)?;
        writeln!(f, "Average Power per Number of Points")?;
        if by_points.len() > 1 {
            for (points, avg) in by_points {
                writeln!(f, "  {:<30} {:.2}", points, avg)?;
            }
        } else {
            writeln!(f, "  Not enough distinct points data")?;
        }

        let bins = filtered.power_per_point_histogram(HISTOGRAM_BINS);
        writeln!(f)?;
        writeln!(f, "Power per Point (kW) Distribution")?;
        if bins.is_empty() {
            writeln!(f, "  No data")?;
        }
        for bin in bins.iter().filter(|b| b.count > 0) {
            let label = format!("{:.1}-{:.1}", bin.start, bin.end);
            writeln!(f, "  {:<30} {}", label, bin.count)?;
        }

        // Per-station detail only makes sense once narrowed to one city
        if self.filter.city.is_some() {
            writeln!(f)?;
            writeln!(f, "Stations")?;
            for station in filtered.stations() {
                writeln!(f)?;
                write!(f, "{}", StationCard(station))?;
            }
        }

        Ok(())
    }
}

pub struct StationCard<'a>(pub &'a NormalizedStation);

impl fmt::Display for StationCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let station = self.0;
        writeln!(f, "  {}", display_or_not_available(station.name.as_deref()))?;
        writeln!(f, "    Operator: {}", display_or_not_available(station.operator.as_deref()))?;
        writeln!(f, "    Address: {}", display_or_not_available(station.address.as_deref()))?;
        writeln!(f, "    City: {}", station.city)?;
        writeln!(
            f,
            "    Postal Code: {}",
            display_or_not_available(station.postal_code.as_deref())
        )?;
        writeln!(f, "    Latitude: {:.5}", station.latitude)?;
        writeln!(f, "    Longitude: {:.5}", station.longitude)?;
        writeln!(
            f,
            "    Number of Charging Points: {}",
            station
                .number_of_points
                .map(|n| n.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        )?;
        writeln!(
            f,
            "    Total Power: {} kW",
            station
                .total_power_kw
                .map(|p| p.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        )?;
        writeln!(
            f,
            "    Power per Point: {} kW ({})",
            format_optional(station.power_per_point_kw),
            station.power_per_point_category.description()
        )?;
        writeln!(
            f,
            "    Last Update: {}",
            display_or_not_available(station.last_update.as_deref())
        )
    }
}

fn format_optional(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}
