use crate::models::{NormalizedStation, PointsCategory, PowerRange, CITY_NOT_SPECIFIED};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Default map centre (mainland Portugal) and zoom when no city is selected.
pub const DEFAULT_CENTER: (f64, f64) = (39.5, -8.0);
pub const DEFAULT_ZOOM: u8 = 7;
pub const CITY_ZOOM: u8 = 12;

/// Selection applied to a dataset.
///
/// `city: None` means every city. An empty membership list applies no
/// restriction for that field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationFilter {
    pub city: Option<String>,
    pub power_ranges: Vec<PowerRange>,
    pub points_categories: Vec<PointsCategory>,
}

impl StationFilter {
    pub fn matches(&self, station: &NormalizedStation) -> bool {
        if let Some(city) = &self.city {
            if &station.city != city {
                return false;
            }
        }

        if !self.power_ranges.is_empty() {
            match station.power_range {
                Some(range) if self.power_ranges.contains(&range) => {}
                _ => return false,
            }
        }

        if !self.points_categories.is_empty()
            && !self.points_categories.contains(&station.points_category)
        {
            return false;
        }

        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_stations: usize,
    pub total_points: u64,
    pub total_power_kw: f64,
    pub avg_power_per_station_kw: Option<f64>,
    pub avg_power_per_point_kw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
}

/// The enriched station table. Immutable once built; filtering returns a new dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    stations: Vec<NormalizedStation>,
}

impl Dataset {
    pub fn new(stations: Vec<NormalizedStation>) -> Self {
        Self { stations }
    }

    pub fn stations(&self) -> &[NormalizedStation] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NormalizedStation> {
        self.stations.get(index)
    }

    pub fn filter(&self, filter: &StationFilter) -> Dataset {
        Dataset::new(
            self.stations
                .iter()
                .filter(|s| filter.matches(s))
                .cloned()
                .collect(),
        )
    }

    /// Sorted city names for a selector, without the "Not specified" bucket.
    pub fn cities(&self) -> Vec<String> {
        self.stations
            .iter()
            .filter(|s| s.city != CITY_NOT_SPECIFIED)
            .map(|s| s.city.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> Summary {
        let total_points = self
            .stations
            .iter()
            .filter_map(|s| s.number_of_points)
            .map(u64::from)
            .sum();
        let total_power_kw = self.stations.iter().filter_map(|s| s.total_power_kw).sum();

        Summary {
            total_stations: self.stations.len(),
            total_points,
            total_power_kw,
            avg_power_per_station_kw: mean(self.stations.iter().filter_map(|s| s.total_power_kw)),
            avg_power_per_point_kw: mean(self.stations.iter().filter_map(|s| s.power_per_point_kw)),
        }
    }

    /// Station count per city, largest first; ties are ordered by name.
    pub fn top_cities(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for station in &self.stations {
            *counts.entry(station.city.as_str()).or_default() += 1;
        }

        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(city, count)| (city.to_string(), count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Station count per points bucket, in bucket order. Empty buckets are omitted.
    pub fn points_distribution(&self) -> Vec<(PointsCategory, usize)> {
        let mut counts: BTreeMap<PointsCategory, usize> = BTreeMap::new();
        for station in &self.stations {
            *counts.entry(station.points_category).or_default() += 1;
        }
        counts.into_iter().collect()
    }

    /// Station count for every power range, zero-filled. Stations without power are not counted.
    pub fn power_range_distribution(&self) -> Vec<(PowerRange, usize)> {
        PowerRange::ALL
            .into_iter()
            .map(|range| {
                let count = self
                    .stations
                    .iter()
                    .filter(|s| s.power_range == Some(range))
                    .count();
                (range, count)
            })
            .collect()
    }

    /// Mean total power for each distinct point count, ascending by point count.
    pub fn avg_power_by_points(&self) -> Vec<(u32, f64)> {
        let mut groups: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for station in &self.stations {
            if let (Some(points), Some(power)) = (station.number_of_points, station.total_power_kw) {
                let entry = groups.entry(points).or_insert((0.0, 0));
                entry.0 += power;
                entry.1 += 1;
            }
        }

        groups
            .into_iter()
            .map(|(points, (sum, count))| (points, sum / count as f64))
            .collect()
    }

    /// Equal-width histogram of power per point over the stations that have one.
    pub fn power_per_point_histogram(&self, max_bins: usize) -> Vec<HistogramBin> {
        let values: Vec<f64> = self
            .stations
            .iter()
            .filter_map(|s| s.power_per_point_kw)
            .collect();
        histogram(&values, max_bins)
    }

    /// Map framing: the country view for "all cities", otherwise the mean position of the rows.
    pub fn map_view(&self, city_selected: bool) -> MapView {
        let country = MapView {
            center_lat: DEFAULT_CENTER.0,
            center_lon: DEFAULT_CENTER.1,
            zoom: DEFAULT_ZOOM,
        };

        if !city_selected {
            return country;
        }

        match (
            mean(self.stations.iter().map(|s| s.latitude)),
            mean(self.stations.iter().map(|s| s.longitude)),
        ) {
            (Some(center_lat), Some(center_lon)) => MapView {
                center_lat,
                center_lon,
                zoom: CITY_ZOOM,
            },
            _ => country,
        }
    }
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn histogram(values: &[f64], max_bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || max_bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max <= min {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / max_bins as f64;
    let mut bins: Vec<HistogramBin> = (0..max_bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == max_bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for v in values {
        // the maximum lands in the last bin
        let index = (((v - min) / width) as usize).min(max_bins - 1);
        bins[index].count += 1;
    }

    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PowerPerPointCategory;
    use crate::normalize::{points_category, power_per_point, power_per_point_category, power_range};

    fn station(id: i64, city: &str, points: Option<u32>, power: Option<f64>) -> NormalizedStation {
        let ppp = power_per_point(power, points);
        NormalizedStation {
            id: Some(id),
            name: None,
            operator: None,
            address: None,
            city: city.to_string(),
            postal_code: None,
            latitude: 38.0 + id as f64,
            longitude: -9.0,
            number_of_points: points,
            total_power_kw: power,
            last_update: None,
            power_per_point_kw: ppp,
            power_range: power.map(power_range),
            points_category: points_category(points),
            power_per_point_category: power_per_point_category(ppp),
        }
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            station(1, "Lisboa", Some(2), Some(44.0)),
            station(2, "Lisboa", Some(4), Some(150.0)),
            station(3, "Porto", Some(1), Some(22.0)),
            station(4, "Not specified", None, None),
        ])
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let data = sample();
        assert_eq!(data.filter(&StationFilter::default()).len(), 4);
    }

    #[test]
    fn test_filter_by_city_and_range() {
        let data = sample();
        let filter = StationFilter {
            city: Some("Lisboa".to_string()),
            power_ranges: vec![PowerRange::UpTo50],
            points_categories: vec![],
        };

        let filtered = data.filter(&filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.stations()[0].id, Some(1));
    }

    #[test]
    fn test_range_filter_excludes_missing_power() {
        let data = sample();
        let filter = StationFilter {
            power_ranges: PowerRange::ALL.to_vec(),
            ..Default::default()
        };
        assert_eq!(data.filter(&filter).len(), 3);
    }

    #[test]
    fn test_filter_by_points_category() {
        let data = sample();
        let filter = StationFilter {
            points_categories: vec![PointsCategory::One],
            ..Default::default()
        };
        let ids: Vec<i64> = data.filter(&filter).stations().iter().filter_map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_cities_skip_not_specified() {
        assert_eq!(sample().cities(), vec!["Lisboa".to_string(), "Porto".to_string()]);
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.total_stations, 4);
        assert_eq!(summary.total_points, 7);
        assert_eq!(summary.total_power_kw, 216.0);
        assert_eq!(summary.avg_power_per_station_kw, Some(72.0));
        // 22.0, 37.5 and 22.0
        assert_eq!(summary.avg_power_per_point_kw, Some(81.5 / 3.0));
    }

    #[test]
    fn test_summary_of_empty_dataset() {
        let summary = Dataset::default().summary();
        assert_eq!(summary.total_stations, 0);
        assert_eq!(summary.avg_power_per_station_kw, None);
        assert_eq!(summary.avg_power_per_point_kw, None);
    }

    #[test]
    fn test_top_cities() {
        let top = sample().top_cities(2);
        assert_eq!(top, vec![("Lisboa".to_string(), 2), ("Not specified".to_string(), 1)]);
    }

    #[test]
    fn test_distributions() {
        let data = sample();
        assert_eq!(
            data.points_distribution(),
            vec![
                (PointsCategory::One, 2),
                (PointsCategory::Two, 1),
                (PointsCategory::ThreeToFour, 1),
            ]
        );
        assert_eq!(
            data.power_range_distribution(),
            vec![
                (PowerRange::UpTo50, 2),
                (PowerRange::UpTo100, 0),
                (PowerRange::Above100, 1),
            ]
        );
    }

    #[test]
    fn test_avg_power_by_points() {
        let data = Dataset::new(vec![
            station(1, "A", Some(2), Some(40.0)),
            station(2, "A", Some(2), Some(60.0)),
            station(3, "A", Some(1), Some(7.4)),
            station(4, "A", Some(3), None),
        ]);
        assert_eq!(data.avg_power_by_points(), vec![(1, 7.4), (2, 50.0)]);
    }

    #[test]
    fn test_power_per_point_histogram() {
        let data = Dataset::new(vec![
            station(1, "A", Some(1), Some(0.0)),
            station(2, "A", Some(1), Some(5.0)),
            station(3, "A", Some(1), Some(10.0)),
            station(4, "A", None, Some(10.0)),
        ]);

        let bins = data.power_per_point_histogram(2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 2);
        assert_eq!(bins[1].end, 10.0);
        assert!(Dataset::default().power_per_point_histogram(20).is_empty());
    }

    #[test]
    fn test_map_view() {
        let data = sample();
        assert_eq!(data.map_view(false).zoom, DEFAULT_ZOOM);

        let lisboa = data.filter(&StationFilter {
            city: Some("Lisboa".to_string()),
            ..Default::default()
        });
        let view = lisboa.map_view(true);
        assert_eq!(view.zoom, CITY_ZOOM);
        assert_eq!(view.center_lat, 39.5);

        assert_eq!(Dataset::default().map_view(true).center_lat, DEFAULT_CENTER.0);
    }

    #[test]
    fn test_ppp_category_of_sample() {
        let data = sample();
        assert_eq!(
            data.get(1).map(|s| s.power_per_point_category),
            Some(PowerPerPointCategory::TwentyThreeTo50)
        );
    }
}
