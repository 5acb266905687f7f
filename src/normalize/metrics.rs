use crate::models::{PointsCategory, PowerPerPointCategory, PowerRange};

/// Bucket a station's total power. Absent power is not a range; callers keep it as `None`.
pub fn power_range(total_power_kw: f64) -> PowerRange {
    if total_power_kw <= 50.0 {
        PowerRange::UpTo50
    } else if total_power_kw <= 100.0 {
        PowerRange::UpTo100
    } else {
        PowerRange::Above100
    }
}

/// Bucket a point count. Zero and unknown counts fall into the lowest bucket.
pub fn points_category(number_of_points: Option<u32>) -> PointsCategory {
    match number_of_points {
        None | Some(0) | Some(1) => PointsCategory::One,
        Some(2) => PointsCategory::Two,
        Some(3) | Some(4) => PointsCategory::ThreeToFour,
        Some(_) => PointsCategory::FivePlus,
    }
}

pub fn power_per_point(total_power_kw: Option<f64>, number_of_points: Option<u32>) -> Option<f64> {
    let points = number_of_points.filter(|n| *n > 0)?;
    let value = total_power_kw? / f64::from(points);
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

pub fn power_per_point_category(power_per_point_kw: Option<f64>) -> PowerPerPointCategory {
    match power_per_point_kw {
        Some(v) if v.is_finite() => {
            if v < 7.0 {
                PowerPerPointCategory::Below7
            } else if v <= 22.0 {
                PowerPerPointCategory::SevenTo22
            } else if v <= 50.0 {
                PowerPerPointCategory::TwentyThreeTo50
            } else {
                PowerPerPointCategory::Above50
            }
        }
        _ => PowerPerPointCategory::NotAvailable,
    }
}
