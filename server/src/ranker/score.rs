//! Range-match scoring.
//!
//! A reading earns partial credit per dimension: 1 inside the rule's
//! range, 0.5 inside a tolerance-widened band around it, 0 otherwise.

use shared_types::{CropRule, SensorReading};

/// Width of the tolerance band as a fraction of the range span.
const MARGIN_FRACTION: f64 = 0.2;
/// Tolerance band for degenerate (zero-width) ranges.
const DEGENERATE_MARGIN: f64 = 0.5;

/// Score one value against one `(min, max)` range. Ranges may be stored
/// inverted and are swapped before comparison; both match zones are
/// closed intervals.
pub fn range_score(value: f64, min: f64, max: f64) -> f64 {
    let (min, max) = if min > max { (max, min) } else { (min, max) };

    if (min..=max).contains(&value) {
        return 1.0;
    }

    let mut margin = MARGIN_FRACTION * (max - min);
    if margin == 0.0 {
        margin = DEGENERATE_MARGIN;
    }
    if value >= min - margin && value <= max + margin {
        return 0.5;
    }
    0.0
}

/// Aggregate confidence of a rule for a reading: the six dimension
/// scores averaged and expressed as a 0–100 percentage, two decimals.
pub fn rule_confidence(reading: &SensorReading, rule: &CropRule) -> f64 {
    let features = reading.features();
    let ranges = rule.ranges();
    let total: f64 = features
        .iter()
        .zip(ranges.iter())
        .map(|(value, (min, max))| range_score(*value, *min, *max))
        .sum();
    round2(total / ranges.len() as f64 * 100.0)
}

/// Round to two decimal places, the precision every confidence value in
/// the API carries.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inverted_ranges_score_identically() {
        for value in [-3.0, 0.0, 4.5, 10.0, 11.9, 25.0] {
            assert_eq!(range_score(value, 0.0, 10.0), range_score(value, 10.0, 0.0));
        }
    }

    #[test]
    fn full_match_zone_is_closed() {
        assert_eq!(range_score(10.0, 10.0, 20.0), 1.0);
        assert_eq!(range_score(20.0, 10.0, 20.0), 1.0);
        assert_eq!(range_score(15.0, 10.0, 20.0), 1.0);
    }

    #[test]
    fn near_match_band_is_twenty_percent_of_span() {
        // span 10 → margin 2
        assert_eq!(range_score(8.0, 10.0, 20.0), 0.5);
        assert_eq!(range_score(22.0, 10.0, 20.0), 0.5);
        assert_eq!(range_score(7.99, 10.0, 20.0), 0.0);
        assert_eq!(range_score(22.01, 10.0, 20.0), 0.0);
    }

    #[test]
    fn degenerate_range_uses_half_unit_margin() {
        assert_eq!(range_score(6.5, 6.5, 6.5), 1.0);
        assert_eq!(range_score(6.9, 6.5, 6.5), 0.5);
        assert_eq!(range_score(7.0, 6.5, 6.5), 0.5);
        assert_eq!(range_score(7.01, 6.5, 6.5), 0.0);
        assert_eq!(range_score(5.99, 6.5, 6.5), 0.0);
    }

    #[test]
    fn rule_confidence_averages_six_dimensions() {
        let rule: shared_types::CropRule = serde_json::from_value(json!({
            "name": "Rice",
            "N_min": 180, "N_max": 260,
            "P_min": 60, "P_max": 120,
            "K_min": 150, "K_max": 220,
            "temp_min": 24, "temp_max": 32,
            "moist_min": 60, "moist_max": 85,
            "ph_min": 5.8, "ph_max": 7.0
        }))
        .unwrap();

        let perfect = SensorReading {
            n: 220.0,
            p: 90.0,
            k: 185.0,
            temperature: 28.0,
            soil_moisture: 72.0,
            ph: 6.4,
        };
        assert_eq!(rule_confidence(&perfect, &rule), 100.0);

        // Five full matches plus one near match: (5 + 0.5) / 6.
        let near = SensorReading {
            temperature: 33.0,
            ..perfect
        };
        assert_eq!(rule_confidence(&near, &rule), 91.67);
    }

    #[test]
    fn round2_is_two_decimal_places() {
        assert_eq!(round2(91.666_666), 91.67);
        assert_eq!(round2(33.333_333), 33.33);
        assert_eq!(round2(50.0), 50.0);
    }
}
