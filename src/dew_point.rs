/// Magnus coefficient a (dimensionless)
const MAGNUS_A: f64 = 17.62;

/// Magnus coefficient b in °C
const MAGNUS_B: f64 = 243.12;

/// Calculates the dew point in °C with the Magnus approximation, rounded to 2 decimals
///
/// Humidity at or below zero has no dew point and yields a non finite value, callers
/// are expected to reject that.
///
/// # Arguments
///
/// * 'temperature_c' - air temperature in °C
/// * 'humidity_percent' - relative humidity in percent (0-100)
pub fn dew_point(temperature_c: f64, humidity_percent: f64) -> f64 {
    let gamma = MAGNUS_A * temperature_c / (MAGNUS_B + temperature_c) + (humidity_percent / 100.0).ln();
    let dew_point = MAGNUS_B * gamma / (MAGNUS_A - gamma);

    round2(dew_point)
}

/// Rounds to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_degrees_half_humidity() {
        assert!((dew_point(20.0, 50.0) - 9.27).abs() < 0.05);
    }

    #[test]
    fn saturated_air_dew_point_equals_temperature() {
        assert_eq!(dew_point(15.0, 100.0), 15.0);
    }

    #[test]
    fn below_freezing() {
        let dp = dew_point(-5.0, 80.0);
        assert!(dp < -5.0 && dp > -10.0);
    }

    #[test]
    fn zero_humidity_is_not_finite() {
        assert!(!dew_point(20.0, 0.0).is_finite());
    }
}
