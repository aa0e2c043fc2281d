//! Pressure → altitude conversion (international barometric formula,
//! troposphere-only form).

use crate::error::{MeasureError, Result};

/// Standard atmosphere pressure at sea level in hPa.
pub const SEA_LEVEL_HPA: f32 = 1013.25;

const ALTITUDE_SCALE_M: f64 = 44330.0;
const EXPONENT: f64 = 1.0 / 5.255;

/// Altitude in meters for a pressure reading, relative to `sea_level_hpa`.
///
/// Pressures that are not strictly positive and finite have no altitude and
/// yield `NaN`, which callers forward unchanged instead of failing.
pub fn altitude(pressure_hpa: f32, sea_level_hpa: f32) -> f32 {
    match try_altitude(pressure_hpa, sea_level_hpa) {
        Ok(meters) => meters,
        Err(_) => f32::NAN,
    }
}

/// Like [`altitude`], but reports out-of-domain input as `InvalidSample`.
pub fn try_altitude(pressure_hpa: f32, sea_level_hpa: f32) -> Result<f32> {
    if !pressure_hpa.is_finite() || pressure_hpa <= 0.0 {
        return Err(MeasureError::InvalidSample(pressure_hpa));
    }
    let ratio = f64::from(pressure_hpa) / f64::from(sea_level_hpa);
    Ok((ALTITUDE_SCALE_M * (1.0 - ratio.powf(EXPONENT))) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_pressure_is_zero_altitude() {
        assert!(altitude(SEA_LEVEL_HPA, SEA_LEVEL_HPA).abs() < 1e-3);
    }

    #[test]
    fn altitude_is_non_negative_up_to_sea_level() {
        let mut p = 1.0f32;
        while p <= SEA_LEVEL_HPA {
            assert!(altitude(p, SEA_LEVEL_HPA) >= 0.0, "pressure {p}");
            p += 0.75;
        }
    }

    #[test]
    fn altitude_strictly_decreases_with_pressure() {
        let mut previous = altitude(10.0, SEA_LEVEL_HPA);
        let mut p = 20.0f32;
        while p < 1100.0 {
            let current = altitude(p, SEA_LEVEL_HPA);
            assert!(current < previous, "{p} hPa: {current} !< {previous}");
            previous = current;
            p += 10.0;
        }
    }

    #[test]
    fn known_reference_points() {
        // ~5.5 km at half an atmosphere
        let half = altitude(506.625, SEA_LEVEL_HPA);
        assert!((half - 5_478.0).abs() < 10.0, "{half}");
        // above-standard pressure sits below sea level
        assert!(altitude(1030.0, SEA_LEVEL_HPA) < 0.0);
    }

    #[test]
    fn non_positive_pressure_is_an_invalid_sample() {
        assert_eq!(
            try_altitude(0.0, SEA_LEVEL_HPA),
            Err(MeasureError::InvalidSample(0.0))
        );
        assert!(try_altitude(-3.0, SEA_LEVEL_HPA).is_err());
        assert!(try_altitude(f32::NAN, SEA_LEVEL_HPA).is_err());
        assert!(altitude(0.0, SEA_LEVEL_HPA).is_nan());
        assert!(altitude(-12.5, SEA_LEVEL_HPA).is_nan());
    }

    #[test]
    fn custom_reference_pressure_shifts_the_zero() {
        assert!(altitude(1000.0, 1000.0).abs() < 1e-3);
    }
}
