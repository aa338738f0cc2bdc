use std::{fmt::Display, str::FromStr};

use nightwatch_types::{AccelerationEvent, MovementSample};
use thiserror::Error;

/// Magnitude above which a sample counts as movement.
pub const MOVEMENT_THRESHOLD: f64 = 0.5;

/// Low-pass coefficient of the gravity estimate, tuned for ~50Hz sensors.
const GRAVITY_ALPHA: f64 = 0.02;

/// How a movement sample is judged significant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignificanceMode {
    /// `|a| > threshold` on the raw vector. A phone at rest reads ~9.8 m/s²,
    /// so nearly every sample is significant.
    RawMagnitude,
    /// Gravity is tracked with a low-pass filter and removed first, so only
    /// the linear acceleration is compared against the threshold.
    #[default]
    GravityCompensated,
}

#[derive(Debug, Error)]
#[error("unknown significance mode `{0}`, expected `raw` or `gravity`")]
pub struct ParseModeError(String);

impl FromStr for SignificanceMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" | "raw-magnitude" => Ok(Self::RawMagnitude),
            "gravity" | "gravity-compensated" => Ok(Self::GravityCompensated),
            _ => Err(ParseModeError(s.to_owned())),
        }
    }
}

impl Display for SignificanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignificanceMode::RawMagnitude => f.write_str("raw"),
            SignificanceMode::GravityCompensated => f.write_str("gravity"),
        }
    }
}

/// Turns acceleration events into movement samples.
#[derive(Debug, Clone)]
pub struct SignificanceFilter {
    mode: SignificanceMode,
    gravity: Option<[f64; 3]>,
}

impl SignificanceFilter {
    pub fn new(mode: SignificanceMode) -> Self {
        Self {
            mode,
            gravity: None,
        }
    }

    pub fn sample(&mut self, event: &AccelerationEvent) -> MovementSample {
        let magnitude = match self.mode {
            SignificanceMode::RawMagnitude => event.magnitude(),
            SignificanceMode::GravityCompensated => self.linear_magnitude(event),
        };

        MovementSample {
            time: event.time,
            magnitude,
            is_significant: magnitude > MOVEMENT_THRESHOLD,
        }
    }

    /// Magnitude of `a - g` where `g` is the running gravity estimate.
    ///
    /// The estimate is seeded with the first reading, which therefore reports
    /// no movement.
    fn linear_magnitude(&mut self, event: &AccelerationEvent) -> f64 {
        let accel = [event.x, event.y, event.z];
        let gravity = self.gravity.get_or_insert(accel);

        let linear = [
            accel[0] - gravity[0],
            accel[1] - gravity[1],
            accel[2] - gravity[2],
        ];

        for (g, a) in gravity.iter_mut().zip(accel) {
            *g = GRAVITY_ALPHA * a + (1.0 - GRAVITY_ALPHA) * *g;
        }

        (linear[0] * linear[0] + linear[1] * linear[1] + linear[2] * linear[2]).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(seconds: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
            + Duration::seconds(seconds)
    }

    fn resting(seconds: i64) -> AccelerationEvent {
        AccelerationEvent {
            time: at(seconds),
            x: 0.05,
            y: 0.02,
            z: 9.81,
        }
    }

    #[test]
    fn raw_magnitude_flags_resting_phone() {
        let mut filter = SignificanceFilter::new(SignificanceMode::RawMagnitude);
        let sample = filter.sample(&resting(0));
        assert!(sample.magnitude > 9.0);
        assert!(sample.is_significant);
    }

    #[test]
    fn gravity_compensated_ignores_resting_phone() {
        let mut filter = SignificanceFilter::new(SignificanceMode::GravityCompensated);
        for s in 0..200 {
            let sample = filter.sample(&resting(s));
            assert!(!sample.is_significant, "resting sample {s} flagged");
        }
    }

    #[test]
    fn gravity_compensated_flags_a_jolt() {
        let mut filter = SignificanceFilter::new(SignificanceMode::GravityCompensated);
        for s in 0..50 {
            filter.sample(&resting(s));
        }
        let jolt = AccelerationEvent {
            time: at(50),
            x: 2.0,
            y: -1.5,
            z: 11.0,
        };
        assert!(filter.sample(&jolt).is_significant);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("raw".parse::<SignificanceMode>().unwrap(), SignificanceMode::RawMagnitude);
        assert_eq!(
            "gravity".parse::<SignificanceMode>().unwrap(),
            SignificanceMode::GravityCompensated
        );
        assert!("delta".parse::<SignificanceMode>().is_err());
        assert_eq!(SignificanceMode::default().to_string(), "gravity");
    }
}
