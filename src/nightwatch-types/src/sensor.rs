use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One reading from the 3-axis accelerometer, in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationEvent {
    pub time: NaiveDateTime,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Normalized ambient brightness, `0.0` (dark) to `1.0` (bright).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrightnessEvent {
    pub time: NaiveDateTime,
    pub value: f64,
}

/// A raw event as delivered by one of the signal sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorEvent {
    Acceleration(AccelerationEvent),
    Brightness(BrightnessEvent),
}

#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("acceleration axis is not finite: ({x}, {y}, {z})")]
    NonFiniteAxis { x: f64, y: f64, z: f64 },
    #[error("brightness {0} is outside 0.0..=1.0")]
    BrightnessOutOfRange(f64),
    #[error("sample at {time} is older than the previous sample at {previous}")]
    OutOfOrder {
        time: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

impl AccelerationEvent {
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl SensorEvent {
    pub fn time(&self) -> NaiveDateTime {
        match self {
            SensorEvent::Acceleration(a) => a.time,
            SensorEvent::Brightness(b) => b.time,
        }
    }

    /// Rejects readings the classifier cannot reason about.
    pub fn validate(&self) -> Result<(), SampleError> {
        match *self {
            SensorEvent::Acceleration(AccelerationEvent { x, y, z, .. }) => {
                if x.is_finite() && y.is_finite() && z.is_finite() {
                    Ok(())
                } else {
                    Err(SampleError::NonFiniteAxis { x, y, z })
                }
            }
            SensorEvent::Brightness(BrightnessEvent { value, .. }) => {
                if (0.0..=1.0).contains(&value) {
                    Ok(())
                } else {
                    Err(SampleError::BrightnessOutOfRange(value))
                }
            }
        }
    }
}

impl From<AccelerationEvent> for SensorEvent {
    fn from(value: AccelerationEvent) -> Self {
        SensorEvent::Acceleration(value)
    }
}

impl From<BrightnessEvent> for SensorEvent {
    fn from(value: BrightnessEvent) -> Self {
        SensorEvent::Brightness(value)
    }
}
