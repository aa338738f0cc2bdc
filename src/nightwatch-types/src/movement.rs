use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementSample {
    pub time: NaiveDateTime,
    pub magnitude: f64,
    pub is_significant: bool,
}

/// Ordered input of the sleep state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleEvent {
    Motion(MovementSample),
    Brightness { time: NaiveDateTime, value: f64 },
}

impl SampleEvent {
    pub fn time(&self) -> NaiveDateTime {
        match self {
            SampleEvent::Motion(sample) => sample.time,
            SampleEvent::Brightness { time, .. } => *time,
        }
    }
}
