use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::Context;
use chrono::NaiveDateTime;
use nightwatch_types::{AccelerationEvent, BrightnessEvent, SensorEvent};
use serde::Deserialize;

/// Reads a recording: one JSON [`SensorEvent`] per line, blank lines ignored.
pub fn read_recording(path: impl AsRef<Path>) -> anyhow::Result<Vec<SensorEvent>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_recording(BufReader::new(file))
}

pub fn parse_recording(reader: impl BufRead) -> anyhow::Result<Vec<SensorEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = serde_json::from_str(line)
            .with_context(|| format!("invalid sensor event on line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

/// A reading typed live, where the timestamp may be left out.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LiveReading {
    Acceleration {
        time: Option<NaiveDateTime>,
        x: f64,
        y: f64,
        z: f64,
    },
    Brightness {
        time: Option<NaiveDateTime>,
        value: f64,
    },
}

impl LiveReading {
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(line)?))
    }

    /// Stamps readings without a time with `now`.
    pub fn into_event(self, now: NaiveDateTime) -> SensorEvent {
        match self {
            LiveReading::Acceleration { time, x, y, z } => AccelerationEvent {
                time: time.unwrap_or(now),
                x,
                y,
                z,
            }
            .into(),
            LiveReading::Brightness { time, value } => BrightnessEvent {
                time: time.unwrap_or(now),
                value,
            }
            .into(),
        }
    }
}
