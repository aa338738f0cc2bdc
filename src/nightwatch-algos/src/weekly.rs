use std::fmt::Display;

use chrono::{NaiveDate, TimeDelta};
use nightwatch_types::SessionRecord;

use crate::helpers::format_hm::FormatHM;

/// Rollup of the seven daily records returned by the weekly read.
#[derive(Debug, Clone, Default)]
pub struct WeeklySummary {
    pub days: Vec<SessionRecord>,
    pub nights_recorded: usize,
    pub mean_duration: TimeDelta,
    pub mean_quality: f64,
    pub restless_periods: u32,
    pub best_night: Option<NaiveDate>,
}

impl WeeklySummary {
    pub fn new(days: Vec<SessionRecord>) -> Self {
        let recorded = days.iter().filter(|d| !d.is_empty()).collect::<Vec<_>>();
        if recorded.is_empty() {
            return Self {
                days,
                ..Default::default()
            };
        }

        let nights = recorded.len() as i64;
        let total_seconds = recorded
            .iter()
            .map(|d| d.sleep_duration().num_seconds())
            .sum::<i64>();
        let mean_quality = recorded.iter().map(|d| d.quality).sum::<f64>() / nights as f64;

        let best_night = recorded
            .iter()
            .max_by(|a, b| a.quality.total_cmp(&b.quality))
            .map(|d| d.date);

        Self {
            nights_recorded: recorded.len(),
            mean_duration: TimeDelta::seconds(total_seconds / nights),
            mean_quality: (mean_quality * 100.0).round() / 100.0,
            restless_periods: recorded.iter().map(|d| d.restless_periods).sum(),
            best_night,
            days,
        }
    }
}

impl Display for WeeklySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for day in &self.days {
            if day.is_empty() {
                writeln!(f, "{}  no data", day.date)?;
            } else {
                writeln!(
                    f,
                    "{}  {} -> {}  {}  quality {:.1}{}",
                    day.date,
                    day.sleep_start.format("%H:%M"),
                    day.sleep_end.format("%H:%M"),
                    day.sleep_duration().format_hm(),
                    day.quality,
                    if day.is_manual { " (manual)" } else { "" },
                )?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Nights recorded: {}/{}", self.nights_recorded, self.days.len())?;
        writeln!(f, "Mean duration: {}", self.mean_duration.format_hm())?;
        writeln!(f, "Mean quality: {}", self.mean_quality)?;
        writeln!(f, "Restless periods: {}", self.restless_periods)?;
        if let Some(best) = self.best_night {
            writeln!(f, "Best night: {}", best)?;
        }
        Ok(())
    }
}
