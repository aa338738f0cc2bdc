use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

/// A sleep session whose end is not known yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenSession {
    pub sleep_start: NaiveDateTime,
    pub is_manual: bool,
}

/// A finalized sleep session.
///
/// Only obtainable through [`OpenSession::finish`]; the score is fixed at that
/// point and there is no way to change it afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepSession {
    sleep_start: NaiveDateTime,
    sleep_end: NaiveDateTime,
    quality: f64,
    total_movements: u32,
    restless_periods: u32,
    is_manual: bool,
}

impl OpenSession {
    pub fn automatic(sleep_start: NaiveDateTime) -> Self {
        Self {
            sleep_start,
            is_manual: false,
        }
    }

    pub fn manual(sleep_start: NaiveDateTime) -> Self {
        Self {
            sleep_start,
            is_manual: true,
        }
    }

    pub fn finish(
        self,
        sleep_end: NaiveDateTime,
        quality: f64,
        total_movements: u32,
        restless_periods: u32,
    ) -> SleepSession {
        SleepSession {
            sleep_start: self.sleep_start,
            sleep_end,
            quality,
            total_movements,
            restless_periods,
            is_manual: self.is_manual,
        }
    }
}

impl SleepSession {
    pub fn sleep_start(&self) -> NaiveDateTime {
        self.sleep_start
    }

    pub fn sleep_end(&self) -> NaiveDateTime {
        self.sleep_end
    }

    pub fn duration(&self) -> TimeDelta {
        self.sleep_end - self.sleep_start
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration().num_seconds() as f64 / 3600.0
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn total_movements(&self) -> u32 {
        self.total_movements
    }

    pub fn restless_periods(&self) -> u32 {
        self.restless_periods
    }

    pub fn is_manual(&self) -> bool {
        self.is_manual
    }

    /// Calendar day the session is filed under: the day the sleeper woke up.
    pub fn date(&self) -> NaiveDate {
        self.sleep_end.date()
    }
}

/// Stored form of a session, one per user and calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub sleep_start: NaiveDateTime,
    pub sleep_end: NaiveDateTime,
    /// Hours.
    pub duration: f64,
    pub quality: f64,
    pub total_movements: u32,
    pub restless_periods: u32,
    pub is_manual: bool,
    pub date: NaiveDate,
    pub updated_at: NaiveDateTime,
}

impl SessionRecord {
    pub fn from_session(session: &SleepSession, updated_at: NaiveDateTime) -> Self {
        Self {
            sleep_start: session.sleep_start(),
            sleep_end: session.sleep_end(),
            duration: session.duration_hours(),
            quality: session.quality(),
            total_movements: session.total_movements(),
            restless_periods: session.restless_periods(),
            is_manual: session.is_manual(),
            date: session.date(),
            updated_at,
        }
    }

    /// Zeroed stand-in for a day without data.
    pub fn empty(date: NaiveDate) -> Self {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        Self {
            sleep_start: midnight,
            sleep_end: midnight,
            duration: 0.0,
            quality: 0.0,
            total_movements: 0,
            restless_periods: 0,
            is_manual: false,
            date,
            updated_at: midnight,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sleep_end <= self.sleep_start
    }

    pub fn sleep_duration(&self) -> TimeDelta {
        self.sleep_end - self.sleep_start
    }
}
