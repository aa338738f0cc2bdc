use std::collections::VecDeque;

use chrono::{Duration, NaiveDateTime};
use nightwatch_types::MovementSample;

/// How long movement samples are kept around.
pub const RETENTION: Duration = Duration::hours(2);

/// Sliding log of recent movement samples, oldest first.
///
/// Every [`append`](Self::append) evicts what fell out of the retention
/// horizon relative to the appended sample, so the buffer never holds a
/// sample older than `newest - retention`.
#[derive(Debug, Clone)]
pub struct MovementBuffer {
    samples: VecDeque<MovementSample>,
    retention: Duration,
}

impl Default for MovementBuffer {
    fn default() -> Self {
        Self::new(RETENTION)
    }
}

impl MovementBuffer {
    pub fn new(retention: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            retention,
        }
    }

    pub fn append(&mut self, sample: MovementSample) {
        self.samples.push_back(sample);
        self.evict(sample.time);
    }

    fn evict(&mut self, now: NaiveDateTime) {
        let horizon = now - self.retention;
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.time < horizon)
        {
            self.samples.pop_front();
        }
    }

    /// Samples newer than `now - duration`.
    pub fn window_since(
        &self,
        now: NaiveDateTime,
        duration: Duration,
    ) -> impl Iterator<Item = &MovementSample> {
        let from = now - duration;
        self.samples.iter().filter(move |s| s.time > from)
    }

    /// Samples with `start <= time <= end`.
    pub fn between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> impl Iterator<Item = &MovementSample> {
        self.samples
            .iter()
            .filter(move |s| s.time >= start && s.time <= end)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap()
    }

    fn sample(minutes: i64, is_significant: bool) -> MovementSample {
        MovementSample {
            time: base() + Duration::minutes(minutes),
            magnitude: if is_significant { 1.2 } else { 0.1 },
            is_significant,
        }
    }

    #[test]
    fn evicts_samples_older_than_retention() {
        let mut buffer = MovementBuffer::default();
        for m in [0, 30, 60, 90, 119, 121, 150] {
            buffer.append(sample(m, false));
        }

        let newest = buffer.samples.back().unwrap().time;
        assert!(buffer.samples.front().unwrap().time >= newest - RETENTION);
        // horizon is 22:30 once the 00:30 sample arrives
        assert_eq!(buffer.samples.front().unwrap().time, base() + Duration::minutes(30));
        assert_eq!(buffer.samples.len(), 6);
    }

    #[test]
    fn never_retains_stale_sample_after_any_append() {
        let mut buffer = MovementBuffer::default();
        for m in (0..600).step_by(7) {
            buffer.append(sample(m, m % 3 == 0));
            let now = buffer.samples.back().unwrap().time;
            assert!(buffer.window_since(now, Duration::days(1)).all(|s| s.time >= now - RETENTION));
        }
    }

    #[test]
    fn window_since_excludes_boundary() {
        let mut buffer = MovementBuffer::default();
        for m in [0, 5, 8, 10] {
            buffer.append(sample(m, true));
        }
        let now = base() + Duration::minutes(10);
        let recent = buffer.window_since(now, Duration::minutes(5)).count();
        assert_eq!(recent, 2);
    }

    #[test]
    fn between_is_inclusive() {
        let mut buffer = MovementBuffer::default();
        for m in [0, 5, 10, 15] {
            buffer.append(sample(m, true));
        }
        let found = buffer
            .between(base() + Duration::minutes(5), base() + Duration::minutes(10))
            .count();
        assert_eq!(found, 2);
    }

    #[test]
    fn clear_drops_everything() {
        let mut buffer = MovementBuffer::default();
        for m in [0, 5, 10] {
            buffer.append(sample(m, true));
        }
        buffer.clear();
        assert!(buffer.samples.is_empty());
        let now = base() + Duration::minutes(10);
        assert_eq!(buffer.window_since(now, Duration::minutes(10)).count(), 0);
    }

    #[test]
    fn empty_buffer() {
        let buffer = MovementBuffer::default();
        assert!(buffer.samples.is_empty());
        assert_eq!(buffer.window_since(base(), Duration::minutes(10)).count(), 0);
    }
}
