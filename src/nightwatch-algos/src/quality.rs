use chrono::{Duration, NaiveDateTime, TimeDelta};
use nightwatch_types::{MovementSample, OpenSession, SleepSession};

/// Sessions shorter than this score zero.
const MIN_SCORED_DURATION: Duration = Duration::minutes(30);
/// Significant movements this far apart or more start a new restless period.
const RESTLESS_GAP: Duration = Duration::minutes(5);
const IDEAL_MINUTES: f64 = 480.0;

const MOVEMENT_PENALTY: f64 = 0.5;
const RESTLESS_PENALTY: f64 = 2.0;
const MOVEMENT_WEIGHT: f64 = 0.7;
const DURATION_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityReport {
    pub duration: TimeDelta,
    pub quality: f64,
    pub total_movements: u32,
    pub restless_periods: u32,
}

pub struct QualityScorer;

impl QualityScorer {
    /// Scores the `[start, end]` interval from the movement samples inside it.
    ///
    /// Every sample in the interval counts as a movement, significant or not.
    /// Samples outside the interval are ignored, so the whole buffer can be
    /// handed in.
    pub fn score<'a, I>(start: NaiveDateTime, end: NaiveDateTime, samples: I) -> QualityReport
    where
        I: IntoIterator<Item = &'a MovementSample>,
    {
        let inside = samples
            .into_iter()
            .filter(|s| s.time >= start && s.time <= end)
            .copied()
            .collect::<Vec<_>>();

        let total_movements = inside.len().try_into().unwrap_or(u32::MAX);
        let restless_periods = Self::count_clusters(&inside);
        let duration = end - start;

        QualityReport {
            duration,
            quality: Self::quality(duration, total_movements, restless_periods),
            total_movements,
            restless_periods,
        }
    }

    /// Closes `session` at `end`, scoring it exactly once.
    ///
    /// Manual sessions do not rely on the classifier and are scored as if no
    /// movement happened.
    pub fn finalize<'a, I>(session: OpenSession, end: NaiveDateTime, samples: I) -> SleepSession
    where
        I: IntoIterator<Item = &'a MovementSample>,
    {
        let report = if session.is_manual {
            Self::score(session.sleep_start, end, std::iter::empty::<&MovementSample>())
        } else {
            Self::score(session.sleep_start, end, samples)
        };

        session.finish(
            end,
            report.quality,
            report.total_movements,
            report.restless_periods,
        )
    }

    pub fn quality(duration: TimeDelta, total_movements: u32, restless_periods: u32) -> f64 {
        if duration < MIN_SCORED_DURATION {
            return 0.0;
        }

        let minutes = duration.num_seconds() as f64 / 60.0;
        let movement_score = f64::max(
            0.0,
            100.0
                - f64::from(total_movements) * MOVEMENT_PENALTY
                - f64::from(restless_periods) * RESTLESS_PENALTY,
        );
        let duration_score = f64::min(100.0, minutes / IDEAL_MINUTES * 100.0);

        (movement_score * MOVEMENT_WEIGHT + duration_score * DURATION_WEIGHT).clamp(0.0, 100.0)
    }

    /// Counts bursts of significant movement in ascending `samples`.
    ///
    /// A significant sample opens a new cluster unless the sample right before
    /// it was also significant and less than [`RESTLESS_GAP`] earlier.
    pub fn count_clusters(samples: &[MovementSample]) -> u32 {
        let mut clusters = 0;
        let mut previous: Option<&MovementSample> = None;
        for sample in samples {
            if sample.is_significant {
                let continues = previous
                    .is_some_and(|p| p.is_significant && sample.time - p.time < RESTLESS_GAP);
                if !continues {
                    clusters += 1;
                }
            }
            previous = Some(sample);
        }
        clusters
    }
}
