use chrono::{Duration, NaiveDateTime};
use nightwatch_types::{MovementSample, SampleEvent};

use crate::MovementBuffer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DetectorConfig {
    /// Stillness window looked at before declaring sleep.
    pub onset_window: Duration,
    /// Sleep requires fewer significant movements than this in `onset_window`.
    pub onset_max_movements: usize,
    /// Sleep requires brightness strictly below this.
    pub onset_max_brightness: f64,
    /// Movement window looked at while asleep.
    pub wake_window: Duration,
    /// More significant movements than this in `wake_window` means awake.
    pub wake_max_movements: usize,
    /// Brightness strictly above this means awake.
    pub wake_min_brightness: f64,
    /// While asleep, a brightness update above this triggers a wake check.
    pub wake_check_brightness: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            onset_window: Duration::minutes(10),
            onset_max_movements: 2,
            onset_max_brightness: 0.1,
            wake_window: Duration::minutes(5),
            wake_max_movements: 3,
            wake_min_brightness: 0.3,
            wake_check_brightness: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum MonitoringState {
    #[default]
    Idle,
    Monitoring,
    Asleep {
        since: NaiveDateTime,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    FellAsleep {
        at: NaiveDateTime,
    },
    WokeUp {
        since: NaiveDateTime,
        at: NaiveDateTime,
    },
}

/// Decides whether the user is asleep from the movement buffer and the last
/// brightness reading.
#[derive(Debug, Clone, Default)]
pub struct SleepDetector {
    config: DetectorConfig,
    state: MonitoringState,
    brightness: Option<f64>,
}

impl SleepDetector {
    pub fn state(&self) -> MonitoringState {
        self.state
    }

    /// Last brightness reading, `None` until the light source reported once.
    ///
    /// Onset is never evaluated while this is `None`, so a light source that
    /// stays silent keeps the detector in `Monitoring` however still the
    /// user is.
    pub fn brightness(&self) -> Option<f64> {
        self.brightness
    }

    pub fn is_asleep(&self) -> bool {
        matches!(self.state, MonitoringState::Asleep { .. })
    }

    /// Leaves `Idle`. Returns `false` if monitoring was already running.
    pub fn start(&mut self) -> bool {
        if self.state != MonitoringState::Idle {
            return false;
        }
        self.state = MonitoringState::Monitoring;
        true
    }

    /// Returns to `Idle` from any state. An open sleep is dropped and its
    /// start handed back so the caller can report what was discarded.
    pub fn stop(&mut self) -> Option<NaiveDateTime> {
        let discarded = match self.state {
            MonitoringState::Asleep { since } => Some(since),
            _ => None,
        };
        self.state = MonitoringState::Idle;
        self.brightness = None;
        discarded
    }

    /// Records a brightness reading without evaluating any transition.
    pub fn observe_brightness(&mut self, value: f64) {
        self.brightness = Some(value);
    }

    /// Advances the state machine by one event. `buffer` must already contain
    /// the sample carried by a `Motion` event.
    pub fn step(&mut self, buffer: &MovementBuffer, event: &SampleEvent) -> Option<Transition> {
        let now = event.time();

        let evaluate = match *event {
            SampleEvent::Motion(_) => true,
            SampleEvent::Brightness { value, .. } => {
                self.observe_brightness(value);
                self.is_asleep() && value > self.config.wake_check_brightness
            }
        };

        if !evaluate {
            return None;
        }

        match self.state {
            MonitoringState::Idle => None,
            MonitoringState::Monitoring => self.check_onset(buffer, now),
            MonitoringState::Asleep { since } => self.check_wake(buffer, since, now),
        }
    }

    fn check_onset(&mut self, buffer: &MovementBuffer, now: NaiveDateTime) -> Option<Transition> {
        let brightness = self.brightness?;
        if brightness >= self.config.onset_max_brightness {
            return None;
        }

        let movements = count_significant(buffer.window_since(now, self.config.onset_window));
        trace!("onset check at {now}: brightness {brightness}, {movements} movements");

        if movements < self.config.onset_max_movements {
            self.state = MonitoringState::Asleep { since: now };
            Some(Transition::FellAsleep { at: now })
        } else {
            None
        }
    }

    fn check_wake(
        &mut self,
        buffer: &MovementBuffer,
        since: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Option<Transition> {
        let movements = count_significant(buffer.window_since(now, self.config.wake_window));
        let bright = self
            .brightness
            .is_some_and(|b| b > self.config.wake_min_brightness);
        trace!("wake check at {now}: bright {bright}, {movements} movements");

        if movements > self.config.wake_max_movements || bright {
            self.state = MonitoringState::Monitoring;
            Some(Transition::WokeUp { since, at: now })
        } else {
            None
        }
    }
}

fn count_significant<'a>(samples: impl Iterator<Item = &'a MovementSample>) -> usize {
    samples.filter(|s| s.is_significant).count()
}
