use chrono::NaiveDateTime;
use futures::{future::join_all, stream::AbortHandle};
use nightwatch_algos::{
    MonitoringState, MovementBuffer, QualityScorer, SignificanceFilter, SignificanceMode,
    SleepDetector, Transition,
};
use nightwatch_types::{
    AccelerationEvent, BrightnessEvent, MovementSample, OpenSession, SampleEvent, SessionRecord,
    SleepSession,
};
use tokio::task::JoinHandle;

use crate::{MonitorError, SessionRecorder, SessionStore, SignalIngestor, SignalSource};

/// Sleep tracking for one user.
///
/// Owns the movement history, the detector state and the open manual session.
/// Automatic sessions are written in the background when the user wakes up,
/// manual sessions are written when they are stopped.
pub struct SleepMonitor<S> {
    user_id: String,
    mode: SignificanceMode,
    buffer: MovementBuffer,
    detector: SleepDetector,
    ingestor: Option<SignalIngestor>,
    manual: Option<OpenSession>,
    recorder: SessionRecorder<S>,
    pending: Vec<JoinHandle<()>>,
}

impl<S: SessionStore> SleepMonitor<S> {
    pub fn new(user_id: impl Into<String>, store: S, mode: SignificanceMode) -> Self {
        Self {
            user_id: user_id.into(),
            mode,
            buffer: MovementBuffer::default(),
            detector: SleepDetector::default(),
            ingestor: None,
            manual: None,
            recorder: SessionRecorder::new(store),
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> MonitoringState {
        self.detector.state()
    }

    pub fn manual_session(&self) -> Option<OpenSession> {
        self.manual
    }

    /// Subscribes to both sensors and leaves `Idle`.
    pub fn start_monitoring<M, L>(
        &mut self,
        motion: &mut M,
        light: &mut L,
    ) -> Result<(), MonitorError>
    where
        M: SignalSource<AccelerationEvent>,
        L: SignalSource<BrightnessEvent>,
    {
        if self.state() != MonitoringState::Idle {
            return Err(MonitorError::AlreadyMonitoring);
        }

        let ingestor = SignalIngestor::subscribe(motion, light, SignificanceFilter::new(self.mode))
            .inspect_err(|error| error!("cannot start monitoring: {}", error))?;
        self.attach(ingestor)
    }

    /// Starts monitoring from an already prepared ingestor.
    pub fn attach(&mut self, ingestor: SignalIngestor) -> Result<(), MonitorError> {
        if !self.detector.start() {
            ingestor.cancel();
            return Err(MonitorError::AlreadyMonitoring);
        }

        info!("monitoring sleep for {} ({} significance)", self.user_id, self.mode);
        self.ingestor = Some(ingestor);
        Ok(())
    }

    /// Handle that ends [`Self::run`] from outside, e.g. a signal handler.
    pub fn stop_handle(&self) -> Option<AbortHandle> {
        self.ingestor.as_ref().map(SignalIngestor::abort_handle)
    }

    /// Consumes samples until the subscription ends or is aborted, then stops
    /// monitoring. Returns the sessions finalized along the way.
    pub async fn run(&mut self) -> Vec<SleepSession> {
        let mut sessions = Vec::new();
        while let Some(event) = self.next_event().await {
            sessions.extend(self.handle_event(event));
        }

        if self.state() != MonitoringState::Idle {
            self.stop_monitoring();
        }
        sessions
    }

    async fn next_event(&mut self) -> Option<SampleEvent> {
        self.ingestor.as_mut()?.next().await
    }

    /// Feeds one sample through the detector. Returns the session finalized by
    /// a wake-up, whose write has been started in the background.
    ///
    /// Events arriving while `Idle` are ignored and never reach the buffer.
    ///
    /// # Panics
    ///
    /// A wake-up spawns the write with [`tokio::spawn`], so this must run
    /// inside a Tokio runtime once monitoring has started.
    pub fn handle_event(&mut self, event: SampleEvent) -> Option<SleepSession> {
        if self.state() == MonitoringState::Idle {
            trace!("ignoring event at {} while idle", event.time());
            return None;
        }

        if let SampleEvent::Motion(sample) = event {
            self.buffer.append(sample);
        }

        if self.manual.is_some() {
            if let SampleEvent::Brightness { value, .. } = event {
                self.detector.observe_brightness(value);
            }
            return None;
        }

        match self.detector.step(&self.buffer, &event)? {
            Transition::FellAsleep { at } => {
                info!("{} fell asleep at {}", self.user_id, at);
                None
            }
            Transition::WokeUp { since, at } => {
                let session = QualityScorer::finalize(
                    OpenSession::automatic(since),
                    at,
                    self.buffer.between(since, at),
                );
                info!(
                    "{} woke up at {} after sleeping since {}, quality {:.1}",
                    self.user_id,
                    at,
                    since,
                    session.quality()
                );

                self.pending.retain(|handle| !handle.is_finished());
                self.pending
                    .push(self.recorder.finalize_detached(&self.user_id, session));
                Some(session)
            }
        }
    }

    /// Unsubscribes and returns to `Idle`. An open automatic session is
    /// dropped unscored and its start returned. The movement history is
    /// cleared, so a later start begins from an empty buffer. Writes already
    /// started keep running and manual sessions stay open.
    pub fn stop_monitoring(&mut self) -> Option<NaiveDateTime> {
        if let Some(ingestor) = self.ingestor.take() {
            ingestor.cancel();
        }
        self.buffer.clear();

        let discarded = self.detector.stop();
        match discarded {
            Some(since) => info!(
                "monitoring stopped for {}, discarding sleep open since {}",
                self.user_id, since
            ),
            None => info!("monitoring stopped for {}", self.user_id),
        }
        discarded
    }

    pub fn start_manual_sleep(&mut self, at: NaiveDateTime) -> Result<(), MonitorError> {
        if self.manual.is_some() || self.detector.is_asleep() {
            return Err(MonitorError::SessionAlreadyOpen);
        }

        info!("{} started manual sleep at {}", self.user_id, at);
        self.manual = Some(OpenSession::manual(at));
        Ok(())
    }

    /// Closes the manual session at `at` and waits for it to be stored.
    pub async fn stop_manual_sleep(
        &mut self,
        at: NaiveDateTime,
    ) -> Result<SessionRecord, MonitorError> {
        let open = self.manual.ok_or(MonitorError::NoOpenSession)?;
        if at < open.sleep_start {
            return Err(MonitorError::EndsBeforeStart {
                start: open.sleep_start,
                end: at,
            });
        }
        self.manual = None;

        let session = QualityScorer::finalize(open, at, std::iter::empty::<&MovementSample>());
        info!(
            "{} stopped manual sleep at {}, quality {:.1}",
            self.user_id,
            at,
            session.quality()
        );
        self.recorder.finalize(&self.user_id, &session).await
    }

    /// Waits for every background write started so far.
    pub async fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for result in join_all(pending).await {
            if let Err(error) = result {
                error!("session write task failed: {}", error);
            }
        }
    }
}
