use chrono::NaiveDateTime;
use futures::{
    StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    stream::{self, AbortHandle, Abortable, BoxStream},
};
use nightwatch_algos::SignificanceFilter;
use nightwatch_types::{AccelerationEvent, BrightnessEvent, SampleError, SampleEvent, SensorEvent};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("{0}")]
    Unavailable(String),
    #[error("source was already subscribed")]
    AlreadySubscribed,
}

/// A sensor that can be subscribed to once.
pub trait SignalSource<T> {
    fn subscribe(&mut self) -> Result<BoxStream<'static, T>, SignalError>;
}

/// In-process source fed through an unbounded channel.
pub struct ChannelSource<T> {
    receiver: Option<UnboundedReceiver<T>>,
    unavailable: Option<String>,
}

impl<T> ChannelSource<T> {
    pub fn new() -> (UnboundedSender<T>, Self) {
        let (sender, receiver) = mpsc::unbounded();
        let source = Self {
            receiver: Some(receiver),
            unavailable: None,
        };
        (sender, source)
    }

    /// A source whose subscription always fails, for a missing or denied sensor.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            receiver: None,
            unavailable: Some(reason.into()),
        }
    }
}

impl<T: Send + 'static> SignalSource<T> for ChannelSource<T> {
    fn subscribe(&mut self) -> Result<BoxStream<'static, T>, SignalError> {
        if let Some(reason) = &self.unavailable {
            return Err(SignalError::Unavailable(reason.clone()));
        }

        self.receiver
            .take()
            .map(|receiver| receiver.boxed())
            .ok_or(SignalError::AlreadySubscribed)
    }
}

/// Turns raw sensor events into the ordered [`SampleEvent`] stream consumed by
/// the detector.
pub struct SignalIngestor {
    events: Abortable<BoxStream<'static, SensorEvent>>,
    abort: AbortHandle,
    filter: SignificanceFilter,
    last_motion: Option<NaiveDateTime>,
}

impl SignalIngestor {
    /// Subscribes to both sources and merges them. Fails without producing
    /// anything if either source cannot be subscribed.
    pub fn subscribe<M, L>(
        motion: &mut M,
        light: &mut L,
        filter: SignificanceFilter,
    ) -> Result<Self, SignalError>
    where
        M: SignalSource<AccelerationEvent>,
        L: SignalSource<BrightnessEvent>,
    {
        let motion = motion.subscribe()?.map(SensorEvent::from);
        let light = light.subscribe()?.map(SensorEvent::from);

        Ok(Self::from_stream(
            stream::select(motion, light).boxed(),
            filter,
        ))
    }

    /// Ingests a stream that is already in event order, such as a recording.
    pub fn from_stream(
        events: BoxStream<'static, SensorEvent>,
        filter: SignificanceFilter,
    ) -> Self {
        let (abort, registration) = AbortHandle::new_pair();
        Self {
            events: Abortable::new(events, registration),
            abort,
            filter,
            last_motion: None,
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Unsubscribes. The next call to [`Self::next`] returns `None`.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    /// Next valid sample. Invalid samples are logged and skipped.
    pub async fn next(&mut self) -> Option<SampleEvent> {
        while let Some(event) = self.events.next().await {
            match self.ingest(event) {
                Ok(sample) => return Some(sample),
                Err(error) => warn!("dropping sensor event: {}", error),
            }
        }
        None
    }

    pub fn ingest(&mut self, event: SensorEvent) -> Result<SampleEvent, SampleError> {
        event.validate()?;

        match event {
            SensorEvent::Acceleration(acceleration) => {
                if let Some(previous) = self.last_motion.filter(|p| acceleration.time < *p) {
                    return Err(SampleError::OutOfOrder {
                        time: acceleration.time,
                        previous,
                    });
                }
                self.last_motion = Some(acceleration.time);

                let sample = self.filter.sample(&acceleration);
                trace!(
                    "motion at {}: magnitude {:.3}, significant {}",
                    sample.time, sample.magnitude, sample.is_significant
                );
                Ok(SampleEvent::Motion(sample))
            }
            SensorEvent::Brightness(BrightnessEvent { time, value }) => {
                Ok(SampleEvent::Brightness { time, value })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use nightwatch_algos::SignificanceMode;

    fn at(seconds: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
            + Duration::seconds(seconds)
    }

    fn accel(seconds: i64, x: f64, y: f64, z: f64) -> AccelerationEvent {
        AccelerationEvent {
            time: at(seconds),
            x,
            y,
            z,
        }
    }

    fn raw() -> SignificanceFilter {
        SignificanceFilter::new(SignificanceMode::RawMagnitude)
    }

    #[test]
    fn raw_mode_uses_total_magnitude() {
        let mut ingestor = SignalIngestor::from_stream(stream::empty().boxed(), raw());

        let Ok(SampleEvent::Motion(sample)) = ingestor.ingest(accel(0, 0.0, 0.0, 0.4).into())
        else {
            panic!("expected a motion sample");
        };
        assert!((sample.magnitude - 0.4).abs() < 1e-12);
        assert!(!sample.is_significant);

        let Ok(SampleEvent::Motion(sample)) = ingestor.ingest(accel(1, 0.0, 0.0, 9.81).into())
        else {
            panic!("expected a motion sample");
        };
        assert!(sample.is_significant);
    }

    #[test]
    fn rejects_out_of_order_motion() {
        let mut ingestor = SignalIngestor::from_stream(stream::empty().boxed(), raw());
        ingestor.ingest(accel(10, 0.0, 0.0, 0.0).into()).unwrap();

        assert_eq!(
            ingestor.ingest(accel(5, 0.0, 0.0, 0.0).into()),
            Err(SampleError::OutOfOrder {
                time: at(5),
                previous: at(10),
            })
        );
        // equal timestamps are fine
        assert!(ingestor.ingest(accel(10, 0.0, 0.0, 0.0).into()).is_ok());
    }

    #[test]
    fn channel_source_subscribes_once() {
        let (_sender, mut source) = ChannelSource::<BrightnessEvent>::new();
        assert!(source.subscribe().is_ok());
        assert_eq!(source.subscribe().err(), Some(SignalError::AlreadySubscribed));
    }

    #[test]
    fn unavailable_source_fails_subscription() {
        let (_sender, mut motion) = ChannelSource::<AccelerationEvent>::new();
        let mut light = ChannelSource::<BrightnessEvent>::unavailable("no light sensor");

        let result = SignalIngestor::subscribe(&mut motion, &mut light, raw());
        assert_eq!(
            result.err(),
            Some(SignalError::Unavailable("no light sensor".to_string()))
        );
    }

    #[tokio::test]
    async fn merges_sources_and_skips_invalid_samples() {
        let (motion_tx, mut motion) = ChannelSource::new();
        let (light_tx, mut light) = ChannelSource::new();
        let mut ingestor = SignalIngestor::subscribe(&mut motion, &mut light, raw()).unwrap();

        motion_tx
            .unbounded_send(accel(0, f64::NAN, 0.0, 0.0))
            .unwrap();
        motion_tx.unbounded_send(accel(1, 1.0, 0.0, 0.0)).unwrap();
        light_tx
            .unbounded_send(BrightnessEvent {
                time: at(2),
                value: 1.5,
            })
            .unwrap();
        light_tx
            .unbounded_send(BrightnessEvent {
                time: at(3),
                value: 0.05,
            })
            .unwrap();
        drop(motion_tx);
        drop(light_tx);

        let mut events = Vec::new();
        while let Some(event) = ingestor.next().await {
            events.push(event);
        }

        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| matches!(e, SampleEvent::Motion(s) if s.time == at(1))));
        assert!(events.contains(&SampleEvent::Brightness {
            time: at(3),
            value: 0.05
        }));
    }

    #[tokio::test]
    async fn cancel_ends_the_stream() {
        let (motion_tx, mut motion) = ChannelSource::new();
        let (_light_tx, mut light) = ChannelSource::<BrightnessEvent>::new();
        let mut ingestor = SignalIngestor::subscribe(&mut motion, &mut light, raw()).unwrap();

        motion_tx.unbounded_send(accel(0, 0.0, 0.0, 0.0)).unwrap();
        ingestor.cancel();

        assert!(ingestor.abort.is_aborted());
        assert!(ingestor.next().await.is_none());
    }
}
