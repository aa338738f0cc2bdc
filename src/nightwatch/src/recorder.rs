use chrono::{Local, NaiveDate, TimeDelta};
use futures::future::join_all;
use nightwatch_types::{SessionRecord, SleepSession};
use tokio::task::JoinHandle;

use crate::{MonitorError, SessionStore};

/// Writes finalized sessions to a [`SessionStore`] and reads them back.
#[derive(Clone)]
pub struct SessionRecorder<S> {
    store: S,
}

impl<S: SessionStore> SessionRecorder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stores `session` under the day it ended. A single attempt is made.
    pub async fn finalize(
        &self,
        user_id: &str,
        session: &SleepSession,
    ) -> Result<SessionRecord, MonitorError> {
        let record = SessionRecord::from_session(session, Local::now().naive_local());

        match self.store.write(user_id, record.date, &record).await {
            Ok(()) => {
                info!(
                    "recorded sleep for {} on {}: {:.2}h, quality {:.1}",
                    user_id, record.date, record.duration, record.quality
                );
                Ok(record)
            }
            Err(error) => {
                error!(
                    "failed to record sleep for {} on {}: {}",
                    user_id, record.date, error
                );
                Err(MonitorError::Persist(error))
            }
        }
    }

    /// Stores `session` on a background task. The outcome is only logged.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn finalize_detached(&self, user_id: &str, session: SleepSession) -> JoinHandle<()> {
        let recorder = self.clone();
        let user_id = user_id.to_owned();

        tokio::spawn(async move {
            let _ = recorder.finalize(&user_id, &session).await;
        })
    }

    pub async fn get_session(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Option<SessionRecord>> {
        self.store.read(user_id, date).await
    }

    /// The seven days ending at `ending`, oldest first. Days without a record,
    /// or whose read failed, come back as [`SessionRecord::empty`].
    pub async fn get_weekly_sessions(&self, user_id: &str, ending: NaiveDate) -> Vec<SessionRecord> {
        let days = (0..7)
            .rev()
            .map(|offset| ending - TimeDelta::days(offset))
            .collect::<Vec<_>>();

        let reads = days.iter().map(|&date| async move {
            let read = self.store.read(user_id, date).await;
            (date, read)
        });

        join_all(reads)
            .await
            .into_iter()
            .map(|(date, read)| match read {
                Ok(Some(record)) => record,
                Ok(None) => SessionRecord::empty(date),
                Err(error) => {
                    warn!("failed to read sleep for {} on {}: {}", user_id, date, error);
                    SessionRecord::empty(date)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{FailingStore, MemoryStore};
    use chrono::{Duration, NaiveDateTime};
    use nightwatch_types::OpenSession;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn night(day: u32) -> SleepSession {
        OpenSession::automatic(at(day, 23)).finish(at(day, 23) + Duration::hours(8), 93.7, 10, 2)
    }

    #[tokio::test]
    async fn finalize_stores_under_wake_day() {
        let store = MemoryStore::default();
        let recorder = SessionRecorder::new(store.clone());

        let record = recorder.finalize("alice", &night(1)).await.unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert_eq!(record.date, date);
        assert_eq!(record.duration, 8.0);
        assert_eq!(record.total_movements, 10);
        assert_eq!(store.get("alice", date), Some(record));
    }

    #[tokio::test]
    async fn finalize_reports_store_failure() {
        let store = FailingStore::default();
        let recorder = SessionRecorder::new(store.clone());

        let result = recorder.finalize("alice", &night(1)).await;
        assert!(matches!(result, Err(MonitorError::Persist(_))));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn detached_finalize_completes() {
        let store = MemoryStore::default();
        let recorder = SessionRecorder::new(store.clone());

        recorder.finalize_detached("alice", night(1)).await.unwrap();
        assert_eq!(store.writes(), 1);

        // failures are swallowed
        let failing = SessionRecorder::new(FailingStore::default());
        failing.finalize_detached("alice", night(1)).await.unwrap();
    }

    #[test]
    #[should_panic]
    fn detached_finalize_needs_runtime() {
        let recorder = SessionRecorder::new(MemoryStore::default());
        let _ = recorder.finalize_detached("alice", night(1));
    }

    #[tokio::test]
    async fn week_fills_missing_days() {
        let store = MemoryStore::default();
        let recorder = SessionRecorder::new(store);
        recorder.finalize("alice", &night(3)).await.unwrap();
        recorder.finalize("alice", &night(5)).await.unwrap();
        recorder.finalize("bob", &night(6)).await.unwrap();

        let ending = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let week = recorder.get_weekly_sessions("alice", ending).await;

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(week[6].date, ending);

        let recorded = week
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| r.date)
            .collect::<Vec<_>>();
        assert_eq!(
            recorded,
            [
                NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn week_survives_read_failures() {
        let recorder = SessionRecorder::new(FailingStore::default());
        let ending = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();

        let week = recorder.get_weekly_sessions("alice", ending).await;
        assert_eq!(week.len(), 7);
        assert!(week.iter().all(SessionRecord::is_empty));
    }
}
