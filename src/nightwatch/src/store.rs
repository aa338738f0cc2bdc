use std::future::Future;

use chrono::NaiveDate;
use nightwatch_db::DatabaseHandler;
use nightwatch_types::SessionRecord;

/// Keyed storage for one session record per user and day.
pub trait SessionStore: Clone + Send + Sync + 'static {
    /// Replaces whatever was stored for `(user_id, date)`.
    fn write(
        &self,
        user_id: &str,
        date: NaiveDate,
        record: &SessionRecord,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn read(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> impl Future<Output = anyhow::Result<Option<SessionRecord>>> + Send;
}

impl SessionStore for DatabaseHandler {
    async fn write(
        &self,
        user_id: &str,
        date: NaiveDate,
        record: &SessionRecord,
    ) -> anyhow::Result<()> {
        let record = SessionRecord { date, ..*record };
        self.upsert_sleep_session(user_id, &record).await
    }

    async fn read(&self, user_id: &str, date: NaiveDate) -> anyhow::Result<Option<SessionRecord>> {
        self.get_sleep_session(user_id, date).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::HashMap,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use anyhow::anyhow;

    use super::*;

    #[derive(Clone, Default)]
    pub struct MemoryStore {
        records: Arc<Mutex<HashMap<(String, NaiveDate), SessionRecord>>>,
        writes: Arc<AtomicUsize>,
    }

    impl MemoryStore {
        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn get(&self, user_id: &str, date: NaiveDate) -> Option<SessionRecord> {
            let records = self.records.lock().unwrap();
            records.get(&(user_id.to_owned(), date)).copied()
        }
    }

    impl SessionStore for MemoryStore {
        async fn write(
            &self,
            user_id: &str,
            date: NaiveDate,
            record: &SessionRecord,
        ) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut records = self.records.lock().unwrap();
            records.insert((user_id.to_owned(), date), *record);
            Ok(())
        }

        async fn read(
            &self,
            user_id: &str,
            date: NaiveDate,
        ) -> anyhow::Result<Option<SessionRecord>> {
            Ok(self.get(user_id, date))
        }
    }

    /// Every call fails, counting the attempted writes.
    #[derive(Clone, Default)]
    pub struct FailingStore {
        writes: Arc<AtomicUsize>,
    }

    impl FailingStore {
        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl SessionStore for FailingStore {
        async fn write(
            &self,
            _user_id: &str,
            _date: NaiveDate,
            _record: &SessionRecord,
        ) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("store offline"))
        }

        async fn read(
            &self,
            _user_id: &str,
            _date: NaiveDate,
        ) -> anyhow::Result<Option<SessionRecord>> {
            Err(anyhow!("store offline"))
        }
    }
}
