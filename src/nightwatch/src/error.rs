use chrono::NaiveDateTime;
use thiserror::Error;

use crate::SignalError;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("signal source unavailable: {0}")]
    SignalUnavailable(#[from] SignalError),
    #[error("monitoring is already running")]
    AlreadyMonitoring,
    #[error("a sleep session is already open")]
    SessionAlreadyOpen,
    #[error("no manual sleep session is open")]
    NoOpenSession,
    #[error("sleep cannot end at {end}, before it started at {start}")]
    EndsBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("failed to store sleep session: {0}")]
    Persist(#[source] anyhow::Error),
}
