#[macro_use]
extern crate log;

mod error;
pub use error::MonitorError;

pub mod ingest;
pub use ingest::{ChannelSource, SignalError, SignalIngestor, SignalSource};

pub mod store;
pub use store::SessionStore;

mod recorder;
pub use recorder::SessionRecorder;

mod monitor;
pub use monitor::SleepMonitor;

pub mod replay;

pub mod algo {
    pub use nightwatch_algos::*;
}

pub use nightwatch_db::DatabaseHandler;
pub use nightwatch_types as types;
