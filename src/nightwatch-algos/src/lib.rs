#[macro_use]
extern crate log;

pub(crate) mod buffer;
pub use buffer::{MovementBuffer, RETENTION};

pub(crate) mod significance;
pub use significance::{MOVEMENT_THRESHOLD, ParseModeError, SignificanceFilter, SignificanceMode};

pub(crate) mod detector;
pub use detector::{MonitoringState, SleepDetector, Transition};

pub(crate) mod quality;
pub use quality::{QualityReport, QualityScorer};

pub(crate) mod weekly;
pub use weekly::WeeklySummary;

pub mod helpers;
