pub mod sensor;
pub use sensor::{AccelerationEvent, BrightnessEvent, SampleError, SensorEvent};

pub mod movement;
pub use movement::{MovementSample, SampleEvent};

pub mod session;
pub use session::{OpenSession, SessionRecord, SleepSession};
