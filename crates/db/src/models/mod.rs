//! Row models for the linewatch schema.

pub mod event;
pub mod reading;
pub mod sensor;

pub use event::{AlertRow, AlertWithSensor};
pub use reading::{LatestReading, ReadingRow};
pub use sensor::{OperatingBoundsRow, Sensor};
