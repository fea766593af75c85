//! Query repositories, one per table group.

pub mod alert_repo;
pub mod reading_repo;
pub mod sensor_repo;

pub use alert_repo::AlertRepo;
pub use reading_repo::ReadingRepo;
pub use sensor_repo::SensorRepo;
