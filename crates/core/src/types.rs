/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// User id recorded on alert events raised by the pipeline itself.
pub const SYSTEM_USER_ID: DbId = 1;
