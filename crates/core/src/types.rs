/// User ids are the upstream platform's numeric account ids.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Milliseconds since the Unix epoch, as delivered to socket clients.
pub type EpochMillis = i64;
