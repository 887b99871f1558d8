/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier of one end-to-end generation run.
pub type RunId = DbId;

/// Identifier of a scene preset (one requested variant).
pub type PresetId = DbId;
