/// Monitor and group identifiers are opaque strings assigned by the server
/// (monitors) or generated locally (groups).
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
