use chrono::{DateTime, Utc};
use serde::Serialize;

/// Classification of a bucket notification, derived from the event name
/// prefix. Anything that is neither a create nor a remove event (restores,
/// replication, ...) is reported as `Updated` rather than dropped, so
/// callers can still react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Created,
    Deleted,
    Updated,
}

impl EventKind {
    pub fn from_event_name(event_name: &str) -> Self {
        if event_name.starts_with("ObjectCreated:") {
            Self::Created
        } else if event_name.starts_with("ObjectRemoved:") {
            Self::Deleted
        } else {
            Self::Updated
        }
    }
}

/// A normalized object-change event. This is the stable data contract
/// handed to consumers of the watch loop.
///
/// `size`, `etag` and `version_id` can be legitimately absent on some
/// delete notifications; `None` means "not reported", which is distinct
/// from a zero-byte object.
///
/// `sequence` is the record sequencer decoded from hex. S3 orders
/// sequencers lexicographically per key, so decoded values are
/// monotonically non-decreasing for events on the same key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchEvent {
    pub bucket: String,
    pub key: String,
    pub size: Option<u64>,
    pub etag: Option<String>,
    pub version_id: Option<String>,
    pub sequence: u64,
    pub kind: EventKind,
    pub event_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_created_events() {
        assert_eq!(
            EventKind::from_event_name("ObjectCreated:Put"),
            EventKind::Created
        );
        assert_eq!(
            EventKind::from_event_name("ObjectCreated:CompleteMultipartUpload"),
            EventKind::Created
        );
    }

    #[test]
    fn classifies_removed_events() {
        assert_eq!(
            EventKind::from_event_name("ObjectRemoved:Delete"),
            EventKind::Deleted
        );
        assert_eq!(
            EventKind::from_event_name("ObjectRemoved:DeleteMarkerCreated"),
            EventKind::Deleted
        );
    }

    #[test]
    fn everything_else_is_updated() {
        assert_eq!(
            EventKind::from_event_name("ObjectRestore:Completed"),
            EventKind::Updated
        );
        assert_eq!(
            EventKind::from_event_name("Replication:OperationFailedReplication"),
            EventKind::Updated
        );
    }
}
