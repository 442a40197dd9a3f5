use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Body of an SQS message produced by S3 bucket notifications.
///
/// See
/// https://docs.aws.amazon.com/AmazonS3/latest/userguide/notification-content-structure.html
/// for record details. The `Records` array defaults to empty so that
/// non-record bodies such as `s3:TestEvent` parse to zero records instead
/// of failing.
#[derive(Debug, Deserialize)]
pub struct S3EventMessage {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    pub event_source: String,
    pub event_version: String,
    pub event_name: String,
    pub event_time: DateTime<Utc>,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: S3BucketEntity,
    pub object: S3ObjectEntity,
}

#[derive(Debug, Deserialize)]
pub struct S3BucketEntity {
    pub name: String,
}

/// Object portion of a notification record. `size` and `e_tag` are absent
/// on some delete notifications and must stay absent rather than default
/// to zero or an empty string.
#[derive(Debug, Deserialize)]
pub struct S3ObjectEntity {
    pub key: String,
    pub size: Option<u64>,
    #[serde(rename = "eTag")]
    pub e_tag: Option<String>,
    pub sequencer: Option<String>,
    #[serde(rename = "versionId")]
    pub version_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_create_record() {
        let body = r#"{
            "Records": [{
                "eventSource": "aws:s3",
                "eventVersion": "2.1",
                "eventName": "ObjectCreated:Put",
                "eventTime": "2024-01-01T12:00:00.000Z",
                "s3": {
                    "bucket": {"name": "logs-bucket"},
                    "object": {
                        "key": "logs/2024-01-01.txt",
                        "size": 1024,
                        "eTag": "d41d8cd98f00b204e9800998ecf8427e",
                        "sequencer": "0055AED6DCD90281E5",
                        "versionId": "v1"
                    }
                }
            }]
        }"#;
        let message: S3EventMessage = serde_json::from_str(body).unwrap();
        assert_eq!(message.records.len(), 1);
        let record = &message.records[0];
        assert_eq!(record.event_source, "aws:s3");
        assert_eq!(record.event_name, "ObjectCreated:Put");
        assert_eq!(record.s3.bucket.name, "logs-bucket");
        assert_eq!(record.s3.object.size, Some(1024));
        assert_eq!(record.s3.object.version_id.as_deref(), Some("v1"));
    }

    #[test]
    fn delete_record_without_size_and_etag_stays_absent() {
        let body = r#"{
            "Records": [{
                "eventSource": "aws:s3",
                "eventVersion": "2.1",
                "eventName": "ObjectRemoved:Delete",
                "eventTime": "2024-01-01T12:00:00.000Z",
                "s3": {
                    "bucket": {"name": "logs-bucket"},
                    "object": {
                        "key": "gone.txt",
                        "sequencer": "0055AED6DCD90281E6"
                    }
                }
            }]
        }"#;
        let message: S3EventMessage = serde_json::from_str(body).unwrap();
        let object = &message.records[0].s3.object;
        assert_eq!(object.size, None);
        assert_eq!(object.e_tag, None);
        assert_eq!(object.version_id, None);
    }

    #[test]
    fn test_event_body_has_no_records() {
        let body = r#"{"Service": "Amazon S3", "Event": "s3:TestEvent", "Time": "2024-01-01T12:00:00.000Z"}"#;
        let message: S3EventMessage = serde_json::from_str(body).unwrap();
        assert!(message.records.is_empty());
    }
}
