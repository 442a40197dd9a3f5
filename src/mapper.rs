use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;

use crate::event::{EventKind, WatchEvent};
use crate::record::S3EventRecord;

/// Event source identifier stamped on genuine S3 notification records.
const EXPECTED_EVENT_SOURCE: &str = "aws:s3";

/// The one record schema major version this mapper understands. Any other
/// version is discarded rather than guessed at.
const SUPPORTED_EVENT_MAJOR_VERSION: &str = "2";

/// Convert a single notification record into a [`WatchEvent`].
///
/// Returns `Ok(None)` for records that are filtered out (wrong source,
/// unsupported schema version, foreign bucket). A missing or unparsable
/// sequencer is an error: it indicates a schema change worth surfacing,
/// not something to silently drop.
pub fn map_record(record: &S3EventRecord, bucket: &str) -> Result<Option<WatchEvent>> {
    if record.event_source != EXPECTED_EVENT_SOURCE {
        log::debug!("Ignoring record from source {}", record.event_source);
        return Ok(None);
    }

    let major_version = record.event_version.split('.').next().unwrap_or("");
    if major_version != SUPPORTED_EVENT_MAJOR_VERSION {
        log::error!(
            "Ignoring unsupported event version {}",
            record.event_version
        );
        return Ok(None);
    }

    let record_bucket = record.s3.bucket.name.as_str();
    if record_bucket != bucket {
        log::debug!("Ignoring record for bucket {record_bucket}");
        return Ok(None);
    }

    let kind = EventKind::from_event_name(&record.event_name);
    if kind == EventKind::Updated {
        log::debug!("Passing through non-object event {}", record.event_name);
    }

    let key = decode_key(&record.s3.object.key);

    let sequencer = record
        .s3
        .object
        .sequencer
        .as_deref()
        .context("record is missing a sequencer")?;
    let sequence = u64::from_str_radix(sequencer, 16)
        .with_context(|| format!("invalid sequencer {sequencer:?}"))?;

    Ok(Some(WatchEvent {
        bucket: record_bucket.to_owned(),
        key,
        size: record.s3.object.size,
        etag: record.s3.object.e_tag.clone(),
        version_id: record.s3.object.version_id.clone(),
        sequence,
        kind,
        event_time: record.event_time,
    }))
}

/// Object keys arrive URL-encoded as if they were HTML form fields, so a
/// literal `+` means a space and must be substituted before percent
/// decoding.
fn decode_key(raw: &str) -> String {
    let unplussed = raw.replace('+', " ");
    percent_decode_str(&unplussed).decode_utf8_lossy().into_owned()
}
