//! Defines an _upload record_, the input for the processing of a
//! single uploaded image. Records are built from the S3 event.

use anyhow::{anyhow, Context, Result};
use aws_lambda_events::event::s3::{S3Event, S3EventRecord};
use tracing::instrument;

/// A newly stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub bucket: String,
    pub key: String,
}

impl UploadRecord {
    /// Builds the upload records found inside an S3 event, in the
    /// order they were delivered. A malformed record doesn't prevent
    /// the others from being built.
    #[instrument(skip(event))]
    pub fn from_event(event: &S3Event) -> Vec<Result<Self>> {
        event.records.iter().map(Self::from_record).collect()
    }

    /// Builds a single upload record.
    fn from_record(record: &S3EventRecord) -> Result<Self> {
        let bucket = record
            .s3
            .bucket
            .name
            .clone()
            .ok_or_else(|| anyhow!("S3 event record is missing the bucket name"))?;
        let raw_key = record
            .s3
            .object
            .key
            .as_deref()
            .ok_or_else(|| anyhow!("S3 event record is missing the object key"))?;
        let key = decode_key(raw_key)?;
        Ok(UploadRecord { bucket, key })
    }
}

/// Object keys in S3 notifications are form-encoded: spaces arrive as
/// `+` and other special characters are percent-escaped.
fn decode_key(raw_key: &str) -> Result<String> {
    let spaced = raw_key.replace('+', " ");
    let key = urlencoding::decode(&spaced)
        .with_context(|| format!("Object key {:?} is not valid UTF-8", raw_key))?;
    Ok(key.into_owned())
}
