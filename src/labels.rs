//! Detects the labels of a single uploaded image.

use crate::ports::{Label, LabelDetector, ObjectStore};
use crate::retry::RetryPolicy;
use crate::trigger::UploadRecord;
use anyhow::{Context, Result};
use tracing::{info, instrument};

/// Fetch the uploaded object and detect at most `max_labels` labels
/// in it. Labels are kept in the order the detector gave them.
#[instrument(skip(store, detector, retry))]
pub async fn extract<S, D>(
    store: &S,
    detector: &D,
    record: &UploadRecord,
    max_labels: i32,
    retry: &RetryPolicy,
) -> Result<Vec<Label>>
where
    S: ObjectStore + ?Sized,
    D: LabelDetector + ?Sized,
{
    let image = retry
        .run("fetch object", || {
            store.get_object(&record.bucket, &record.key)
        })
        .await
        .with_context(|| {
            format!(
                "Failed to fetch object {:?} from bucket {:?}",
                record.key, record.bucket
            )
        })?;
    let labels = retry
        .run("detect labels", || detector.detect_labels(&image, max_labels))
        .await
        .with_context(|| format!("Failed to detect labels in object {:?}", record.key))?;
    info!("Detected {} labels in {:?}", labels.len(), record.key);
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockLabelDetector, MockObjectStore};
    use anyhow::anyhow;

    const RETRY: RetryPolicy = RetryPolicy {
        attempts: 1,
        base_lapse: 0,
    };

    fn record() -> UploadRecord {
        UploadRecord {
            bucket: String::from("photos"),
            key: String::from("dog.jpg"),
        }
    }

    #[tokio::test]
    async fn fetched_bytes_are_sent_to_the_detector() {
        let mut store = MockObjectStore::new();
        store
            .expect_get_object()
            .withf(|bucket, key| bucket == "photos" && key == "dog.jpg")
            .times(1)
            .returning(|_, _| Ok(vec![0xff, 0xd8, 0xff]));
        let mut detector = MockLabelDetector::new();
        detector
            .expect_detect_labels()
            .withf(|image, max_labels| image == [0xff, 0xd8, 0xff] && *max_labels == 10)
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    Label {
                        name: String::from("Dog"),
                        confidence: 99.1,
                    },
                    Label {
                        name: String::from("Animal"),
                        confidence: 95.0,
                    },
                ])
            });
        let labels = extract(&store, &detector, &record(), 10, &RETRY)
            .await
            .unwrap();
        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Dog", "Animal"]);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let mut store = MockObjectStore::new();
        let mut fetches = 0;
        store.expect_get_object().times(2).returning(move |_, _| {
            fetches += 1;
            if fetches == 1 {
                Err(anyhow!("SlowDown"))
            } else {
                Ok(vec![1, 2, 3])
            }
        });
        let mut detector = MockLabelDetector::new();
        let mut detections = 0;
        detector
            .expect_detect_labels()
            .times(2)
            .returning(move |_, _| {
                detections += 1;
                if detections == 1 {
                    Err(anyhow!("ProvisionedThroughputExceededException"))
                } else {
                    Ok(vec![Label {
                        name: String::from("Dog"),
                        confidence: 99.1,
                    }])
                }
            });
        let retry = RetryPolicy {
            attempts: 2,
            base_lapse: 0,
        };
        let labels = extract(&store, &detector, &record(), 10, &retry)
            .await
            .unwrap();
        assert_eq!(labels.len(), 1);
    }

    #[tokio::test]
    async fn missing_object_skips_detection() {
        let mut store = MockObjectStore::new();
        store
            .expect_get_object()
            .returning(|_, _| Err(anyhow!("NoSuchKey")));
        let mut detector = MockLabelDetector::new();
        detector.expect_detect_labels().never();
        let error = extract(&store, &detector, &record(), 10, &RETRY)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("dog.jpg"));
    }
}
