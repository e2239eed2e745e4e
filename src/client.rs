//! Defines the global AWS clients, and the calls made through them.

use crate::ports::{Label, LabelDetector, Notifier, ObjectStore, Subscription};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::Image;
use once_cell::sync::OnceCell;
use std::env;

/// Downloads the full body of a single object from storage.
pub async fn get_object_bytes(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
) -> Result<Vec<u8>> {
    let body = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .with_context(|| {
            format!(
                "Failed to download object {:?} from bucket {:?}",
                key, bucket
            )
        })?
        .body
        .collect()
        .await
        .with_context(|| {
            format!(
                "Failed to read the contents of object {:?} from bucket {:?}",
                key, bucket
            )
        })?;
    Ok(body.into_bytes().to_vec())
}

/// Detects labels in an image given as raw bytes.
pub async fn detect_labels(
    client: &aws_sdk_rekognition::Client,
    image: &[u8],
    max_labels: i32,
) -> Result<Vec<Label>> {
    let response = client
        .detect_labels()
        .image(Image::builder().bytes(Blob::new(image)).build())
        .max_labels(max_labels)
        .send()
        .await
        .context("Failed to detect labels in image")?;
    Ok(response
        .labels()
        .iter()
        .map(|label| Label {
            name: label.name().unwrap_or_default().to_string(),
            confidence: label.confidence().unwrap_or_default(),
        })
        .collect())
}

/// Lists topic ARNs. Returns a page of ARNs and a token that can be
/// used for a subsequent fetch.
pub async fn list_topics(
    client: &aws_sdk_sns::Client,
    next: &Option<String>,
) -> Result<(Vec<String>, Option<String>)> {
    let response = client
        .list_topics()
        .set_next_token(next.clone())
        .send()
        .await
        .with_context(|| {
            format!(
                "Failed to list topics using {} continuation token",
                if next.is_some() { "a" } else { "no" }
            )
        })?;
    Ok((
        response
            .topics()
            .iter()
            .filter_map(|t| t.topic_arn().map(String::from))
            .collect(),
        response.next_token().map(String::from),
    ))
}

/// Lists the subscriptions of a topic. Returns a page of
/// subscriptions and a token that can be used for a subsequent fetch.
pub async fn list_subscriptions(
    client: &aws_sdk_sns::Client,
    topic_arn: &str,
    next: &Option<String>,
) -> Result<(Vec<Subscription>, Option<String>)> {
    let response = client
        .list_subscriptions_by_topic()
        .topic_arn(topic_arn)
        .set_next_token(next.clone())
        .send()
        .await
        .with_context(|| {
            format!(
                "Failed to list subscriptions of topic {:?} \
                 using {} continuation token",
                topic_arn,
                if next.is_some() { "a" } else { "no" }
            )
        })?;
    Ok((
        response
            .subscriptions()
            .iter()
            .map(|s| Subscription {
                endpoint: s.endpoint().map(String::from),
                subscription_arn: s.subscription_arn().map(String::from),
            })
            .collect(),
        response.next_token().map(String::from),
    ))
}

/// The AWS clients used by the pipeline.
#[derive(Clone, Debug)]
pub struct AwsClients {
    pub s3: aws_sdk_s3::Client,
    pub rekognition: aws_sdk_rekognition::Client,
    pub sns: aws_sdk_sns::Client,
}

impl AwsClients {
    /// Build every client from a shared configuration.
    pub fn new(config: &SdkConfig) -> Self {
        AwsClients {
            s3: aws_sdk_s3::Client::new(config),
            rekognition: aws_sdk_rekognition::Client::new(config),
            sns: aws_sdk_sns::Client::new(config),
        }
    }
}

#[async_trait]
impl ObjectStore for AwsClients {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        get_object_bytes(&self.s3, bucket, key).await
    }
}

#[async_trait]
impl LabelDetector for AwsClients {
    async fn detect_labels(&self, image: &[u8], max_labels: i32) -> Result<Vec<Label>> {
        detect_labels(&self.rekognition, image, max_labels).await
    }
}

#[async_trait]
impl Notifier for AwsClients {
    async fn list_topic_arns(&self) -> Result<Vec<String>> {
        let mut arns = Vec::new();
        let mut next = None;
        loop {
            let (page, token) = list_topics(&self.sns, &next).await?;
            arns.extend(page);
            if token.is_none() {
                return Ok(arns);
            }
            next = token;
        }
    }

    async fn list_subscriptions(&self, topic_arn: &str) -> Result<Vec<Subscription>> {
        let mut subscriptions = Vec::new();
        let mut next = None;
        loop {
            let (page, token) = list_subscriptions(&self.sns, topic_arn, &next).await?;
            subscriptions.extend(page);
            if token.is_none() {
                return Ok(subscriptions);
            }
            next = token;
        }
    }

    async fn subscribe_email(&self, topic_arn: &str, endpoint: &str) -> Result<()> {
        self.sns
            .subscribe()
            .topic_arn(topic_arn)
            .protocol("email")
            .endpoint(endpoint)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to request subscription of {:?} to topic {:?}",
                    endpoint, topic_arn
                )
            })?;
        Ok(())
    }

    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<()> {
        self.sns
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .with_context(|| format!("Failed to publish message to topic {:?}", topic_arn))?;
        Ok(())
    }
}

/// Global AWS clients instance.
static CURRENT: OnceCell<AwsClients> = OnceCell::new();

/// Load the shared AWS configuration. `AWS_ENDPOINT_URL` overrides
/// the endpoint of every service, e.g. to target a local emulator.
pub async fn aws_service_config() -> SdkConfig {
    let loader = aws_config::defaults(BehaviorVersion::latest());
    if let Ok(endpoint_url) = env::var("AWS_ENDPOINT_URL") {
        loader
            .endpoint_url(
                if endpoint_url.starts_with("http://") || endpoint_url.starts_with("https://") {
                    endpoint_url
                } else {
                    format!("https://{}", endpoint_url)
                },
            )
            .region(Region::new("us-east-1")) // should be OK since the endpoint was overridden
            .load()
            .await
    } else {
        loader.load().await
    }
}

/// Initialize the global AWS clients.
pub async fn init() -> Result<()> {
    let config = aws_service_config().await;
    CURRENT
        .set(AwsClients::new(&config))
        .map_err(|_| anyhow!("client::CURRENT was already initialized"))
}

/// Get the current AWS clients instance, or panic if it hasn't been
/// initialized.
pub fn current() -> &'static AwsClients {
    CURRENT.get().expect("client is not initialized")
}
