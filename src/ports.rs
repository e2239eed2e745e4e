//! Defines the external services the pipeline talks to, and the
//! values exchanged with them.

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// A label detected in an image.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,

    /// Confidence score, in the `[0, 100]` range.
    pub confidence: f32,
}

/// A subscription to a notification topic, as listed by the
/// notification service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscription {
    pub endpoint: Option<String>,

    /// Either a full ARN, for confirmed subscriptions, or a
    /// placeholder such as `PendingConfirmation`.
    pub subscription_arn: Option<String>,
}

impl Subscription {
    /// Whether the subscription was confirmed by the endpoint's
    /// owner.
    pub fn is_confirmed(&self) -> bool {
        self.subscription_arn
            .as_deref()
            .is_some_and(|arn| arn.starts_with("arn:"))
    }
}

/// Storage holding the uploaded objects.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full body of an object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Service that detects labels in images.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Detect at most `max_labels` labels in the given image.
    async fn detect_labels(&self, image: &[u8], max_labels: i32) -> Result<Vec<Label>>;
}

/// Publish/subscribe notification service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// List the ARNs of every topic visible to the caller.
    async fn list_topic_arns(&self) -> Result<Vec<String>>;

    /// List every subscription of a topic.
    async fn list_subscriptions(&self, topic_arn: &str) -> Result<Vec<Subscription>>;

    /// Request an email subscription to a topic.
    async fn subscribe_email(&self, topic_arn: &str, endpoint: &str) -> Result<()>;

    /// Publish a message to a topic.
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<()>;
}
