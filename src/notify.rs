//! Formats and publishes the summary of an image's labels.

use crate::ports::{Label, Notifier};
use anyhow::{Context, Result};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{info, instrument};

/// Matches the `{key}` and `{labels}` template placeholders.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(key|labels)\}").expect("valid placeholder regex"));

/// A message ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub subject: String,
    pub body: String,
}

/// Render a single label, e.g. `Cat (87.65% confidence)`.
pub fn render_label(label: &Label) -> String {
    format!("{} ({:.2}% confidence)", label.name, label.confidence)
}

/// Render the labels as a comma-separated list.
pub fn render_labels(labels: &[Label]) -> String {
    labels.iter().map(render_label).join(", ")
}

impl NotificationMessage {
    /// Build the message for an object, filling the `{labels}` and
    /// `{key}` placeholders of the template. Only the template's own
    /// placeholders are filled, never text coming from the key or the
    /// labels.
    pub fn new(subject: &str, template: &str, key: &str, labels: &[Label]) -> Self {
        let rendered = render_labels(labels);
        let body = PLACEHOLDER
            .replace_all(template, |caps: &Captures| match &caps[1] {
                "key" => key.to_string(),
                _ => rendered.clone(),
            })
            .into_owned();
        NotificationMessage {
            subject: subject.to_string(),
            body,
        }
    }
}

/// Publish the message to the topic. Publishing isn't retried.
#[instrument(skip(notifier, message), fields(subject = %message.subject))]
pub async fn publish<N: Notifier + ?Sized>(
    notifier: &N,
    topic_arn: &str,
    message: &NotificationMessage,
) -> Result<()> {
    notifier
        .publish(topic_arn, &message.subject, &message.body)
        .await
        .with_context(|| format!("Failed to publish to topic {:?}", topic_arn))?;
    info!("Published notification to {:?}", topic_arn);
    Ok(())
}
