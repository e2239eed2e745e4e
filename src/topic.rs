//! Resolves the notification topic by its human-readable name.

use crate::ports::Notifier;
use crate::retry::RetryPolicy;
use anyhow::{anyhow, Result};
use tracing::{info, instrument};

/// Pick the first ARN that names the given topic.
pub fn find_topic_arn<'a>(arns: &'a [String], topic_name: &str) -> Option<&'a str> {
    let suffix = format!(":{}", topic_name);
    arns.iter()
        .map(String::as_str)
        .find(|arn| arn.ends_with(&suffix))
}

/// Look up the ARN of the named topic. A topic that can't be found is
/// a configuration error.
#[instrument(skip(notifier, retry))]
pub async fn resolve<N: Notifier + ?Sized>(
    notifier: &N,
    topic_name: &str,
    retry: &RetryPolicy,
) -> Result<String> {
    let arns = retry
        .run("list notification topics", || notifier.list_topic_arns())
        .await?;
    let arn = find_topic_arn(&arns, topic_name)
        .ok_or_else(|| anyhow!("Notification topic {:?} was not found", topic_name))?;
    info!("Resolved topic {:?} to {:?}", topic_name, arn);
    Ok(arn.to_string())
}
