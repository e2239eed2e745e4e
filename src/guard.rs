//! Makes sure the configured email address is a confirmed subscriber
//! of the notification topic.

use crate::ports::{Notifier, Subscription};
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use tracing::{info, instrument};

/// Whether the current invocation may go on to process its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// The subscriber confirmed its subscription.
    Active,

    /// A subscription was just requested and awaits confirmation.
    VerificationPending,
}

/// Check whether `endpoint` holds a confirmed subscription.
pub fn is_active(subscriptions: &[Subscription], endpoint: &str) -> bool {
    subscriptions
        .iter()
        .any(|s| s.endpoint.as_deref() == Some(endpoint) && s.is_confirmed())
}

/// Ensure `endpoint` is subscribed to the topic. When it isn't, a
/// subscription is requested and the caller must stop: the
/// subscriber has yet to confirm it.
#[instrument(skip(notifier, retry))]
pub async fn ensure_subscribed<N: Notifier + ?Sized>(
    notifier: &N,
    topic_arn: &str,
    endpoint: &str,
    retry: &RetryPolicy,
) -> Result<SubscriptionStatus> {
    let subscriptions = retry
        .run("list topic subscriptions", || {
            notifier.list_subscriptions(topic_arn)
        })
        .await?;
    if is_active(&subscriptions, endpoint) {
        return Ok(SubscriptionStatus::Active);
    }
    notifier
        .subscribe_email(topic_arn, endpoint)
        .await
        .with_context(|| format!("Failed to subscribe {:?} to topic {:?}", endpoint, topic_arn))?;
    info!("Requested subscription of {:?}; awaiting confirmation", endpoint);
    Ok(SubscriptionStatus::VerificationPending)
}
