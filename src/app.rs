//! Defines the read-only application state and the orchestration of
//! a single invocation.

use crate::conf::Settings;
use crate::guard::{self, SubscriptionStatus};
use crate::labels;
use crate::notify::{self, NotificationMessage};
use crate::ports::{LabelDetector, Notifier, ObjectStore};
use crate::retry::RetryPolicy;
use crate::topic;
use crate::trigger::UploadRecord;
use anyhow::{anyhow, Context, Result};
use envy::from_env;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Result body when a subscription had to be requested.
pub const VERIFICATION_SENT: &str = "Email verification sent.";

/// Result body when every record was processed.
pub const PROCESS_COMPLETED: &str = "Process completed successfully!";

/// The value returned to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,

    /// A JSON-encoded human-readable message.
    pub body: String,
}

impl InvocationResult {
    /// A successful result carrying the given message.
    pub fn ok(message: &str) -> Self {
        InvocationResult {
            status_code: 200,
            body: serde_json::Value::from(message).to_string(),
        }
    }
}

/// An App is an initialized application state, derived from
/// settings. This is only useful to pre-compute stuff that will be
/// used constantly.
#[derive(Debug)]
pub struct App {
    /// The original settings.
    pub settings: Settings,

    /// The regex that matches S3 event keys.
    pub match_key_re: Regex,

    /// The retry policy for idempotent reads.
    pub retry: RetryPolicy,
}

impl App {
    /// Initialize an App instance given a settings struct. Consumes
    /// the settings struct.
    pub fn new(settings: Settings) -> Result<Self> {
        if settings.subscriber_endpoint.trim().is_empty() {
            return Err(anyhow!("the subscriber endpoint can't be empty"));
        }
        if settings.max_labels <= 0 {
            return Err(anyhow!(
                "the maximum amount of labels must be positive, got {}",
                settings.max_labels
            ));
        }
        // Parse regex
        let match_key_re = if let Some(match_key) = &settings.match_key {
            Regex::new(&format!(
                "^{}$",
                match_key
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<String>>()
                    .join("[^/]*?")
            ))
        } else {
            Regex::new("")
        }?;
        let retry = RetryPolicy {
            attempts: settings.read_attempts,
            base_lapse: settings.retry_base_millis,
        };
        Ok(App {
            settings,
            match_key_re,
            retry,
        })
    }

    /// Handle an invocation: make sure the subscriber is confirmed,
    /// then detect and publish the labels of each uploaded object, in
    /// order. Processing stops at the first record that fails.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn handle<S, D, N>(
        &self,
        records: Vec<Result<UploadRecord>>,
        store: &S,
        detector: &D,
        notifier: &N,
    ) -> Result<InvocationResult>
    where
        S: ObjectStore + ?Sized,
        D: LabelDetector + ?Sized,
        N: Notifier + ?Sized,
    {
        let topic_arn = topic::resolve(notifier, &self.settings.topic_name, &self.retry).await?;
        let status = guard::ensure_subscribed(
            notifier,
            &topic_arn,
            &self.settings.subscriber_endpoint,
            &self.retry,
        )
        .await?;
        if status == SubscriptionStatus::VerificationPending {
            // The triggering records are dropped, not replayed after
            // confirmation.
            info!("Skipping {} records until the subscription is confirmed", records.len());
            return Ok(InvocationResult::ok(VERIFICATION_SENT));
        }

        for record in records {
            let record = record?;
            if !self.match_key_re.is_match(&record.key) {
                warn!("Skipping non-matching key {:?}", record.key);
                continue;
            }
            self.process(&record, store, detector, notifier, &topic_arn)
                .await
                .with_context(|| format!("Failed to handle record {:?}", &record))?;
        }
        Ok(InvocationResult::ok(PROCESS_COMPLETED))
    }

    /// Detect and publish the labels of a single object.
    async fn process<S, D, N>(
        &self,
        record: &UploadRecord,
        store: &S,
        detector: &D,
        notifier: &N,
        topic_arn: &str,
    ) -> Result<()>
    where
        S: ObjectStore + ?Sized,
        D: LabelDetector + ?Sized,
        N: Notifier + ?Sized,
    {
        let labels = labels::extract(
            store,
            detector,
            record,
            self.settings.max_labels,
            &self.retry,
        )
        .await?;
        let message = NotificationMessage::new(
            &self.settings.message_subject,
            &self.settings.message_template,
            &record.key,
            &labels,
        );
        notify::publish(notifier, topic_arn, &message).await
    }
}

/// Global App instance.
static CURRENT: OnceCell<App> = OnceCell::new();

/// Initialize the global App instance.
pub fn init() -> Result<()> {
    let settings = from_env().context("Invalid configuration")?;
    let app = App::new(settings)?;
    CURRENT
        .set(app)
        .map_err(|_| anyhow!("app::CURRENT was already initialized"))
}

/// Get the current App instance, or panic if it hasn't been
/// initialized.
pub fn current() -> &'static App {
    CURRENT.get().expect("app is not initialized")
}
