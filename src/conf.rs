//! Defines configuration as read from the environment.

use serde::Deserialize;

/// Default `topic_name` value.
fn default_topic_name() -> String {
    String::from("ImageAnalysisNotification")
}

/// Default `max_labels` value.
fn default_max_labels() -> i32 {
    10
}

/// Default `message_subject` value.
fn default_message_subject() -> String {
    String::from("Image Labels Detection")
}

/// Default `message_template` value.
fn default_message_template() -> String {
    String::from("Labels detected in the image {key}: {labels}.")
}

/// Default `read_attempts` value.
fn default_read_attempts() -> u32 {
    3
}

/// Default `retry_base_millis` value.
fn default_retry_base_millis() -> u64 {
    300
}

/// Default `bucket_var` value.
fn default_bucket_var() -> String {
    String::from("BUCKET")
}

/// Default `key_var` value.
fn default_key_var() -> String {
    String::from("KEY")
}

/// The notifier is configured to detect labels in uploaded images and
/// publish them to a notification topic with a single email
/// subscriber. The configuration must be given as environment
/// variables.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// The name of the notification topic. The topic itself is
    /// looked up by this name on every invocation.
    #[serde(default = "default_topic_name")]
    pub topic_name: String,

    /// The email address that must be a confirmed subscriber of the
    /// topic before any image is processed.
    pub subscriber_endpoint: String,

    /// The maximum amount of labels requested for each image.
    #[serde(default = "default_max_labels")]
    pub max_labels: i32,

    /// The subject line of every published notification.
    #[serde(default = "default_message_subject")]
    pub message_subject: String,

    /// The body of every published notification. The `{key}`
    /// placeholder is replaced with the object key, and `{labels}`
    /// with the rendered list of labels.
    #[serde(default = "default_message_template")]
    pub message_template: String,

    /// Defines a filter to select only matching keys. The star (*)
    /// can be used as a wildcard matching any number of non-slash
    /// characters. E.g. to match only JPEG images in a folder, use
    /// `"folder/*.jpg"`. Omitting this will make it match any file.
    #[serde(default)]
    pub match_key: Option<String>,

    /// How many times an idempotent read (listing topics or
    /// subscriptions, fetching an object, detecting labels) is
    /// attempted before giving up.
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    /// The time to wait after the first failed read, in
    /// milliseconds. Doubles after each subsequent failure.
    #[serde(default = "default_retry_base_millis")]
    pub retry_base_millis: u64,

    /// The environment variable holding the bucket name, read by the
    /// command entry point.
    #[serde(default = "default_bucket_var")]
    pub bucket_var: String,

    /// The environment variable holding the object key, read by the
    /// command entry point.
    #[serde(default = "default_key_var")]
    pub key_var: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_applied() {
        let settings: Settings =
            envy::from_iter(vars(&[("SUBSCRIBER_ENDPOINT", "someone@example.com")])).unwrap();
        assert_eq!(settings.topic_name, "ImageAnalysisNotification");
        assert_eq!(settings.subscriber_endpoint, "someone@example.com");
        assert_eq!(settings.max_labels, 10);
        assert_eq!(settings.message_subject, "Image Labels Detection");
        assert_eq!(
            settings.message_template,
            "Labels detected in the image {key}: {labels}."
        );
        assert_eq!(settings.match_key, None);
        assert_eq!(settings.read_attempts, 3);
        assert_eq!(settings.retry_base_millis, 300);
        assert_eq!(settings.bucket_var, "BUCKET");
        assert_eq!(settings.key_var, "KEY");
    }

    #[test]
    fn overrides_are_read() {
        let settings: Settings = envy::from_iter(vars(&[
            ("SUBSCRIBER_ENDPOINT", "ops@example.com"),
            ("TOPIC_NAME", "Uploads"),
            ("MAX_LABELS", "5"),
            ("MATCH_KEY", "incoming/*.png"),
            ("READ_ATTEMPTS", "1"),
        ]))
        .unwrap();
        assert_eq!(settings.topic_name, "Uploads");
        assert_eq!(settings.max_labels, 5);
        assert_eq!(settings.match_key.as_deref(), Some("incoming/*.png"));
        assert_eq!(settings.read_attempts, 1);
    }

    #[test]
    fn subscriber_endpoint_is_required() {
        let result: Result<Settings, _> = envy::from_iter(vars(&[("TOPIC_NAME", "Uploads")]));
        assert!(result.is_err());
    }
}
