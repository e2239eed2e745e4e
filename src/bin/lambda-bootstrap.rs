use anyhow::{anyhow, Result};
use aws_lambda_events::event::s3::S3Event;
use image_label_notifier::app::{self, InvocationResult};
use image_label_notifier::client;
use image_label_notifier::trigger::UploadRecord;
use lambda_runtime::{run, service_fn, LambdaEvent};

/// Detect and publish the labels of each uploaded image in the event
async fn function_handler(event: LambdaEvent<S3Event>) -> Result<InvocationResult> {
    let clients = client::current();
    app::current()
        .handle(
            UploadRecord::from_event(&event.payload),
            clients,
            clients,
            clients,
        )
        .await
}

/// Run an AWS Lambda function that listens to S3 events, detects
/// labels in the uploaded images and publishes them to a notification
/// topic, once its email subscriber has confirmed the subscription.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();
    app::init()?;
    client::init().await?;

    run(service_fn(function_handler))
        .await
        .map_err(|e| anyhow!("{:?}", e))
}
