use anyhow::{Context, Result};
use image_label_notifier::trigger::UploadRecord;
use image_label_notifier::{app, client};
use std::env::var;
use tracing::info;

/// Detect and publish the labels of a single object, given by the
/// bucket and key environment variables.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();
    app::init()?;
    client::init().await?;

    let settings = &app::current().settings;
    let bucket = var(&settings.bucket_var).context(settings.bucket_var.clone())?;
    let key = var(&settings.key_var).context(settings.key_var.clone())?;
    let record = UploadRecord { bucket, key };
    info!("Handling {:?}", record);

    let clients = client::current();
    let result = app::current()
        .handle(vec![Ok(record)], clients, clients, clients)
        .await
        .context("Failed to handle the object")?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
