use anyhow::{Context, Result};
use aws_sdk_s3::Client;

/// List the names of all buckets visible to the current credentials.
pub async fn list_buckets(client: &Client) -> Result<Vec<String>> {
    let resp = client
        .list_buckets()
        .send()
        .await
        .context("failed to list buckets")?;
    Ok(resp
        .buckets
        .unwrap_or_default()
        .into_iter()
        .filter_map(|bucket| bucket.name)
        .collect())
}
