//! One-time plumbing between a bucket and its watch queue: queue creation,
//! queue policy, and the bucket notification configuration.

use anyhow::{Context, Result, anyhow};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{Event, NotificationConfiguration, QueueConfiguration};
use aws_sdk_sqs::types::QueueAttributeName;
use serde_json::json;

/// Event groups registered on the bucket.
const WATCHED_EVENTS: [&str; 3] = [
    "s3:ObjectCreated:*",
    "s3:ObjectRemoved:*",
    "s3:ObjectRestore:*",
];

/// Error code S3-compatible services return for a bucket without any
/// notification configuration. Treated as an empty configuration.
const NOTIFICATION_NOT_FOUND: &str = "NotificationConfigurationNotFoundError";

/// Ensure `queue_name` exists and receives create/remove/restore
/// notifications for `bucket`, returning the queue URL.
///
/// Re-running is idempotent at the level of the configuration entry's id
/// (the bucket name), but registering overlapping event types under a
/// different id is rejected by the platform; that surfaces here as a setup
/// error and is not retried. Existing queue configurations on the bucket
/// are carried over; topic and lambda configurations are overwritten, a
/// documented limitation.
pub async fn ensure_notification(
    s3: &aws_sdk_s3::Client,
    sqs: &aws_sdk_sqs::Client,
    sts: &aws_sdk_sts::Client,
    bucket: &str,
    queue_name: &str,
    region: &str,
) -> Result<String> {
    let queue_url = create_queue(sqs, queue_name).await?;
    let account = get_account_number(sts).await?;
    let queue_arn = queue_arn(region, &account, queue_name);

    let mut queue_configurations = current_queue_configurations(s3, bucket).await?;
    queue_configurations.push(watch_queue_configuration(bucket, &queue_arn)?);
    let notification_configuration = NotificationConfiguration::builder()
        .set_queue_configurations(Some(queue_configurations))
        .build();

    let policy = queue_policy(&queue_arn, bucket);
    sqs.set_queue_attributes()
        .queue_url(&queue_url)
        .attributes(QueueAttributeName::Policy, policy.to_string())
        .send()
        .await
        .with_context(|| format!("failed to set policy on queue {queue_name}"))?;
    log::info!("Granted s3.amazonaws.com publish access to queue {queue_name}");

    s3.put_bucket_notification_configuration()
        .bucket(bucket)
        .notification_configuration(notification_configuration)
        .send()
        .await
        .with_context(|| format!("failed to update notification configuration of bucket {bucket}"))?;
    log::info!("Registered {WATCHED_EVENTS:?} notifications for bucket {bucket} on {queue_arn}");

    Ok(queue_url)
}

/// Create or reuse an SQS queue, returning its URL. SQS treats creation of
/// an existing queue with identical attributes as a successful no-op.
async fn create_queue(sqs: &aws_sdk_sqs::Client, queue_name: &str) -> Result<String> {
    let resp = sqs
        .create_queue()
        .queue_name(queue_name)
        .send()
        .await
        .with_context(|| format!("failed to create queue {queue_name}"))?;
    let queue_url = resp
        .queue_url()
        .with_context(|| format!("queue {queue_name} was created without a URL"))?
        .to_owned();
    log::info!("Created queue {queue_name} with URL={queue_url}");
    Ok(queue_url)
}

/// Resolve the account number of the current credentials.
async fn get_account_number(sts: &aws_sdk_sts::Client) -> Result<String> {
    let identity = sts
        .get_caller_identity()
        .send()
        .await
        .context("failed to resolve caller identity")?;
    identity
        .account()
        .map(str::to_owned)
        .context("caller identity has no account number")
}

/// Fetch the bucket's current queue configurations. A bucket without any
/// notification configuration is a valid empty state, not an error.
async fn current_queue_configurations(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
) -> Result<Vec<QueueConfiguration>> {
    match s3
        .get_bucket_notification_configuration()
        .bucket(bucket)
        .send()
        .await
    {
        Ok(output) => Ok(output.queue_configurations.unwrap_or_default()),
        Err(e) if e.code() == Some(NOTIFICATION_NOT_FOUND) => {
            log::info!("No bucket notification configuration found.");
            Ok(Vec::new())
        }
        Err(e) => Err(anyhow!(e)
            .context(format!("failed to get notification configuration of bucket {bucket}"))),
    }
}

/// The configuration entry registered for a watched bucket. Its id is the
/// bucket name, so repeating setup replaces rather than multiplies it.
fn watch_queue_configuration(bucket: &str, queue_arn: &str) -> Result<QueueConfiguration> {
    let mut builder = QueueConfiguration::builder().id(bucket).queue_arn(queue_arn);
    for event in WATCHED_EVENTS {
        builder = builder.events(Event::from(event));
    }
    builder
        .build()
        .context("failed to build queue configuration")
}

fn queue_arn(region: &str, account: &str, queue_name: &str) -> String {
    format!("arn:aws:sqs:{region}:{account}:{queue_name}")
}

/// Access policy letting the storage service publish into the queue,
/// scoped by source ARN to the exact bucket.
fn queue_policy(queue_arn: &str, bucket: &str) -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Id": format!("{queue_arn}/SQSDefaultPolicy"),
        "Statement": [
            {
                "Sid": "allow bucket to notify",
                "Effect": "Allow",
                "Principal": {"Service": "s3.amazonaws.com"},
                "Action": "SQS:*",
                "Resource": queue_arn,
                "Condition": {
                    "ArnLike": {
                        "aws:SourceArn": format!("arn:aws:s3:*:*:{bucket}")
                    }
                }
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_arn_has_the_expected_shape() {
        assert_eq!(
            queue_arn("us-east-1", "123456789012", "logs-bucket-watch"),
            "arn:aws:sqs:us-east-1:123456789012:logs-bucket-watch"
        );
    }

    #[test]
    fn policy_grants_s3_scoped_to_the_bucket() {
        let arn = "arn:aws:sqs:us-east-1:123456789012:logs-bucket-watch";
        let policy = queue_policy(arn, "logs-bucket");
        let statement = &policy["Statement"][0];
        assert_eq!(statement["Principal"]["Service"], "s3.amazonaws.com");
        assert_eq!(statement["Resource"], arn);
        assert_eq!(
            statement["Condition"]["ArnLike"]["aws:SourceArn"],
            "arn:aws:s3:*:*:logs-bucket"
        );
    }

    #[test]
    fn configuration_entry_is_keyed_by_bucket_and_covers_all_event_groups() {
        let config =
            watch_queue_configuration("logs-bucket", "arn:aws:sqs:us-east-1:123:q").unwrap();
        assert_eq!(config.id(), Some("logs-bucket"));
        assert_eq!(config.queue_arn(), "arn:aws:sqs:us-east-1:123:q");
        let events: Vec<&str> = config.events().iter().map(|e| e.as_str()).collect();
        assert_eq!(
            events,
            vec![
                "s3:ObjectCreated:*",
                "s3:ObjectRemoved:*",
                "s3:ObjectRestore:*"
            ]
        );
    }
}
