use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::operation::purge_queue::PurgeQueueError;
use aws_sdk_sqs::types::Message;

use crate::config::{LONG_POLL_WAIT_CAP_SECONDS, MAX_MESSAGES_PER_FETCH_CAP};

/// A message pulled off the queue, reduced to the parts the watch loop
/// needs: the body to parse and the receipt to delete it with.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: String,
    pub body: String,
    pub receipt: String,
}

/// Capability handed to the watch loop instead of a concrete SQS client,
/// so the loop can be exercised against an in-memory queue in tests.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Long-poll for up to `max_messages`, waiting up to `wait_seconds`
    /// for at least one. May return earlier with messages, or after the
    /// full wait with none.
    async fn receive(&self, max_messages: u32, wait_seconds: u32) -> Result<Vec<QueueMessage>>;

    async fn delete(&self, message: &QueueMessage) -> Result<()>;

    async fn purge(&self) -> Result<()>;

    async fn delete_queue(&self) -> Result<()>;
}

/// [`EventQueue`] backed by an SQS queue URL.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Resolve a queue URL by queue name.
    pub async fn from_name(client: Client, queue_name: &str) -> Result<Self> {
        let resp = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .with_context(|| format!("failed to resolve URL of queue {queue_name}"))?;
        let queue_url = resp
            .queue_url()
            .with_context(|| format!("queue {queue_name} has no URL"))?
            .to_owned();
        log::info!("Got queue {queue_name} with URL={queue_url}");
        Ok(Self { client, queue_url })
    }

    pub fn get_queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl EventQueue for SqsQueue {
    async fn receive(&self, max_messages: u32, wait_seconds: u32) -> Result<Vec<QueueMessage>> {
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, MAX_MESSAGES_PER_FETCH_CAP) as i32)
            .wait_time_seconds(wait_seconds.min(LONG_POLL_WAIT_CAP_SECONDS) as i32)
            .send()
            .await
            .with_context(|| format!("failed to receive messages from {}", self.queue_url))?;

        Ok(to_queue_messages(resp.messages.unwrap_or_default()))
    }

    async fn delete(&self, message: &QueueMessage) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt)
            .send()
            .await
            .with_context(|| format!("failed to delete message {}", message.id))?;
        Ok(())
    }

    async fn purge(&self) -> Result<()> {
        if let Err(e) = self
            .client
            .purge_queue()
            .queue_url(&self.queue_url)
            .send()
            .await
        {
            return downgrade_purge_in_progress(e.into_service_error(), &self.queue_url);
        }
        log::info!("Purged queue {}", self.queue_url);
        Ok(())
    }

    async fn delete_queue(&self) -> Result<()> {
        self.client
            .delete_queue()
            .queue_url(&self.queue_url)
            .send()
            .await
            .with_context(|| format!("failed to delete queue {}", self.queue_url))?;
        log::info!("Deleted queue with URL={}", self.queue_url);
        Ok(())
    }
}

/// Reduce raw SQS messages to the parts the loop consumes. Messages
/// without a body or a receipt handle are skipped with a warning.
fn to_queue_messages(messages: Vec<Message>) -> Vec<QueueMessage> {
    let mut queue_messages = Vec::new();
    for msg in messages {
        let Some(body) = msg.body else {
            log::warn!("Received SQS message with empty body. Skipping.");
            continue;
        };
        let Some(receipt) = msg.receipt_handle else {
            log::warn!("Received SQS message without a receipt handle. Skipping.");
            continue;
        };
        queue_messages.push(QueueMessage {
            id: msg.message_id.unwrap_or_default(),
            body,
            receipt,
        });
    }
    queue_messages
}

/// A purge that is already in progress still empties the queue, so it is
/// only worth a warning; every other purge failure propagates.
fn downgrade_purge_in_progress(error: PurgeQueueError, queue_url: &str) -> Result<()> {
    if error.is_purge_queue_in_progress() {
        log::warn!("Queue purge already in progress. Queue url: {queue_url}");
        return Ok(());
    }
    Err(anyhow::Error::new(error).context(format!("failed to purge queue {queue_url}")))
}

#[cfg(test)]
mod tests {
    use aws_sdk_sqs::types::error::{PurgeQueueInProgress, QueueDoesNotExist};

    use super::*;

    fn complete_message(id: &str) -> Message {
        Message::builder()
            .message_id(id)
            .body(r#"{"Records": []}"#)
            .receipt_handle(format!("receipt-{id}"))
            .build()
    }

    #[test]
    fn keeps_complete_messages() {
        let messages = to_queue_messages(vec![complete_message("m1"), complete_message("m2")]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[0].body, r#"{"Records": []}"#);
        assert_eq!(messages[0].receipt, "receipt-m1");
    }

    #[test]
    fn skips_messages_without_a_body() {
        let no_body = Message::builder()
            .message_id("m1")
            .receipt_handle("receipt-m1")
            .build();
        let messages = to_queue_messages(vec![no_body, complete_message("m2")]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m2");
    }

    #[test]
    fn skips_messages_without_a_receipt_handle() {
        let no_receipt = Message::builder().message_id("m1").body("{}").build();
        let messages = to_queue_messages(vec![no_receipt]);
        assert!(messages.is_empty());
    }

    #[test]
    fn purge_in_progress_proceeds_with_a_warning() {
        let error =
            PurgeQueueError::PurgeQueueInProgress(PurgeQueueInProgress::builder().build());
        assert!(downgrade_purge_in_progress(error, "https://queue.example/q").is_ok());
    }

    #[test]
    fn other_purge_failures_propagate() {
        let error = PurgeQueueError::QueueDoesNotExist(QueueDoesNotExist::builder().build());
        assert!(downgrade_purge_in_progress(error, "https://queue.example/q").is_err());
    }
}
