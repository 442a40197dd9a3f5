use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{
    select,
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::sleep,
};

use crate::{
    config::WatcherConfig,
    event::WatchEvent,
    mapper::map_record,
    queue::{EventQueue, QueueMessage},
    record::S3EventMessage,
};

/// A running watch of one bucket.
///
/// [`Watcher::spawn`] starts a background task that long-polls the queue
/// and pushes each mapped [`WatchEvent`] into a bounded channel, consumed
/// through [`Watcher::next_event`]. A polling or parse failure is delivered
/// as a final `Err` item and ends the stream. The stream is infinite and
/// not restartable: a new watcher starts a fresh poll cycle with no memory
/// of earlier sequence numbers.
///
/// Call [`Watcher::close`] to stop deterministically; it signals the task,
/// waits for it to finish, and runs the optional queue teardown. Simply
/// dropping the watcher also stops the task (the stop channel closes), but
/// without waiting for it.
pub struct Watcher {
    events: mpsc::Receiver<Result<WatchEvent>>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Watcher {
    pub fn spawn<Q: EventQueue + 'static>(queue: Q, config: WatcherConfig) -> Self {
        let (sender, events) = mpsc::channel(config.get_channel_size());
        let (stop, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            if let Err(e) = watch(&queue, &config, &sender, &mut stop_rx).await {
                log::error!("Watch of bucket {} failed: {e:?}", config.get_bucket());
                let _ = sender.send(Err(e)).await;
            }
            if config.get_delete_queue_on_close() {
                // Best effort only. A teardown failure must not take the
                // host process down with it.
                if let Err(e) = queue.delete_queue().await {
                    log::warn!("Failed to delete queue on shutdown: {e:?}");
                }
            }
        });
        Self {
            events,
            stop: Some(stop),
            handle,
        }
    }

    /// Receive the next event. Returns `None` once the watcher has been
    /// closed and all buffered events were consumed.
    pub async fn next_event(&mut self) -> Option<Result<WatchEvent>> {
        self.events.recv().await
    }

    /// Stop the watch loop and wait for it to finish, including the
    /// optional queue teardown. Buffered but unconsumed events are
    /// discarded.
    pub async fn close(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.events.close();
        if let Err(e) = self.handle.await {
            log::error!("Watch task ended abnormally: {e:?}");
        }
    }
}

async fn watch<Q: EventQueue>(
    queue: &Q,
    config: &WatcherConfig,
    sender: &mpsc::Sender<Result<WatchEvent>>,
    stop: &mut oneshot::Receiver<()>,
) -> Result<()> {
    if config.get_purge_before_watch() {
        queue.purge().await?;
    }

    loop {
        let messages = select! {
            _ = &mut *stop => {
                log::info!("Stop requested. Ending watch of bucket {}.", config.get_bucket());
                return Ok(());
            }
            received = queue.receive(
                config.get_max_messages_per_fetch(),
                config.get_wait_seconds(),
            ) => received?,
        };

        let num_messages = messages.len();
        log::debug!(
            "Received {num_messages} message{}",
            if num_messages == 1 { "" } else { "s" }
        );

        if messages.is_empty() {
            // The long poll already waited. Sleeping again is deliberate so
            // a queue that returns instantly with nothing cannot spin this
            // loop.
            select! {
                _ = &mut *stop => return Ok(()),
                () = sleep(Duration::from_secs(config.get_wait_seconds().into())) => {}
            }
            continue;
        }

        for message in messages {
            if !process_message(queue, config, sender, &message).await? {
                return Ok(());
            }
        }
    }
}

/// Expand one queue message into events and delete it. Deletion happens
/// unconditionally once the records were handed to the caller, even when
/// every record was filtered out: delivery is at most once from the loop's
/// point of view. Returns `Ok(false)` when the caller stopped consuming.
async fn process_message<Q: EventQueue>(
    queue: &Q,
    config: &WatcherConfig,
    sender: &mpsc::Sender<Result<WatchEvent>>,
    message: &QueueMessage,
) -> Result<bool> {
    let body: S3EventMessage = serde_json::from_str(&message.body)
        .with_context(|| format!("failed to parse body of message {} as S3 records", message.id))?;

    for record in &body.records {
        let Some(event) = map_record(record, config.get_bucket())? else {
            continue;
        };
        if let Some(prefix) = config.get_key_prefix() {
            if !event.key.starts_with(prefix) {
                log::debug!("Ignoring event for key {} outside prefix {prefix}", event.key);
                continue;
            }
        }
        if sender.send(Ok(event)).await.is_err() {
            // Receiver dropped: the caller stopped iterating.
            return Ok(false);
        }
    }

    log::info!("Processed and deleting message {}", message.id);
    queue.delete(message).await?;
    Ok(true)
}
