//! Watch an S3 bucket for object changes through SQS bucket notifications.
//!
//! A [`Watcher`] polls a queue fed by the bucket's notification
//! configuration and yields one normalized [`WatchEvent`] per change.
//! [`infra::ensure_notification`] sets up the queue, its access policy,
//! and the notification rule in one shot.

pub mod config;
pub mod event;
pub mod infra;
pub mod mapper;
pub mod queue;
pub mod record;
pub mod utils;
pub mod watcher;

pub use config::{WatcherConfig, default_queue_name};
pub use event::{EventKind, WatchEvent};
pub use queue::{EventQueue, QueueMessage, SqsQueue};
pub use watcher::Watcher;
