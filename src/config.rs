/// SQS caps a single receive at 10 messages.
pub const MAX_MESSAGES_PER_FETCH_CAP: u32 = 10;

/// SQS caps long-poll waits at 20 seconds.
pub const LONG_POLL_WAIT_CAP_SECONDS: u32 = 20;

/// Name of the queue created for a bucket when none is given explicitly.
pub fn default_queue_name(bucket: &str) -> String {
    format!("{bucket}-watch")
}

/// Configuration for a [`crate::watcher::Watcher`], captured at
/// construction and read-only afterwards.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    bucket: String,
    key_prefix: Option<String>,
    wait_seconds: u32,
    max_messages_per_fetch: u32,
    purge_before_watch: bool,
    delete_queue_on_close: bool,
    channel_size: usize,
}

impl WatcherConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key_prefix: None,
            wait_seconds: 3,
            max_messages_per_fetch: MAX_MESSAGES_PER_FETCH_CAP,
            purge_before_watch: false,
            delete_queue_on_close: false,
            channel_size: 100,
        }
    }

    /// Only emit events whose decoded key starts with `prefix`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_wait_seconds(mut self, wait_seconds: u32) -> Self {
        self.wait_seconds = wait_seconds;
        self
    }

    pub fn with_max_messages_per_fetch(mut self, max_messages: u32) -> Self {
        self.max_messages_per_fetch = max_messages.clamp(1, MAX_MESSAGES_PER_FETCH_CAP);
        self
    }

    pub fn with_purge_before_watch(mut self, purge: bool) -> Self {
        self.purge_before_watch = purge;
        self
    }

    pub fn with_delete_queue_on_close(mut self, delete: bool) -> Self {
        self.delete_queue_on_close = delete;
        self
    }

    pub fn with_channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size.max(1);
        self
    }

    pub fn get_bucket(&self) -> &str {
        &self.bucket
    }

    pub fn get_key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    pub const fn get_wait_seconds(&self) -> u32 {
        self.wait_seconds
    }

    pub const fn get_max_messages_per_fetch(&self) -> u32 {
        self.max_messages_per_fetch
    }

    pub const fn get_purge_before_watch(&self) -> bool {
        self.purge_before_watch
    }

    pub const fn get_delete_queue_on_close(&self) -> bool {
        self.delete_queue_on_close
    }

    pub const fn get_channel_size(&self) -> usize {
        self.channel_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = WatcherConfig::new("logs-bucket");
        assert_eq!(config.get_bucket(), "logs-bucket");
        assert_eq!(config.get_key_prefix(), None);
        assert_eq!(config.get_wait_seconds(), 3);
        assert_eq!(config.get_max_messages_per_fetch(), 10);
        assert!(!config.get_purge_before_watch());
        assert!(!config.get_delete_queue_on_close());
    }

    #[test]
    fn max_messages_is_clamped_to_the_platform_cap() {
        let config = WatcherConfig::new("b").with_max_messages_per_fetch(50);
        assert_eq!(config.get_max_messages_per_fetch(), 10);
        let config = WatcherConfig::new("b").with_max_messages_per_fetch(0);
        assert_eq!(config.get_max_messages_per_fetch(), 1);
    }

    #[test]
    fn queue_name_is_derived_from_the_bucket() {
        assert_eq!(default_queue_name("logs-bucket"), "logs-bucket-watch");
    }
}
