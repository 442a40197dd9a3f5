mod notification;

pub use notification::ensure_notification;
