use std::time::Duration;

/// Upper bound on a single peer message.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);
