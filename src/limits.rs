/// Default cap on active (pending or approved) appointments per user per book.
pub const MAX_ACTIVE_PER_USER_BOOK: usize = 2;

/// Broadcast buffer per book channel on the notify hub.
pub const NOTIFY_CHANNEL_CAPACITY: usize = 256;
