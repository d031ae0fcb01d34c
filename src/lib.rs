//! # `tasklight`
//!
//! An in-memory task tracking backend. The core is a [`store::TaskStore`]
//! that keeps the authoritative task collection transactionally consistent
//! with a derived full-text index, and a [`broadcast::TopicBroadcaster`]
//! that fans out change notifications to long-lived subscribers. The HTTP
//! server in [`server`] is a thin collaborator on top of those two.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod events;
pub mod server;
pub mod store;
pub mod timefmt;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
