//! Subscriber registry: which push channels are live, per topic.
//!
//! The registry is a best-effort cache of channel liveness. Channels are
//! added when they open and removed when they close, but a channel can
//! vanish without a close event, so a failed delivery during a broadcast is
//! the authoritative signal that an entry is stale.

mod journal;

pub use self::journal::JournalRegistry;

use crate::error::Result;
use crate::types::{ChannelId, Topic};
use std::collections::BTreeSet;

/// Channel ids read per page when no size is configured.
pub const DEFAULT_REGISTRY_PAGE_SIZE: usize = 500;

/// One page of a registry scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryPage {
    pub channels: Vec<ChannelId>,
    /// Cursor for the next page; `None` once the scan is complete.
    pub last: Option<ChannelId>,
}

/// Durable set of live channel ids, one independent set per topic.
pub trait SubscriberRegistry: Send + Sync {
    /// Add a channel. Registering a present channel is a no-op.
    fn register(&self, topic: Topic, channel: &ChannelId) -> Result<()>;

    /// Remove a channel. Removing an absent channel is a no-op.
    fn deregister(&self, topic: Topic, channel: &ChannelId) -> Result<()>;

    /// Up to `limit` channels ordered by id, strictly after `start_after`.
    fn scan(
        &self,
        topic: Topic,
        start_after: Option<&ChannelId>,
        limit: usize,
    ) -> Result<RegistryPage>;

    /// Number of channels registered under a topic.
    fn count(&self, topic: Topic) -> Result<usize>;

    /// Page size used by [`SubscriberRegistry::list_all`].
    fn page_size(&self) -> usize {
        DEFAULT_REGISTRY_PAGE_SIZE
    }

    /// Every channel registered under a topic, read page by page.
    fn list_all(&self, topic: Topic) -> Result<BTreeSet<ChannelId>> {
        let limit = self.page_size().max(1);
        let mut all = BTreeSet::new();
        let mut cursor: Option<ChannelId> = None;

        loop {
            let page = self.scan(topic, cursor.as_ref(), limit)?;
            all.extend(page.channels);
            match page.last {
                Some(last) => cursor = Some(last),
                None => break,
            }
        }

        Ok(all)
    }
}
