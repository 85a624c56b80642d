//! Journal-backed subscriber registry.

use super::{RegistryPage, SubscriberRegistry, DEFAULT_REGISTRY_PAGE_SIZE};
use crate::error::Result;
use crate::journal::Journal;
use crate::types::{ChannelId, Timestamp, Topic};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Registry mutation, as written to a topic's journal.
#[derive(Clone, Debug, Serialize, Deserialize)]
enum RegistryEntry {
    Register {
        channel: ChannelId,
        timestamp: Timestamp,
    },
    Deregister {
        channel: ChannelId,
        timestamp: Timestamp,
    },
}

/// One topic's channel set and its journal.
struct TopicTable {
    journal: Journal<RegistryEntry>,
    channels: RwLock<BTreeSet<ChannelId>>,
}

impl TopicTable {
    /// Open a topic journal, replay it, then compact it down to one
    /// `Register` entry per live channel.
    fn open(path: PathBuf) -> Result<Self> {
        let (journal, entries) = Journal::<RegistryEntry>::open(&path, 1)?;

        let replayed = entries.len();
        let mut channels = BTreeSet::new();
        for (_, entry) in entries {
            match entry {
                RegistryEntry::Register { channel, .. } => {
                    channels.insert(channel);
                }
                RegistryEntry::Deregister { channel, .. } => {
                    channels.remove(&channel);
                }
            }
        }

        if replayed > channels.len() {
            let timestamp = Timestamp::now();
            let live: Vec<_> = channels
                .iter()
                .map(|channel| RegistryEntry::Register {
                    channel: channel.clone(),
                    timestamp,
                })
                .collect();
            journal.rewrite(&live)?;
        }

        info!(
            path = %path.display(),
            entries = replayed,
            channels = channels.len(),
            "opened registry journal"
        );

        Ok(Self {
            journal,
            channels: RwLock::new(channels),
        })
    }
}

/// Subscriber registry persisted as one journal file per topic.
pub struct JournalRegistry {
    path: PathBuf,
    posts: TopicTable,
    questions: TopicTable,
    page_size: usize,
}

impl JournalRegistry {
    /// Open (or create) the registry journals in a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_page_size(path, DEFAULT_REGISTRY_PAGE_SIZE)
    }

    /// Open with a custom scan page size.
    pub fn open_with_page_size(path: impl AsRef<Path>, page_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        Ok(Self {
            posts: TopicTable::open(Self::journal_path(&path, Topic::Posts))?,
            questions: TopicTable::open(Self::journal_path(&path, Topic::Questions))?,
            path,
            page_size: page_size.max(1),
        })
    }

    /// Get the registry directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn journal_path(dir: &Path, topic: Topic) -> PathBuf {
        dir.join(format!("{}-connections.journal", topic.as_str()))
    }

    fn table(&self, topic: Topic) -> &TopicTable {
        match topic {
            Topic::Posts => &self.posts,
            Topic::Questions => &self.questions,
        }
    }
}

impl SubscriberRegistry for JournalRegistry {
    fn register(&self, topic: Topic, channel: &ChannelId) -> Result<()> {
        let table = self.table(topic);
        let mut channels = table.channels.write();
        if channels.contains(channel) {
            return Ok(());
        }

        table.journal.append(&RegistryEntry::Register {
            channel: channel.clone(),
            timestamp: Timestamp::now(),
        })?;
        channels.insert(channel.clone());

        debug!(%topic, %channel, "registered channel");
        Ok(())
    }

    fn deregister(&self, topic: Topic, channel: &ChannelId) -> Result<()> {
        let table = self.table(topic);
        let mut channels = table.channels.write();
        if !channels.contains(channel) {
            return Ok(());
        }

        table.journal.append(&RegistryEntry::Deregister {
            channel: channel.clone(),
            timestamp: Timestamp::now(),
        })?;
        channels.remove(channel);

        debug!(%topic, %channel, "deregistered channel");
        Ok(())
    }

    fn scan(
        &self,
        topic: Topic,
        start_after: Option<&ChannelId>,
        limit: usize,
    ) -> Result<RegistryPage> {
        let channels = self.table(topic).channels.read();
        let lower = match start_after {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };

        let mut range = channels.range::<ChannelId, _>((lower, Bound::Unbounded));
        let page: Vec<ChannelId> = range.by_ref().take(limit).cloned().collect();
        let last = if range.next().is_some() {
            page.last().cloned()
        } else {
            None
        };

        Ok(RegistryPage {
            channels: page,
            last,
        })
    }

    fn count(&self, topic: Topic) -> Result<usize> {
        Ok(self.table(topic).channels.read().len())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
