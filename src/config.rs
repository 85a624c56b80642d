//! Blog configuration.

use std::path::PathBuf;

/// Configuration for opening a live blog data directory.
#[derive(Clone, Debug)]
pub struct BlogConfig {
    /// Base path for content and registry files.
    pub path: PathBuf,

    /// Whether to create the data directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Decoded posts kept in memory (number of posts).
    pub post_cache_size: usize,

    /// Sync the content log every N writes (0 or 1 = every write).
    pub sync_interval: u64,

    /// Posts per page when listing a feed.
    pub page_size: usize,

    /// Questions returned by a question listing.
    pub question_page_size: usize,

    /// Attempts at claiming the next sequence before giving up.
    pub max_sequence_retries: usize,

    /// Channel ids read per registry page during a broadcast.
    pub registry_page_size: usize,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./liveblog-data"),
            create_if_missing: true,
            post_cache_size: 1000,
            sync_interval: 1,
            page_size: 25,
            question_page_size: 25,
            max_sequence_retries: 5,
            registry_page_size: 500,
        }
    }
}
