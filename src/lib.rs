//! # Live Blog
//!
//! A live-blogging backend: authors append posts to a numbered feed per blog,
//! readers ask questions, and every change is pushed to connected readers as
//! it happens.
//!
//! ## Core Concepts
//!
//! - **Content**: Durable per-blog feeds of posts and sets of open questions
//! - **Registry**: Durable set of live push channels per topic
//! - **Broadcast**: Concurrent fan-out that prunes channels found gone
//! - **Channels**: WebSocket sessions attached to an in-process hub
//!
//! ## Example
//!
//! ```ignore
//! use liveblog::{api, AppState, BlogConfig, BlogId, HubConfig};
//!
//! let state = AppState::open(
//!     BlogConfig {
//!         path: "./blog-data".into(),
//!         ..Default::default()
//!     },
//!     HubConfig::default(),
//! )?;
//!
//! let post = state
//!     .blog
//!     .create_post(&BlogId::new("final")?, json!({"text": "Kick-off!"}))
//!     .await?;
//!
//! axum::serve(listener, api::router(state)).await?;
//! ```

pub mod api;
pub mod broadcast;
pub mod channels;
pub mod config;
pub mod content;
pub mod error;
pub mod journal;
pub mod registry;
pub mod service;
pub mod types;

// Re-exports
pub use api::{router, AppState};
pub use broadcast::{BroadcastReport, Broadcaster, DeliveryError, Transport};
pub use channels::{ChannelHub, ChannelLifecycle, HubConfig, PushChannels};
pub use config::BlogConfig;
pub use content::{ContentLog, ContentStore};
pub use error::{BlogError, Result};
pub use registry::{JournalRegistry, RegistryPage, SubscriberRegistry};
pub use service::LiveBlog;
pub use types::{
    BlogId, ChannelId, Post, PostPage, Question, QuestionId, QuestionList, QuestionTombstone,
    Sequence, Timestamp, Topic,
};
