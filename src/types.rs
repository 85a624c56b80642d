//! Core types for the live blog.

use crate::error::{BlogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest blog id accepted, in bytes.
pub const MAX_BLOG_ID_LEN: usize = 256;

/// Identifier of one blog (one feed of posts and its questions).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlogId(String);

impl BlogId {
    /// Validate and wrap a blog id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(BlogError::InvalidInput("blog id is empty".into()));
        }
        if id.len() > MAX_BLOG_ID_LEN {
            return Err(BlogError::InvalidInput(format!(
                "blog id longer than {} bytes",
                MAX_BLOG_ID_LEN
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(BlogError::InvalidInput(
                "blog id contains control characters".into(),
            ));
        }
        Ok(BlogId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BlogId {
    type Error = BlogError;

    fn try_from(value: String) -> Result<Self> {
        BlogId::new(value)
    }
}

impl From<BlogId> for String {
    fn from(id: BlogId) -> Self {
        id.0
    }
}

impl fmt::Debug for BlogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlogId({})", self.0)
    }
}

impl fmt::Display for BlogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a post in its blog's feed. Stored posts start at 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl Sequence {
    /// Sequence of the first post in a feed.
    pub const FIRST: Sequence = Sequence(1);

    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }

    /// Previous stored position, `None` below the first post.
    pub fn prev(self) -> Option<Self> {
        if self.0 > 1 {
            Some(Sequence(self.0 - 1))
        } else {
            None
        }
    }

    /// Parse a sequence from a path segment.
    pub fn parse(s: &str) -> Result<Self> {
        match s.parse::<u64>() {
            Ok(n) if n >= 1 => Ok(Sequence(n)),
            _ => Err(BlogError::InvalidInput(format!("invalid post sequence: {:?}", s))),
        }
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a question, unique for the lifetime of a blog.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Generate a fresh collision-resistant id.
    pub fn generate() -> Self {
        QuestionId(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Accept a client-supplied id. Only emptiness is rejected; unknown ids
    /// are handled by the store.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(BlogError::InvalidInput("question id is empty".into()));
        }
        Ok(QuestionId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one live push channel.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Generate an id for a newly opened channel.
    pub fn generate() -> Self {
        ChannelId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        ChannelId(s.to_string())
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Broadcast topic. Each topic has its own registry and push endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Posts,
    Questions,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Posts, Topic::Questions];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Posts => "posts",
            Topic::Questions => "questions",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. A clock before the epoch reads as zero.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// One entry in a blog's feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub blog_id: BlogId,
    pub sequence: Sequence,
    /// Opaque rich-text document; the server never looks inside.
    pub content: serde_json::Value,
}

/// A reader question awaiting an answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub blog_id: BlogId,
    pub question_id: QuestionId,
    pub content: String,
}

/// Push payload announcing that a question was removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTombstone {
    pub deleted: bool,
    pub question_id: QuestionId,
}

impl QuestionTombstone {
    pub fn new(question_id: QuestionId) -> Self {
        Self {
            deleted: true,
            question_id,
        }
    }
}

/// A page of posts, most recent first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub items: Vec<Post>,
    /// Sequence of the newest post older than this page, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_post: Option<Sequence>,
}

/// Questions currently open on a blog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionList {
    pub items: Vec<Question>,
}
