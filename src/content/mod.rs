//! Content store: per-blog feeds of posts and sets of open questions.
//!
//! [`ContentStore`] is the narrow query interface the rest of the blog uses.
//! [`ContentLog`] implements it over a durable append-only journal with
//! in-memory indices rebuilt on open.

mod index;
mod log;

pub use self::index::ContentIndex;
pub use self::log::ContentLog;

use crate::error::Result;
use crate::types::{BlogId, Post, PostPage, Question, QuestionId, QuestionList, Sequence};

/// Ordered key-value access to posts and questions.
pub trait ContentStore: Send + Sync {
    /// Most recent post of a blog (strongly consistent).
    fn latest_post(&self, blog: &BlogId) -> Result<Option<Post>>;

    fn get_post(&self, blog: &BlogId, sequence: Sequence) -> Result<Option<Post>>;

    /// Up to `take` posts, newest first, starting at `before` (inclusive) or
    /// at the latest post. `next_post` names the newest post left out below
    /// the page.
    fn query_posts(&self, blog: &BlogId, take: usize, before: Option<Sequence>)
        -> Result<PostPage>;

    /// Store a new post. Fails with `SequenceConflict` if its sequence is
    /// already taken.
    fn insert_post(&self, post: &Post) -> Result<()>;

    /// Store a post, overwriting any existing one with the same sequence.
    fn put_post(&self, post: &Post) -> Result<()>;

    fn put_question(&self, question: &Question) -> Result<()>;

    /// Remove a question. Returns false if it did not exist.
    fn delete_question(&self, blog: &BlogId, question: &QuestionId) -> Result<bool>;

    /// Up to `take` open questions of a blog.
    fn query_questions(&self, blog: &BlogId, take: usize) -> Result<QuestionList>;
}
