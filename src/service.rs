//! Content mutations and reads for live blogs.

use crate::broadcast::Broadcaster;
use crate::config::BlogConfig;
use crate::content::ContentStore;
use crate::error::{BlogError, Result};
use crate::types::{
    BlogId, Post, PostPage, Question, QuestionId, QuestionList, QuestionTombstone, Sequence, Topic,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Persists posts and questions and pushes every change to live subscribers.
///
/// Each mutation is durable before its broadcast starts. A broadcast failure
/// is returned as the result of the call; the stored data stays in place.
#[derive(Clone)]
pub struct LiveBlog {
    content: Arc<dyn ContentStore>,
    broadcaster: Broadcaster,
    config: BlogConfig,
}

impl LiveBlog {
    pub fn new(content: Arc<dyn ContentStore>, broadcaster: Broadcaster, config: BlogConfig) -> Self {
        Self {
            content,
            broadcaster,
            config,
        }
    }

    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn config(&self) -> &BlogConfig {
        &self.config
    }

    /// Append a post to the end of a blog's feed.
    ///
    /// The next sequence is claimed with a conditional insert. Losing a race
    /// to a concurrent creator re-reads the latest post and tries again.
    #[instrument(skip_all, fields(blog = %blog))]
    pub async fn create_post(&self, blog: &BlogId, content: serde_json::Value) -> Result<Post> {
        let attempts = self.config.max_sequence_retries.max(1);
        let mut post = Post {
            blog_id: blog.clone(),
            sequence: Sequence::FIRST,
            content,
        };

        let mut claimed = false;
        for attempt in 1..=attempts {
            post.sequence = match self.content.latest_post(blog)? {
                Some(latest) => latest.sequence.next(),
                None => Sequence::FIRST,
            };
            match self.content.insert_post(&post) {
                Ok(()) => {
                    claimed = true;
                    break;
                }
                Err(BlogError::SequenceConflict { sequence, .. }) => {
                    debug!(%sequence, attempt, "sequence taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        if !claimed {
            return Err(BlogError::SequenceConflict {
                blog: blog.clone(),
                sequence: post.sequence,
            });
        }

        info!(sequence = %post.sequence, "created post");
        self.broadcaster.broadcast(Topic::Posts, &post).await?;
        Ok(post)
    }

    /// Replace the content of an existing post and push the edit.
    #[instrument(skip_all, fields(blog = %blog, sequence = %sequence))]
    pub async fn update_post(
        &self,
        blog: &BlogId,
        sequence: Sequence,
        content: serde_json::Value,
    ) -> Result<Post> {
        if self.content.get_post(blog, sequence)?.is_none() {
            return Err(BlogError::PostNotFound {
                blog: blog.clone(),
                sequence,
            });
        }

        let post = Post {
            blog_id: blog.clone(),
            sequence,
            content,
        };
        self.content.put_post(&post)?;

        info!("updated post");
        self.broadcaster.broadcast(Topic::Posts, &post).await?;
        Ok(post)
    }

    /// Store a reader question under a fresh id.
    #[instrument(skip_all, fields(blog = %blog))]
    pub async fn create_question(&self, blog: &BlogId, text: &str) -> Result<Question> {
        if text.trim().is_empty() {
            return Err(BlogError::InvalidInput("question text is empty".into()));
        }

        let question = Question {
            blog_id: blog.clone(),
            question_id: QuestionId::generate(),
            content: text.to_string(),
        };
        self.content.put_question(&question)?;

        info!(question = %question.question_id, "created question");
        self.broadcaster.broadcast(Topic::Questions, &question).await?;
        Ok(question)
    }

    /// Remove a question and push its tombstone.
    ///
    /// Deleting a question that is already gone still pushes the tombstone,
    /// so late subscribers converge.
    #[instrument(skip_all, fields(blog = %blog, question = %question))]
    pub async fn delete_question(&self, blog: &BlogId, question: &QuestionId) -> Result<()> {
        let existed = self.content.delete_question(blog, question)?;
        if existed {
            info!("deleted question");
        } else {
            debug!("question already deleted");
        }

        let tombstone = QuestionTombstone::new(question.clone());
        self.broadcaster.broadcast(Topic::Questions, &tombstone).await?;
        Ok(())
    }

    /// One page of a blog's feed, newest first, ending at `before` when given.
    pub fn list_posts(&self, blog: &BlogId, before: Option<Sequence>) -> Result<PostPage> {
        self.content.query_posts(blog, self.config.page_size, before)
    }

    pub fn list_questions(&self, blog: &BlogId) -> Result<QuestionList> {
        self.content
            .query_questions(blog, self.config.question_page_size)
    }
}
