//! In-memory indices over the content log.

use crate::types::{BlogId, QuestionId, Sequence};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Maps post and question keys to the offset of their latest log entry.
pub struct ContentIndex {
    /// blog -> sequence -> offset.
    posts: RwLock<HashMap<BlogId, BTreeMap<Sequence, u64>>>,

    /// blog -> question -> offset.
    questions: RwLock<HashMap<BlogId, BTreeMap<QuestionId, u64>>>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self {
            posts: RwLock::new(HashMap::new()),
            questions: RwLock::new(HashMap::new()),
        }
    }

    /// Point a post key at a new entry. Returns true if the key already existed.
    pub fn set_post(&self, blog: &BlogId, sequence: Sequence, offset: u64) -> bool {
        self.posts
            .write()
            .entry(blog.clone())
            .or_default()
            .insert(sequence, offset)
            .is_some()
    }

    pub fn post_offset(&self, blog: &BlogId, sequence: Sequence) -> Option<u64> {
        self.posts
            .read()
            .get(blog)
            .and_then(|posts| posts.get(&sequence).copied())
    }

    /// Highest sequence stored for a blog.
    pub fn latest_post(&self, blog: &BlogId) -> Option<(Sequence, u64)> {
        self.posts
            .read()
            .get(blog)
            .and_then(|posts| posts.last_key_value().map(|(s, o)| (*s, *o)))
    }

    /// Up to `limit` posts at or below `before`, newest first.
    pub fn posts_desc(
        &self,
        blog: &BlogId,
        before: Option<Sequence>,
        limit: usize,
    ) -> Vec<(Sequence, u64)> {
        let posts = self.posts.read();
        let Some(posts) = posts.get(blog) else {
            return Vec::new();
        };

        match before {
            Some(before) => posts
                .range(..=before)
                .rev()
                .take(limit)
                .map(|(s, o)| (*s, *o))
                .collect(),
            None => posts
                .iter()
                .rev()
                .take(limit)
                .map(|(s, o)| (*s, *o))
                .collect(),
        }
    }

    pub fn set_question(&self, blog: &BlogId, question: &QuestionId, offset: u64) {
        self.questions
            .write()
            .entry(blog.clone())
            .or_default()
            .insert(question.clone(), offset);
    }

    pub fn has_question(&self, blog: &BlogId, question: &QuestionId) -> bool {
        self.questions
            .read()
            .get(blog)
            .is_some_and(|q| q.contains_key(question))
    }

    /// Remove a question. Returns false if it was not present.
    pub fn remove_question(&self, blog: &BlogId, question: &QuestionId) -> bool {
        let mut questions = self.questions.write();
        let Some(entries) = questions.get_mut(blog) else {
            return false;
        };
        let removed = entries.remove(question).is_some();
        if entries.is_empty() {
            questions.remove(blog);
        }
        removed
    }

    /// Offsets of up to `limit` questions of a blog, in id order.
    pub fn question_offsets(&self, blog: &BlogId, limit: usize) -> Vec<u64> {
        self.questions
            .read()
            .get(blog)
            .map(|q| q.values().take(limit).copied().collect())
            .unwrap_or_default()
    }

    /// Number of posts across all blogs.
    pub fn post_count(&self) -> usize {
        self.posts.read().values().map(BTreeMap::len).sum()
    }

    /// Number of open questions across all blogs.
    pub fn question_count(&self) -> usize {
        self.questions.read().values().map(BTreeMap::len).sum()
    }
}

impl Default for ContentIndex {
    fn default() -> Self {
        Self::new()
    }
}
