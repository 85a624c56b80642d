//! Durable content store backed by an append-only journal.

use super::{ContentIndex, ContentStore};
use crate::config::BlogConfig;
use crate::error::{BlogError, Result};
use crate::journal::Journal;
use crate::types::{
    BlogId, Post, PostPage, Question, QuestionId, QuestionList, Sequence, Timestamp,
};
use fs2::FileExt;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Magic bytes for the data directory manifest.
const STORE_MAGIC: &[u8; 4] = b"LBG\0";

/// Current data directory format version.
const STORE_VERSION: u8 = 1;

/// File name of the content journal.
const CONTENT_FILE: &str = "content.log";

/// One mutation of the content store, as written to the journal.
///
/// Post content is kept as the JSON text the client sent and decoded on read.
#[derive(Clone, Debug, Serialize, Deserialize)]
enum ContentEntry {
    PutPost {
        blog: BlogId,
        sequence: Sequence,
        content: String,
        timestamp: Timestamp,
    },
    PutQuestion {
        blog: BlogId,
        question: QuestionId,
        content: String,
        timestamp: Timestamp,
    },
    DeleteQuestion {
        blog: BlogId,
        question: QuestionId,
        timestamp: Timestamp,
    },
}

/// Content store persisted in a data directory.
pub struct ContentLog {
    path: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,

    journal: Journal<ContentEntry>,

    index: ContentIndex,

    /// Decoded posts by journal offset.
    cache: Mutex<LruCache<u64, Post>>,

    /// Serializes check-then-append for conditional writes.
    write_lock: Mutex<()>,
}

impl ContentLog {
    /// Open an existing data directory or create a new one.
    pub fn open_or_create(config: &BlogConfig) -> Result<Self> {
        if config.path.join("MANIFEST").exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(BlogError::NotInitialized)
        }
    }

    /// Create a new data directory.
    pub fn create(config: &BlogConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;
        Self::open(config)
    }

    /// Open an existing data directory, replaying the content journal.
    pub fn open(config: &BlogConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        let (journal, entries) =
            Journal::<ContentEntry>::open(config.path.join(CONTENT_FILE), config.sync_interval)?;

        let index = ContentIndex::new();
        let replayed = entries.len();
        for (offset, entry) in entries {
            Self::apply(&index, &entry, offset);
        }

        info!(
            path = %config.path.display(),
            entries = replayed,
            posts = index.post_count(),
            questions = index.question_count(),
            "opened content log"
        );

        let cache_size = NonZeroUsize::new(config.post_cache_size.max(1))
            .unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path: config.path.clone(),
            _lock_file: lock_file,
            journal,
            index,
            cache: Mutex::new(LruCache::new(cache_size)),
            write_lock: Mutex::new(()),
        })
    }

    /// Get the data directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Force pending writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.journal.sync()
    }

    /// Size of the content journal in bytes.
    pub fn size(&self) -> u64 {
        self.journal.size()
    }

    pub fn post_count(&self) -> usize {
        self.index.post_count()
    }

    pub fn question_count(&self) -> usize {
        self.index.question_count()
    }

    fn apply(index: &ContentIndex, entry: &ContentEntry, offset: u64) {
        match entry {
            ContentEntry::PutPost { blog, sequence, .. } => {
                index.set_post(blog, *sequence, offset);
            }
            ContentEntry::PutQuestion { blog, question, .. } => {
                index.set_question(blog, question, offset);
            }
            ContentEntry::DeleteQuestion { blog, question, .. } => {
                index.remove_question(blog, question);
            }
        }
    }

    fn post_entry(post: &Post) -> Result<ContentEntry> {
        Ok(ContentEntry::PutPost {
            blog: post.blog_id.clone(),
            sequence: post.sequence,
            content: serde_json::to_string(&post.content)?,
            timestamp: Timestamp::now(),
        })
    }

    fn read_post(&self, offset: u64) -> Result<Post> {
        if let Some(post) = self.cache.lock().get(&offset).cloned() {
            return Ok(post);
        }

        let post = match self.journal.read_at(offset)? {
            ContentEntry::PutPost {
                blog,
                sequence,
                content,
                ..
            } => Post {
                blog_id: blog,
                sequence,
                content: serde_json::from_str(&content)
                    .map_err(|e| BlogError::Deserialization(e.to_string()))?,
            },
            other => {
                return Err(BlogError::Corruption(format!(
                    "expected a post at offset {}, found {:?}",
                    offset, other
                )))
            }
        };

        self.cache.lock().put(offset, post.clone());
        Ok(post)
    }

    fn read_question(&self, offset: u64) -> Result<Question> {
        match self.journal.read_at(offset)? {
            ContentEntry::PutQuestion {
                blog,
                question,
                content,
                ..
            } => Ok(Question {
                blog_id: blog,
                question_id: question,
                content,
            }),
            other => Err(BlogError::Corruption(format!(
                "expected a question at offset {}, found {:?}",
                offset, other
            ))),
        }
    }

    // --- Private Helpers ---

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join("MANIFEST"))?;
        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;
        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let mut file = File::open(path.join("MANIFEST")).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BlogError::NotInitialized,
            _ => BlogError::Io(e),
        })?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(BlogError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(BlogError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| BlogError::Locked)?;
        Ok(lock_file)
    }
}

impl ContentStore for ContentLog {
    fn latest_post(&self, blog: &BlogId) -> Result<Option<Post>> {
        match self.index.latest_post(blog) {
            Some((_, offset)) => Ok(Some(self.read_post(offset)?)),
            None => Ok(None),
        }
    }

    fn get_post(&self, blog: &BlogId, sequence: Sequence) -> Result<Option<Post>> {
        match self.index.post_offset(blog, sequence) {
            Some(offset) => Ok(Some(self.read_post(offset)?)),
            None => Ok(None),
        }
    }

    fn query_posts(
        &self,
        blog: &BlogId,
        take: usize,
        before: Option<Sequence>,
    ) -> Result<PostPage> {
        if take == 0 {
            return Err(BlogError::InvalidInput("page size must be positive".into()));
        }

        // One extra row tells us where the next page starts
        let mut rows = self.index.posts_desc(blog, before, take + 1);
        let next_post = if rows.len() > take {
            rows.pop().map(|(sequence, _)| sequence)
        } else {
            None
        };

        let items = rows
            .into_iter()
            .map(|(_, offset)| self.read_post(offset))
            .collect::<Result<Vec<_>>>()?;

        Ok(PostPage { items, next_post })
    }

    fn insert_post(&self, post: &Post) -> Result<()> {
        let entry = Self::post_entry(post)?;

        let _lock = self.write_lock.lock();
        if self.index.post_offset(&post.blog_id, post.sequence).is_some() {
            return Err(BlogError::SequenceConflict {
                blog: post.blog_id.clone(),
                sequence: post.sequence,
            });
        }

        let offset = self.journal.append(&entry)?;
        self.index.set_post(&post.blog_id, post.sequence, offset);
        self.cache.lock().put(offset, post.clone());

        debug!(blog = %post.blog_id, sequence = %post.sequence, offset, "inserted post");
        Ok(())
    }

    fn put_post(&self, post: &Post) -> Result<()> {
        let entry = Self::post_entry(post)?;

        let _lock = self.write_lock.lock();
        let offset = self.journal.append(&entry)?;
        let replaced = self.index.set_post(&post.blog_id, post.sequence, offset);
        self.cache.lock().put(offset, post.clone());

        debug!(blog = %post.blog_id, sequence = %post.sequence, offset, replaced, "stored post");
        Ok(())
    }

    fn put_question(&self, question: &Question) -> Result<()> {
        let entry = ContentEntry::PutQuestion {
            blog: question.blog_id.clone(),
            question: question.question_id.clone(),
            content: question.content.clone(),
            timestamp: Timestamp::now(),
        };

        let _lock = self.write_lock.lock();
        let offset = self.journal.append(&entry)?;
        self.index
            .set_question(&question.blog_id, &question.question_id, offset);

        debug!(blog = %question.blog_id, question = %question.question_id, "stored question");
        Ok(())
    }

    fn delete_question(&self, blog: &BlogId, question: &QuestionId) -> Result<bool> {
        let _lock = self.write_lock.lock();
        if !self.index.has_question(blog, question) {
            return Ok(false);
        }

        let entry = ContentEntry::DeleteQuestion {
            blog: blog.clone(),
            question: question.clone(),
            timestamp: Timestamp::now(),
        };
        self.journal.append(&entry)?;
        self.index.remove_question(blog, question);

        debug!(blog = %blog, question = %question, "deleted question");
        Ok(true)
    }

    fn query_questions(&self, blog: &BlogId, take: usize) -> Result<QuestionList> {
        let items = self
            .index
            .question_offsets(blog, take)
            .into_iter()
            .map(|offset| self.read_question(offset))
            .collect::<Result<Vec<_>>>()?;

        Ok(QuestionList { items })
    }
}

impl Drop for ContentLog {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.journal.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> BlogConfig {
        BlogConfig {
            path: dir.path().join("data"),
            ..Default::default()
        }
    }

    fn post(blog: &str, sequence: u64, text: &str) -> Post {
        Post {
            blog_id: BlogId::new(blog).unwrap(),
            sequence: Sequence(sequence),
            content: json!({ "text": text }),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let dir = TempDir::new().unwrap();
        let log = ContentLog::open_or_create(&test_config(&dir)).unwrap();
        let blog = BlogId::new("b").unwrap();

        assert!(log.latest_post(&blog).unwrap().is_none());

        log.insert_post(&post("b", 1, "one")).unwrap();
        log.insert_post(&post("b", 2, "two")).unwrap();

        assert_eq!(log.latest_post(&blog).unwrap(), Some(post("b", 2, "two")));
        assert_eq!(
            log.get_post(&blog, Sequence(1)).unwrap(),
            Some(post("b", 1, "one"))
        );
    }

    #[test]
    fn test_insert_conflict() {
        let dir = TempDir::new().unwrap();
        let log = ContentLog::open_or_create(&test_config(&dir)).unwrap();

        log.insert_post(&post("b", 1, "first")).unwrap();
        let result = log.insert_post(&post("b", 1, "second"));
        assert!(matches!(result, Err(BlogError::SequenceConflict { .. })));

        // The first write is untouched
        let blog = BlogId::new("b").unwrap();
        assert_eq!(
            log.get_post(&blog, Sequence(1)).unwrap(),
            Some(post("b", 1, "first"))
        );
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let log = ContentLog::open_or_create(&test_config(&dir)).unwrap();
        let blog = BlogId::new("b").unwrap();

        log.insert_post(&post("b", 1, "draft")).unwrap();
        log.put_post(&post("b", 1, "edited")).unwrap();

        assert_eq!(log.post_count(), 1);
        assert_eq!(
            log.get_post(&blog, Sequence(1)).unwrap(),
            Some(post("b", 1, "edited"))
        );
    }

    #[test]
    fn test_query_posts_pages() {
        let dir = TempDir::new().unwrap();
        let log = ContentLog::open_or_create(&test_config(&dir)).unwrap();
        let blog = BlogId::new("b").unwrap();

        for i in 1..=7 {
            log.insert_post(&post("b", i, "x")).unwrap();
        }

        let page = log.query_posts(&blog, 3, None).unwrap();
        let seqs: Vec<_> = page.items.iter().map(|p| p.sequence.0).collect();
        assert_eq!(seqs, vec![7, 6, 5]);
        assert_eq!(page.next_post, Some(Sequence(4)));

        let page = log.query_posts(&blog, 3, page.next_post).unwrap();
        let seqs: Vec<_> = page.items.iter().map(|p| p.sequence.0).collect();
        assert_eq!(seqs, vec![4, 3, 2]);

        let page = log.query_posts(&blog, 3, page.next_post).unwrap();
        let seqs: Vec<_> = page.items.iter().map(|p| p.sequence.0).collect();
        assert_eq!(seqs, vec![1]);
        assert_eq!(page.next_post, None);

        assert!(log.query_posts(&blog, 0, None).is_err());
    }

    #[test]
    fn test_questions() {
        let dir = TempDir::new().unwrap();
        let log = ContentLog::open_or_create(&test_config(&dir)).unwrap();
        let blog = BlogId::new("b").unwrap();

        let question = Question {
            blog_id: blog.clone(),
            question_id: QuestionId::generate(),
            content: "why?".into(),
        };
        log.put_question(&question).unwrap();
        assert_eq!(log.query_questions(&blog, 25).unwrap().items, vec![question.clone()]);

        assert!(log.delete_question(&blog, &question.question_id).unwrap());
        assert!(!log.delete_question(&blog, &question.question_id).unwrap());
        assert!(log.query_questions(&blog, 25).unwrap().items.is_empty());
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let blog = BlogId::new("b").unwrap();
        let kept = QuestionId::generate();
        let removed = QuestionId::generate();

        {
            let log = ContentLog::open_or_create(&config).unwrap();
            for i in 1..=3 {
                log.insert_post(&post("b", i, "x")).unwrap();
            }
            log.put_post(&post("b", 2, "edited")).unwrap();
            for id in [&kept, &removed] {
                log.put_question(&Question {
                    blog_id: blog.clone(),
                    question_id: id.clone(),
                    content: "q".into(),
                })
                .unwrap();
            }
            log.delete_question(&blog, &removed).unwrap();
        }

        let log = ContentLog::open_or_create(&config).unwrap();
        assert_eq!(log.post_count(), 3);
        assert_eq!(
            log.get_post(&blog, Sequence(2)).unwrap(),
            Some(post("b", 2, "edited"))
        );
        let questions = log.query_questions(&blog, 25).unwrap();
        assert_eq!(questions.items.len(), 1);
        assert_eq!(questions.items[0].question_id, kept);
    }

    #[test]
    fn test_exclusive_lock() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let _log = ContentLog::open_or_create(&config).unwrap();
        let second = ContentLog::open_or_create(&config);
        assert!(matches!(second, Err(BlogError::Locked)));
    }

    #[test]
    fn test_missing_directory_without_create() {
        let dir = TempDir::new().unwrap();
        let config = BlogConfig {
            create_if_missing: false,
            ..test_config(&dir)
        };

        let result = ContentLog::open_or_create(&config);
        assert!(matches!(result, Err(BlogError::NotInitialized)));
    }
}
