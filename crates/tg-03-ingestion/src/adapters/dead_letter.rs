//! # Dead Letter Sinks
//!
//! - `InMemoryDeadLetterSink`: bounded ring, oldest dropped first
//! - `FileDeadLetterSink`: one JSON object per line, appended

use crate::domain::alerts::DeadLetter;
use crate::ports::outbound::{DeadLetterError, DeadLetterSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Bounded in-memory dead letter queue.
pub struct InMemoryDeadLetterSink {
    letters: Mutex<VecDeque<DeadLetter>>,
    capacity: usize,
}

impl InMemoryDeadLetterSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            letters: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot, oldest first.
    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.letters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.lock().is_empty()
    }
}

impl Default for InMemoryDeadLetterSink {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn write(&self, letter: DeadLetter) -> Result<(), DeadLetterError> {
        let mut letters = self.letters.lock();
        if letters.len() == self.capacity {
            letters.pop_front();
        }
        letters.push_back(letter);
        Ok(())
    }
}

/// Appends dead letters to a JSON-lines file.
pub struct FileDeadLetterSink {
    path: PathBuf,
    // Serialises appends so concurrent lines never interleave.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileDeadLetterSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DeadLetterSink for FileDeadLetterSink {
    async fn write(&self, letter: DeadLetter) -> Result<(), DeadLetterError> {
        let mut line = serde_json::to_vec(&letter)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
