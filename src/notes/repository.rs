//! Note storage
//!
//! The repository is a collaborator of the streaming core; the bundled
//! implementation keeps notes in memory.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::protocol::Note;

use super::error::NotesError;

/// Persistence contract used by the note service
pub trait NoteRepository: Send + Sync + 'static {
    /// Store a new note and return it with its assigned id
    fn create(
        &self,
        user_id: i64,
        title: String,
        content: String,
    ) -> impl Future<Output = Result<Note, NotesError>> + Send;

    /// Fetch a note by id
    fn get(&self, id: i64) -> impl Future<Output = Result<Note, NotesError>> + Send;

    /// All notes of a user, ordered by id
    fn list_by_user(&self, user_id: i64) -> impl Future<Output = Result<Vec<Note>, NotesError>> + Send;

    /// Remove a note
    fn delete(&self, id: i64) -> impl Future<Output = Result<(), NotesError>> + Send;
}

/// In-memory note repository
pub struct MemoryNoteRepository {
    notes: RwLock<BTreeMap<i64, Note>>,
    next_id: AtomicI64,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored notes
    pub async fn len(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notes.read().await.is_empty()
    }
}

impl Default for MemoryNoteRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteRepository for MemoryNoteRepository {
    async fn create(&self, user_id: i64, title: String, content: String) -> Result<Note, NotesError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let note = Note {
            id,
            user_id,
            title,
            content,
            created_at: now,
            updated_at: now,
        };

        self.notes.write().await.insert(id, note.clone());
        tracing::debug!(note_id = id, user_id = user_id, "Note stored");

        Ok(note)
    }

    async fn get(&self, id: i64) -> Result<Note, NotesError> {
        self.notes
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(NotesError::NotFound(id))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Note>, NotesError> {
        let notes = self.notes.read().await;
        Ok(notes
            .values()
            .filter(|note| note.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), NotesError> {
        match self.notes.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(NotesError::NotFound(id)),
        }
    }
}
