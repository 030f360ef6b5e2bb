//! Note CRUD service
//!
//! The only producer of hub events: every successful create publishes one
//! [`NoteEvent`].

use std::sync::Arc;

use crate::auth::RequestContext;
use crate::hub::EventHub;
use crate::protocol::{Note, NoteEvent};

use super::error::NotesError;
use super::repository::{MemoryNoteRepository, NoteRepository};

/// Note operations backed by a repository and the event hub
pub struct NoteService<R = MemoryNoteRepository> {
    repository: R,
    hub: Arc<EventHub>,
}

impl<R: NoteRepository> NoteService<R> {
    pub fn new(repository: R, hub: Arc<EventHub>) -> Self {
        Self { repository, hub }
    }

    /// Hub that receives created notes
    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Create a note owned by the authenticated user and announce it
    pub async fn create_note(
        &self,
        ctx: &RequestContext,
        title: String,
        content: String,
    ) -> Result<Note, NotesError> {
        let user_id = ctx.require_user()?;

        if title.trim().is_empty() {
            return Err(NotesError::InvalidArgument("title must not be empty".into()));
        }

        let note = self.repository.create(user_id, title, content).await?;

        tracing::info!(note_id = note.id, user_id = user_id, "Note created");
        self.hub.publish(NoteEvent::new(note.clone()));

        Ok(note)
    }

    pub async fn get_note(&self, note_id: i64) -> Result<Note, NotesError> {
        self.repository.get(note_id).await
    }

    /// Notes of `user_id`, ordered by id
    pub async fn get_notes(&self, user_id: i64) -> Result<Vec<Note>, NotesError> {
        self.repository.list_by_user(user_id).await
    }

    pub async fn delete_note(&self, note_id: i64) -> Result<(), NotesError> {
        self.repository.delete(note_id).await?;
        tracing::info!(note_id = note_id, "Note deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;

    fn service() -> NoteService {
        NoteService::new(MemoryNoteRepository::new(), Arc::new(EventHub::new()))
    }

    #[tokio::test]
    async fn test_create_publishes_one_event() {
        let service = service();
        let mut subscription = service.hub().subscribe(CancellationToken::new());

        let note = service
            .create_note(&RequestContext::for_user(1), "groceries".into(), "milk".into())
            .await
            .unwrap();

        let event = subscription.next().await.unwrap();
        assert_eq!(event.created_note, note);
        assert_eq!(service.hub().stats().published, 1);
    }

    #[tokio::test]
    async fn test_failed_create_publishes_nothing() {
        let service = service();
        let mut subscription = service.hub().subscribe(CancellationToken::new());

        let anonymous = service
            .create_note(&RequestContext::anonymous(), "t".into(), "c".into())
            .await;
        assert!(matches!(anonymous, Err(NotesError::Unauthenticated(_))));

        let empty = service
            .create_note(&RequestContext::for_user(1), "  ".into(), "c".into())
            .await;
        assert!(matches!(empty, Err(NotesError::InvalidArgument(_))));

        assert_eq!(service.hub().stats().published, 0);
        let pending = tokio::time::timeout(Duration::from_millis(20), subscription.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let service = service();

        assert_eq!(service.get_note(9).await, Err(NotesError::NotFound(9)));
        assert_eq!(service.delete_note(9).await, Err(NotesError::NotFound(9)));
    }

    #[tokio::test]
    async fn test_crud_flow() {
        let service = service();
        let ctx = RequestContext::for_user(5);

        let note = service
            .create_note(&ctx, "a".into(), "b".into())
            .await
            .unwrap();
        assert_eq!(note.user_id, 5);
        assert_eq!(service.get_note(note.id).await.unwrap(), note);
        assert_eq!(service.get_notes(5).await.unwrap(), vec![note.clone()]);
        assert!(service.get_notes(6).await.unwrap().is_empty());

        service.delete_note(note.id).await.unwrap();
        assert!(service.get_notes(5).await.unwrap().is_empty());
    }
}
