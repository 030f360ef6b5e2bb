//! Note CRUD collaborator
//!
//! Storage lives behind [`NoteRepository`]; [`NoteService`] adds validation
//! and announces created notes on the [`EventHub`](crate::hub::EventHub).

mod error;
mod repository;
mod service;

pub use error::NotesError;
pub use repository::{MemoryNoteRepository, NoteRepository};
pub use service::NoteService;
