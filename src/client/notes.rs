//! Unary note calls

use crate::error::{Error, Result};
use crate::protocol::{MetricsFrame, MetricsSummary, Method, Note, Request, Response};
use crate::transport::{FrameSink, FrameSource};

use super::config::ClientConfig;
use super::connector;

/// Client for the note CRUD methods and metrics upload
///
/// Each call opens its own connection and carries the configured
/// authorization token.
#[derive(Debug, Clone)]
pub struct NotesClient {
    config: ClientConfig,
}

impl NotesClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub async fn create_note(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Note> {
        let method = Method::CreateNote {
            title: title.into(),
            content: content.into(),
        };
        match self.call(method).await? {
            Response::Note(note) => Ok(note),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_note(&self, note_id: i64) -> Result<Note> {
        match self.call(Method::GetNote { note_id }).await? {
            Response::Note(note) => Ok(note),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_notes(&self, user_id: i64) -> Result<Vec<Note>> {
        match self.call(Method::GetNotes { user_id }).await? {
            Response::Notes(notes) => Ok(notes),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete_note(&self, note_id: i64) -> Result<()> {
        match self.call(Method::DeleteNote { note_id }).await? {
            Response::Deleted => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Upload view counters and wait for their sum
    ///
    /// The upload ends when every counter is sent; the server answers once
    /// after reading end-of-stream.
    pub async fn upload_metrics(
        &self,
        counters: impl IntoIterator<Item = i64>,
    ) -> Result<MetricsSummary> {
        let opened = connector::open_stream(&self.config, Request::new(Method::UploadMetrics)).await?;
        let mut sink = opened.sink.retype::<MetricsFrame>();
        let mut source = opened.source.retype::<MetricsSummary>();

        for counter in counters {
            sink.send(MetricsFrame::new(counter)).await?;
        }
        sink.close().await?;

        source
            .recv()
            .await?
            .ok_or_else(|| Error::Protocol("upload closed without a summary".into()))
    }

    async fn call(&self, method: Method) -> Result<Response> {
        let mut opened = connector::open(&self.config, Request::new(method)).await?;
        connector::read_response(&mut opened).await
    }
}

fn unexpected(response: Response) -> Error {
    Error::Protocol(format!("unexpected response: {:?}", response))
}
