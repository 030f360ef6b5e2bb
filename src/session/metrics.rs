//! Metrics upload handler
//!
//! Client-streaming counterpart of the chat session: the client pushes view
//! counters until it closes its send side, then receives a single summary
//! with their sum.

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::Result;
use crate::protocol::{MetricsFrame, MetricsSummary};
use crate::transport::{FrameSink, FrameSource};

use super::context::SessionContext;

/// One metrics upload stream
pub struct MetricsSession {
    ctx: SessionContext,
}

impl MetricsSession {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Sum every frame read from `source` and answer once on end-of-stream
    ///
    /// Returns the summary that was sent. Cancellation before end-of-stream
    /// and graceful read errors end the upload with `Ok(None)` and nothing is
    /// written. Other read or write errors are returned.
    pub async fn run<S, W>(
        self,
        mut source: S,
        mut sink: W,
        cancel: &CancellationToken,
    ) -> Result<Option<MetricsSummary>>
    where
        S: FrameSource<MetricsFrame>,
        W: FrameSink<MetricsSummary>,
    {
        let span = self.ctx.tracing_span().clone();

        async move {
            let mut summary = MetricsSummary::default();
            let mut frames = 0u64;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(frames = frames, "Metrics upload cancelled");
                        return Ok(None);
                    }
                    next = source.recv() => next,
                };

                match next {
                    Ok(Some(frame)) => {
                        frames += 1;
                        summary.total_view = summary.total_view.saturating_add(frame.note_view_counter);
                        tracing::debug!(note_view_counter = frame.note_view_counter, "Metrics received");
                    }
                    Ok(None) => break,
                    Err(e) if e.is_graceful() => {
                        tracing::info!(code = %e.code, "Metrics upload ended by client");
                        return Ok(None);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, code = %e.code, "Metrics receive failed");
                        return Err(e.into());
                    }
                }
            }

            sink.send(summary).await?;
            tracing::info!(frames = frames, total_view = summary.total_view, "Metrics summary sent");
            Ok(Some(summary))
        }
        .instrument(span)
        .await
    }
}
