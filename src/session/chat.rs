//! Correlated ack channel
//!
//! One chat session runs four cooperative loops under a single cancellation
//! scope:
//!
//! ```text
//!   source ──► [receive] ──ids──► [ack] ──┐
//!                                         ├──frames──► [writer] ──► sink
//!              [content ticker] ─────────┘
//! ```
//!
//! The writer is the only code that touches the sink. The content ticker and
//! the ack loop hand frames to it over one bounded queue, so two frames can
//! never be written concurrently. Pending ids sit in a bounded queue too; the
//! receive loop waits when it is full instead of spawning work per frame.
//!
//! When the client closes its side, the ack loop drains every pending id,
//! then stops the content ticker, and the writer flushes what is queued
//! before the session returns.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::Result;
use crate::protocol::{ClientFrame, ServerFrame, StatusCode};
use crate::stats::{SessionCounters, SessionStats};
use crate::transport::{FrameSink, FrameSource, TransportError};

use super::config::ChatConfig;
use super::context::SessionContext;

/// A duplex chat session
pub struct ChatSession {
    config: ChatConfig,
    ctx: SessionContext,
}

impl ChatSession {
    /// Create a session
    pub fn new(config: ChatConfig, ctx: SessionContext) -> Self {
        Self { config, ctx }
    }

    /// Run the session until the client closes, `cancel` fires, or the
    /// transport fails
    ///
    /// Peer close, cancellation and graceful transport errors (cancelled,
    /// deadline exceeded, unavailable) return `Ok`. Any other transport error
    /// stops every loop and is returned.
    pub async fn run<S, W>(
        self,
        mut source: S,
        mut sink: W,
        cancel: &CancellationToken,
    ) -> Result<SessionStats>
    where
        S: FrameSource<ClientFrame>,
        W: FrameSink<ServerFrame>,
    {
        let span = self.ctx.tracing_span().clone();

        async move {
            let config = self.config.clamped();
            let scope = cancel.child_token();
            let content_stop = scope.child_token();
            let counters = SessionCounters::new();

            let (ack_tx, ack_rx) = mpsc::channel::<String>(config.ack_queue_capacity);
            let (out_tx, out_rx) = mpsc::channel::<ServerFrame>(config.outbound_queue_capacity);

            tracing::info!(user_id = ?self.ctx.request.user_id, "Chat session started");

            let result = tokio::try_join!(
                receive_loop(&mut source, ack_tx, &scope, &counters),
                content_loop(&config, out_tx.clone(), &content_stop),
                ack_loop(ack_rx, out_tx, &scope, &content_stop),
                write_loop(&mut sink, out_rx, config.write_timeout, &scope, &counters),
            );

            // Releases whatever is still parked on the scope
            scope.cancel();

            let stats = counters.snapshot();
            match result {
                Ok(_) => {
                    tracing::info!(
                        frames_received = stats.frames_received,
                        acks_sent = stats.acks_sent,
                        content_sent = stats.content_sent,
                        "Chat session finished"
                    );
                    Ok(stats)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Chat session failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Read client frames and queue their correlation ids
async fn receive_loop<S>(
    source: &mut S,
    ack_tx: mpsc::Sender<String>,
    scope: &CancellationToken,
    counters: &SessionCounters,
) -> Result<()>
where
    S: FrameSource<ClientFrame>,
{
    loop {
        let received = tokio::select! {
            _ = scope.cancelled() => {
                tracing::debug!("Context cancelled in receive loop");
                return Ok(());
            }
            received = source.recv() => received,
        };

        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("Client closed stream");
                return Ok(());
            }
            Err(e) if e.is_graceful() => {
                tracing::info!(code = %e.code, "Client stream ended");
                scope.cancel();
                return Ok(());
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to receive client frame");
                scope.cancel();
                return Err(e.into());
            }
        };

        counters.on_frame_received();
        tracing::debug!(
            correlation_id = %frame.correlation_id,
            content = %frame.content,
            "Received message from client"
        );

        // Waits while the ack queue is full; dropped if the session ends first
        tokio::select! {
            _ = scope.cancelled() => {
                tracing::debug!("Pending ack dropped");
                return Ok(());
            }
            queued = ack_tx.send(frame.correlation_id) => {
                if queued.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// Push a random canned phrase on every tick
async fn content_loop(
    config: &ChatConfig,
    out_tx: mpsc::Sender<ServerFrame>,
    stop: &CancellationToken,
) -> Result<()> {
    if config.phrases.is_empty() {
        return Ok(());
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut seeder = rand::rng();
            StdRng::from_rng(&mut seeder)
        }
    };

    let period = config.content_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                tracing::debug!("Context cancelled in send loop");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let idx = rng.random_range(0..config.phrases.len());
        let frame = ServerFrame::content(config.phrases[idx].clone());

        tokio::select! {
            _ = stop.cancelled() => return Ok(()),
            queued = out_tx.send(frame) => {
                if queued.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/// Turn each queued correlation id into one ack frame
async fn ack_loop(
    mut ack_rx: mpsc::Receiver<String>,
    out_tx: mpsc::Sender<ServerFrame>,
    scope: &CancellationToken,
    content_stop: &CancellationToken,
) -> Result<()> {
    loop {
        let correlation_id = tokio::select! {
            _ = scope.cancelled() => {
                tracing::debug!("Context cancelled in ack loop");
                return Ok(());
            }
            next = ack_rx.recv() => match next {
                Some(id) => id,
                None => break,
            },
        };

        tokio::select! {
            _ = scope.cancelled() => return Ok(()),
            queued = out_tx.send(ServerFrame::ack(correlation_id)) => {
                if queued.is_err() {
                    return Ok(());
                }
            }
        }
    }

    // Client closed and every ack is queued; let the writer wind down
    content_stop.cancel();
    Ok(())
}

/// Sole writer of the session's sink
///
/// Cancellation is only observed between frames. A frame that has been
/// dequeued is written completely or fails on `write_timeout`, so the peer
/// never sees a truncated frame.
async fn write_loop<W>(
    sink: &mut W,
    mut out_rx: mpsc::Receiver<ServerFrame>,
    write_timeout: Duration,
    scope: &CancellationToken,
    counters: &SessionCounters,
) -> Result<()>
where
    W: FrameSink<ServerFrame>,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = scope.cancelled() => return Ok(()),
            next = out_rx.recv() => match next {
                Some(frame) => frame,
                None => return Ok(()),
            },
        };

        let acked = frame.acked_id().map(str::to_owned);

        let written = match time::timeout(write_timeout, sink.send(frame)).await {
            Ok(written) => written,
            Err(_) => Err(TransportError::new(
                StatusCode::DeadlineExceeded,
                "frame write timed out",
            )),
        };

        match written {
            Ok(()) => match acked {
                Some(correlation_id) => {
                    counters.on_ack_sent();
                    tracing::debug!(correlation_id = %correlation_id, "Acknowledged message");
                }
                None => counters.on_content_sent(),
            },
            Err(e) => return on_write_error(e, scope),
        }
    }
}

fn on_write_error(err: TransportError, scope: &CancellationToken) -> Result<()> {
    scope.cancel();

    if err.is_graceful() {
        tracing::info!(code = %err.code, "Client went away while writing");
        Ok(())
    } else {
        tracing::error!(error = %err, "Failed to write server frame");
        Err(err.into())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::error::Error;
    use crate::protocol::constants::CANNED_PHRASES;
    use crate::protocol::StatusCode;
    use crate::transport::memory::{self, MemoryPeer};
    use crate::transport::{FramedSink, FramedSource};

    type Peer = MemoryPeer<ClientFrame, ServerFrame>;

    fn quiet_config() -> ChatConfig {
        ChatConfig::default().content_interval(Duration::from_secs(3600))
    }

    fn spawn_session(
        config: ChatConfig,
        cancel: CancellationToken,
    ) -> (Peer, tokio::task::JoinHandle<Result<SessionStats>>) {
        spawn_session_with_capacity(config, cancel, 64)
    }

    fn spawn_session_with_capacity(
        config: ChatConfig,
        cancel: CancellationToken,
        capacity: usize,
    ) -> (Peer, tokio::task::JoinHandle<Result<SessionStats>>) {
        let (source, sink, peer) = memory::duplex(capacity);
        let handle = tokio::spawn(async move {
            ChatSession::new(config, SessionContext::new(1))
                .run(source, sink, &cancel)
                .await
        });
        (peer, handle)
    }

    fn acked_ids(frames: &[ServerFrame]) -> Vec<String> {
        frames
            .iter()
            .filter_map(|f| f.acked_id().map(str::to_owned))
            .collect()
    }

    #[tokio::test]
    async fn test_acks_each_correlation_id() {
        let (mut peer, handle) = spawn_session(quiet_config(), CancellationToken::new());

        for id in ["a", "b", "c"] {
            assert!(peer.send(ClientFrame::new(id, "hi")).await);
        }
        peer.close();

        let frames = peer.collect().await;
        let stats = handle.await.unwrap().unwrap();

        let mut ids = acked_ids(&frames);
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(frames.iter().all(|f| f.is_ack));
        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.acks_sent, 3);
    }

    #[tokio::test]
    async fn test_n_frames_yield_n_distinct_acks() {
        let config = quiet_config().ack_queue_capacity(4).outbound_queue_capacity(4);
        // Transport buffers hold every ack so the peer can read after sending
        let (mut peer, handle) =
            spawn_session_with_capacity(config, CancellationToken::new(), 256);

        let sender = tokio::spawn(async move {
            for i in 0..200 {
                assert!(peer.send(ClientFrame::new(format!("id-{}", i), "x")).await);
            }
            peer.collect().await
        });

        let frames = sender.await.unwrap();
        let stats = handle.await.unwrap().unwrap();

        let ids = acked_ids(&frames);
        let unique: HashSet<_> = ids.iter().cloned().collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(unique.len(), 200);
        assert!((0..200).all(|i| unique.contains(&format!("id-{}", i))));
        assert_eq!(stats.acks_sent, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_content_frames_on_tick() {
        let cancel = CancellationToken::new();
        let (mut peer, handle) = spawn_session(ChatConfig::default().seed(7), cancel.clone());

        let start = Instant::now();
        for _ in 0..3 {
            let frame = peer.recv().await.unwrap();
            assert!(!frame.is_ack);
            let text = frame.content.unwrap();
            assert!(CANNED_PHRASES.contains(&text.as_str()));
        }
        assert!(start.elapsed() >= Duration::from_millis(1500));

        cancel.cancel();
        let stats = handle.await.unwrap().unwrap();
        assert!(stats.content_sent >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acks_interleave_with_content() {
        let cancel = CancellationToken::new();
        let (mut peer, handle) = spawn_session(ChatConfig::default(), cancel.clone());

        // First content frame arrives after one interval
        assert!(!peer.recv().await.unwrap().is_ack);

        peer.send(ClientFrame::new("mid", "hello")).await;
        let mut saw_ack = false;
        for _ in 0..4 {
            if peer.recv().await.unwrap().acked_id() == Some("mid") {
                saw_ack = true;
                break;
            }
        }
        assert!(saw_ack);

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_returns_ok_promptly() {
        let cancel = CancellationToken::new();
        let (_peer, handle) = spawn_session(quiet_config(), cancel.clone());

        tokio::task::yield_now().await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session did not stop after cancel")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_acks() {
        let config = quiet_config()
            .ack_queue_capacity(1)
            .outbound_queue_capacity(1)
            .write_timeout(Duration::from_millis(100));
        let cancel = CancellationToken::new();
        // The peer never reads, so the writer and both queues fill up
        let (peer, handle) = spawn_session_with_capacity(config, cancel.clone(), 1);

        for i in 0..6 {
            let sent = tokio::time::timeout(
                Duration::from_millis(200),
                peer.send(ClientFrame::new(format!("id-{}", i), "x")),
            )
            .await;
            assert!(sent.is_ok(), "frame {} was not accepted", i);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        cancel.cancel();
        let stats = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("session did not stop after cancel")
            .unwrap()
            .unwrap();

        assert!(stats.frames_received >= 4);
        assert_eq!(stats.acks_sent, 1);
        assert!(stats.acks_sent < stats.frames_received);
        drop(peer);
    }

    #[tokio::test]
    async fn test_cancel_mid_write_finishes_frame() {
        let (server_io, client_io) = tokio::io::duplex(16);
        let sink = FramedSink::<_, ServerFrame>::new(server_io, 1024);
        let (source, _unused, peer) = memory::duplex::<ClientFrame, ServerFrame>(4);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                ChatSession::new(quiet_config(), SessionContext::new(1))
                    .run(source, sink, &cancel)
                    .await
            }
        });

        // The ack is larger than the pipe, so its write is still in progress
        let id = "c".repeat(40);
        assert!(peer.send(ClientFrame::new(id.clone(), "hi")).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let mut client = FramedSource::<_, ServerFrame>::new(client_io, 1024);
        let frame = client.recv().await.unwrap().unwrap();
        assert_eq!(frame.acked_id(), Some(id.as_str()));

        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("session did not stop after cancel")
            .unwrap()
            .unwrap();
        assert_eq!(stats.acks_sent, 1);
        assert!(client.recv().await.unwrap().is_none());
        drop(peer);
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        let config = quiet_config().write_timeout(Duration::from_millis(50));
        let (peer, handle) = spawn_session_with_capacity(config, CancellationToken::new(), 1);

        // First ack fills the transport, the second can never be written
        peer.send(ClientFrame::new("a", "x")).await;
        peer.send(ClientFrame::new("b", "x")).await;

        let stats = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("stalled write did not time out")
            .unwrap()
            .unwrap();
        assert_eq!(stats.acks_sent, 1);
        drop(peer);
    }

    #[tokio::test]
    async fn test_zero_config_fields_do_not_panic() {
        let config = ChatConfig {
            content_interval: Duration::ZERO,
            ack_queue_capacity: 0,
            outbound_queue_capacity: 0,
            write_timeout: Duration::ZERO,
            phrases: Vec::new(),
            seed: None,
        };
        let (mut peer, handle) = spawn_session(config, CancellationToken::new());

        peer.send(ClientFrame::new("a", "hi")).await;
        peer.close();

        let frames = peer.collect().await;
        assert_eq!(acked_ids(&frames), vec!["a"]);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_fatal_read_error_is_returned() {
        let (peer, handle) = spawn_session(quiet_config(), CancellationToken::new());

        peer.fail_reads(TransportError::internal("connection corrupted")).await;

        match handle.await.unwrap() {
            Err(Error::Transport(e)) => assert_eq!(e.code, StatusCode::Internal),
            other => panic!("expected transport error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_cancelled_read_is_graceful() {
        let (peer, handle) = spawn_session(quiet_config(), CancellationToken::new());

        peer.fail_reads(TransportError::cancelled()).await;

        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_fatal_write_error_is_returned() {
        let (peer, handle) = spawn_session(quiet_config(), CancellationToken::new());

        peer.fail_writes(TransportError::internal("socket broke"));
        peer.send(ClientFrame::new("a", "hi")).await;

        match handle.await.unwrap() {
            Err(Error::Transport(e)) => assert_eq!(e.code, StatusCode::Internal),
            other => panic!("expected transport error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_unavailable_write_is_graceful() {
        let (peer, handle) = spawn_session(quiet_config(), CancellationToken::new());

        peer.fail_writes(TransportError::unavailable("client gone"));
        peer.send(ClientFrame::new("a", "hi")).await;

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.acks_sent, 0);
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_child_scope() {
        let parent = CancellationToken::new();
        let (mut peer, handle) = spawn_session(quiet_config(), parent.child_token());

        peer.send(ClientFrame::new("a", "hi")).await;
        assert_eq!(peer.recv().await.unwrap().acked_id(), Some("a"));

        parent.cancel();
        assert!(handle.await.unwrap().is_ok());
    }
}
