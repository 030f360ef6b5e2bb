//! Event subscription adapter
//!
//! Bridges the [`EventHub`] to one server-push stream. A heartbeat goes out
//! immediately, then the loop forwards either hub notifications or interval
//! heartbeats until the subscription is cancelled or a send fails.

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::Result;
use crate::hub::{EventHub, HubSubscription};
use crate::protocol::{EventFrame, HealthCheck, StatusCode};
use crate::stats::SubscriptionStats;
use crate::transport::{FrameSink, TransportError};

use super::config::SubscriptionConfig;
use super::context::SessionContext;

/// How a failed send ends a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// Client cancelled or its deadline passed
    Unsubscribed(StatusCode),
    /// Peer reported unavailable
    PeerUnavailable,
    /// Anything else
    Fatal(TransportError),
}

/// Classify a send error
pub fn classify_send_error(err: TransportError) -> SendFailure {
    match err.code {
        StatusCode::Cancelled | StatusCode::DeadlineExceeded => SendFailure::Unsubscribed(err.code),
        StatusCode::Unavailable => SendFailure::PeerUnavailable,
        _ => SendFailure::Fatal(err),
    }
}

/// A server-push subscription to note events
pub struct SubscriptionSession {
    config: SubscriptionConfig,
    ctx: SessionContext,
}

impl SubscriptionSession {
    /// Create a subscription session
    pub fn new(config: SubscriptionConfig, ctx: SessionContext) -> Self {
        Self {
            config: config.clamped(),
            ctx,
        }
    }

    /// Register with `hub` and push frames to `sink`
    ///
    /// `user_id` is accepted and logged but does not filter events: every
    /// subscriber receives every created note.
    ///
    /// Returns `Ok` on cancellation, on a cancelled/deadline-exceeded send,
    /// and when the peer is unavailable. Other send errors are returned.
    /// An already-cancelled token returns `Ok` without sending anything.
    pub async fn run<W>(
        self,
        mut sink: W,
        user_id: i64,
        hub: &EventHub,
        cancel: &CancellationToken,
    ) -> Result<SubscriptionStats>
    where
        W: FrameSink<EventFrame>,
    {
        let span = self.ctx.tracing_span().clone();

        async move {
            let started_at = Instant::now();
            let mut stats = SubscriptionStats::default();

            if cancel.is_cancelled() {
                tracing::debug!(user_id = user_id, "Subscription cancelled before start");
                return Ok(stats);
            }

            let scope = cancel.child_token();
            let mut subscription = hub.subscribe(scope.clone());

            tracing::info!(user_id = user_id, "Client subscribed to events");

            let result = self
                .pump(&mut sink, &mut subscription, &scope, &mut stats)
                .await;

            scope.cancel();
            stats.duration = started_at.elapsed();
            result.map(|()| stats)
        }
        .instrument(span)
        .await
    }

    /// Initial heartbeat, then forward hub events and heartbeats
    async fn pump<W>(
        &self,
        sink: &mut W,
        subscription: &mut HubSubscription,
        scope: &CancellationToken,
        stats: &mut SubscriptionStats,
    ) -> Result<()>
    where
        W: FrameSink<EventFrame>,
    {
        if !self.send(sink, HealthCheck::now().into()).await? {
            return Ok(());
        }
        stats.heartbeats_sent += 1;

        let period = self.config.heartbeat_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let frame: EventFrame = tokio::select! {
                _ = scope.cancelled() => {
                    tracing::debug!("Context cancelled");
                    return Ok(());
                }
                _ = ticker.tick() => HealthCheck::now().into(),
                event = subscription.next() => match event {
                    Some(event) => event.into(),
                    None => {
                        tracing::debug!("Hub subscription ended");
                        return Ok(());
                    }
                },
            };

            let is_heartbeat = frame.is_health_check();
            if !self.send(sink, frame).await? {
                return Ok(());
            }

            if is_heartbeat {
                stats.heartbeats_sent += 1;
            } else {
                stats.events_sent += 1;
            }
        }
    }

    /// Send one frame; `Ok(false)` means the subscription ended gracefully
    async fn send<W>(&self, sink: &mut W, frame: EventFrame) -> Result<bool>
    where
        W: FrameSink<EventFrame>,
    {
        let Err(err) = sink.send(frame).await else {
            return Ok(true);
        };

        match classify_send_error(err) {
            SendFailure::Unsubscribed(code) => {
                tracing::info!(code = %code, "Client unsubscribed");
                Ok(false)
            }
            SendFailure::PeerUnavailable => {
                tracing::warn!("Client unavailable");
                Ok(false)
            }
            SendFailure::Fatal(err) => {
                tracing::error!(error = %err, code = %err.code, "Unexpected send error");
                Err(err.into())
            }
        }
    }
}
