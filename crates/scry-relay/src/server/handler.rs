//! Per-connection transport handler
//!
//! Each accepted socket gets a reader loop (decoding wire messages into
//! lifecycle events) and a writer task (draining the connection's
//! outbound queue into the framed sink). The handler also runs the
//! liveness ping: peers that stop answering are force-disconnected
//! through the same path as any other transport drop.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use scry_core::time::{current_time_millis, elapsed_millis};
use scry_core::ConnectionId;
use scry_protocol::{Message, MessageCodec};

use crate::lifecycle::RelayEvent;

/// Capacity of each connection's outbound queue.
///
/// Holds at most a handful of frames plus status notices. Frames are
/// freshest-wins all the way down: a viewer that cannot drain its queue
/// loses frames here rather than building a backlog.
const OUTBOUND_CHANNEL_CAPACITY: usize = 32;

type WireSink = SplitSink<Framed<TcpStream, MessageCodec>, Message>;
type WireStream = SplitStream<Framed<TcpStream, MessageCodec>>;

/// Liveness settings for one connection
#[derive(Debug, Clone, Copy)]
pub struct PingSettings {
    /// How often to ping the peer
    pub interval: Duration,
    /// How stale the last pong may be before the peer is dropped
    pub timeout: Duration,
}

/// Drive one connection until it drops, is cancelled, or goes silent.
pub async fn run_connection(
    id: ConnectionId,
    stream: TcpStream,
    events: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
    ping: PingSettings,
) {
    let framed = Framed::new(stream, MessageCodec::new());
    let (sink, stream) = framed.split();

    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

    if events
        .send(RelayEvent::Connected {
            id,
            outbound: outbound_tx.clone(),
            cancel: cancel.clone(),
        })
        .await
        .is_err()
    {
        return;
    }

    let writer = tokio::spawn(write_outbound(sink, outbound_rx, cancel.clone()));

    read_inbound(id, stream, &events, &cancel, outbound_tx, ping).await;

    // Either side ending tears the whole connection down
    let _ = events.send(RelayEvent::Disconnected { id }).await;
    cancel.cancel();
    let _ = writer.await;
}

/// Reader half: decode messages, dispatch lifecycle events, track pongs.
async fn read_inbound(
    id: ConnectionId,
    mut stream: WireStream,
    events: &mpsc::Sender<RelayEvent>,
    cancel: &CancellationToken,
    outbound: mpsc::Sender<Message>,
    ping: PingSettings,
) {
    let start = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval_at(start + ping.interval, ping.interval);
    let mut last_pong = start;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(%id, "Connection handler cancelled");
                break;
            }

            _ = ticker.tick() => {
                if last_pong.elapsed() > ping.timeout {
                    tracing::warn!(%id, "No pong within timeout, dropping connection");
                    break;
                }
                let _ = outbound.try_send(Message::Ping {
                    timestamp: current_time_millis(),
                });
            }

            next = stream.next() => match next {
                Some(Ok(message)) => {
                    match message {
                        Message::RegisterAgent { token } => {
                            let _ = events.send(RelayEvent::RegisterAgent { id, token }).await;
                        }
                        Message::Authenticate { credential } => {
                            let _ = events.send(RelayEvent::Authenticate { id, credential }).await;
                        }
                        frame @ (Message::Frame(_) | Message::FrameText { .. }) => {
                            let _ = events.send(RelayEvent::FrameReceived { id, frame }).await;
                        }
                        Message::Command(command) => {
                            let _ = events.send(RelayEvent::CommandReceived { id, command }).await;
                        }
                        Message::Pong { timestamp } => {
                            last_pong = tokio::time::Instant::now();
                            tracing::trace!(%id, latency_ms = elapsed_millis(timestamp), "Pong");
                        }
                        Message::Ping { timestamp } => {
                            let _ = outbound.try_send(Message::Pong { timestamp });
                        }
                        other => {
                            tracing::warn!(%id, message_type = ?other.message_type(), "Unexpected message from peer");
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(%id, "Protocol error: {}", e);
                    break;
                }
                None => {
                    tracing::debug!(%id, "Peer closed connection");
                    break;
                }
            }
        }
    }
}

/// Writer half: drain the outbound queue into the socket. On
/// cancellation, flush whatever is already queued (a registration
/// failure notice must reach the peer before the close), then stop.
async fn write_outbound(
    mut sink: WireSink,
    mut outbound: mpsc::Receiver<Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            next = outbound.recv() => match next {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        tracing::debug!("Write failed: {}", e);
                        break;
                    }
                }
                None => break,
            },

            _ = cancel.cancelled() => {
                while let Ok(message) = outbound.try_recv() {
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }

    let _ = sink.close().await;
}
