//! Outbound relay connector
//!
//! Performs a single bounded connection attempt and hands back an
//! `ActiveLink`. There is no automatic reconnection at this layer:
//! every attempt is a fresh TCP connection owned by the driver state
//! machine, so nothing here can race the driver's retry loop.

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use scry_core::config::AgentConfig;
use scry_core::LinkError;
use scry_protocol::{ControlCommand, Message, MessageCodec};

/// Capacity for events from the relay.
///
/// Commands dominate this channel; a burst of keystrokes from a fast
/// typist stays well under this.
const LINK_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the outbound queue. Frames are produced no faster than
/// the capture interval, so a small queue is enough.
const OUTBOUND_CHANNEL_CAPACITY: usize = 8;

/// Events received from the relay
#[derive(Debug)]
pub enum LinkEvent {
    /// The relay accepted our registration
    RegistrationAccepted,
    /// The relay rejected our registration and will drop us
    RegistrationRejected { message: String },
    /// A viewer command routed to us
    Command(ControlCommand),
    /// Liveness ping from the relay
    Ping { timestamp: u64 },
    /// The link went down
    Disconnected,
}

/// Establishes connections to the relay
pub struct Connector {
    config: AgentConfig,
}

impl Connector {
    /// Create a connector for the configured relay address
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// The agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Attempt one connection with a bounded timeout. Sends the
    /// registration request immediately on transport connect.
    pub async fn try_connect(&self) -> Result<ActiveLink, LinkError> {
        let address = &self.config.relay_address;
        tracing::debug!("Connecting to {}", address);

        let stream = timeout(self.config.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| LinkError::ConnectTimeout {
                address: address.clone(),
            })??;

        let framed = Framed::new(stream, MessageCodec::new());
        let (sink, stream) = framed.split();

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(LINK_EVENT_CHANNEL_CAPACITY);

        let writer = tokio::spawn(write_outbound(sink, outbound_rx));
        let reader = tokio::spawn(read_inbound(stream, event_tx));

        let link = ActiveLink {
            outbound: outbound_tx,
            events: event_rx,
            writer,
            reader,
        };

        link.send(Message::RegisterAgent {
            token: self.config.shared_secret.clone(),
        })
        .await?;

        Ok(link)
    }
}

/// An active link to the relay
pub struct ActiveLink {
    outbound: mpsc::Sender<Message>,
    events: mpsc::Receiver<LinkEvent>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl ActiveLink {
    /// Queue a message for the relay
    pub async fn send(&self, message: Message) -> Result<(), LinkError> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| LinkError::Closed)
    }

    /// Send one captured frame in the configured wire encoding
    pub async fn send_frame(&self, frame: Bytes, legacy_text: bool) -> Result<(), LinkError> {
        let message = if legacy_text {
            Message::text_frame(&frame)
        } else {
            Message::Frame(frame)
        };
        self.send(message).await
    }

    /// Receive the next event from the relay
    pub async fn recv_event(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }

    /// Tear the link down and wait for its tasks
    pub async fn close(self) {
        // Dropping the sender lets the writer drain and close the socket
        drop(self.outbound);
        self.reader.abort();
        let _ = self.writer.await;
        let _ = self.reader.await;
    }
}

async fn write_outbound(
    mut sink: SplitSink<Framed<TcpStream, MessageCodec>, Message>,
    mut outbound: mpsc::Receiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        if let Err(e) = sink.send(message).await {
            tracing::debug!("Write to relay failed: {}", e);
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_inbound(
    mut stream: SplitStream<Framed<TcpStream, MessageCodec>>,
    events: mpsc::Sender<LinkEvent>,
) {
    while let Some(next) = stream.next().await {
        match next {
            Ok(message) => {
                let event = match message {
                    Message::RegistrationSuccess => LinkEvent::RegistrationAccepted,
                    Message::RegistrationFail { message } => {
                        LinkEvent::RegistrationRejected { message }
                    }
                    Message::Command(command) => LinkEvent::Command(command),
                    Message::Ping { timestamp } => LinkEvent::Ping { timestamp },
                    Message::Pong { .. } => continue,
                    other => {
                        tracing::warn!(
                            message_type = ?other.message_type(),
                            "Unexpected message from relay"
                        );
                        continue;
                    }
                };

                if events.send(event).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!("Protocol error from relay: {}", e);
                break;
            }
        }
    }

    let _ = events.send(LinkEvent::Disconnected).await;
}
