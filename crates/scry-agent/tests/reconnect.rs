//! Agent driver integration tests
//!
//! Runs the full driver state machine against a scripted fake relay:
//! registration, streaming, command delivery, and reconnection after
//! drops and rejections.

use std::net::SocketAddr;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use scry_agent::synthetic::SyntheticSource;
use scry_core::config::AgentConfig;
use scry_core::traits::InputSink;
use scry_protocol::{ControlCommand, Message, MessageCodec, MouseButton};

const SECRET: &str = "agent-test-secret";

fn test_config(addr: SocketAddr) -> AgentConfig {
    AgentConfig {
        relay_address: addr.to_string(),
        shared_secret: SECRET.to_string(),
        connect_timeout: Duration::from_secs(2),
        reconnect_delay: Duration::from_millis(50),
        capture_fps: 100.0,
        mouse_move_duration: Duration::ZERO,
        mouse_move_steps: 0,
        ..AgentConfig::default()
    }
}

/// Input sink that reports every operation over a channel
struct ChannelSink {
    tx: std_mpsc::Sender<String>,
}

impl InputSink for ChannelSink {
    fn screen_size(&self) -> (u32, u32) {
        (1920, 1080)
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        Some((0, 0))
    }

    fn move_to(&mut self, x: i32, y: i32) {
        let _ = self.tx.send(format!("move {} {}", x, y));
    }

    fn press(&mut self, button: MouseButton) {
        let _ = self.tx.send(format!("press {}", button));
    }

    fn release(&mut self, button: MouseButton) {
        let _ = self.tx.send(format!("release {}", button));
    }

    fn key_down(&mut self, key: &str) {
        let _ = self.tx.send(format!("keydown {}", key));
    }

    fn key_up(&mut self, key: &str) {
        let _ = self.tx.send(format!("keyup {}", key));
    }

    fn scroll(&mut self, dx: i32, dy: i32) {
        let _ = self.tx.send(format!("scroll {} {}", dx, dy));
    }
}

struct FakeRelay {
    framed: Framed<TcpStream, MessageCodec>,
}

impl FakeRelay {
    /// Accept the agent's next connection
    async fn accept(listener: &TcpListener) -> Self {
        let (socket, _) = timeout(Duration::from_secs(2), listener.accept())
            .await
            .expect("Timed out waiting for agent to connect")
            .expect("Accept failed");
        Self {
            framed: Framed::new(socket, MessageCodec::new()),
        }
    }

    async fn recv(&mut self) -> Message {
        timeout(Duration::from_secs(2), self.framed.next())
            .await
            .expect("Timed out waiting for message")
            .expect("Agent closed connection")
            .expect("Protocol error")
    }

    async fn send(&mut self, message: Message) {
        self.framed.send(message).await.expect("Send failed");
    }

    async fn expect_registration(&mut self) {
        match self.recv().await {
            Message::RegisterAgent { token } => assert_eq!(token, SECRET),
            other => panic!("Expected registration, got {:?}", other),
        }
    }

    /// Wait for the next frame, skipping liveness traffic
    async fn expect_frame(&mut self) -> Vec<u8> {
        loop {
            match self.recv().await {
                Message::Frame(data) => return data.to_vec(),
                Message::FrameText { image } => {
                    return Message::FrameText { image }
                        .frame_payload()
                        .expect("Undecodable text frame")
                        .to_vec()
                }
                Message::Pong { .. } => {}
                other => panic!("Expected frame, got {:?}", other),
            }
        }
    }
}

fn spawn_agent(
    config: AgentConfig,
    sink_tx: std_mpsc::Sender<String>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        scry_agent::run(
            config,
            Box::new(|| Box::new(SyntheticSource::new())),
            ChannelSink { tx: sink_tx },
            shutdown,
        )
        .await
        .expect("Agent run failed");
    })
}

#[tokio::test]
async fn test_agent_registers_and_streams_after_ack() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let (sink_tx, _sink_rx) = std_mpsc::channel();

    let agent = spawn_agent(test_config(addr), sink_tx, shutdown.clone());

    let mut relay = FakeRelay::accept(&listener).await;
    relay.expect_registration().await;
    relay.send(Message::RegistrationSuccess).await;

    // Frames flow only after the ack, and keep their order
    let f1 = relay.expect_frame().await;
    let f2 = relay.expect_frame().await;
    assert!(f1.starts_with(b"SCRYSYN"));
    assert!(f1 < f2, "frame counter must increase");

    shutdown.cancel();
    let _ = timeout(Duration::from_secs(2), agent).await;
}

#[tokio::test]
async fn test_agent_reconnects_after_transport_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let (sink_tx, _sink_rx) = std_mpsc::channel();

    let agent = spawn_agent(test_config(addr), sink_tx, shutdown.clone());

    let mut relay = FakeRelay::accept(&listener).await;
    relay.expect_registration().await;
    relay.send(Message::RegistrationSuccess).await;
    relay.expect_frame().await;

    // Drop the connection mid-stream; the agent must come back with a
    // fresh registration.
    drop(relay);

    let mut relay = FakeRelay::accept(&listener).await;
    relay.expect_registration().await;
    relay.send(Message::RegistrationSuccess).await;
    relay.expect_frame().await;

    shutdown.cancel();
    let _ = timeout(Duration::from_secs(2), agent).await;
}

#[tokio::test]
async fn test_agent_retries_after_registration_rejection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let (sink_tx, _sink_rx) = std_mpsc::channel();

    let agent = spawn_agent(test_config(addr), sink_tx, shutdown.clone());

    let mut relay = FakeRelay::accept(&listener).await;
    relay.expect_registration().await;
    relay
        .send(Message::RegistrationFail {
            message: "Authentication failed".to_string(),
        })
        .await;
    drop(relay);

    // Indistinguishable from a transient fault, so the agent retries
    // with the same fixed delay.
    let mut relay = FakeRelay::accept(&listener).await;
    relay.expect_registration().await;

    shutdown.cancel();
    let _ = timeout(Duration::from_secs(2), agent).await;
}

#[tokio::test]
async fn test_routed_command_reaches_input_sink() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let (sink_tx, sink_rx) = std_mpsc::channel();

    let agent = spawn_agent(test_config(addr), sink_tx, shutdown.clone());

    let mut relay = FakeRelay::accept(&listener).await;
    relay.expect_registration().await;
    relay.send(Message::RegistrationSuccess).await;

    relay
        .send(Message::Command(ControlCommand::Move { x: 123, y: 45 }))
        .await;

    let op = tokio::task::spawn_blocking(move || {
        sink_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("Sink never saw the command")
    })
    .await
    .unwrap();
    assert_eq!(op, "move 123 45");

    shutdown.cancel();
    let _ = timeout(Duration::from_secs(2), agent).await;
}

#[tokio::test]
async fn test_legacy_text_frames_on_the_wire() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let (sink_tx, _sink_rx) = std_mpsc::channel();

    let mut config = test_config(addr);
    config.legacy_text_frames = true;
    let agent = spawn_agent(config, sink_tx, shutdown.clone());

    let mut relay = FakeRelay::accept(&listener).await;
    relay.expect_registration().await;
    relay.send(Message::RegistrationSuccess).await;

    // The wire carries the text variant; the payload still decodes
    loop {
        match relay.recv().await {
            Message::FrameText { image } => {
                let payload = Message::FrameText { image }.frame_payload().unwrap();
                assert!(payload.starts_with(b"SCRYSYN"));
                break;
            }
            Message::Frame(_) => panic!("Expected text frames in legacy mode"),
            Message::Pong { .. } => {}
            other => panic!("Unexpected message {:?}", other),
        }
    }

    shutdown.cancel();
    let _ = timeout(Duration::from_secs(2), agent).await;
}
