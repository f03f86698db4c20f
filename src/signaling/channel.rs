//! Room-scoped signaling channel
//!
//! A persistent duplex connection scoped to one room id. Inbound messages
//! are delivered in send order through a single receiver that the session
//! controller consumes on its control task. There is no reconnect policy at
//! this layer: when the transport drops, the channel stops delivering
//! events and the connected flag goes false.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::protocol::SignalingMessage;
use crate::{CallConfig, Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Duplex signaling connection for one room
pub struct SignalingChannel {
    /// Room this channel is scoped to
    room_id: String,

    /// Local participant id (used for presence frames and self-filtering)
    local_id: String,

    /// Outbound message queue, drained by the transport task
    outbound: mpsc::UnboundedSender<SignalingMessage>,

    /// Inbound message sequence, taken once by the session controller
    inbound: Option<mpsc::UnboundedReceiver<SignalingMessage>>,

    /// Whether the transport is currently delivering
    connected: Arc<AtomicBool>,

    /// Set once by `disconnect()`; later calls are no-ops
    closed: Arc<AtomicBool>,

    /// Shutdown signal observed by the transport tasks
    shutdown: watch::Sender<bool>,

    /// Keeps the inbound sender alive for loopback channels that have no
    /// relay task holding it
    _inbound_keepalive: Option<mpsc::UnboundedSender<SignalingMessage>>,
}

impl SignalingChannel {
    /// Connect to the signaling relay and join a room
    ///
    /// Establishes the WebSocket transport, spawns the sender and receiver
    /// tasks, and announces presence with a Join frame.
    ///
    /// # Arguments
    ///
    /// * `config` - Call configuration carrying the relay URL
    /// * `room_id` - Room to scope the channel to
    /// * `local_id` - Local participant id
    pub async fn connect(config: &CallConfig, room_id: &str, local_id: &str) -> Result<Self> {
        config.validate()?;

        info!(
            "Connecting to signaling relay {} for room {}",
            config.signaling_url, room_id
        );

        let (ws_stream, _) = connect_async(&config.signaling_url)
            .await
            .map_err(|e| Error::signaling(format!("failed to connect: {}", e)))?;

        info!("Connected to signaling relay for room {}", room_id);

        let (write, read) = ws_stream.split();

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let connected = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::sender_task(
            write,
            out_rx,
            shutdown_rx.clone(),
            connected.clone(),
        ));
        tokio::spawn(Self::receiver_task(
            read,
            in_tx,
            shutdown_rx,
            connected.clone(),
            closed.clone(),
            room_id.to_string(),
            local_id.to_string(),
        ));

        let channel = Self {
            room_id: room_id.to_string(),
            local_id: local_id.to_string(),
            outbound: out_tx,
            inbound: Some(in_rx),
            connected,
            closed,
            shutdown: shutdown_tx,
            _inbound_keepalive: None,
        };

        channel.send(SignalingMessage::join(room_id, local_id));

        Ok(channel)
    }

    /// Build a connected channel with no remote participants.
    ///
    /// Outbound messages are drained and discarded; the inbound sequence
    /// stays open and never yields. Used to drive a session against an
    /// empty room without a relay.
    pub fn in_memory(room_id: &str, local_id: &str) -> Self {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalingMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);

        tokio::spawn(async move { while out_rx.recv().await.is_some() {} });

        Self {
            room_id: room_id.to_string(),
            local_id: local_id.to_string(),
            outbound: out_tx,
            inbound: Some(in_rx),
            connected: Arc::new(AtomicBool::new(true)),
            closed: Arc::new(AtomicBool::new(false)),
            shutdown: shutdown_tx,
            _inbound_keepalive: Some(in_tx),
        }
    }

    /// Build two cross-wired channels simulating the relay for one room.
    ///
    /// Each side's outbound feeds the other side's inbound in order, and
    /// each side starts with the other's Join already delivered, exactly as
    /// the relay reports existing room members to a joiner.
    pub fn in_memory_pair(room_id: &str, a_id: &str, b_id: &str) -> (Self, Self) {
        let (a_out_tx, a_out_rx) = mpsc::unbounded_channel();
        let (b_out_tx, b_out_rx) = mpsc::unbounded_channel();
        let (a_in_tx, a_in_rx) = mpsc::unbounded_channel();
        let (b_in_tx, b_in_rx) = mpsc::unbounded_channel();

        let _ = a_in_tx.send(SignalingMessage::join(room_id, b_id));
        let _ = b_in_tx.send(SignalingMessage::join(room_id, a_id));

        tokio::spawn(Self::relay_task(a_out_rx, b_in_tx, room_id.to_string()));
        tokio::spawn(Self::relay_task(b_out_rx, a_in_tx, room_id.to_string()));

        let (a_shutdown, _) = watch::channel(false);
        let (b_shutdown, _) = watch::channel(false);

        let a = Self {
            room_id: room_id.to_string(),
            local_id: a_id.to_string(),
            outbound: a_out_tx,
            inbound: Some(a_in_rx),
            connected: Arc::new(AtomicBool::new(true)),
            closed: Arc::new(AtomicBool::new(false)),
            shutdown: a_shutdown,
            _inbound_keepalive: None,
        };
        let b = Self {
            room_id: room_id.to_string(),
            local_id: b_id.to_string(),
            outbound: b_out_tx,
            inbound: Some(b_in_rx),
            connected: Arc::new(AtomicBool::new(true)),
            closed: Arc::new(AtomicBool::new(false)),
            shutdown: b_shutdown,
            _inbound_keepalive: None,
        };

        (a, b)
    }

    /// In-memory relay: forwards one direction of the pair, dropping
    /// frames addressed to other rooms
    async fn relay_task(
        mut rx: mpsc::UnboundedReceiver<SignalingMessage>,
        tx: mpsc::UnboundedSender<SignalingMessage>,
        room_id: String,
    ) {
        while let Some(msg) = rx.recv().await {
            if msg.room_id != room_id {
                warn!("Relay dropping message for foreign room {}", msg.room_id);
                continue;
            }
            if tx.send(msg).is_err() {
                break;
            }
        }

        debug!("Relay task for room {} terminated", room_id);
    }

    /// Sender task: serializes queued messages onto the WebSocket
    async fn sender_task(
        mut write: futures::stream::SplitSink<WsStream, Message>,
        mut rx: mpsc::UnboundedReceiver<SignalingMessage>,
        mut shutdown: watch::Receiver<bool>,
        connected: Arc<AtomicBool>,
    ) {
        loop {
            tokio::select! {
                // Drain queued frames (the Leave sent by disconnect() must
                // go out before the socket closes)
                biased;

                msg = rx.recv() => match msg {
                    Some(msg) => {
                        let json = match msg.to_json() {
                            Ok(json) => json,
                            Err(e) => {
                                error!("Failed to serialize {} frame: {}", msg.kind(), e);
                                continue;
                            }
                        };
                        if let Err(e) = write.send(Message::Text(json)).await {
                            error!("Failed to send signaling frame: {}", e);
                            connected.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                    None => break,
                },

                _ = shutdown.changed() => break,
            }
        }

        let _ = write.send(Message::Close(None)).await;
        debug!("Signaling sender task terminated");
    }

    /// Receiver task: forwards in-order inbound frames for this room,
    /// skipping echoes of our own messages
    async fn receiver_task(
        mut read: futures::stream::SplitStream<WsStream>,
        tx: mpsc::UnboundedSender<SignalingMessage>,
        mut shutdown: watch::Receiver<bool>,
        connected: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
        room_id: String,
        local_id: String,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,

                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let msg = match SignalingMessage::from_json(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("Ignoring malformed signaling frame: {}", e);
                                continue;
                            }
                        };
                        if msg.room_id != room_id {
                            warn!(
                                "Ignoring {} frame for foreign room {}",
                                msg.kind(),
                                msg.room_id
                            );
                            continue;
                        }
                        if msg.sender_id == local_id {
                            continue;
                        }
                        // disconnect() guarantees nothing is delivered once
                        // it has returned
                        if closed.load(Ordering::SeqCst) {
                            break;
                        }
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Signaling connection closed for room {}", room_id);
                        connected.store(false, Ordering::SeqCst);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("Signaling transport error: {}", e);
                        connected.store(false, Ordering::SeqCst);
                        break;
                    }
                    Some(Ok(_)) => {}
                },
            }
        }

        debug!("Signaling receiver task terminated");
    }

    /// Room this channel is scoped to
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Local participant id
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Whether the transport is currently delivering events
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    /// Queue a message for the room.
    ///
    /// Fails silently when the channel is not connected; negotiation
    /// callers gate on [`SignalingChannel::is_connected`] instead of
    /// checking a return value.
    pub fn send(&self, msg: SignalingMessage) {
        if !self.is_connected() {
            debug!(
                "Dropping {} frame, signaling channel not connected",
                msg.kind()
            );
            return;
        }

        debug!("Sending {} frame for room {}", msg.kind(), self.room_id);

        if self.outbound.send(msg).is_err() {
            debug!("Signaling sender task gone, frame dropped");
        }
    }

    /// Take the inbound message sequence.
    ///
    /// The sequence is lazy, infinite, and non-restartable: this returns
    /// `Some` exactly once, and the stream ends only when the transport
    /// drops or the channel is disconnected.
    pub fn take_inbound(&mut self) -> Option<UnboundedReceiverStream<SignalingMessage>> {
        self.inbound.take().map(UnboundedReceiverStream::new)
    }

    /// Disconnect from the room.
    ///
    /// Idempotent: the first call queues a Leave frame and stops delivery;
    /// later calls do nothing. After this returns no further inbound
    /// events are delivered.
    pub fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Signaling channel for room {} already closed", self.room_id);
            return;
        }

        info!("Disconnecting signaling channel for room {}", self.room_id);

        let _ = self
            .outbound
            .send(SignalingMessage::leave(&self.room_id, &self.local_id));
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.shutdown.send(true);
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}
