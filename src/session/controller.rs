//! Session controller
//!
//! Orchestrates one room's call session: decides the offerer/answerer role,
//! drives the connection state machine from engine callbacks, owns the
//! membership roster, and exposes the mute/speaker/beckon/hang-up surface
//! to the presentation layer.
//!
//! All session state lives on a single control task. Inbound signaling
//! frames and media engine events arrive on their own execution contexts
//! and are marshaled onto that task before anything is mutated, so no two
//! sources ever update the state machine concurrently.

use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::beckon::BeckonLimiter;
use super::events::{CallSnapshot, DismissReason, SessionEvent};
use super::roster::ParticipantRoster;
use super::state::{ConnectionState, ConnectionStateMachine};
use crate::identity::{DisplayNameResolver, LocalIdentity, RingDispatcher};
use crate::media::{IceConnectionState, MediaEngine, MediaEngineEvent};
use crate::signaling::{SignalPayload, SignalingChannel, SignalingMessage};
use crate::{CallConfig, Error, Result};

/// How often the control task refreshes the snapshot while idle, so the
/// duration readout and beckon countdown keep moving
const SNAPSHOT_TICK: Duration = Duration::from_millis(250);

/// User-initiated actions, queued onto the control task
#[derive(Debug)]
enum Command {
    Connect,
    ToggleMute,
    ToggleSpeaker,
    Beckon { target: Option<String> },
    HangUp,
}

/// Handle to one room's call session.
///
/// The presentation context that enters the call view owns exactly one
/// controller per room id and discards it on leaving, whatever state the
/// call reached. Dropping the controller ends the session: the control
/// task notices the command channel closing and runs the same teardown
/// path as an explicit hang-up, so abrupt navigation away releases every
/// resource too.
pub struct SessionController {
    room_id: String,
    local_id: String,
    commands: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<CallSnapshot>,
    events: StdMutex<Option<mpsc::UnboundedReceiver<SessionEvent>>>,
    control: StdMutex<Option<JoinHandle<()>>>,
    resolver: Option<Arc<dyn DisplayNameResolver>>,
}

impl SessionController {
    /// Join a room's calling surface over the configured signaling relay.
    ///
    /// Opens the signaling channel, then hands everything to
    /// [`SessionController::with_channel`].
    pub async fn join(
        config: CallConfig,
        identity: LocalIdentity,
        room_id: &str,
        engine: Arc<dyn MediaEngine>,
        ring: Arc<dyn RingDispatcher>,
        resolver: Option<Arc<dyn DisplayNameResolver>>,
    ) -> Result<Self> {
        let channel = SignalingChannel::connect(&config, room_id, identity.participant_id()).await?;
        Self::with_channel(config, identity, channel, engine, ring, resolver)
    }

    /// Build a session over an already constructed signaling channel.
    ///
    /// Spawns the control task; must be called within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated against the usual limits
    /// * `identity` - Local participant identity, injected explicitly
    /// * `channel` - Signaling channel scoped to the session's room
    /// * `engine` - Media engine instance exclusively owned by this session
    /// * `ring` - Push-notification collaborator for the beckon action
    /// * `resolver` - Optional display-name lookup for the presentation layer
    pub fn with_channel(
        config: CallConfig,
        identity: LocalIdentity,
        mut channel: SignalingChannel,
        engine: Arc<dyn MediaEngine>,
        ring: Arc<dyn RingDispatcher>,
        resolver: Option<Arc<dyn DisplayNameResolver>>,
    ) -> Result<Self> {
        config.validate()?;

        if channel.local_id() != identity.participant_id() {
            return Err(Error::channel(format!(
                "signaling channel is bound to participant {}, not {}",
                channel.local_id(),
                identity.participant_id()
            )));
        }

        let room_id = channel.room_id().to_string();
        let local_id = identity.participant_id().to_string();

        let signal_rx = channel
            .take_inbound()
            .ok_or_else(|| Error::channel("signaling inbound already consumed"))?;
        let engine_rx = engine
            .take_events()
            .ok_or_else(|| Error::channel("media engine events already consumed"))?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(CallSnapshot::initial(&room_id, &local_id, channel.is_connected()));

        info!(
            "Starting call session for room {} as participant {}",
            room_id, local_id
        );

        let mut roster = ParticipantRoster::new();
        roster.join(local_id.clone());

        let task = ControlTask {
            room_id: room_id.clone(),
            local_id: local_id.clone(),
            channel,
            engine,
            ring,
            machine: ConnectionStateMachine::new(),
            roster,
            beckon: BeckonLimiter::new(Duration::from_secs(config.beckon_cooldown_secs)),
            dismiss_delay: Duration::from_millis(config.dismiss_delay_ms),
            has_local_sdp: false,
            has_remote_sdp: false,
            remote_sdp_applied: false,
            pending_candidates: Vec::new(),
            muted: false,
            speaker_on: false,
            connect_in_flight: false,
            connected_at: None,
            connected_frozen: Duration::ZERO,
            dismiss_deadline: None,
            dismiss_reason: DismissReason::HungUp,
            dismissed: false,
            signal_open: true,
            engine_open: true,
            commands_rx,
            signal_rx,
            engine_rx,
            snapshot_tx,
            events_tx,
        };

        let handle = tokio::spawn(task.run());

        Ok(Self {
            room_id,
            local_id,
            commands: commands_tx,
            snapshot_rx,
            events: StdMutex::new(Some(events_rx)),
            control: StdMutex::new(Some(handle)),
            resolver,
        })
    }

    /// Room this session is scoped to
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Local participant id
    pub fn local_participant_id(&self) -> &str {
        &self.local_id
    }

    /// The UI-facing Connect action.
    ///
    /// Dispatches to the answer path when a remote offer has been observed,
    /// to the offer path otherwise. A no-op while alone in the room, while
    /// signaling is down, or while an attempt is already in flight. This is
    /// a manual-acceptance model: a received offer never auto-answers.
    pub fn connect(&self) {
        self.send_command(Command::Connect);
    }

    /// Toggle the local microphone mute flag.
    ///
    /// Local-only, no signaling round-trip. Never fails visibly: the flag
    /// reflects requested intent even when the audio route errors.
    pub fn toggle_mute(&self) {
        self.send_command(Command::ToggleMute);
    }

    /// Toggle the speaker audio route. Same visibility rules as
    /// [`SessionController::toggle_mute`].
    pub fn toggle_speaker(&self) {
        self.send_command(Command::ToggleSpeaker);
    }

    /// Ring another participant, inviting them into the room.
    ///
    /// Rate limited client-side; suppressed while the cooldown runs. With
    /// no explicit target the remote party of the two-party call is rung.
    pub fn beckon(&self, target: Option<String>) {
        self.send_command(Command::Beckon { target });
    }

    /// Hang up and tear the session down.
    ///
    /// Safe to call from any state, including before negotiation starts,
    /// and more than once.
    pub fn hang_up(&self) {
        self.send_command(Command::HangUp);
    }

    /// Get the latest observable state
    pub fn snapshot(&self) -> CallSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to observable state updates
    pub fn watch_state(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Take the session event stream.
    ///
    /// Returns `Some` exactly once; the stream ends when the session does.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.lock().ok().and_then(|mut guard| guard.take())
    }

    /// Resolve a participant's display name, falling back to the raw id
    pub async fn display_name(&self, participant_id: &str) -> String {
        match &self.resolver {
            Some(resolver) => resolver
                .display_name(participant_id)
                .await
                .unwrap_or_else(|| participant_id.to_string()),
            None => participant_id.to_string(),
        }
    }

    /// Wait for the control task to finish tearing down
    pub async fn ended(&self) {
        let handle = self.control.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn send_command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Call session for room {} already ended", self.room_id);
        }
    }
}

/// Sleep until the given deadline, or forever when there is none.
///
/// Lets the dismiss deadline sit directly in a `select!` arm without
/// spawning a timer task that would need cancelling on every exit path.
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// State owned by the control task. Nothing here is shared; every mutation
/// happens inside [`ControlTask::run`].
struct ControlTask {
    room_id: String,
    local_id: String,
    channel: SignalingChannel,
    engine: Arc<dyn MediaEngine>,
    ring: Arc<dyn RingDispatcher>,
    machine: ConnectionStateMachine,
    roster: ParticipantRoster,
    beckon: BeckonLimiter,
    dismiss_delay: Duration,

    has_local_sdp: bool,
    has_remote_sdp: bool,
    /// The remote description was applied to the engine; candidates may
    /// now be forwarded instead of buffered
    remote_sdp_applied: bool,
    /// Remote candidates that arrived before the remote description
    pending_candidates: Vec<String>,

    muted: bool,
    speaker_on: bool,
    connect_in_flight: bool,

    connected_at: Option<Instant>,
    connected_frozen: Duration,
    dismiss_deadline: Option<Instant>,
    dismiss_reason: DismissReason,
    dismissed: bool,

    signal_open: bool,
    engine_open: bool,

    commands_rx: mpsc::UnboundedReceiver<Command>,
    signal_rx: UnboundedReceiverStream<SignalingMessage>,
    engine_rx: mpsc::UnboundedReceiver<MediaEngineEvent>,
    snapshot_tx: watch::Sender<CallSnapshot>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ControlTask {
    async fn run(mut self) {
        loop {
            let dismiss_at = self.dismiss_deadline;

            tokio::select! {
                biased;

                command = self.commands_rx.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!(
                            "Controller handle for room {} dropped, tearing down",
                            self.room_id
                        );
                        break;
                    }
                },

                frame = self.signal_rx.next(), if self.signal_open => match frame {
                    Some(msg) => self.handle_signal(msg).await,
                    None => {
                        debug!("Signaling inbound for room {} ended", self.room_id);
                        self.signal_open = false;
                    }
                },

                event = self.engine_rx.recv(), if self.engine_open => match event {
                    Some(event) => self.handle_engine_event(event).await,
                    None => self.engine_open = false,
                },

                _ = sleep_until_opt(dismiss_at), if dismiss_at.is_some() => {
                    self.emit_dismissed(self.dismiss_reason);
                    break;
                }

                _ = tokio::time::sleep(SNAPSHOT_TICK) => {}
            }

            self.publish_snapshot();
        }

        self.teardown().await;
    }

    /// Handle a user action. Returns whether the control loop keeps running.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect => {
                self.try_connect().await;
                true
            }
            Command::ToggleMute => {
                self.muted = !self.muted;
                if let Err(e) = self.engine.set_muted(self.muted).await {
                    // Toggle reflects requested intent only
                    debug!("Swallowing audio route error on mute toggle: {}", e);
                }
                true
            }
            Command::ToggleSpeaker => {
                self.speaker_on = !self.speaker_on;
                if let Err(e) = self.engine.set_speaker(self.speaker_on).await {
                    debug!("Swallowing audio route error on speaker toggle: {}", e);
                }
                true
            }
            Command::Beckon { target } => {
                self.try_beckon(target);
                true
            }
            Command::HangUp => {
                info!("Hanging up call in room {}", self.room_id);
                self.apply_transition(ConnectionState::Closed);
                self.emit_dismissed(DismissReason::HungUp);
                false
            }
        }
    }

    async fn try_connect(&mut self) {
        if self.machine.state().is_terminal() || self.dismiss_deadline.is_some() {
            debug!("Connect ignored, session for room {} is ending", self.room_id);
            return;
        }
        if self.roster.len() <= 1 {
            debug!("Connect ignored, nobody else in room {}", self.room_id);
            return;
        }
        if !self.channel.is_connected() {
            debug!("Connect ignored, signaling channel not connected");
            return;
        }
        if self.connect_in_flight || self.has_local_sdp {
            debug!("Connect ignored, attempt already in flight");
            return;
        }

        self.connect_in_flight = true;

        if self.has_remote_sdp {
            self.answer().await;
        } else {
            self.offer().await;
        }
    }

    /// Create and send a local offer. Valid only while no remote
    /// description has been observed.
    async fn offer(&mut self) {
        if self.has_remote_sdp {
            debug!("Offer skipped, a remote description is already present");
            return;
        }

        self.apply_transition(ConnectionState::Checking);

        let sdp = match self.engine.create_offer().await {
            Ok(sdp) => sdp,
            Err(e) => {
                warn!("Failed to create offer for room {}: {}", self.room_id, e);
                self.fail_negotiation();
                return;
            }
        };
        if let Err(e) = self.engine.set_local_description(sdp.clone()).await {
            warn!("Failed to apply local offer for room {}: {}", self.room_id, e);
            self.fail_negotiation();
            return;
        }

        self.has_local_sdp = true;
        self.channel
            .send(SignalingMessage::offer(&self.room_id, &self.local_id, sdp));
        debug!("Sent offer for room {}", self.room_id);
    }

    /// Create and send a local answer to the observed remote offer
    async fn answer(&mut self) {
        if !self.has_remote_sdp {
            debug!("Answer skipped, no remote description observed yet");
            return;
        }

        self.apply_transition(ConnectionState::Checking);

        let sdp = match self.engine.create_answer().await {
            Ok(sdp) => sdp,
            Err(e) => {
                warn!("Failed to create answer for room {}: {}", self.room_id, e);
                self.fail_negotiation();
                return;
            }
        };
        if let Err(e) = self.engine.set_local_description(sdp.clone()).await {
            warn!(
                "Failed to apply local answer for room {}: {}",
                self.room_id, e
            );
            self.fail_negotiation();
            return;
        }

        self.has_local_sdp = true;
        self.channel
            .send(SignalingMessage::answer(&self.room_id, &self.local_id, sdp));
        debug!("Sent answer for room {}", self.room_id);
    }

    fn try_beckon(&mut self, target: Option<String>) {
        if self.machine.state().is_terminal() || self.dismiss_deadline.is_some() {
            debug!("Beckon ignored, session for room {} is ending", self.room_id);
            return;
        }

        let target = target.or_else(|| self.roster.remote_of(&self.local_id).map(String::from));
        let Some(target) = target else {
            debug!("Beckon ignored, no remote participant in room {}", self.room_id);
            return;
        };

        if !self.beckon.fire() {
            return;
        }

        info!("Beckoning {} to room {}", target, self.room_id);

        // Fire-and-forget: no delivery signal ever comes back
        let ring = Arc::clone(&self.ring);
        let sender = self.local_id.clone();
        tokio::spawn(async move {
            ring.ring(&sender, &target).await;
        });
    }

    async fn handle_signal(&mut self, msg: SignalingMessage) {
        debug!(
            "Handling {} from {} for room {}",
            msg.kind(),
            msg.sender_id,
            msg.room_id
        );

        let sender = msg.sender_id;
        match msg.payload {
            SignalPayload::Join => {
                if self.roster.join(sender) {
                    self.emit(SessionEvent::RosterChanged(self.roster.ids().to_vec()));
                }
            }
            SignalPayload::Leave => {
                if self.roster.leave(&sender) {
                    self.emit(SessionEvent::RosterChanged(self.roster.ids().to_vec()));
                }
            }
            SignalPayload::Offer { sdp } => self.handle_remote_offer(sender, sdp).await,
            SignalPayload::Answer { sdp } => self.handle_remote_answer(sender, sdp).await,
            SignalPayload::IceCandidate { candidate } => {
                self.handle_remote_candidate(sender, candidate).await
            }
        }
    }

    async fn handle_remote_offer(&mut self, sender: String, sdp: String) {
        if self.machine.state().is_terminal() || self.dismiss_deadline.is_some() {
            debug!("Ignoring offer from {} after collapse", sender);
            return;
        }
        if self.has_remote_sdp {
            debug!("Ignoring duplicate offer from {}", sender);
            return;
        }

        let mut yielded = false;
        if self.has_local_sdp {
            // Glare: both sides offered before observing each other's SDP.
            // The lexicographically smaller participant id keeps the
            // offerer role; the other side discards its offer and answers.
            if self.local_id.as_str() < sender.as_str() {
                debug!("Glare with {}: keeping offerer role", sender);
                return;
            }
            info!("Glare with {}: yielding offerer role", sender);
            self.has_local_sdp = false;
            yielded = true;
        }

        self.has_remote_sdp = true;
        match self.engine.set_remote_description(sdp).await {
            Ok(()) => {
                self.remote_sdp_applied = true;
                self.flush_pending_candidates().await;
                if yielded {
                    // Connect intent was already expressed locally; the
                    // concession converts it into the answer
                    self.answer().await;
                }
            }
            Err(e) => {
                warn!("Failed to apply remote offer from {}: {}", sender, e);
                self.fail_negotiation();
            }
        }
    }

    async fn handle_remote_answer(&mut self, sender: String, sdp: String) {
        if !self.has_local_sdp {
            warn!("Ignoring answer from {} before any offer was sent", sender);
            return;
        }
        if self.has_remote_sdp {
            debug!("Ignoring duplicate answer from {}", sender);
            return;
        }

        self.has_remote_sdp = true;
        match self.engine.set_remote_description(sdp).await {
            Ok(()) => {
                self.remote_sdp_applied = true;
                self.flush_pending_candidates().await;
            }
            Err(e) => {
                warn!("Failed to apply remote answer from {}: {}", sender, e);
                self.fail_negotiation();
            }
        }
    }

    async fn handle_remote_candidate(&mut self, sender: String, candidate: String) {
        if !self.remote_sdp_applied {
            debug!(
                "Buffering ICE candidate from {} until the remote description is set",
                sender
            );
            self.pending_candidates.push(candidate);
            return;
        }

        if let Err(e) = self.engine.add_ice_candidate(candidate).await {
            warn!("Failed to apply ICE candidate from {}: {}", sender, e);
        }
    }

    /// Apply candidates that arrived ahead of the remote description, in
    /// arrival order
    async fn flush_pending_candidates(&mut self) {
        let pending = std::mem::take(&mut self.pending_candidates);
        if pending.is_empty() {
            return;
        }

        debug!("Applying {} buffered ICE candidates", pending.len());
        for candidate in pending {
            if let Err(e) = self.engine.add_ice_candidate(candidate).await {
                warn!("Failed to apply buffered ICE candidate: {}", e);
            }
        }
    }

    async fn handle_engine_event(&mut self, event: MediaEngineEvent) {
        match event {
            MediaEngineEvent::IceCandidate(candidate) => {
                // Trickle ICE: forward every gathered candidate immediately
                self.channel.send(SignalingMessage::ice_candidate(
                    &self.room_id,
                    &self.local_id,
                    candidate,
                ));
            }
            MediaEngineEvent::IceConnectionState(state) => {
                self.apply_transition(map_ice_state(state));
            }
        }
    }

    /// Drive the state machine, emitting the change and running entry
    /// policy for the new state. Returns whether the transition applied.
    fn apply_transition(&mut self, next: ConnectionState) -> bool {
        if !self.machine.transition(next) {
            return false;
        }

        self.emit(SessionEvent::StateChanged(next));

        match next {
            ConnectionState::Connected | ConnectionState::Completed => {
                if self.connected_at.is_none() && self.dismiss_deadline.is_none() {
                    self.connected_at = Some(Instant::now());
                }
            }
            ConnectionState::Disconnected => self.collapse(DismissReason::MediaDisconnected),
            ConnectionState::Failed => self.collapse(DismissReason::MediaFailed),
            _ => {}
        }

        true
    }

    fn fail_negotiation(&mut self) {
        if !self.apply_transition(ConnectionState::Failed) {
            // Already terminal; make sure the collapse is still armed
            self.collapse(DismissReason::MediaFailed);
        }
    }

    /// Collapse-to-exit policy for Failed and Disconnected: stop the
    /// timers and the limiter, then auto-dismiss after the fixed delay.
    /// No reconnect is attempted; redialing means a fresh session.
    fn collapse(&mut self, reason: DismissReason) {
        if self.dismiss_deadline.is_some() {
            return;
        }

        info!(
            "Call in room {} collapsing ({}), dismissing in {}ms",
            self.room_id,
            self.machine.state().as_str(),
            self.dismiss_delay.as_millis()
        );

        self.beckon.stop();
        self.freeze_duration();
        self.connect_in_flight = false;
        self.dismiss_reason = reason;
        self.dismiss_deadline = Some(Instant::now() + self.dismiss_delay);
    }

    fn freeze_duration(&mut self) {
        self.connected_frozen = self.current_duration();
        self.connected_at = None;
    }

    fn current_duration(&self) -> Duration {
        match self.connected_at {
            Some(connected_at) => self.connected_frozen + connected_at.elapsed(),
            None => self.connected_frozen,
        }
    }

    fn emit(&self, event: SessionEvent) {
        debug!("Emitting {} for room {}", event.name(), self.room_id);
        if self.events_tx.send(event).is_err() {
            debug!("No session event listener for room {}", self.room_id);
        }
    }

    fn emit_dismissed(&mut self, reason: DismissReason) {
        if self.dismissed {
            return;
        }
        self.dismissed = true;
        self.emit(SessionEvent::Dismissed(reason));
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(CallSnapshot {
            room_id: self.room_id.clone(),
            local_participant_id: self.local_id.clone(),
            roster: self.roster.ids().to_vec(),
            connection_state: self.machine.state(),
            has_local_sdp: self.has_local_sdp,
            has_remote_sdp: self.has_remote_sdp,
            muted: self.muted,
            speaker_on: self.speaker_on,
            signaling_connected: self.channel.is_connected(),
            connected_secs: self.current_duration().as_secs(),
            beckon_cooldown_remaining: self.beckon.remaining_secs(),
        });
    }

    /// The single teardown path. Every exit route funnels through here
    /// exactly once, whether the session ended in a hang-up, a collapse
    /// dismissal, or a dropped controller handle.
    async fn teardown(&mut self) {
        debug!("Tearing down call session for room {}", self.room_id);

        self.apply_transition(ConnectionState::Closed);
        self.beckon.stop();
        self.freeze_duration();
        self.dismiss_deadline = None;

        if let Err(e) = self.engine.close().await {
            warn!("Error closing media engine for room {}: {}", self.room_id, e);
        }
        self.channel.disconnect();

        self.publish_snapshot();
        info!("Call session for room {} ended", self.room_id);
    }
}

fn map_ice_state(state: IceConnectionState) -> ConnectionState {
    match state {
        IceConnectionState::New => ConnectionState::New,
        IceConnectionState::Checking => ConnectionState::Checking,
        IceConnectionState::Connected => ConnectionState::Connected,
        IceConnectionState::Completed => ConnectionState::Completed,
        IceConnectionState::Disconnected => ConnectionState::Disconnected,
        IceConnectionState::Failed => ConnectionState::Failed,
        IceConnectionState::Closed => ConnectionState::Closed,
    }
}
