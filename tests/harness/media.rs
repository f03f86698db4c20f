//! Scripted media engine and collaborator fakes
//!
//! The fake engine records every call made against it and lets tests emit
//! ICE events as if the native stack produced them, so negotiation and
//! state-machine behavior can be driven end to end without any real media.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use roomcall::{
    DisplayNameResolver, Error, IceConnectionState, MediaEngine, MediaEngineEvent, RingDispatcher,
};

/// Media engine fake with a scripted event stream and a call log
pub struct FakeMediaEngine {
    label: String,
    calls: Mutex<Vec<String>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<MediaEngineEvent>>>,
    events_tx: mpsc::UnboundedSender<MediaEngineEvent>,
    fail_audio_route: bool,
}

impl FakeMediaEngine {
    /// Create an engine that accepts everything
    pub fn new(label: &str) -> Arc<Self> {
        Self::build(label, false)
    }

    /// Create an engine whose mute/speaker routing always errors
    pub fn with_failing_audio_route(label: &str) -> Arc<Self> {
        Self::build(label, true)
    }

    fn build(label: &str, fail_audio_route: bool) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            label: label.to_string(),
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(Some(events_rx)),
            events_tx,
            fail_audio_route,
        })
    }

    /// Emit a gathered ICE candidate as the native stack would
    pub fn emit_candidate(&self, candidate: &str) {
        let _ = self
            .events_tx
            .send(MediaEngineEvent::IceCandidate(candidate.to_string()));
    }

    /// Emit an ICE connection state change
    pub fn emit_ice_state(&self, state: IceConnectionState) {
        let _ = self
            .events_tx
            .send(MediaEngineEvent::IceConnectionState(state));
    }

    /// All calls made against the engine, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Whether a call was made at least once
    pub fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|c| c == name)
    }

    /// Number of times a call was made
    pub fn count_of(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    /// Position of the first matching call, if any
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == name)
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl MediaEngine for FakeMediaEngine {
    async fn create_offer(&self) -> roomcall::Result<String> {
        self.record("create_offer".to_string());
        Ok(format!("v=0 offer from {}", self.label))
    }

    async fn create_answer(&self) -> roomcall::Result<String> {
        self.record("create_answer".to_string());
        Ok(format!("v=0 answer from {}", self.label))
    }

    async fn set_local_description(&self, _sdp: String) -> roomcall::Result<()> {
        self.record("set_local_description".to_string());
        Ok(())
    }

    async fn set_remote_description(&self, _sdp: String) -> roomcall::Result<()> {
        self.record("set_remote_description".to_string());
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: String) -> roomcall::Result<()> {
        self.record(format!("add_ice_candidate:{}", candidate));
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> roomcall::Result<()> {
        self.record(format!("set_muted:{}", muted));
        if self.fail_audio_route {
            return Err(Error::negotiation("audio route unavailable"));
        }
        Ok(())
    }

    async fn set_speaker(&self, speaker_on: bool) -> roomcall::Result<()> {
        self.record(format!("set_speaker:{}", speaker_on));
        if self.fail_audio_route {
            return Err(Error::negotiation("audio route unavailable"));
        }
        Ok(())
    }

    async fn close(&self) -> roomcall::Result<()> {
        self.record("close".to_string());
        Ok(())
    }

    fn take_events(&self) -> Option<mpsc::UnboundedReceiver<MediaEngineEvent>> {
        self.events.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// Ring dispatcher fake that records every dispatched ring
#[derive(Default)]
pub struct RingRecorder {
    rings: Mutex<Vec<(String, String)>>,
}

impl RingRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.rings.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn rings(&self) -> Vec<(String, String)> {
        self.rings.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RingDispatcher for RingRecorder {
    async fn ring(&self, sender_id: &str, target_id: &str) {
        if let Ok(mut rings) = self.rings.lock() {
            rings.push((sender_id.to_string(), target_id.to_string()));
        }
    }
}

/// Fixed-table display name resolver
pub struct StaticResolver {
    names: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            names: entries
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        })
    }
}

#[async_trait]
impl DisplayNameResolver for StaticResolver {
    async fn display_name(&self, participant_id: &str) -> Option<String> {
        self.names.get(participant_id).cloned()
    }
}
