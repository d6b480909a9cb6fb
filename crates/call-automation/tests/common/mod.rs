//! Common test helpers for call-automation testing
//!
//! Provides a recording [`CallingOperations`] implementation so menu and
//! choice behavior can be asserted without a call-control backend.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use callflow_call_automation::ivr::parse_tone_sequence;
use callflow_call_automation::prelude::*;

/// One recorded calling operation
#[derive(Debug, Clone, PartialEq)]
pub enum CallingOp {
    GetParticipants(String),
    AddParticipant { call: String, target: String },
    RemoveParticipant { call: String, participant: String },
    PlayAudio { call: String, uri: String, target: Option<String>, looped: bool },
    RecognizeDtmf { call: String, target: String, max_tones: usize, prompt_uri: Option<String> },
    TransferCallLeg { call: String, target: String },
    CancelMedia(String),
    StartRecording(String),
    HangUp { call: String, terminate_for_all: bool },
}

/// Records every call and answers from scripted data
#[derive(Debug, Default)]
pub struct MockCallingOperations {
    ops: Mutex<Vec<CallingOp>>,
    participants: Mutex<Vec<CallParticipant>>,
    recognized: Mutex<VecDeque<Vec<DtmfTone>>>,
    fail_play_audio: Mutex<bool>,
    fail_remove: Mutex<bool>,
}

impl MockCallingOperations {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Participants returned by `get_participants`
    pub async fn set_participants(&self, raw_ids: &[&str]) {
        *self.participants.lock().await = raw_ids
            .iter()
            .map(|raw| CallParticipant::new(CommunicationIdentifier::from_raw_id(raw)))
            .collect();
    }

    /// Queue the tones the next `recognize_dtmf` call returns
    pub async fn push_recognized(&self, tones: &str) {
        self.recognized
            .lock()
            .await
            .push_back(parse_tone_sequence(tones));
    }

    pub async fn fail_play_audio(&self) {
        *self.fail_play_audio.lock().await = true;
    }

    pub async fn fail_remove(&self) {
        *self.fail_remove.lock().await = true;
    }

    pub async fn ops(&self) -> Vec<CallingOp> {
        self.ops.lock().await.clone()
    }

    pub async fn plays(&self) -> Vec<CallingOp> {
        self.ops()
            .await
            .into_iter()
            .filter(|op| matches!(op, CallingOp::PlayAudio { .. }))
            .collect()
    }

    pub async fn removals(&self) -> Vec<String> {
        self.ops()
            .await
            .into_iter()
            .filter_map(|op| match op {
                CallingOp::RemoveParticipant { participant, .. } => Some(participant),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, op: CallingOp) {
        self.ops.lock().await.push(op);
    }
}

#[async_trait]
impl CallingOperations for MockCallingOperations {
    async fn get_participants(
        &self,
        call: &CallConnection,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CallParticipant>> {
        self.record(CallingOp::GetParticipants(call.call_connection_id.clone())).await;
        Ok(self.participants.lock().await.clone())
    }

    async fn add_participant(
        &self,
        call: &CallConnection,
        invite: CallInvite,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.record(CallingOp::AddParticipant {
            call: call.call_connection_id.clone(),
            target: invite.target.raw_id(),
        })
        .await;
        Ok(())
    }

    async fn remove_participant(
        &self,
        call: &CallConnection,
        participant: &CommunicationIdentifier,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.record(CallingOp::RemoveParticipant {
            call: call.call_connection_id.clone(),
            participant: participant.raw_id(),
        })
        .await;
        if *self.fail_remove.lock().await {
            return Err(AutomationError::calling("remove participant rejected"));
        }
        Ok(())
    }

    async fn play_audio(
        &self,
        call: &CallConnection,
        uri: &str,
        target: Option<&CommunicationIdentifier>,
        looped: bool,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.record(CallingOp::PlayAudio {
            call: call.call_connection_id.clone(),
            uri: uri.to_string(),
            target: target.map(|t| t.raw_id()),
            looped,
        })
        .await;
        if *self.fail_play_audio.lock().await {
            return Err(AutomationError::calling("play audio rejected"));
        }
        Ok(())
    }

    async fn recognize_dtmf(
        &self,
        call: &CallConnection,
        options: DtmfRecognizeOptions,
        _cancel: &CancellationToken,
    ) -> Result<Vec<DtmfTone>> {
        self.record(CallingOp::RecognizeDtmf {
            call: call.call_connection_id.clone(),
            target: options.target.raw_id(),
            max_tones: options.max_tones,
            prompt_uri: options.prompt_uri.clone(),
        })
        .await;
        Ok(self.recognized.lock().await.pop_front().unwrap_or_default())
    }

    async fn transfer_call_leg(
        &self,
        call: &CallConnection,
        invite: CallInvite,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.record(CallingOp::TransferCallLeg {
            call: call.call_connection_id.clone(),
            target: invite.target.raw_id(),
        })
        .await;
        Ok(())
    }

    async fn cancel_media(&self, call: &CallConnection, _cancel: &CancellationToken) -> Result<()> {
        self.record(CallingOp::CancelMedia(call.call_connection_id.clone())).await;
        Ok(())
    }

    async fn start_recording(&self, call: &CallConnection, _cancel: &CancellationToken) -> Result<()> {
        self.record(CallingOp::StartRecording(call.call_connection_id.clone())).await;
        Ok(())
    }

    async fn hang_up(
        &self,
        call: &CallConnection,
        terminate_for_all: bool,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.record(CallingOp::HangUp {
            call: call.call_connection_id.clone(),
            terminate_for_all,
        })
        .await;
        Ok(())
    }
}

/// A choice that counts its invocations and remembers what it was given
#[derive(Debug, Default)]
pub struct RecordingChoice {
    calls: AtomicUsize,
    seen: Mutex<Vec<(DtmfTone, String, String)>>,
    fail_with: Option<String>,
}

impl RecordingChoice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (tone, call connection id, target raw id) per invocation
    pub async fn seen(&self) -> Vec<(DtmfTone, String, String)> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl IvrChoice for RecordingChoice {
    fn name(&self) -> &str {
        "recording"
    }

    async fn on_press(
        &self,
        tone: DtmfTone,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .await
            .push((tone, call.call_connection_id.clone(), target.raw_id()));
        match &self.fail_with {
            Some(message) => Err(AutomationError::calling(message.clone())),
            None => Ok(()),
        }
    }
}

pub fn test_call() -> CallConnection {
    CallConnection::new("call-123")
}

pub fn acs_target() -> CommunicationIdentifier {
    CommunicationIdentifier::from_raw_id("8:acs:abc_123")
}
