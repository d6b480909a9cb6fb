//! Typed inbound call-automation events

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ivr::calling::{CallParticipant, CommunicationIdentifier};
use crate::ivr::tone::DtmfTone;

/// Namespace prefix carried by CloudEvents/EventGrid type names
pub const EVENT_TYPE_PREFIX: &str = "Microsoft.Communication.";

/// Trim a type name and drop the namespace prefix in any letter case
pub fn strip_type_prefix(type_name: &str) -> &str {
    let trimmed = type_name.trim();
    match trimmed.get(..EVENT_TYPE_PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(EVENT_TYPE_PREFIX) => &trimmed[EVENT_TYPE_PREFIX.len()..],
        _ => trimmed,
    }
}

/// Every event kind this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CallConnected,
    CallDisconnected,
    AddParticipantSucceeded,
    AddParticipantFailed,
    RemoveParticipantSucceeded,
    RemoveParticipantFailed,
    ParticipantsUpdated,
    CallTransferAccepted,
    CallTransferFailed,
    PlayCompleted,
    PlayFailed,
    PlayCanceled,
    RecognizeCompleted,
    RecognizeFailed,
    RecognizeCanceled,
    ContinuousDtmfRecognitionToneReceived,
    ContinuousDtmfRecognitionToneFailed,
    ContinuousDtmfRecognitionStopped,
    SendDtmfTonesCompleted,
    SendDtmfTonesFailed,
    RecordingStateChanged,
    // Calling-server generation
    CallLegStateChangedEvent,
    ToneReceivedEvent,
    PlayAudioResultEvent,
    InviteParticipantsResultEvent,
}

/// Which payload field identifies the pending action an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationSource {
    /// The call connection (call leg) id
    CallConnection,
    /// The operation context supplied when the action was started
    OperationContext,
}

impl EventKind {
    pub const ALL: [EventKind; 25] = [
        Self::CallConnected,
        Self::CallDisconnected,
        Self::AddParticipantSucceeded,
        Self::AddParticipantFailed,
        Self::RemoveParticipantSucceeded,
        Self::RemoveParticipantFailed,
        Self::ParticipantsUpdated,
        Self::CallTransferAccepted,
        Self::CallTransferFailed,
        Self::PlayCompleted,
        Self::PlayFailed,
        Self::PlayCanceled,
        Self::RecognizeCompleted,
        Self::RecognizeFailed,
        Self::RecognizeCanceled,
        Self::ContinuousDtmfRecognitionToneReceived,
        Self::ContinuousDtmfRecognitionToneFailed,
        Self::ContinuousDtmfRecognitionStopped,
        Self::SendDtmfTonesCompleted,
        Self::SendDtmfTonesFailed,
        Self::RecordingStateChanged,
        Self::CallLegStateChangedEvent,
        Self::ToneReceivedEvent,
        Self::PlayAudioResultEvent,
        Self::InviteParticipantsResultEvent,
    ];

    /// Name used in correlation keys
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallConnected => "CallConnected",
            Self::CallDisconnected => "CallDisconnected",
            Self::AddParticipantSucceeded => "AddParticipantSucceeded",
            Self::AddParticipantFailed => "AddParticipantFailed",
            Self::RemoveParticipantSucceeded => "RemoveParticipantSucceeded",
            Self::RemoveParticipantFailed => "RemoveParticipantFailed",
            Self::ParticipantsUpdated => "ParticipantsUpdated",
            Self::CallTransferAccepted => "CallTransferAccepted",
            Self::CallTransferFailed => "CallTransferFailed",
            Self::PlayCompleted => "PlayCompleted",
            Self::PlayFailed => "PlayFailed",
            Self::PlayCanceled => "PlayCanceled",
            Self::RecognizeCompleted => "RecognizeCompleted",
            Self::RecognizeFailed => "RecognizeFailed",
            Self::RecognizeCanceled => "RecognizeCanceled",
            Self::ContinuousDtmfRecognitionToneReceived => "ContinuousDtmfRecognitionToneReceived",
            Self::ContinuousDtmfRecognitionToneFailed => "ContinuousDtmfRecognitionToneFailed",
            Self::ContinuousDtmfRecognitionStopped => "ContinuousDtmfRecognitionStopped",
            Self::SendDtmfTonesCompleted => "SendDtmfTonesCompleted",
            Self::SendDtmfTonesFailed => "SendDtmfTonesFailed",
            Self::RecordingStateChanged => "RecordingStateChanged",
            Self::CallLegStateChangedEvent => "CallLegStateChangedEvent",
            Self::ToneReceivedEvent => "ToneReceivedEvent",
            Self::PlayAudioResultEvent => "PlayAudioResultEvent",
            Self::InviteParticipantsResultEvent => "InviteParticipantsResultEvent",
        }
    }

    /// Resolve a wire type name, with or without the namespace prefix.
    ///
    /// Returns `None` for kinds this crate does not track.
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let bare = strip_type_prefix(type_name);
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(bare))
    }

    pub fn correlation_source(self) -> CorrelationSource {
        match self {
            Self::PlayAudioResultEvent | Self::InviteParticipantsResultEvent => {
                CorrelationSource::OperationContext
            }
            _ => CorrelationSource::CallConnection,
        }
    }

    /// Payload field holding the call connection id for this kind
    pub(crate) fn connection_field(self) -> &'static str {
        match self {
            Self::CallLegStateChangedEvent | Self::ToneReceivedEvent => "callLegId",
            _ => "callConnectionId",
        }
    }

    /// Whether this kind reports a failed operation
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::AddParticipantFailed
                | Self::RemoveParticipantFailed
                | Self::CallTransferFailed
                | Self::PlayFailed
                | Self::RecognizeFailed
                | Self::ContinuousDtmfRecognitionToneFailed
                | Self::SendDtmfTonesFailed
        )
    }
}

impl AsRef<str> for EventKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome details attached to operation events
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultInformation {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub sub_code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One parsed inbound event.
///
/// Consumed once by dispatch; the callback receives its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEvent {
    pub kind: EventKind,
    pub call_connection_id: Option<String>,
    pub server_call_id: Option<String>,
    pub correlation_id: Option<String>,
    pub operation_context: Option<String>,
    pub result_information: Option<ResultInformation>,
    /// The event body as received
    pub data: Value,
}

impl CallEvent {
    /// Build an event from its kind and body object
    pub fn from_data(kind: EventKind, data: Value) -> Self {
        let text = |field: &str| data.get(field).and_then(Value::as_str).map(str::to_string);

        let result_information = data
            .get("resultInformation")
            .and_then(|v| serde_json::from_value::<ResultInformation>(v.clone()).ok());

        Self {
            kind,
            call_connection_id: text(kind.connection_field()),
            server_call_id: text("serverCallId"),
            correlation_id: text("correlationId"),
            operation_context: text("operationContext"),
            result_information,
            data,
        }
    }

    /// The value this event correlates on, if the payload carried it
    pub fn call_leg_id(&self) -> Option<&str> {
        match self.kind.correlation_source() {
            CorrelationSource::CallConnection => self.call_connection_id.as_deref(),
            CorrelationSource::OperationContext => self.operation_context.as_deref(),
        }
    }

    /// Tones carried by recognize and tone-received events
    pub fn collected_tones(&self) -> Vec<DtmfTone> {
        let from_array = |value: &Value| -> Vec<DtmfTone> {
            value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|s| s.parse().ok())
                        .collect()
                })
                .unwrap_or_default()
        };

        match self.kind {
            EventKind::RecognizeCompleted => {
                let recognize = self
                    .data
                    .get("recognizeResult")
                    .or_else(|| self.data.get("collectTonesResult"));
                let tones = recognize.and_then(|r| r.get("tones"));
                tones.map(from_array).unwrap_or_default()
            }
            EventKind::ContinuousDtmfRecognitionToneReceived => self
                .data
                .get("toneInfo")
                .and_then(|info| info.get("tone"))
                .or_else(|| self.data.get("tone"))
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .into_iter()
                .collect(),
            EventKind::ToneReceivedEvent => self
                .data
                .get("toneInfo")
                .and_then(|info| info.get("tone"))
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Participants listed by a `ParticipantsUpdated` event
    pub fn participants(&self) -> Vec<CallParticipant> {
        if self.kind != EventKind::ParticipantsUpdated {
            return Vec::new();
        }

        self.data
            .get("participants")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let raw_id = item
                            .get("identifier")
                            .and_then(|id| id.get("rawId"))
                            .and_then(Value::as_str)?;
                        let is_muted = item.get("isMuted").and_then(Value::as_bool).unwrap_or(false);
                        Some(CallParticipant {
                            identifier: CommunicationIdentifier::from_raw_id(raw_id),
                            is_muted,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
