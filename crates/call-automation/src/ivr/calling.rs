//! Calling-operations boundary
//!
//! IVR choices act on a call only through [`CallingOperations`]. The
//! implementation (an SDK client, a test double, a logger) lives outside
//! this crate.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::ivr::tone::DtmfTone;

/// Identity of a call participant, round-trippable through its raw id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CommunicationIdentifier {
    /// PSTN number in E.164 form, e.g. `+14255550100`
    PhoneNumber(String),
    /// Communication Services user, stored as its full raw id
    CommunicationUser(String),
    /// Teams user, stored as its full raw id
    MicrosoftTeamsUser(String),
    /// Anything else, kept verbatim
    Unknown(String),
}

const PHONE_PREFIX: &str = "4:";
const USER_PREFIXES: [&str; 4] = ["8:acs:", "8:spool:", "8:dod-acs:", "8:gcch-acs:"];
const TEAMS_PREFIXES: [&str; 4] = ["8:orgid:", "8:dod:", "8:gcch:", "8:teamsvisitor:"];

impl CommunicationIdentifier {
    /// Classify a raw id by its prefix
    pub fn from_raw_id(raw_id: &str) -> Self {
        if let Some(number) = raw_id.strip_prefix(PHONE_PREFIX) {
            return Self::PhoneNumber(number.to_string());
        }
        if USER_PREFIXES.iter().any(|p| raw_id.starts_with(p)) {
            return Self::CommunicationUser(raw_id.to_string());
        }
        if TEAMS_PREFIXES.iter().any(|p| raw_id.starts_with(p)) {
            return Self::MicrosoftTeamsUser(raw_id.to_string());
        }
        Self::Unknown(raw_id.to_string())
    }

    pub fn phone_number(number: impl Into<String>) -> Self {
        Self::PhoneNumber(number.into())
    }

    pub fn raw_id(&self) -> String {
        match self {
            Self::PhoneNumber(number) => format!("{}{}", PHONE_PREFIX, number),
            Self::CommunicationUser(raw) | Self::MicrosoftTeamsUser(raw) | Self::Unknown(raw) => {
                raw.clone()
            }
        }
    }

    pub fn is_phone_number(&self) -> bool {
        matches!(self, Self::PhoneNumber(_))
    }
}

impl fmt::Display for CommunicationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_id())
    }
}

/// The call a menu is acting on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallConnection {
    pub call_connection_id: String,
    #[serde(default)]
    pub server_call_id: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl CallConnection {
    pub fn new(call_connection_id: impl Into<String>) -> Self {
        Self {
            call_connection_id: call_connection_id.into(),
            server_call_id: None,
            correlation_id: None,
        }
    }

    pub fn with_server_call_id(mut self, server_call_id: impl Into<String>) -> Self {
        self.server_call_id = Some(server_call_id.into());
        self
    }
}

/// One participant as reported by the call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParticipant {
    pub identifier: CommunicationIdentifier,
    #[serde(default)]
    pub is_muted: bool,
}

impl CallParticipant {
    pub fn new(identifier: CommunicationIdentifier) -> Self {
        Self {
            identifier,
            is_muted: false,
        }
    }
}

/// Invitation used when adding a participant or transferring a leg
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInvite {
    pub target: CommunicationIdentifier,
    pub source_caller_id: Option<CommunicationIdentifier>,
}

impl CallInvite {
    pub fn new(target: CommunicationIdentifier, source_caller_id: Option<CommunicationIdentifier>) -> Self {
        Self {
            target,
            source_caller_id,
        }
    }
}

/// How DTMF input should be collected
#[derive(Debug, Clone, PartialEq)]
pub struct DtmfRecognizeOptions {
    /// Participant whose tones are collected
    pub target: CommunicationIdentifier,
    /// Stop after this many tones
    pub max_tones: usize,
    /// Prompt played while waiting
    pub prompt_uri: Option<String>,
    /// Whether a key press interrupts the prompt
    pub interrupt_prompt: bool,
    /// Tones that end collection early
    pub stop_tones: Vec<DtmfTone>,
    /// Silence allowed before the first tone
    pub initial_silence_timeout: Duration,
}

impl DtmfRecognizeOptions {
    pub fn new(target: CommunicationIdentifier, max_tones: usize) -> Self {
        Self {
            target,
            max_tones,
            prompt_uri: None,
            interrupt_prompt: false,
            stop_tones: Vec::new(),
            initial_silence_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_prompt(mut self, prompt_uri: Option<String>) -> Self {
        self.prompt_uri = prompt_uri;
        self.interrupt_prompt = true;
        self
    }

    pub fn with_stop_tones(mut self, stop_tones: Vec<DtmfTone>) -> Self {
        self.stop_tones = stop_tones;
        self
    }
}

/// Operations an IVR branch may perform on a call
#[async_trait]
pub trait CallingOperations: Send + Sync {
    /// List the call's current participants
    async fn get_participants(
        &self,
        call: &CallConnection,
        cancel: &CancellationToken,
    ) -> Result<Vec<CallParticipant>>;

    /// Invite a new participant into the call
    async fn add_participant(
        &self,
        call: &CallConnection,
        invite: CallInvite,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Remove one participant from the call
    async fn remove_participant(
        &self,
        call: &CallConnection,
        participant: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Play an audio file to one participant, or to everyone when `target` is `None`
    async fn play_audio(
        &self,
        call: &CallConnection,
        uri: &str,
        target: Option<&CommunicationIdentifier>,
        looped: bool,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Collect DTMF tones; an empty list means nothing was pressed in time
    async fn recognize_dtmf(
        &self,
        call: &CallConnection,
        options: DtmfRecognizeOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<DtmfTone>>;

    /// Transfer the call leg to someone else
    async fn transfer_call_leg(
        &self,
        call: &CallConnection,
        invite: CallInvite,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Stop any media operation in progress
    async fn cancel_media(&self, call: &CallConnection, cancel: &CancellationToken) -> Result<()>;

    /// Start recording the call
    async fn start_recording(&self, call: &CallConnection, cancel: &CancellationToken) -> Result<()>;

    /// Hang up, ending the call for everyone when `terminate_for_all` is set
    async fn hang_up(
        &self,
        call: &CallConnection,
        terminate_for_all: bool,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_id_classification() {
        let phone = CommunicationIdentifier::from_raw_id("4:+14255550100");
        assert_eq!(phone, CommunicationIdentifier::phone_number("+14255550100"));
        assert_eq!(phone.raw_id(), "4:+14255550100");

        let user = CommunicationIdentifier::from_raw_id("8:acs:abc_123");
        assert!(matches!(user, CommunicationIdentifier::CommunicationUser(_)));
        assert_eq!(user.raw_id(), "8:acs:abc_123");

        let teams = CommunicationIdentifier::from_raw_id("8:orgid:00000000-aaaa");
        assert!(matches!(teams, CommunicationIdentifier::MicrosoftTeamsUser(_)));

        let odd = CommunicationIdentifier::from_raw_id("28:bot");
        assert_eq!(odd, CommunicationIdentifier::Unknown("28:bot".to_string()));
        assert!(!odd.is_phone_number());
    }

    #[test]
    fn test_recognize_options_builder() {
        let options = DtmfRecognizeOptions::new(CommunicationIdentifier::from_raw_id("8:acs:x"), 20)
            .with_prompt(Some("https://x/prompt.wav".to_string()))
            .with_stop_tones(vec![DtmfTone::Pound]);

        assert!(options.interrupt_prompt);
        assert_eq!(options.max_tones, 20);
        assert_eq!(options.stop_tones, vec![DtmfTone::Pound]);
    }
}
