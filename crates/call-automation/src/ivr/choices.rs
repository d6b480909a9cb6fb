//! Stock menu branches

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{AutomationError, Result};
use crate::ivr::calling::{
    CallConnection, CallInvite, CallingOperations, CommunicationIdentifier, DtmfRecognizeOptions,
};
use crate::ivr::choice::IvrChoice;
use crate::ivr::tone::{DtmfTone, tones_to_digits};

/// Longest number a caller may key in
const MAX_NUMBER_TONES: usize = 20;

/// Country code prepended to collected numbers
const DIAL_PREFIX: &str = "+1";

fn ensure_active(cancel: &CancellationToken, choice: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(AutomationError::cancelled(choice.to_string()));
    }
    Ok(())
}

fn caller_id(phone_number: &str) -> Option<CommunicationIdentifier> {
    if phone_number.trim().is_empty() {
        None
    } else {
        Some(CommunicationIdentifier::phone_number(phone_number))
    }
}

/// Prompt the target for a phone number ended by `#` or `*`
async fn collect_number(
    calling: &dyn CallingOperations,
    call: &CallConnection,
    target: &CommunicationIdentifier,
    prompt_uri: Option<String>,
    cancel: &CancellationToken,
) -> Result<String> {
    let options = DtmfRecognizeOptions::new(target.clone(), MAX_NUMBER_TONES)
        .with_prompt(prompt_uri)
        .with_stop_tones(vec![DtmfTone::Pound, DtmfTone::Asterisk]);

    let tones = calling.recognize_dtmf(call, options, cancel).await?;
    let digits: Vec<DtmfTone> = tones.into_iter().filter(|tone| tone.is_digit()).collect();
    if digits.is_empty() {
        return Err(AutomationError::no_input(format!(
            "no number entered on call {}",
            call.call_connection_id
        )));
    }

    Ok(format!("{}{}", DIAL_PREFIX, tones_to_digits(&digits)))
}

/// Collect a number, invite it into the call over hold music, then record
pub struct AddParticipantChoice {
    calling: Arc<dyn CallingOperations>,
    prompt_uri: Option<String>,
    hold_music_uri: Option<String>,
    caller_id: Option<CommunicationIdentifier>,
}

impl AddParticipantChoice {
    pub fn new(
        calling: Arc<dyn CallingOperations>,
        prompt_uri: Option<String>,
        hold_music_uri: Option<String>,
        phone_number: &str,
    ) -> Self {
        Self {
            calling,
            prompt_uri,
            hold_music_uri,
            caller_id: caller_id(phone_number),
        }
    }
}

#[async_trait]
impl IvrChoice for AddParticipantChoice {
    fn name(&self) -> &str {
        "add-participant"
    }

    async fn on_press(
        &self,
        _tone: DtmfTone,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel, self.name())?;
        let number = collect_number(self.calling.as_ref(), call, target, self.prompt_uri.clone(), cancel).await?;
        info!("➕ Adding {} to call {}", number, call.call_connection_id);

        if let Some(hold_music) = &self.hold_music_uri {
            self.calling.play_audio(call, hold_music, None, true, cancel).await?;
        }

        let invite = CallInvite::new(CommunicationIdentifier::phone_number(number), self.caller_id.clone());
        let added = self.calling.add_participant(call, invite, cancel).await;

        // hold music stops whether or not the invite succeeded
        if self.hold_music_uri.is_some() {
            self.calling.cancel_media(call, cancel).await?;
        }
        added?;

        self.calling.start_recording(call, cancel).await
    }
}

/// Remove every PSTN participant except the caller who pressed the key
pub struct RemovePstnParticipantsChoice {
    calling: Arc<dyn CallingOperations>,
}

impl RemovePstnParticipantsChoice {
    pub fn new(calling: Arc<dyn CallingOperations>) -> Self {
        Self { calling }
    }
}

#[async_trait]
impl IvrChoice for RemovePstnParticipantsChoice {
    fn name(&self) -> &str {
        "remove-pstn-participants"
    }

    async fn on_press(
        &self,
        _tone: DtmfTone,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel, self.name())?;
        let participants = self.calling.get_participants(call, cancel).await?;
        let target_raw_id = target.raw_id();

        let mut removed = 0usize;
        for participant in participants {
            let identifier = &participant.identifier;
            if identifier.is_phone_number() && identifier.raw_id() != target_raw_id {
                debug!("Removing {} from call {}", identifier, call.call_connection_id);
                self.calling.remove_participant(call, identifier, cancel).await?;
                removed += 1;
            }
        }

        info!("➖ Removed {} PSTN participants from call {}", removed, call.call_connection_id);
        Ok(())
    }
}

/// Collect a number and transfer the call leg to it
pub struct TransferChoice {
    calling: Arc<dyn CallingOperations>,
    prompt_uri: Option<String>,
    caller_id: Option<CommunicationIdentifier>,
}

impl TransferChoice {
    pub fn new(calling: Arc<dyn CallingOperations>, prompt_uri: Option<String>, phone_number: &str) -> Self {
        Self {
            calling,
            prompt_uri,
            caller_id: caller_id(phone_number),
        }
    }
}

#[async_trait]
impl IvrChoice for TransferChoice {
    fn name(&self) -> &str {
        "transfer"
    }

    async fn on_press(
        &self,
        _tone: DtmfTone,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel, self.name())?;
        let number = collect_number(self.calling.as_ref(), call, target, self.prompt_uri.clone(), cancel).await?;
        info!("↪️ Transferring call {} to {}", call.call_connection_id, number);

        let invite = CallInvite::new(CommunicationIdentifier::phone_number(number), self.caller_id.clone());
        self.calling.transfer_call_leg(call, invite, cancel).await?;
        self.calling.cancel_media(call, cancel).await
    }
}

/// End the call for everyone
pub struct HangUpChoice {
    calling: Arc<dyn CallingOperations>,
}

impl HangUpChoice {
    pub fn new(calling: Arc<dyn CallingOperations>) -> Self {
        Self { calling }
    }
}

#[async_trait]
impl IvrChoice for HangUpChoice {
    fn name(&self) -> &str {
        "hang-up"
    }

    async fn on_press(
        &self,
        _tone: DtmfTone,
        call: &CallConnection,
        _target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel, self.name())?;
        info!("📴 Hanging up call {}", call.call_connection_id);
        self.calling.hang_up(call, true, cancel).await
    }
}

/// Play one prompt back to the caller
pub struct PlayPromptChoice {
    calling: Arc<dyn CallingOperations>,
    prompt_uri: String,
}

impl PlayPromptChoice {
    pub fn new(calling: Arc<dyn CallingOperations>, prompt_uri: impl Into<String>) -> Self {
        Self {
            calling,
            prompt_uri: prompt_uri.into(),
        }
    }
}

#[async_trait]
impl IvrChoice for PlayPromptChoice {
    fn name(&self) -> &str {
        "play-prompt"
    }

    async fn on_press(
        &self,
        _tone: DtmfTone,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()> {
        ensure_active(cancel, self.name())?;
        self.calling
            .play_audio(call, &self.prompt_uri, Some(target), false, cancel)
            .await
    }
}
