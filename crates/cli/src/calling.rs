//! A `CallingOperations` backend that only logs what it is asked to do

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use callflow_call_automation::ivr::parse_tone_sequence;
use callflow_call_automation::prelude::*;

/// Answers participant and DTMF queries from fixed data and logs every action
#[derive(Debug, Clone, Default)]
pub struct LoggingCallingOperations {
    participants: Vec<CallParticipant>,
    number_tones: Vec<DtmfTone>,
}

impl LoggingCallingOperations {
    pub fn new(participant_raw_ids: &[String], number: Option<&str>) -> Self {
        Self {
            participants: participant_raw_ids
                .iter()
                .map(|raw| CallParticipant::new(CommunicationIdentifier::from_raw_id(raw)))
                .collect(),
            number_tones: number.map(parse_tone_sequence).unwrap_or_default(),
        }
    }
}

#[async_trait]
impl CallingOperations for LoggingCallingOperations {
    async fn get_participants(
        &self,
        call: &CallConnection,
        _cancel: &CancellationToken,
    ) -> Result<Vec<CallParticipant>> {
        info!("👥 [{}] list participants -> {}", call.call_connection_id, self.participants.len());
        Ok(self.participants.clone())
    }

    async fn add_participant(
        &self,
        call: &CallConnection,
        invite: CallInvite,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        let caller_id = invite
            .source_caller_id
            .as_ref()
            .map(|id| id.raw_id())
            .unwrap_or_else(|| "-".to_string());
        info!("➕ [{}] add {} (caller id {})", call.call_connection_id, invite.target, caller_id);
        Ok(())
    }

    async fn remove_participant(
        &self,
        call: &CallConnection,
        participant: &CommunicationIdentifier,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        info!("➖ [{}] remove {}", call.call_connection_id, participant);
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
        match target {
            Some(target) => info!("🔊 [{}] play {} to {} (loop: {})", call.call_connection_id, uri, target, looped),
            None => info!("🔊 [{}] play {} to all (loop: {})", call.call_connection_id, uri, looped),
        }
        Ok(())
    }

    async fn recognize_dtmf(
        &self,
        call: &CallConnection,
        options: DtmfRecognizeOptions,
        _cancel: &CancellationToken,
    ) -> Result<Vec<DtmfTone>> {
        let tones: Vec<DtmfTone> = self.number_tones.iter().copied().take(options.max_tones).collect();
        info!(
            "🎹 [{}] recognize up to {} tones from {} -> {:?}",
            call.call_connection_id, options.max_tones, options.target, tones
        );
        Ok(tones)
    }

    async fn transfer_call_leg(
        &self,
        call: &CallConnection,
        invite: CallInvite,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        info!("↪️ [{}] transfer to {}", call.call_connection_id, invite.target);
        Ok(())
    }

    async fn cancel_media(&self, call: &CallConnection, _cancel: &CancellationToken) -> Result<()> {
        info!("⏹️ [{}] cancel media", call.call_connection_id);
        Ok(())
    }

    async fn start_recording(&self, call: &CallConnection, _cancel: &CancellationToken) -> Result<()> {
        info!("⏺️ [{}] start recording", call.call_connection_id);
        Ok(())
    }

    async fn hang_up(
        &self,
        call: &CallConnection,
        terminate_for_all: bool,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        info!("📴 [{}] hang up (for everyone: {})", call.call_connection_id, terminate_for_all);
        Ok(())
    }
}
