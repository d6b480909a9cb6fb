//! Drives one menu for one call: prompt, collect a tone, act, retry.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AutomationError, Result};
use crate::ivr::calling::{CallConnection, CallingOperations, CommunicationIdentifier, DtmfRecognizeOptions};
use crate::ivr::menu::IvrMenu;
use crate::ivr::tone::DtmfTone;

/// How a menu session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    /// The caller picked a bound choice and it completed
    Completed(DtmfTone),
    /// Every attempt ended with no input or an invalid entry
    RetriesExhausted,
}

/// Presents a menu to a caller and retries on bad or missing input
pub struct TopLevelMenuService {
    menu: Arc<IvrMenu>,
    calling: Arc<dyn CallingOperations>,
}

impl TopLevelMenuService {
    pub fn new(menu: Arc<IvrMenu>) -> Self {
        let calling = Arc::clone(menu.calling());
        Self { menu, calling }
    }

    pub fn menu(&self) -> &Arc<IvrMenu> {
        &self.menu
    }

    /// Run the menu until a choice completes or the configured attempts run out.
    ///
    /// Choice failures other than an invalid entry end the session with that error.
    pub async fn run(
        &self,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<MenuOutcome> {
        let config = self.menu.config();
        let attempts = config.num_retries.max(1);

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(AutomationError::cancelled(format!(
                    "menu '{}' on call {}",
                    self.menu.name(),
                    call.call_connection_id
                )));
            }

            debug!(
                "Menu '{}' attempt {}/{} on call {}",
                self.menu.name(),
                attempt,
                attempts,
                call.call_connection_id
            );

            let options = DtmfRecognizeOptions::new(target.clone(), 1).with_prompt(config.prompt_uri.clone());
            let tones = self.calling.recognize_dtmf(call, options, cancel).await?;

            let Some(&tone) = tones.first() else {
                warn!("🔇 No option selected on call {}", call.call_connection_id);
                if let Some(uri) = &config.no_option_selected_uri {
                    self.calling.play_audio(call, uri, Some(target), false, cancel).await?;
                }
                continue;
            };

            match self.menu.on_press(tone, call, target, cancel).await {
                Ok(()) => {
                    info!(
                        "✅ Menu '{}' completed with {} on call {}",
                        self.menu.name(),
                        tone,
                        call.call_connection_id
                    );
                    return Ok(MenuOutcome::Completed(tone));
                }
                Err(e) if e.is_invalid_entry() => {
                    debug!("Attempt {} rejected: {}", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "Menu '{}' gave up on call {} after {} attempts",
            self.menu.name(),
            call.call_connection_id,
            attempts
        );
        Ok(MenuOutcome::RetriesExhausted)
    }
}
