//! # IVR Menus
//!
//! A menu maps each DTMF tone to at most one [`IvrChoice`]. Menus are built
//! once at startup through [`IvrMenuBuilder`] and never change afterwards;
//! pressing a key is a lookup followed by either the bound choice or the
//! invalid-entry path.
//!
//! ```text
//!             on_press(tone)
//!  AwaitingTone ──────────────┬──► Dispatched  (choice ran; its error, if any, propagates)
//!                             └──► Rejected    (invalid-entry prompt, then InvalidEntry)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use callflow_call_automation::prelude::*;
//!
//! # async fn example(calling: Arc<dyn CallingOperations>) -> Result<()> {
//! let menu = IvrMenuBuilder::new("MainMenu", Arc::clone(&calling))
//!     .with_configuration(IvrConfig::new().with_invalid_entry_uri("https://x/invalid.wav"))
//!     .add_choice(DtmfTone::Two, Arc::new(RemovePstnParticipantsChoice::new(Arc::clone(&calling))))
//!     .add_choice(DtmfTone::Four, Arc::new(HangUpChoice::new(calling)))
//!     .build()?;
//!
//! let call = CallConnection::new("call-1");
//! let caller = CommunicationIdentifier::from_raw_id("8:acs:abc_123");
//! match menu.on_press(DtmfTone::Nine, &call, &caller, &CancellationToken::new()).await {
//!     Err(e) if e.is_invalid_entry() => { /* re-prompt */ }
//!     other => other?,
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::IvrConfig;
use crate::error::{AutomationError, Result};
use crate::ivr::calling::{CallConnection, CallingOperations, CommunicationIdentifier};
use crate::ivr::choice::IvrChoice;
use crate::ivr::tone::DtmfTone;

/// Declarative menu definition
pub struct IvrMenuBuilder {
    name: String,
    calling: Arc<dyn CallingOperations>,
    config: IvrConfig,
    choices: Vec<(DtmfTone, Arc<dyn IvrChoice>)>,
}

impl IvrMenuBuilder {
    pub fn new(name: impl Into<String>, calling: Arc<dyn CallingOperations>) -> Self {
        Self {
            name: name.into(),
            calling,
            config: IvrConfig::new(),
            choices: Vec::new(),
        }
    }

    pub fn with_configuration(mut self, config: IvrConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind `choice` to `tone`. Duplicates are reported by [`build`](Self::build).
    pub fn add_choice(mut self, tone: DtmfTone, choice: Arc<dyn IvrChoice>) -> Self {
        self.choices.push((tone, choice));
        self
    }

    /// Freeze the menu.
    ///
    /// Fails when no choice was added or a tone was bound twice. Both are
    /// configuration mistakes and should abort startup.
    pub fn build(self) -> Result<IvrMenu> {
        if self.choices.is_empty() {
            return Err(AutomationError::menu_construction(format!(
                "no IVR choices added to menu '{}'",
                self.name
            )));
        }

        let mut choices = HashMap::with_capacity(self.choices.len());
        for (tone, choice) in self.choices {
            if choices.insert(tone, choice).is_some() {
                return Err(AutomationError::DuplicateTone {
                    menu: self.name,
                    tone,
                });
            }
        }

        if self.config.invalid_entry_uri.is_none() {
            warn!("⚠️ Menu '{}' has no invalid-entry prompt configured", self.name);
        }

        info!("🎛️ Built IVR menu '{}' with {} choices", self.name, choices.len());
        Ok(IvrMenu {
            name: self.name,
            calling: self.calling,
            config: self.config,
            choices,
        })
    }
}

/// An immutable tone-to-choice menu
pub struct IvrMenu {
    name: String,
    calling: Arc<dyn CallingOperations>,
    config: IvrConfig,
    choices: HashMap<DtmfTone, Arc<dyn IvrChoice>>,
}

impl IvrMenu {
    /// Act on one key press.
    ///
    /// A bound choice runs to completion and its result is returned as is.
    /// An unbound tone plays the invalid-entry prompt once and then fails with
    /// [`AutomationError::InvalidEntry`].
    pub async fn on_press(
        &self,
        tone: DtmfTone,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match self.choices.get(&tone) {
            Some(choice) => {
                debug!(
                    "Menu '{}' dispatching tone {} to '{}' on call {}",
                    self.name,
                    tone,
                    choice.name(),
                    call.call_connection_id
                );
                choice.on_press(tone, call, target, cancel).await
            }
            None => self.invoke_invalid_entry(tone, call, cancel).await,
        }
    }

    async fn invoke_invalid_entry(
        &self,
        tone: DtmfTone,
        call: &CallConnection,
        cancel: &CancellationToken,
    ) -> Result<()> {
        warn!(
            "❌ Invalid selection {} in menu '{}' on call {}",
            tone, self.name, call.call_connection_id
        );

        match &self.config.invalid_entry_uri {
            Some(uri) => self.calling.play_audio(call, uri, None, false, cancel).await?,
            None => warn!("No invalid-entry prompt to play for menu '{}'", self.name),
        }

        Err(AutomationError::invalid_entry(format!("Invalid selection {}", tone)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &IvrConfig {
        &self.config
    }

    /// The calling operations this menu plays prompts through
    pub fn calling(&self) -> &Arc<dyn CallingOperations> {
        &self.calling
    }

    pub fn has_choice(&self, tone: DtmfTone) -> bool {
        self.choices.contains_key(&tone)
    }

    /// Bound tones in keypad order
    pub fn tones(&self) -> Vec<DtmfTone> {
        DtmfTone::ALL
            .into_iter()
            .filter(|tone| self.choices.contains_key(tone))
            .collect()
    }
}

impl fmt::Debug for IvrMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IvrMenu")
            .field("name", &self.name)
            .field("tones", &self.tones())
            .field("config", &self.config)
            .finish()
    }
}

/// Named menus available to the application
#[derive(Debug, Default)]
pub struct IvrMenuRegistry {
    menus: HashMap<String, Arc<IvrMenu>>,
}

impl IvrMenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a built menu; names must be unique
    pub fn register(&mut self, menu: IvrMenu) -> Result<Arc<IvrMenu>> {
        if self.menus.contains_key(menu.name()) {
            return Err(AutomationError::DuplicateMenu(menu.name().to_string()));
        }
        let menu = Arc::new(menu);
        self.menus.insert(menu.name().to_string(), Arc::clone(&menu));
        Ok(menu)
    }

    pub fn get(&self, name: &str) -> Option<Arc<IvrMenu>> {
        self.menus.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}
