//! # Callflow Call Automation
//!
//! Event correlation and IVR choice resolution for call-automation webhooks.
//!
//! This crate provides:
//! - Correlation of inbound webhook events with pending call operations
//! - Non-blocking dispatch of matched events onto tracked tasks
//! - DTMF-driven IVR menus built from tone-to-choice bindings
//! - Stock menu branches that act on a call through [`CallingOperations`](ivr::CallingOperations)
//!
//! ## Architecture
//!
//! The webhook transport and the call-control SDK both live outside this
//! crate. The transport hands each request body to
//! [`EventDispatcher::process_notification`](events::EventDispatcher::process_notification);
//! menu branches reach the SDK only through the [`CallingOperations`](ivr::CallingOperations)
//! trait, so tests and the CLI can substitute their own implementation.

pub mod error;
pub mod config;
pub mod events;
pub mod ivr;

pub use error::{AutomationError, Result};
pub use config::{AutomationConfig, DispatcherConfig, IvrConfig};
pub use events::{CallEvent, EventDispatcher, EventKind, NotificationCallback, build_event_key};
pub use ivr::{DtmfTone, IvrChoice, IvrMenu, IvrMenuBuilder, MenuOutcome, TopLevelMenuService};

/// Everything an application wiring up dispatch and menus usually needs
pub mod prelude {
    pub use crate::config::{AutomationConfig, DispatcherConfig, IvrConfig};
    pub use crate::error::{AutomationError, Result};
    pub use crate::events::{
        CallEvent, CorrelationKey, DispatcherStats, EventDispatcher, EventKind,
        NotificationCallback, build_event_key, parse_events,
    };
    pub use crate::ivr::{
        AddParticipantChoice, CallConnection, CallInvite, CallParticipant, CallingOperations,
        CommunicationIdentifier, DtmfRecognizeOptions, DtmfTone, HangUpChoice, IvrChoice,
        IvrMenu, IvrMenuBuilder, IvrMenuRegistry, MenuOutcome, PlayPromptChoice,
        RemovePstnParticipantsChoice, TopLevelMenuService, TransferChoice,
    };
    pub use tokio_util::sync::CancellationToken;
}
