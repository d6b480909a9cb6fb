//! IVR choice resolution
//!
//! - [`tone`]: DTMF tone values
//! - [`calling`]: the boundary to the call-control backend
//! - [`choice`]: the per-branch contract
//! - [`choices`]: stock branches
//! - [`menu`]: tone-to-choice menus
//! - [`top_level`]: prompt/retry loop around a menu

pub mod tone;
pub mod calling;
pub mod choice;
pub mod choices;
pub mod menu;
pub mod top_level;

pub use tone::{DtmfTone, ParseToneError, parse_tone_sequence, tones_to_digits};
pub use calling::{
    CallConnection, CallInvite, CallParticipant, CallingOperations, CommunicationIdentifier,
    DtmfRecognizeOptions,
};
pub use choice::IvrChoice;
pub use choices::{
    AddParticipantChoice, HangUpChoice, PlayPromptChoice, RemovePstnParticipantsChoice,
    TransferChoice,
};
pub use menu::{IvrMenu, IvrMenuBuilder, IvrMenuRegistry};
pub use top_level::{MenuOutcome, TopLevelMenuService};
