//! The contract every menu branch implements

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::ivr::calling::{CallConnection, CommunicationIdentifier};
use crate::ivr::tone::DtmfTone;

/// One menu branch's business action.
///
/// Implementations hold whatever [`CallingOperations`](crate::ivr::calling::CallingOperations)
/// handle they need and act on the call only through it.
#[async_trait]
pub trait IvrChoice: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Run the branch for `tone`, pressed by `target` on `call`
    async fn on_press(
        &self,
        tone: DtmfTone,
        call: &CallConnection,
        target: &CommunicationIdentifier,
        cancel: &CancellationToken,
    ) -> Result<()>;
}
