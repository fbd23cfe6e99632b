use async_trait::async_trait;
use tmem_types::OpLog;

use crate::error::SdkResult;

/// Observer of committed logs, e.g. to persist or ship them to peers.
///
/// Hooks run after the document has been updated and the writer grant has
/// been released. A failing hook is logged; it cannot undo the commit.
#[async_trait]
pub trait CommitHook: Send + Sync {
    async fn on_commit(&self, log: &OpLog) -> SdkResult<()>;
}

pub struct NoOpHook;

#[async_trait]
impl CommitHook for NoOpHook {
    async fn on_commit(&self, _log: &OpLog) -> SdkResult<()> {
        Ok(())
    }
}
