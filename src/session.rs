use async_trait::async_trait;

use crate::error::Result;

/// A live browser session that must be released explicitly.
#[async_trait]
pub trait Session: Send + Sync {
    async fn close(self) -> Result<()>;
}

/// Acquires new sessions. The orchestrator calls this at most once per instance.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: Session;

    async fn launch(&self) -> Result<Self::Session>;
}
