use async_trait::async_trait;

use scrummate_core::errors::TierError;

/// An agent registered on the remote platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteAgent {
    pub id: String,
    pub name: String,
}

/// Lifecycle state of a remote run. Polling stops at the first terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::Expired)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadMessage {
    pub role: String,
    pub text: String,
}

/// Thread-and-run protocol of the hosted agent platform. Implementations are
/// pluggable so the orchestrator can be exercised against deterministic fakes.
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    async fn list_agents(&self, limit: usize) -> Result<Vec<RemoteAgent>, TierError>;

    async fn create_thread(&self) -> Result<String, TierError>;

    async fn post_message(&self, thread_id: &str, text: &str) -> Result<(), TierError>;

    async fn start_run(&self, thread_id: &str, agent_id: &str) -> Result<String, TierError>;

    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState, TierError>;

    /// Messages newest-first, the way the platform returns them.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, TierError>;
}

/// Single-shot prompt completion against a model endpoint.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, TierError>;
}
