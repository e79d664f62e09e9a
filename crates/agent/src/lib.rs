//! Response tiers and the cascade that walks them.
//!
//! Every request resolves through the same three-step cascade:
//! 1. **Remote agent platform** (`platform`) - hosted agents with project data
//! 2. **Remote completion** (`completion`) - direct model call with a local prompt
//! 3. **Local fallback** - deterministic guidance templates, always available
//!
//! The orchestrator (`orchestrator` module) owns the walk: a tier failure is
//! recorded against connection health and the next tier is tried. The cascade
//! as a whole never fails; the fallback floor is infallible by construction.

pub mod completion;
pub mod health;
pub mod orchestrator;
pub mod platform;
pub mod remote;
pub mod retry;

pub use health::{ConnectionHealth, HealthTracker, TierId, TierStatus};
pub use orchestrator::{CascadeConfig, CascadeOutcome, Orchestrator, TierAttempt, TierOutcome};
pub use remote::{AgentPlatform, CompletionService, RemoteAgent, RunState, ThreadMessage};
