use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use scrummate_core::errors::TierError;

/// The three response tiers, in cascade order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierId {
    AgentPlatform,
    Completion,
    Fallback,
}

impl TierId {
    pub const ALL: [TierId; 3] = [TierId::AgentPlatform, TierId::Completion, TierId::Fallback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentPlatform => "agent_platform",
            Self::Completion => "completion",
            Self::Fallback => "fallback",
        }
    }
}

impl std::str::FromStr for TierId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "agent_platform" => Ok(Self::AgentPlatform),
            "completion" => Ok(Self::Completion),
            "fallback" => Ok(Self::Fallback),
            other => {
                Err(format!("unknown tier `{other}` (expected agent_platform|completion|fallback)"))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    NotAttempted,
    Connecting,
    Connected,
    TimedOut,
    ConfigurationMissing,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionHealth {
    pub status: TierStatus,
    pub message: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl ConnectionHealth {
    fn initial() -> Self {
        Self { status: TierStatus::NotAttempted, message: None, checked_at: None }
    }
}

/// Shared record of the last observed state per tier. Injected wherever tier
/// state is read or written; there is no global instance.
#[derive(Clone, Default)]
pub struct HealthTracker {
    inner: Arc<Mutex<HashMap<TierId, ConnectionHealth>>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tier: TierId) -> ConnectionHealth {
        self.lock().get(&tier).cloned().unwrap_or_else(ConnectionHealth::initial)
    }

    pub fn record(&self, tier: TierId, status: TierStatus, message: Option<String>) {
        self.lock().insert(
            tier,
            ConnectionHealth { status, message, checked_at: Some(Utc::now()) },
        );
    }

    pub fn record_error(&self, tier: TierId, error: &TierError) {
        let status = match error {
            TierError::ConfigurationMissing(_) => TierStatus::ConfigurationMissing,
            TierError::Timeout(_) => TierStatus::TimedOut,
            _ => TierStatus::Error,
        };
        self.record(tier, status, Some(error.to_string()));
    }

    /// Missing configuration cannot heal without operator action, so the tier
    /// is skipped on later requests until `reset` is called.
    pub fn is_short_circuited(&self, tier: TierId) -> bool {
        self.get(tier).status == TierStatus::ConfigurationMissing
    }

    pub fn reset(&self, tier: TierId) {
        self.lock().remove(&tier);
    }

    pub fn report(&self) -> Vec<(TierId, ConnectionHealth)> {
        let states = self.lock();
        TierId::ALL
            .iter()
            .map(|tier| {
                (*tier, states.get(tier).cloned().unwrap_or_else(ConnectionHealth::initial))
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TierId, ConnectionHealth>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
