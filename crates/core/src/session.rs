use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::capability::Capability;
use crate::errors::{validate_session_id, ValidationError};

/// One completed exchange. Appended after the cascade resolves; never mutated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Turn {
    pub message: String,
    pub capability: Capability,
    pub response: String,
    pub at: DateTime<Utc>,
}

/// Per-conversation history plus uploaded reference material. Bounded and
/// process-lifetime only; nothing here survives a restart.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    pub id: String,
    turns: VecDeque<Turn>,
    artifacts: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            turns: VecDeque::new(),
            artifacts: BTreeMap::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn artifact(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).map(String::as_str)
    }

    pub fn artifact_names(&self) -> Vec<String> {
        self.artifacts.keys().cloned().collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SessionLimits {
    /// Most recent turns retained per session; older turns drop FIFO.
    pub history_cap: usize,
    pub max_artifact_bytes: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { history_cap: 10, max_artifact_bytes: 64 * 1024 }
    }
}

/// Shared, keyed store of sessions. Cloning the store clones the handle, not
/// the contents; concurrent writes to the same session interleave without
/// further serialization, which is an accepted limitation.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), limits }
    }

    /// Resolves the caller-supplied id, creating the session on first use.
    /// A fresh id is generated when none is supplied.
    pub fn get_or_create(&self, requested: Option<&str>) -> Result<String, ValidationError> {
        let id = match requested {
            Some(candidate) => {
                validate_session_id(candidate)?;
                candidate.to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        let now = Utc::now();
        let mut sessions = self.lock();
        sessions.entry(id.clone()).or_insert_with(|| Session::new(id.clone(), now));
        Ok(id)
    }

    pub fn append_turn(&self, session_id: &str, turn: Turn) {
        let mut sessions = self.lock();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string(), turn.at));

        session.last_activity = turn.at;
        session.turns.push_back(turn);
        while session.turns.len() > self.limits.history_cap {
            session.turns.pop_front();
        }
    }

    pub fn put_artifact(
        &self,
        session_id: &str,
        name: &str,
        content: &str,
    ) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyArtifactName);
        }
        if content.len() > self.limits.max_artifact_bytes {
            return Err(ValidationError::ArtifactTooLarge {
                name: name.to_string(),
                size: content.len(),
                limit: self.limits.max_artifact_bytes,
            });
        }

        let now = Utc::now();
        let mut sessions = self.lock();
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id.to_string(), now));
        session.last_activity = now;
        session.artifacts.insert(name.to_string(), content.to_string());
        Ok(())
    }

    /// Recent history rendered as prompt context for the completion tier.
    /// Uses the last five turns and truncates long responses.
    pub fn context_string(&self, session_id: &str) -> Option<String> {
        const CONTEXT_TURNS: usize = 5;
        const RESPONSE_PREVIEW_CHARS: usize = 500;

        let sessions = self.lock();
        let session = sessions.get(session_id)?;
        if session.turns.is_empty() {
            return None;
        }

        let mut parts = vec!["Previous conversation context:".to_string()];
        let skip = session.turns.len().saturating_sub(CONTEXT_TURNS);
        for turn in session.turns.iter().skip(skip) {
            let preview: String = turn.response.chars().take(RESPONSE_PREVIEW_CHARS).collect();
            parts.push(format!("User: {}", turn.message));
            parts.push(format!("{}: {preview}", turn.capability.profile().display_name));
        }
        parts.push(String::new());
        parts.push("Current request:".to_string());
        Some(parts.join("\n"))
    }

    pub fn snapshot(&self, session_id: &str) -> Option<Session> {
        self.lock().get(session_id).cloned()
    }

    pub fn clear(&self, session_id: &str) -> bool {
        self.lock().remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
