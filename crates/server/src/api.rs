use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use scrummate_core::capability::{registry, Capability};
use scrummate_core::classify::classify_with_default;
use scrummate_core::errors::ValidationError;
use scrummate_core::session::Turn;

use crate::bootstrap::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/agents/chat", post(chat))
        .route("/agents/list", get(list_agents))
        .route("/session/{id}/artifacts", post(upload_artifact))
        .route("/session/{id}", delete(clear_session))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Explicit routing override; omitted means classify the message.
    #[serde(default, alias = "agent_type")]
    pub capability: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub agent_name: String,
    pub capability: Capability,
    /// Present only when routing was classified rather than overridden.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub fallback_mode: bool,
    pub session_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

fn bad_request(error: &ValidationError) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::BAD_REQUEST, Json(ErrorBody { success: false, error: error.to_string() }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    if request.message.trim().is_empty() {
        return Err(bad_request(&ValidationError::EmptyMessage));
    }

    let (capability, confidence) = match request.capability.as_deref() {
        Some(name) => {
            let parsed: Capability = name.parse().map_err(|error| bad_request(&error))?;
            (parsed, None)
        }
        None => {
            let routed = classify_with_default(&request.message, state.default_capability);
            info!(
                event_name = "api.chat.classified",
                correlation_id = request.session_id.as_deref().unwrap_or("new"),
                capability = %routed.capability,
                confidence = routed.confidence,
                reason = %routed.reason,
                "message classified"
            );
            (routed.capability, Some(routed.confidence))
        }
    };

    let session_id = state
        .sessions
        .get_or_create(request.session_id.as_deref())
        .map_err(|error| bad_request(&error))?;

    let outcome = state.orchestrator.handle(&session_id, capability, &request.message).await;

    state.sessions.append_turn(
        &session_id,
        Turn {
            message: request.message.clone(),
            capability,
            response: outcome.response.clone(),
            at: Utc::now(),
        },
    );

    Ok(Json(ChatResponse {
        success: true,
        response: outcome.response,
        agent_name: outcome.agent_name,
        capability,
        confidence,
        fallback_mode: outcome.fallback_mode,
        session_id,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
pub struct AgentCatalogEntry {
    pub capability: Capability,
    pub display_name: &'static str,
    pub remote_agent_name: &'static str,
    pub keywords: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct AgentCatalog {
    pub agents: Vec<AgentCatalogEntry>,
    pub count: usize,
}

pub async fn list_agents(State(_state): State<AppState>) -> Json<AgentCatalog> {
    let agents: Vec<AgentCatalogEntry> = registry()
        .iter()
        .map(|profile| AgentCatalogEntry {
            capability: profile.capability,
            display_name: profile.display_name,
            remote_agent_name: profile.remote_agent_name,
            keywords: profile.keywords,
        })
        .collect();

    let count = agents.len();
    Json(AgentCatalog { agents, count })
}

#[derive(Debug, Deserialize)]
pub struct ArtifactRequest {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ArtifactResponse {
    pub success: bool,
    pub session_id: String,
    pub artifacts: Vec<String>,
}

pub async fn upload_artifact(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ArtifactRequest>,
) -> Result<Json<ArtifactResponse>, (StatusCode, Json<ErrorBody>)> {
    let session_id = state
        .sessions
        .get_or_create(Some(&session_id))
        .map_err(|error| bad_request(&error))?;

    state
        .sessions
        .put_artifact(&session_id, &request.name, &request.content)
        .map_err(|error| bad_request(&error))?;

    let artifacts = state
        .sessions
        .snapshot(&session_id)
        .map(|session| session.artifact_names())
        .unwrap_or_default();

    info!(
        event_name = "api.artifact.stored",
        correlation_id = %session_id,
        artifact = %request.name,
        "artifact stored on session"
    );

    Ok(Json(ArtifactResponse { success: true, session_id, artifacts }))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub cleared: bool,
}

pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    let cleared = state.sessions.clear(&session_id);
    Json(ClearResponse { success: true, cleared })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use scrummate_agent::orchestrator::{CascadeConfig, Orchestrator};
    use scrummate_agent::HealthTracker;
    use scrummate_core::capability::Capability;
    use scrummate_core::session::{SessionLimits, SessionStore};

    use super::router;
    use crate::bootstrap::AppState;

    fn fallback_only_state(limits: SessionLimits) -> AppState {
        let sessions = SessionStore::new(limits);
        let health = HealthTracker::new();
        let orchestrator = Arc::new(Orchestrator::new(
            None,
            None,
            health.clone(),
            sessions.clone(),
            CascadeConfig::default(),
        ));

        AppState {
            sessions,
            health,
            orchestrator,
            default_capability: Capability::Coaching,
            platform_configured: false,
            completion_configured: false,
            probe_timeout: std::time::Duration::from_secs(5),
        }
    }

    async fn post_json(state: AppState, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build");

        let response = router(state).oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        let payload: Value = serde_json::from_slice(&bytes).expect("body should be json");
        (status, payload)
    }

    #[tokio::test]
    async fn story_creation_routes_to_backlog_and_serves_fallback() {
        let state = fallback_only_state(SessionLimits::default());
        let (status, payload) = post_json(
            state,
            "/agents/chat",
            json!({ "message": "Create user stories for a login feature" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["capability"], json!("backlog"));
        assert_eq!(payload["fallback_mode"], json!(true));
        assert_eq!(payload["agent_name"], json!("Backlog Intelligence (Fallback Mode)"));
        assert!(payload["response"].as_str().unwrap().contains("acceptance criteria"));
        assert!(!payload["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected_with_bad_request() {
        let state = fallback_only_state(SessionLimits::default());
        let (status, payload) =
            post_json(state, "/agents/chat", json!({ "message": "   " })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["success"], json!(false));
    }

    #[tokio::test]
    async fn unknown_capability_override_is_rejected() {
        let state = fallback_only_state(SessionLimits::default());
        let (status, payload) = post_json(
            state,
            "/agents/chat",
            json!({ "message": "hello", "capability": "jira" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().unwrap().contains("jira"));
    }

    #[tokio::test]
    async fn capability_override_skips_classification() {
        let state = fallback_only_state(SessionLimits::default());
        let (status, payload) = post_json(
            state,
            "/agents/chat",
            json!({ "message": "anything at all", "agent_type": "wellness" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["capability"], json!("wellness"));
        assert!(payload.get("confidence").is_none());
    }

    #[tokio::test]
    async fn same_session_id_accumulates_history() {
        let state = fallback_only_state(SessionLimits::default());
        let sessions = state.sessions.clone();

        let (first_status, _) = post_json(
            state.clone(),
            "/agents/chat",
            json!({ "message": "How can we improve retrospectives?", "session_id": "s1" }),
        )
        .await;
        let (second_status, payload) = post_json(
            state,
            "/agents/chat",
            json!({ "message": "And our standups?", "session_id": "s1" }),
        )
        .await;

        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_eq!(payload["session_id"], json!("s1"));

        let session = sessions.snapshot("s1").expect("session should exist");
        assert_eq!(session.turn_count(), 2);
    }

    #[tokio::test]
    async fn malformed_session_id_is_rejected() {
        let state = fallback_only_state(SessionLimits::default());
        let (status, _) = post_json(
            state,
            "/agents/chat",
            json!({ "message": "hello", "session_id": "not valid!" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn agent_catalog_lists_every_capability() {
        let state = fallback_only_state(SessionLimits::default());
        let request = Request::builder()
            .method("GET")
            .uri("/agents/list")
            .body(Body::empty())
            .expect("request should build");

        let response = router(state).oneshot(request).await.expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes =
            to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        let payload: Value = serde_json::from_slice(&bytes).expect("body should be json");
        assert_eq!(payload["count"], json!(5));
        assert_eq!(payload["agents"][0]["capability"], json!("backlog"));
    }

    #[tokio::test]
    async fn artifacts_upload_and_oversized_content_is_rejected() {
        let state = fallback_only_state(SessionLimits {
            history_cap: 10,
            max_artifact_bytes: 32,
        });

        let (ok_status, payload) = post_json(
            state.clone(),
            "/session/s1/artifacts",
            json!({ "name": "notes", "content": "short transcript" }),
        )
        .await;
        assert_eq!(ok_status, StatusCode::OK);
        assert_eq!(payload["artifacts"], json!(["notes"]));

        let (too_big_status, error_payload) = post_json(
            state,
            "/session/s1/artifacts",
            json!({ "name": "transcript", "content": "x".repeat(64) }),
        )
        .await;
        assert_eq!(too_big_status, StatusCode::BAD_REQUEST);
        assert!(error_payload["error"].as_str().unwrap().contains("transcript"));
    }

    #[tokio::test]
    async fn clearing_a_session_removes_it() {
        let state = fallback_only_state(SessionLimits::default());
        let sessions = state.sessions.clone();
        sessions.get_or_create(Some("gone")).expect("valid id");

        let request = Request::builder()
            .method("DELETE")
            .uri("/session/gone")
            .body(Body::empty())
            .expect("request should build");
        let response =
            router(state.clone()).oneshot(request).await.expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sessions.snapshot("gone").is_none());

        let again = Request::builder()
            .method("DELETE")
            .uri("/session/gone")
            .body(Body::empty())
            .expect("request should build");
        let response = router(state).oneshot(again).await.expect("router should respond");
        let bytes =
            to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
        let payload: Value = serde_json::from_slice(&bytes).expect("body should be json");
        assert_eq!(payload["cleared"], json!(false));
    }
}
