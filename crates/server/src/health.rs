use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use scrummate_agent::{ConnectionHealth, TierId, TierStatus};

use crate::api::ErrorBody;
use crate::bootstrap::AppState;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TierReport {
    pub configured: bool,
    #[serde(flatten)]
    pub health: ConnectionHealth,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Keyed by tier id, one entry per tier.
    pub tiers: BTreeMap<&'static str, TierReport>,
    pub timestamp: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/reset/{tier}", post(reset_tier))
        .with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    // Configured tiers that were never attempted get one reachability check
    // here, so a fresh process reports real connectivity rather than cached
    // silence.
    if state.platform_configured
        && state.health.get(TierId::AgentPlatform).status == TierStatus::NotAttempted
    {
        state.orchestrator.probe(TierId::AgentPlatform, state.probe_timeout).await;
    }

    let reports: Vec<(TierId, TierReport)> = state
        .health
        .report()
        .into_iter()
        .map(|(tier, health)| {
            let configured = match tier {
                TierId::AgentPlatform => state.platform_configured,
                TierId::Completion => state.completion_configured,
                TierId::Fallback => true,
            };
            (tier, TierReport { configured, health })
        })
        .collect();

    let status = aggregate(&reports);
    let status_code = match status {
        "healthy" | "healthy_fallback" => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = HealthResponse {
        status,
        service: "scrummate-server",
        tiers: reports.into_iter().map(|(tier, report)| (tier.as_str(), report)).collect(),
        timestamp: Utc::now().to_rfc3339(),
    };

    (status_code, Json(payload))
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub tier: TierId,
}

/// Operator escape hatch for the configuration-missing short-circuit: clears
/// the tier's recorded state so the next request attempts it again.
pub async fn reset_tier(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> Result<Json<ResetResponse>, (StatusCode, Json<ErrorBody>)> {
    let tier: TierId = tier
        .parse()
        .map_err(|error| (StatusCode::BAD_REQUEST, Json(ErrorBody { success: false, error })))?;

    state.health.reset(tier);
    tracing::info!(
        event_name = "health.tier.reset",
        correlation_id = "admin",
        tier = tier.as_str(),
        "tier health state cleared"
    );
    Ok(Json(ResetResponse { success: true, tier }))
}

/// Requests always resolve through the fallback floor, so missing remote
/// configuration is reported as a healthy state rather than a failure. Only a
/// configured tier that is actively failing degrades the aggregate.
fn aggregate(reports: &[(TierId, TierReport)]) -> &'static str {
    let tier_status = |wanted: TierId| {
        reports.iter().find(|(tier, _)| *tier == wanted).map(|(_, report)| report.health.status)
    };

    if tier_status(TierId::AgentPlatform) == Some(TierStatus::Connected) {
        return "healthy";
    }

    let remote_failing = reports.iter().any(|(tier, report)| {
        report.configured
            && *tier != TierId::Fallback
            && matches!(report.health.status, TierStatus::TimedOut | TierStatus::Error)
    });
    if remote_failing {
        return "degraded";
    }

    if tier_status(TierId::Completion) == Some(TierStatus::Connected) {
        return "healthy";
    }

    "healthy_fallback"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::State;
    use axum::http::{Request, StatusCode};
    use axum::Json;
    use tower::ServiceExt;

    use scrummate_agent::orchestrator::{CascadeConfig, Orchestrator};
    use scrummate_agent::remote::{
        AgentPlatform, RemoteAgent, RunState, ThreadMessage,
    };
    use scrummate_agent::{HealthTracker, TierId, TierStatus};
    use scrummate_core::capability::Capability;
    use scrummate_core::errors::TierError;
    use scrummate_core::session::{SessionLimits, SessionStore};

    use super::{health, router};
    use crate::bootstrap::AppState;

    struct ListOnlyPlatform;

    #[async_trait]
    impl AgentPlatform for ListOnlyPlatform {
        async fn list_agents(&self, _limit: usize) -> Result<Vec<RemoteAgent>, TierError> {
            Ok(vec![RemoteAgent {
                id: "agent-1".to_string(),
                name: "Scrummate-Agile-Coaching".to_string(),
            }])
        }

        async fn create_thread(&self) -> Result<String, TierError> {
            Err(TierError::Remote("not under test".to_string()))
        }

        async fn post_message(&self, _thread_id: &str, _text: &str) -> Result<(), TierError> {
            Err(TierError::Remote("not under test".to_string()))
        }

        async fn start_run(&self, _thread_id: &str, _agent_id: &str) -> Result<String, TierError> {
            Err(TierError::Remote("not under test".to_string()))
        }

        async fn run_state(&self, _thread_id: &str, _run_id: &str) -> Result<RunState, TierError> {
            Err(TierError::Remote("not under test".to_string()))
        }

        async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>, TierError> {
            Err(TierError::Remote("not under test".to_string()))
        }
    }

    fn state_with_platform(
        platform: Option<Arc<dyn AgentPlatform>>,
        platform_configured: bool,
        completion_configured: bool,
    ) -> AppState {
        let sessions = SessionStore::new(SessionLimits::default());
        let tracker = HealthTracker::new();
        let orchestrator = Arc::new(Orchestrator::new(
            platform,
            None,
            tracker.clone(),
            sessions.clone(),
            CascadeConfig::default(),
        ));

        AppState {
            sessions,
            health: tracker,
            orchestrator,
            default_capability: Capability::Coaching,
            platform_configured,
            completion_configured,
            probe_timeout: Duration::from_secs(5),
        }
    }

    fn state(platform_configured: bool, completion_configured: bool) -> AppState {
        state_with_platform(None, platform_configured, completion_configured)
    }

    #[tokio::test]
    async fn unconfigured_remotes_report_healthy_fallback() {
        let subject = state(false, false);
        let (status, Json(payload)) = health(State(subject)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "healthy_fallback");
        assert_eq!(payload.tiers.len(), 3);
        let fallback = payload.tiers.get("fallback").expect("fallback tier in report");
        assert!(fallback.configured, "fallback tier is always configured");
    }

    #[tokio::test]
    async fn tiers_serialize_as_a_mapping_keyed_by_tier_id() {
        let subject = state(false, false);
        let (_, Json(payload)) = health(State(subject)).await;

        let wire = serde_json::to_value(&payload).expect("report should serialize");
        assert!(wire["tiers"]["agent_platform"]["status"].is_string());
        assert!(wire["tiers"]["completion"]["status"].is_string());
        assert!(wire["tiers"]["fallback"]["status"].is_string());
        assert!(wire["timestamp"].is_string());
    }

    #[tokio::test]
    async fn connected_platform_reports_healthy() {
        let subject = state(true, false);
        subject.health.record(TierId::AgentPlatform, TierStatus::Connected, None);

        let (status, Json(payload)) = health(State(subject)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "healthy");
    }

    #[tokio::test]
    async fn fresh_configured_platform_is_probed_before_reporting() {
        let subject = state_with_platform(Some(Arc::new(ListOnlyPlatform)), true, false);
        assert_eq!(subject.health.get(TierId::AgentPlatform).status, TierStatus::NotAttempted);

        let (status, Json(payload)) = health(State(subject.clone())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "healthy");
        assert_eq!(subject.health.get(TierId::AgentPlatform).status, TierStatus::Connected);
    }

    #[tokio::test]
    async fn failing_configured_tier_reports_degraded() {
        let subject = state(true, false);
        subject
            .health
            .record_error(TierId::AgentPlatform, &TierError::Remote("503".to_string()));

        let (status, Json(payload)) = health(State(subject)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
    }

    #[tokio::test]
    async fn connected_completion_without_platform_reports_healthy() {
        let subject = state(false, true);
        subject.health.record(TierId::Completion, TierStatus::Connected, None);

        let (status, Json(payload)) = health(State(subject)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "healthy");
    }

    #[tokio::test]
    async fn reset_clears_a_short_circuited_tier() {
        let subject = state(false, true);
        subject.health.record_error(
            TierId::Completion,
            &TierError::ConfigurationMissing("api key".to_string()),
        );
        assert!(subject.health.is_short_circuited(TierId::Completion));

        let request = Request::builder()
            .method("POST")
            .uri("/health/reset/completion")
            .body(Body::empty())
            .expect("request should build");
        let response =
            router(subject.clone()).oneshot(request).await.expect("router should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!subject.health.is_short_circuited(TierId::Completion));
        assert_eq!(subject.health.get(TierId::Completion).status, TierStatus::NotAttempted);
    }

    #[tokio::test]
    async fn resetting_an_unknown_tier_is_rejected() {
        let subject = state(false, false);
        let request = Request::builder()
            .method("POST")
            .uri("/health/reset/database")
            .body(Body::empty())
            .expect("request should build");
        let response = router(subject).oneshot(request).await.expect("router should respond");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
