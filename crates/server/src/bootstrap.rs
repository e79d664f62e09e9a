use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use scrummate_agent::completion::HttpCompletionService;
use scrummate_agent::orchestrator::{CascadeConfig, Orchestrator};
use scrummate_agent::platform::HttpAgentPlatform;
use scrummate_agent::remote::{AgentPlatform, CompletionService};
use scrummate_agent::HealthTracker;
use scrummate_core::config::{AppConfig, ConfigError, LoadOptions};
use scrummate_core::errors::TierError;
use scrummate_core::session::{SessionLimits, SessionStore};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

/// Shared handles behind every route. Cloning is cheap; everything inside is
/// reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub health: HealthTracker,
    pub orchestrator: Arc<Orchestrator>,
    pub default_capability: scrummate_core::capability::Capability,
    pub platform_configured: bool,
    pub completion_configured: bool,
    /// Bound on the reachability check the health endpoint runs for tiers
    /// that have not been attempted yet.
    pub probe_timeout: std::time::Duration,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(TierError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let sessions = SessionStore::new(SessionLimits {
        history_cap: config.session.history_cap,
        max_artifact_bytes: config.session.max_artifact_bytes,
    });
    let health = HealthTracker::new();

    let platform: Option<Arc<dyn AgentPlatform>> = build_platform(&config)?;
    let completion: Option<Arc<dyn CompletionService>> = build_completion(&config)?;

    let platform_configured = platform.is_some();
    let completion_configured = completion.is_some();

    info!(
        event_name = "system.bootstrap.tiers_configured",
        correlation_id = "bootstrap",
        platform_configured,
        completion_configured,
        "response tiers resolved from configuration"
    );

    let cascade = CascadeConfig {
        poll_interval: config.platform.poll_interval(),
        wait_budget: config.platform.wait_budget(),
        completion_timeout: config.completion.timeout(),
        agent_prefix: config.platform.agent_prefix.clone(),
        ..CascadeConfig::default()
    };

    let orchestrator = Arc::new(Orchestrator::new(
        platform,
        completion,
        health.clone(),
        sessions.clone(),
        cascade,
    ));

    let state = AppState {
        sessions,
        health,
        orchestrator,
        default_capability: config.routing.default_capability,
        platform_configured,
        completion_configured,
        probe_timeout: config.platform.connect_timeout(),
    };

    Ok(Application { config, state })
}

fn build_platform(config: &AppConfig) -> Result<Option<Arc<dyn AgentPlatform>>, BootstrapError> {
    if !config.platform.is_configured() {
        return Ok(None);
    }

    let endpoint = config.platform.endpoint.as_deref().unwrap_or_default();
    let api_key = match &config.platform.api_key {
        Some(api_key) => api_key.clone(),
        None => return Ok(None),
    };

    let client = HttpAgentPlatform::new(endpoint, api_key, config.platform.connect_timeout())
        .map_err(BootstrapError::HttpClient)?;
    Ok(Some(Arc::new(client)))
}

fn build_completion(
    config: &AppConfig,
) -> Result<Option<Arc<dyn CompletionService>>, BootstrapError> {
    if !config.completion.is_configured() {
        return Ok(None);
    }

    let endpoint = config.completion.endpoint.as_deref().unwrap_or_default();
    let api_key = match &config.completion.api_key {
        Some(api_key) => api_key.clone(),
        None => return Ok(None),
    };

    let client = HttpCompletionService::new(
        endpoint,
        api_key,
        &config.completion.model,
        config.completion.timeout(),
    )
    .map_err(BootstrapError::HttpClient)?;
    Ok(Some(Arc::new(client)))
}
