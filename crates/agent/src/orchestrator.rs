use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use scrummate_core::capability::Capability;
use scrummate_core::errors::TierError;
use scrummate_core::fallback;
use scrummate_core::session::SessionStore;

use crate::health::{HealthTracker, TierId, TierStatus};
use crate::remote::{AgentPlatform, CompletionService, RemoteAgent, RunState};
use crate::retry::{poll_until, PollPlan};

/// Tuning knobs for the cascade walk. One canonical set; the platform poll
/// interval and wait budget here are the only place those constants live.
#[derive(Clone, Debug)]
pub struct CascadeConfig {
    pub poll_interval: Duration,
    pub wait_budget: Duration,
    pub completion_timeout: Duration,
    pub agent_prefix: String,
    pub agent_listing_limit: usize,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            wait_budget: Duration::from_secs(26),
            completion_timeout: Duration::from_secs(10),
            agent_prefix: "Scrummate-".to_string(),
            agent_listing_limit: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierOutcome {
    Success,
    Failure,
    Timeout,
    Skipped,
}

/// One row of the cascade audit trail.
#[derive(Clone, Debug)]
pub struct TierAttempt {
    pub tier: TierId,
    pub outcome: TierOutcome,
    pub latency: Duration,
    pub error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CascadeOutcome {
    pub response: String,
    pub tier: TierId,
    pub agent_name: String,
    pub fallback_mode: bool,
    pub attempts: Vec<TierAttempt>,
}

/// Walks the tier cascade for each request. `handle` is infallible: any tier
/// error is absorbed into the audit trail and the walk continues, and the
/// local fallback floor always produces a response.
pub struct Orchestrator {
    platform: Option<Arc<dyn AgentPlatform>>,
    completion: Option<Arc<dyn CompletionService>>,
    health: HealthTracker,
    sessions: SessionStore,
    config: CascadeConfig,
}

impl Orchestrator {
    pub fn new(
        platform: Option<Arc<dyn AgentPlatform>>,
        completion: Option<Arc<dyn CompletionService>>,
        health: HealthTracker,
        sessions: SessionStore,
        config: CascadeConfig,
    ) -> Self {
        Self { platform, completion, health, sessions, config }
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// Minimal remote call to validate tier reachability, recorded against
    /// connection health. The completion protocol has no cheap read call, so
    /// probing it is a no-op; the fallback floor is always reachable.
    pub async fn probe(&self, tier: TierId, timeout: Duration) {
        match tier {
            TierId::AgentPlatform => {
                let platform = match &self.platform {
                    Some(platform) => platform,
                    None => {
                        let error =
                            TierError::ConfigurationMissing("agent platform endpoint or key".to_string());
                        self.health.record_error(tier, &error);
                        return;
                    }
                };

                self.health.record(tier, TierStatus::Connecting, None);
                let result = tokio::time::timeout(timeout, platform.list_agents(1))
                    .await
                    .unwrap_or(Err(TierError::Timeout(timeout)));
                match result {
                    Ok(_) => self.health.record(tier, TierStatus::Connected, None),
                    Err(error) => self.health.record_error(tier, &error),
                }
            }
            TierId::Completion => {}
            TierId::Fallback => self.health.record(tier, TierStatus::Connected, None),
        }
    }

    pub async fn handle(
        &self,
        session_id: &str,
        capability: Capability,
        message: &str,
    ) -> CascadeOutcome {
        let mut attempts = Vec::with_capacity(3);
        let profile = capability.profile();

        if let Some(response) =
            self.try_platform(session_id, capability, message, &mut attempts).await
        {
            return CascadeOutcome {
                response,
                tier: TierId::AgentPlatform,
                agent_name: profile.display_name.to_string(),
                fallback_mode: false,
                attempts,
            };
        }

        if let Some(response) =
            self.try_completion(session_id, capability, message, &mut attempts).await
        {
            return CascadeOutcome {
                response,
                tier: TierId::Completion,
                agent_name: profile.display_name.to_string(),
                fallback_mode: false,
                attempts,
            };
        }

        let started = Instant::now();
        let response = fallback::respond(capability, message, Utc::now());
        self.health.record(TierId::Fallback, TierStatus::Connected, None);
        attempts.push(TierAttempt {
            tier: TierId::Fallback,
            outcome: TierOutcome::Success,
            latency: started.elapsed(),
            error: None,
        });

        tracing::info!(
            event_name = "cascade.fallback.served",
            correlation_id = session_id,
            capability = %capability,
            "request served from the local fallback tier"
        );

        CascadeOutcome {
            response,
            tier: TierId::Fallback,
            agent_name: format!("{} (Fallback Mode)", profile.display_name),
            fallback_mode: true,
            attempts,
        }
    }

    async fn try_platform(
        &self,
        session_id: &str,
        capability: Capability,
        message: &str,
        attempts: &mut Vec<TierAttempt>,
    ) -> Option<String> {
        let tier = TierId::AgentPlatform;

        let platform = match &self.platform {
            Some(platform) => platform,
            None => {
                self.skip_unconfigured(tier, "agent platform endpoint or key", attempts);
                return None;
            }
        };
        if self.health.is_short_circuited(tier) {
            self.skip_short_circuited(tier, session_id, attempts);
            return None;
        }

        self.health.record(tier, TierStatus::Connecting, None);
        let started = Instant::now();

        // Hard wall-clock bound on the whole exchange. The poll schedule only
        // bounds the number of attempts; a remote that accepts connections
        // but stalls mid-response would otherwise hang the cascade.
        let budget = self.config.wait_budget + self.config.poll_interval;
        let result = tokio::time::timeout(
            budget,
            self.run_platform_exchange(platform.as_ref(), session_id, capability, message),
        )
        .await
        .unwrap_or(Err(TierError::Timeout(budget)));

        match result {
            Ok(response) => {
                self.health.record(tier, TierStatus::Connected, None);
                attempts.push(TierAttempt {
                    tier,
                    outcome: TierOutcome::Success,
                    latency: started.elapsed(),
                    error: None,
                });
                tracing::info!(
                    event_name = "cascade.platform.success",
                    correlation_id = session_id,
                    capability = %capability,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "remote agent run completed"
                );
                Some(response)
            }
            Err(error) => {
                self.record_failure(tier, session_id, capability, started, error, attempts);
                None
            }
        }
    }

    async fn run_platform_exchange(
        &self,
        platform: &dyn AgentPlatform,
        session_id: &str,
        capability: Capability,
        message: &str,
    ) -> Result<String, TierError> {
        let agents = platform.list_agents(self.config.agent_listing_limit).await?;
        let agent = select_agent(&agents, capability, &self.config.agent_prefix)
            .ok_or_else(|| TierError::Remote("no agents registered on the platform".to_string()))?
            .clone();

        let thread_id = platform.create_thread().await?;
        let outbound = self.prompt_with_context(session_id, message);
        platform.post_message(&thread_id, &outbound).await?;
        let run_id = platform.start_run(&thread_id, &agent.id).await?;

        let plan = PollPlan::from_budget(self.config.poll_interval, self.config.wait_budget);
        let thread = thread_id.as_str();
        let run = run_id.as_str();
        let settled = poll_until(plan, move || async move {
            let state = platform.run_state(thread, run).await?;
            Ok(state.is_terminal().then_some(state))
        })
        .await?;

        match settled {
            Some(RunState::Completed) => {}
            Some(state) => return Err(TierError::RunFailed(format!("{state:?}"))),
            None => return Err(TierError::Timeout(plan.budget())),
        }

        let messages = platform.list_messages(&thread_id).await?;
        messages
            .into_iter()
            .find(|entry| entry.role == "assistant" && !entry.text.trim().is_empty())
            .map(|entry| entry.text)
            .ok_or_else(|| TierError::Protocol("run completed without an assistant reply".to_string()))
    }

    async fn try_completion(
        &self,
        session_id: &str,
        capability: Capability,
        message: &str,
        attempts: &mut Vec<TierAttempt>,
    ) -> Option<String> {
        let tier = TierId::Completion;

        let completion = match &self.completion {
            Some(completion) => completion,
            None => {
                self.skip_unconfigured(tier, "completion endpoint or key", attempts);
                return None;
            }
        };
        if self.health.is_short_circuited(tier) {
            self.skip_short_circuited(tier, session_id, attempts);
            return None;
        }

        self.health.record(tier, TierStatus::Connecting, None);
        let started = Instant::now();

        let template = capability.profile().prompt_template;
        let prompt = self.prompt_with_context(session_id, &template.replace("{message}", message));

        let result = tokio::time::timeout(self.config.completion_timeout, completion.complete(&prompt))
            .await
            .unwrap_or(Err(TierError::Timeout(self.config.completion_timeout)));

        match result {
            Ok(response) => {
                self.health.record(tier, TierStatus::Connected, None);
                attempts.push(TierAttempt {
                    tier,
                    outcome: TierOutcome::Success,
                    latency: started.elapsed(),
                    error: None,
                });
                tracing::info!(
                    event_name = "cascade.completion.success",
                    correlation_id = session_id,
                    capability = %capability,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "completion tier answered"
                );
                Some(response)
            }
            Err(error) => {
                self.record_failure(tier, session_id, capability, started, error, attempts);
                None
            }
        }
    }

    /// Prior-turn context is prepended so remote tiers see the conversation
    /// the way the session store remembers it.
    fn prompt_with_context(&self, session_id: &str, body: &str) -> String {
        match self.sessions.context_string(session_id) {
            Some(context) => format!("{context} {body}"),
            None => body.to_string(),
        }
    }

    fn skip_unconfigured(&self, tier: TierId, what: &str, attempts: &mut Vec<TierAttempt>) {
        let error = TierError::ConfigurationMissing(what.to_string());
        self.health.record_error(tier, &error);
        attempts.push(TierAttempt {
            tier,
            outcome: TierOutcome::Skipped,
            latency: Duration::ZERO,
            error: Some(error.to_string()),
        });
    }

    fn skip_short_circuited(
        &self,
        tier: TierId,
        session_id: &str,
        attempts: &mut Vec<TierAttempt>,
    ) {
        tracing::debug!(
            event_name = "cascade.tier.short_circuited",
            correlation_id = session_id,
            tier = tier.as_str(),
            "tier skipped until its configuration is reset"
        );
        attempts.push(TierAttempt {
            tier,
            outcome: TierOutcome::Skipped,
            latency: Duration::ZERO,
            error: Some("configuration missing, tier short-circuited".to_string()),
        });
    }

    fn record_failure(
        &self,
        tier: TierId,
        session_id: &str,
        capability: Capability,
        started: Instant,
        error: TierError,
        attempts: &mut Vec<TierAttempt>,
    ) {
        self.health.record_error(tier, &error);
        let outcome = match error {
            TierError::Timeout(_) => TierOutcome::Timeout,
            _ => TierOutcome::Failure,
        };
        tracing::warn!(
            event_name = "cascade.tier.failed",
            correlation_id = session_id,
            capability = %capability,
            tier = tier.as_str(),
            error = %error,
            "tier failed, cascading to the next tier"
        );
        attempts.push(TierAttempt {
            tier,
            outcome,
            latency: started.elapsed(),
            error: Some(error.to_string()),
        });
    }
}

fn select_agent<'a>(
    agents: &'a [RemoteAgent],
    capability: Capability,
    prefix: &str,
) -> Option<&'a RemoteAgent> {
    let wanted = capability.profile().remote_agent_name;
    agents
        .iter()
        .find(|agent| agent.name == wanted)
        .or_else(|| agents.iter().find(|agent| agent.name.starts_with(prefix)))
        .or_else(|| agents.first())
}
