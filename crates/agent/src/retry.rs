use std::future::Future;
use std::time::Duration;

/// Fixed-interval polling schedule derived from a total wait budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPlan {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPlan {
    /// At least one attempt, and never more than the budget allows.
    pub fn from_budget(interval: Duration, budget: Duration) -> Self {
        let interval_secs = interval.as_secs().max(1);
        let attempts = (budget.as_secs() / interval_secs).max(1);
        Self { interval, max_attempts: attempts as u32 }
    }

    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Polls `check` on the plan's schedule until it yields a value, returns an
/// error, or the attempts run out. `Ok(None)` from `check` means "not yet";
/// exhaustion is reported as `Ok(None)` so the caller decides how a timeout
/// maps into its own error type.
pub async fn poll_until<T, E, F, Fut>(plan: PollPlan, mut check: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 0..plan.max_attempts {
        if attempt > 0 {
            tokio::time::sleep(plan.interval).await;
        }
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }
    }

    Ok(None)
}
