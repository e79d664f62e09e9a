use chrono::{DateTime, Utc};

use crate::capability::Capability;

/// Renders the capability-specific guidance template. Pure function over its
/// inputs: the same capability, message, and clock value always produce
/// byte-identical output. This is the availability floor of the cascade and
/// is infallible by construction.
pub fn respond(capability: Capability, message: &str, now: DateTime<Utc>) -> String {
    let body = match capability {
        Capability::Backlog => BACKLOG_GUIDANCE,
        Capability::Meeting => MEETING_GUIDANCE,
        Capability::Metrics => METRICS_GUIDANCE,
        Capability::Wellness => WELLNESS_GUIDANCE,
        Capability::Coaching => COACHING_GUIDANCE,
    };

    format!(
        "{title} Response\n\nBased on your request: \"{message}\"\n\n{body}\n\n{trailer}\nGenerated at {timestamp}.",
        title = capability.profile().display_name,
        trailer = FALLBACK_NOTICE,
        timestamp = now.to_rfc3339(),
    )
}

const FALLBACK_NOTICE: &str = "This is locally generated guidance. For assistance grounded in \
                               your own project data, configure the remote agent platform.";

const BACKLOG_GUIDANCE: &str = "\
For User Stories:
- Structure: \"As a [user type], I want [functionality] so that [benefit]\"
- Include clear acceptance criteria with testable conditions
- Consider edge cases and error scenarios
- Size appropriately (1-8 story points recommended)

For Epics & Features:
- Break down large features into smaller, deliverable stories
- Maintain a clear value proposition for each component
- Consider dependencies and technical constraints

Best Practices:
- Use INVEST criteria (Independent, Negotiable, Valuable, Estimable, Small, Testable)
- Collaborate with the Product Owner on priority
- Include Definition of Done criteria";

const MEETING_GUIDANCE: &str = "\
For Daily Standups:
- Focus on: What did you accomplish? What will you work on? Any blockers?
- Keep it time-boxed (15 minutes max)
- Address impediments immediately after standup

For Retrospectives:
- Use structured formats: What went well? What could improve? Action items?
- Try techniques like Mad/Sad/Glad or Start/Stop/Continue
- Ensure action items have owners and deadlines

For Sprint Planning:
- Review velocity trends and team capacity
- Ensure stories have clear acceptance criteria
- Break down large stories collaboratively";

const METRICS_GUIDANCE: &str = "\
Key Flow Metrics:
- Cycle Time: average time from story start to completion
- Lead Time: total time from request to delivery
- Throughput: stories completed per sprint
- Work in Progress (WIP): current active stories

Analysis Techniques:
- Track trends over 3-6 sprint periods
- Identify bottlenecks in your workflow states
- Compare planned vs. actual completion times

Improvement Strategies:
- Limit WIP to reduce context switching
- Improve story sizing consistency
- Optimize handoff processes";

const WELLNESS_GUIDANCE: &str = "\
Wellness Indicators:
- Team satisfaction and engagement levels
- Work-life balance and sustainable pace
- Collaboration quality and communication
- Stress levels and burnout signs

Health Check Techniques:
- Regular anonymous surveys or mood tracking
- One-on-one conversations with team members
- Monitoring overtime and weekend work patterns

Improvement Actions:
- Adjust sprint capacity based on team feedback
- Address interpersonal conflicts early
- Celebrate successes and recognize contributions";

const COACHING_GUIDANCE: &str = "\
Process Improvement:
- Identify workflow bottlenecks and inefficiencies
- Implement incremental improvements through experimentation
- Use retrospectives to drive continuous improvement

Team Development:
- Foster self-organization and autonomous decision-making
- Build cross-functional skills and knowledge sharing
- Encourage healthy conflict and constructive feedback

Organizational Support:
- Remove impediments and blockers
- Facilitate better stakeholder communication
- Guide adoption of agile best practices";
