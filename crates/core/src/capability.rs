use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// A fixed category of user intent the assistant can route to. Closed set;
/// routing is always a total match over these variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Backlog,
    Meeting,
    Metrics,
    Wellness,
    Coaching,
}

impl Capability {
    /// Declaration order doubles as the classifier tie-break order.
    pub const ALL: [Capability; 5] = [
        Capability::Backlog,
        Capability::Meeting,
        Capability::Metrics,
        Capability::Wellness,
        Capability::Coaching,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Meeting => "meeting",
            Self::Metrics => "metrics",
            Self::Wellness => "wellness",
            Self::Coaching => "coaching",
        }
    }

    pub fn profile(&self) -> &'static CapabilityProfile {
        let index = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        &REGISTRY[index]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "backlog" => Ok(Self::Backlog),
            "meeting" => Ok(Self::Meeting),
            "metrics" => Ok(Self::Metrics),
            "wellness" => Ok(Self::Wellness),
            "coaching" => Ok(Self::Coaching),
            other => Err(ValidationError::UnknownCapability(other.to_string())),
        }
    }
}

/// A linguistic template: one alternation group per slot, every slot must be
/// satisfied somewhere in the message for the pattern to match. Kept as plain
/// word groups rather than regexes so the scorer stays transparent and
/// debuggable.
#[derive(Clone, Copy, Debug)]
pub struct PhrasePattern {
    pub groups: &'static [&'static str],
}

impl PhrasePattern {
    pub fn matches(&self, lowercase_message: &str) -> bool {
        self.groups.iter().all(|group| {
            group.split('|').any(|alternative| lowercase_message.contains(alternative))
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CapabilityProfile {
    pub capability: Capability,
    pub display_name: &'static str,
    /// Name of the corresponding agent on the remote platform.
    pub remote_agent_name: &'static str,
    pub keywords: &'static [&'static str],
    pub patterns: &'static [PhrasePattern],
    /// Completion-tier prompt; `{message}` is the single placeholder.
    pub prompt_template: &'static str,
}

/// Static routing table. Immutable, defined at process start; iteration order
/// is declaration order.
pub fn registry() -> &'static [CapabilityProfile; 5] {
    &REGISTRY
}

static REGISTRY: [CapabilityProfile; 5] = [
    CapabilityProfile {
        capability: Capability::Backlog,
        display_name: "Backlog Intelligence",
        remote_agent_name: "Scrummate-Backlog-Intelligence",
        keywords: &[
            "user story",
            "user stories",
            "stories",
            "backlog",
            "epic",
            "feature",
            "acceptance criteria",
            "requirement",
            "prioritize",
            "login",
            "authentication",
        ],
        patterns: &[
            PhrasePattern { groups: &["create|write|generate|draft", "story|stories|feature|epic"] },
            PhrasePattern { groups: &["break|split", "epic|feature|story"] },
            PhrasePattern { groups: &["prioritize|priority|rank", "backlog|items|stories"] },
        ],
        prompt_template: "You are a Backlog Intelligence agent specialized in user stories, \
                          acceptance criteria, and backlog management.\n\nUser request: \
                          {message}\n\nProvide specific, actionable guidance for backlog \
                          management, user story creation, and agile planning.",
    },
    CapabilityProfile {
        capability: Capability::Meeting,
        display_name: "Meeting Intelligence",
        remote_agent_name: "Scrummate-Meeting-Intelligence",
        keywords: &[
            "meeting",
            "standup",
            "stand-up",
            "daily scrum",
            "retrospective",
            "retro",
            "sprint review",
            "ceremony",
            "action items",
            "facilitation",
        ],
        patterns: &[
            PhrasePattern { groups: &["improve|better|optimize", "standup|meeting|retrospective|ceremony"] },
            PhrasePattern { groups: &["analyze|summarize|review", "transcript|meeting|standup"] },
        ],
        prompt_template: "You are a Meeting Intelligence agent specialized in analyzing \
                          meetings, extracting action items, and identifying \
                          impediments.\n\nUser request: {message}\n\nAnalyze meeting content \
                          and provide insights about team dynamics, action items, and \
                          potential blockers.",
    },
    CapabilityProfile {
        capability: Capability::Metrics,
        display_name: "Flow Metrics",
        remote_agent_name: "Scrummate-Flow-Metrics",
        keywords: &[
            "metrics",
            "velocity",
            "burndown",
            "cycle time",
            "lead time",
            "throughput",
            "bottleneck",
            "flow",
            "wip",
            "delivery",
        ],
        patterns: &[
            PhrasePattern { groups: &["analyze|measure|track", "velocity|throughput|cycle|lead"] },
            PhrasePattern { groups: &["identify|find|spot", "bottleneck|constraint|blocker"] },
        ],
        prompt_template: "You are a Flow Metrics agent specialized in velocity, cycle time, \
                          and performance analysis.\n\nUser request: {message}\n\nProvide \
                          data-driven insights about team performance and actionable \
                          recommendations for improvement.",
    },
    CapabilityProfile {
        capability: Capability::Wellness,
        display_name: "Team Wellness",
        remote_agent_name: "Scrummate-Team-Wellness",
        keywords: &[
            "wellness",
            "burnout",
            "morale",
            "mood",
            "sentiment",
            "engagement",
            "happiness",
            "team health",
            "stressed",
            "overworked",
            "motivation",
        ],
        patterns: &[
            PhrasePattern { groups: &["team|people|everyone", "tired|exhausted|burned out|unhappy|frustrated"] },
            PhrasePattern { groups: &["improve|boost|raise", "morale|engagement|motivation"] },
        ],
        prompt_template: "You are a Team Wellness agent specialized in assessing team \
                          health, sentiment, and burnout prevention.\n\nUser request: \
                          {message}\n\nAssess team wellness and provide recommendations for \
                          maintaining healthy team dynamics.",
    },
    CapabilityProfile {
        capability: Capability::Coaching,
        display_name: "Agile Coaching",
        remote_agent_name: "Scrummate-Agile-Coaching",
        keywords: &[
            "coaching",
            "agile",
            "scrum master",
            "process improvement",
            "technical debt",
            "impediment",
            "self-organization",
            "transformation",
            "best practices",
        ],
        patterns: &[
            PhrasePattern { groups: &["help|guide|advise", "team|process|practice"] },
            PhrasePattern { groups: &["adopt|scale|introduce", "agile|scrum|kanban"] },
        ],
        prompt_template: "You are an Agile Coaching agent providing strategic guidance for \
                          Scrum Masters and agile teams.\n\nUser request: \
                          {message}\n\nProvide strategic coaching guidance and actionable \
                          recommendations for agile team success.",
    },
];
