use crate::capability::{registry, Capability, CapabilityProfile};

/// Weight for a whole-message exact keyword match.
const WEIGHT_EXACT_PHRASE: u32 = 10;
/// Weight per substring keyword occurrence.
const WEIGHT_KEYWORD: u32 = 3;
/// Occurrence cap per keyword, so repeated words cannot run the score away.
const KEYWORD_OCCURRENCE_CAP: u32 = 5;
/// Weight per distinct matched phrase pattern.
const WEIGHT_PATTERN: u32 = 5;
/// Assumed maximum plausible score; the divisor for the confidence estimate.
const ASSUMED_MAX_SCORE: f64 = 25.0;
/// Confidence reported when no signal matched and the default route is used.
const DEFAULT_ROUTE_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    pub capability: Capability,
    pub confidence: f64,
    /// All candidate scores in registry declaration order.
    pub candidates: Vec<(Capability, u32)>,
    pub reason: String,
}

/// Scores the message against every capability profile and picks a single
/// winner. Transparent keyword/pattern scorer by design, not a statistical
/// classifier.
pub fn classify(message: &str) -> ClassificationResult {
    classify_with_default(message, Capability::Coaching)
}

pub fn classify_with_default(message: &str, default: Capability) -> ClassificationResult {
    let lowercase = message.trim().to_ascii_lowercase();

    let candidates: Vec<(Capability, u32)> = registry()
        .iter()
        .map(|profile| (profile.capability, score_profile(profile, &lowercase)))
        .collect();

    let best = candidates
        .iter()
        .copied()
        .max_by_key(|(_, score)| *score)
        .unwrap_or((default, 0));

    if best.1 == 0 {
        return ClassificationResult {
            capability: default,
            confidence: DEFAULT_ROUTE_CONFIDENCE,
            candidates,
            reason: "no signal, default routing".to_string(),
        };
    }

    // max_by_key returns the last maximum; ties must resolve to the first
    // capability in registry order.
    let (capability, score) = candidates
        .iter()
        .copied()
        .find(|(_, score)| *score == best.1)
        .unwrap_or(best);

    ClassificationResult {
        capability,
        confidence: (f64::from(score) / ASSUMED_MAX_SCORE).min(1.0),
        candidates,
        reason: format!("scored {score} from keyword and pattern signals"),
    }
}

fn score_profile(profile: &CapabilityProfile, lowercase_message: &str) -> u32 {
    let mut score = 0;

    for keyword in profile.keywords {
        if lowercase_message == *keyword {
            score += WEIGHT_EXACT_PHRASE;
        }
        let occurrences = lowercase_message.matches(keyword).count() as u32;
        score += occurrences.min(KEYWORD_OCCURRENCE_CAP) * WEIGHT_KEYWORD;
    }

    for pattern in profile.patterns {
        if pattern.matches(lowercase_message) {
            score += WEIGHT_PATTERN;
        }
    }

    score
}
