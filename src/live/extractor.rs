//! # Insight Extractor
//!
//! Classifies a single transcript segment into a decision, action item,
//! risk, or open question using explicit prefixes and keyword heuristics.
//! This is deliberately a rule engine, not NLP: the behavior must stay
//! predictable and cheap enough to run inline on every segment.
//!
//! ## Rule order (first match wins):
//! 1. Case-insensitive prefix (`decision:`, `action:`, `action item:`,
//!    `risk:`, `question:`): content is everything after the first
//!    colon, trimmed.
//! 2. Action keyword anywhere in the lowercased text: content is the
//!    full original text.
//! 3. Decision keyword, full text.
//! 4. Risk keyword, full text.
//! 5. Otherwise no insight.
//!
//! Keyword matching is plain substring matching on the lowercased text,
//! not word-boundary aware ("dissolved" contains "solve" style false
//! positives are accepted). A line carrying both an action and a risk
//! keyword classifies as an action because of the rule order.

/// Kind of insight a transcript segment was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightKind {
    Decision,
    Action,
    Risk,
    OpenQuestion,
}

/// Classification result: the kind plus the content string that should be
/// recorded (prefix stripped for rule 1, full text for keyword rules).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedInsight {
    pub kind: InsightKind,
    pub content: String,
}

/// Explicit marker prefixes, checked before any keyword heuristic.
/// `action item:` must come before `action:` so the longer form is not
/// shadowed.
const PREFIX_RULES: &[(&str, InsightKind)] = &[
    ("decision:", InsightKind::Decision),
    ("action item:", InsightKind::Action),
    ("action:", InsightKind::Action),
    ("risk:", InsightKind::Risk),
    ("question:", InsightKind::OpenQuestion),
];

const ACTION_KEYWORDS: &[&str] = &[
    "need to",
    "should",
    "must",
    "will do",
    "to prepare",
    "to send",
    "to review",
    "to follow up",
    "let's",
    "please",
];

const DECISION_KEYWORDS: &[&str] = &[
    "decided",
    "agreed",
    "confirmed",
    "approved",
    "final decision",
    "we will",
    "we'll go with",
];

const RISK_KEYWORDS: &[&str] = &[
    "risk", "danger", "concern", "worried", "problem", "issue", "blocker",
];

/// Classify one transcript segment. Returns `None` when no rule matches,
/// which is the common case and not an error.
pub fn extract_insight(text: &str) -> Option<ExtractedInsight> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();

    for (prefix, kind) in PREFIX_RULES {
        if lowered.starts_with(prefix) {
            let content = trimmed
                .splitn(2, ':')
                .nth(1)
                .unwrap_or("")
                .trim()
                .to_string();
            return Some(ExtractedInsight { kind: *kind, content });
        }
    }

    let keyword_rules: [(&[&str], InsightKind); 3] = [
        (ACTION_KEYWORDS, InsightKind::Action),
        (DECISION_KEYWORDS, InsightKind::Decision),
        (RISK_KEYWORDS, InsightKind::Risk),
    ];

    for (keywords, kind) in keyword_rules {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return Some(ExtractedInsight {
                kind,
                content: trimmed.to_string(),
            });
        }
    }

    None
}
