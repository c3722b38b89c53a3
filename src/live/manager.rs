//! # Live Meeting State Manager
//!
//! Owns every meeting's live aggregate: the transcript, the rolling
//! summary, the classified insight lists, and the per-meeting
//! deduplication engine. All mutation goes through this type.
//!
//! ## Concurrency model:
//! Each meeting is a logically single-writer stream: transcript segments
//! and questions for one meeting must apply in strict arrival order, or
//! the dedup and summary derivations would corrupt. The map of meetings
//! sits behind an outer `RwLock`, and every meeting entry behind its own
//! `Mutex`, so concurrent traffic for *different* meetings proceeds in
//! parallel while one meeting's events serialize. Every operation here is
//! synchronous in-memory computation; no lock is ever held across I/O.
//!
//! Live state is process-local and never persisted. A restart rebuilds
//! from scratch, which is acceptable for this service: the durable
//! meeting record lives in the meeting store, not here.

use crate::live::dedup::DeduplicationEngine;
use crate::live::extractor::{extract_insight, InsightKind};
use crate::live::summary::build_summary;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Fixed reply for questions asked before any transcript exists.
const NO_CONTEXT_ANSWER: &str =
    "I do not have enough meeting context yet. Please continue the meeting first.";

/// How many insights a direct "decisions"/"actions"/"risks" question
/// lists, and how many the fallback context answer appends.
const ANSWER_LIST_LIMIT: usize = 5;
const FALLBACK_LIST_LIMIT: usize = 3;
const FALLBACK_CONTEXT_LINES: usize = 3;

/// A decision captured from the transcript. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub id: String,
    pub meeting_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An action item captured from the transcript. `owner` and `due_date`
/// exist in the shape but are never populated by the current extraction
/// rules; they are carried for the wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct ActionItem {
    pub id: String,
    pub meeting_id: String,
    pub content: String,
    pub owner: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A risk captured from the transcript.
#[derive(Debug, Clone, Serialize)]
pub struct Risk {
    pub id: String,
    pub meeting_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// An open question captured from the transcript.
#[derive(Debug, Clone, Serialize)]
pub struct OpenQuestion {
    pub id: String,
    pub meeting_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The four insight lists, in the exact shape the wire contract uses.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InsightCollections {
    pub decisions: Vec<Decision>,
    pub actions: Vec<ActionItem>,
    pub risks: Vec<Risk>,
    pub open_questions: Vec<OpenQuestion>,
}

/// Incremental update emitted after a rate-limit-gated summary recompute.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingDelta {
    pub summary: String,
    pub insights: InsightCollections,
    pub updated_at: DateTime<Utc>,
}

/// Full current state, sent to a subscriber when it connects.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub transcript_lines: Vec<String>,
    pub summary: String,
    pub insights: InsightCollections,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Mutable per-meeting aggregate. `last_updated_at` is set iff at least
/// one summary recompute has occurred, and is monotonically
/// non-decreasing once set.
#[derive(Debug, Default)]
struct MeetingState {
    transcript_lines: Vec<String>,
    summary: String,
    insights: InsightCollections,
    last_updated_at: Option<DateTime<Utc>>,
}

/// A meeting's state paired with its deduplication engine. Both mutate
/// only under the entry's mutex.
#[derive(Debug)]
struct MeetingEntry {
    state: MeetingState,
    dedup: DeduplicationEngine,
}

impl MeetingEntry {
    fn new(similarity_threshold: f64) -> Self {
        Self {
            state: MeetingState::default(),
            dedup: DeduplicationEngine::new(similarity_threshold),
        }
    }
}

/// Registry of live meeting state, keyed by meeting id. Entries are
/// created lazily on first access and live for the process lifetime; no
/// eviction is performed (`tracked_meetings` exposes growth).
#[derive(Debug)]
pub struct StateManager {
    min_update_interval: Duration,
    similarity_threshold: f64,
    meetings: RwLock<HashMap<String, Arc<Mutex<MeetingEntry>>>>,
}

impl StateManager {
    /// `min_update_interval` throttles summary recomputes and delta
    /// emission; transcript appends and dedup bookkeeping are never
    /// throttled.
    pub fn new(min_update_interval: Duration, similarity_threshold: f64) -> Self {
        Self {
            min_update_interval,
            similarity_threshold,
            meetings: RwLock::new(HashMap::new()),
        }
    }

    /// Look up the entry for a meeting, creating an empty one on first
    /// access. Never fails: unknown ids are simply new meetings.
    fn entry_for(&self, meeting_id: &str) -> Arc<Mutex<MeetingEntry>> {
        if let Some(entry) = self.meetings.read().unwrap().get(meeting_id) {
            return Arc::clone(entry);
        }

        let mut meetings = self.meetings.write().unwrap();
        Arc::clone(
            meetings
                .entry(meeting_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(MeetingEntry::new(self.similarity_threshold)))),
        )
    }

    /// Ingest one transcript segment.
    ///
    /// The transcript line (speaker-prefixed when a speaker is known) is
    /// appended unconditionally. Insight extraction runs on the raw text;
    /// an extracted insight is recorded only if the dedup engine accepts
    /// its content. The summary recompute and the returned delta are
    /// rate-limited: `None` means "throttled", not an error.
    ///
    /// Empty-after-trim text is ignored entirely: no append, no delta.
    pub fn process_transcript_segment(
        &self,
        meeting_id: &str,
        text: &str,
        speaker: Option<&str>,
    ) -> Option<MeetingDelta> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let now = Utc::now();
        let entry = self.entry_for(meeting_id);
        let mut entry = entry.lock().unwrap();

        let line = match speaker {
            Some(speaker) => format!("{}: {}", speaker, text),
            None => text.to_string(),
        };
        entry.state.transcript_lines.push(line);

        if let Some(extracted) = extract_insight(text) {
            if entry.dedup.add_if_unique(&extracted.content) {
                let id = Uuid::new_v4().to_string();
                let meeting_id = meeting_id.to_string();
                let content = extracted.content;
                match extracted.kind {
                    InsightKind::Decision => entry.state.insights.decisions.push(Decision {
                        id,
                        meeting_id,
                        content,
                        created_at: now,
                    }),
                    InsightKind::Action => entry.state.insights.actions.push(ActionItem {
                        id,
                        meeting_id,
                        content,
                        owner: None,
                        due_date: None,
                        created_at: now,
                    }),
                    InsightKind::Risk => entry.state.insights.risks.push(Risk {
                        id,
                        meeting_id,
                        content,
                        created_at: now,
                    }),
                    InsightKind::OpenQuestion => {
                        entry.state.insights.open_questions.push(OpenQuestion {
                            id,
                            meeting_id,
                            content,
                            created_at: now,
                        })
                    }
                }
            }
        }

        if !self.should_update(&entry.state, now) {
            return None;
        }

        entry.state.summary = build_summary(&entry.state.transcript_lines);
        entry.state.last_updated_at = Some(now);

        Some(MeetingDelta {
            summary: entry.state.summary.clone(),
            insights: entry.state.insights.clone(),
            updated_at: now,
        })
    }

    /// Rule-based answer over the meeting's current state. Rules are
    /// evaluated in order against the lowercased question; the first hit
    /// wins.
    pub fn answer_question(&self, meeting_id: &str, question: &str) -> String {
        let entry = self.entry_for(meeting_id);
        let entry = entry.lock().unwrap();
        let state = &entry.state;

        if state.transcript_lines.is_empty() {
            return NO_CONTEXT_ANSWER.to_string();
        }

        let question = question.trim();
        let lowered = question.to_lowercase();

        if lowered.contains("summary") {
            if state.summary.is_empty() {
                return build_summary(&state.transcript_lines);
            }
            return state.summary.clone();
        }

        if lowered.contains("decision") {
            if state.insights.decisions.is_empty() {
                return "No decisions captured yet.".to_string();
            }
            let items = tail(&state.insights.decisions, ANSWER_LIST_LIMIT);
            return format!(
                "Decisions:\n{}",
                bullet_list(items.iter().map(|item| item.content.as_str()))
            );
        }

        if lowered.contains("action") {
            if state.insights.actions.is_empty() {
                return "No action items captured yet.".to_string();
            }
            let items = tail(&state.insights.actions, ANSWER_LIST_LIMIT);
            return format!(
                "Action items:\n{}",
                bullet_list(items.iter().map(|item| item.content.as_str()))
            );
        }

        if lowered.contains("risk") {
            if state.insights.risks.is_empty() {
                return "No risks captured yet.".to_string();
            }
            let items = tail(&state.insights.risks, ANSWER_LIST_LIMIT);
            return format!(
                "Risks:\n{}",
                bullet_list(items.iter().map(|item| item.content.as_str()))
            );
        }

        // Fallback: recent transcript context, plus recent action items
        // and decisions when any exist, then an echo of the question.
        let context = tail(&state.transcript_lines, FALLBACK_CONTEXT_LINES);
        let mut answer = format!(
            "Based on recent context:\n{}",
            bullet_list(context.iter().map(String::as_str))
        );

        if !state.insights.actions.is_empty() {
            let items = tail(&state.insights.actions, FALLBACK_LIST_LIMIT);
            answer.push_str(&format!(
                "\nRecent action items:\n{}",
                bullet_list(items.iter().map(|item| item.content.as_str()))
            ));
        }

        if !state.insights.decisions.is_empty() {
            let items = tail(&state.insights.decisions, FALLBACK_LIST_LIMIT);
            answer.push_str(&format!(
                "\nRecent decisions:\n{}",
                bullet_list(items.iter().map(|item| item.content.as_str()))
            ));
        }

        answer.push_str("\nQuestion: ");
        answer.push_str(question);
        answer
    }

    /// Full current state for a meeting, creating an empty one on first
    /// access.
    pub fn snapshot(&self, meeting_id: &str) -> StateSnapshot {
        let entry = self.entry_for(meeting_id);
        let entry = entry.lock().unwrap();

        StateSnapshot {
            transcript_lines: entry.state.transcript_lines.clone(),
            summary: entry.state.summary.clone(),
            insights: entry.state.insights.clone(),
            updated_at: entry.state.last_updated_at,
        }
    }

    /// Number of meetings currently tracked. There is no eviction, so
    /// this only grows within one process lifetime.
    pub fn tracked_meetings(&self) -> usize {
        self.meetings.read().unwrap().len()
    }

    /// Recompute is due when no update has happened yet, or when the
    /// configured interval has elapsed since the last one. An explicit
    /// time comparison, driven entirely by inbound events; there is no
    /// background tick.
    fn should_update(&self, state: &MeetingState, now: DateTime<Utc>) -> bool {
        match state.last_updated_at {
            None => true,
            Some(last) => now - last >= self.min_update_interval,
        }
    }
}

/// Last `limit` elements of a slice, in original order.
fn tail<T>(items: &[T], limit: usize) -> &[T] {
    &items[items.len().saturating_sub(limit)..]
}

/// Render items as the shared `- ` bulleted list used by both question
/// answers and summary text.
fn bullet_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
