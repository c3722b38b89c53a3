//! # Meeting Record Store
//!
//! Durable-looking bookkeeping for meetings: create, fetch, list, stop,
//! delete. This is the external collaborator the live engine sits next
//! to; here it is an in-memory registry so the service runs without a
//! database. The live transcript/insight state is *not* stored here (see
//! `live::manager`).

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Lifecycle status of a meeting record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Active,
    Stopped,
}

/// A meeting record as exposed over the HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub status: MeetingStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a meeting.
#[derive(Debug, Deserialize)]
pub struct MeetingCreate {
    pub title: String,
}

const MAX_TITLE_LENGTH: usize = 255;

/// In-memory registry of meeting records.
#[derive(Debug, Default)]
pub struct MeetingStore {
    records: RwLock<HashMap<String, Meeting>>,
}

impl MeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an active meeting. Titles must be non-empty after trimming
    /// and at most 255 characters.
    pub fn create(&self, title: &str) -> Result<Meeting, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::ValidationError("Meeting title cannot be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(AppError::ValidationError(format!(
                "Meeting title cannot exceed {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        let now = Utc::now();
        let meeting = Meeting {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            status: MeetingStatus::Active,
            started_at: now,
            ended_at: None,
            created_at: now,
            updated_at: now,
        };

        self.records
            .write()
            .unwrap()
            .insert(meeting.id.clone(), meeting.clone());
        Ok(meeting)
    }

    pub fn get(&self, meeting_id: &str) -> Result<Meeting, AppError> {
        self.records
            .read()
            .unwrap()
            .get(meeting_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Meeting not found: {}", meeting_id)))
    }

    /// All meetings, most recently created first.
    pub fn list(&self) -> Vec<Meeting> {
        let mut meetings: Vec<Meeting> = self.records.read().unwrap().values().cloned().collect();
        meetings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        meetings
    }

    /// Mark a meeting stopped and stamp its end time. Stopping an already
    /// stopped meeting refreshes the timestamps.
    pub fn stop(&self, meeting_id: &str) -> Result<Meeting, AppError> {
        let mut records = self.records.write().unwrap();
        let meeting = records
            .get_mut(meeting_id)
            .ok_or_else(|| AppError::NotFound(format!("Meeting not found: {}", meeting_id)))?;

        let now = Utc::now();
        meeting.status = MeetingStatus::Stopped;
        meeting.ended_at = Some(now);
        meeting.updated_at = now;
        Ok(meeting.clone())
    }

    pub fn delete(&self, meeting_id: &str) -> Result<(), AppError> {
        self.records
            .write()
            .unwrap()
            .remove(meeting_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Meeting not found: {}", meeting_id)))
    }

    pub fn count(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_meeting() {
        let store = MeetingStore::new();
        let meeting = store.create("Weekly sync").unwrap();

        assert_eq!(meeting.status, MeetingStatus::Active);
        assert!(meeting.ended_at.is_none());

        let fetched = store.get(&meeting.id).unwrap();
        assert_eq!(fetched.title, "Weekly sync");
    }

    #[test]
    fn test_create_rejects_blank_title() {
        let store = MeetingStore::new();
        assert!(matches!(store.create("   "), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_create_rejects_overlong_title() {
        let store = MeetingStore::new();
        let title = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(matches!(store.create(&title), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_get_unknown_meeting_is_not_found() {
        let store = MeetingStore::new();
        assert!(matches!(store.get("missing"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_is_newest_first() {
        let store = MeetingStore::new();
        let first = store.create("first").unwrap();
        let second = store.create("second").unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        // created_at could tie at clock resolution; ids disambiguate.
        let ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains(&first.id.as_str()));
        assert!(ids.contains(&second.id.as_str()));
    }

    #[test]
    fn test_stop_sets_status_and_end_time() {
        let store = MeetingStore::new();
        let meeting = store.create("standup").unwrap();

        let stopped = store.stop(&meeting.id).unwrap();
        assert_eq!(stopped.status, MeetingStatus::Stopped);
        assert!(stopped.ended_at.is_some());
        assert!(stopped.updated_at >= meeting.updated_at);
    }

    #[test]
    fn test_delete_removes_record() {
        let store = MeetingStore::new();
        let meeting = store.create("to be removed").unwrap();

        store.delete(&meeting.id).unwrap();
        assert!(matches!(store.get(&meeting.id), Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(&meeting.id), Err(AppError::NotFound(_))));
    }
}
