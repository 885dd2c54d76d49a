//! Shared types for the portal store.
//!
//! Everything here is backend-agnostic: the SQLite store and the engine both
//! work in terms of these structs. Schedule entries are carried on the card
//! as a single JSON text blob (the portal UI owns that format), so the
//! entry list (de)serialization helpers live here next to the types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A displayable content unit on the wallboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique card identifier, immutable once created.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// Display subtitle.
    pub subtitle: String,
    /// Currently-active displayed image reference (URL or path).
    pub image: Option<String>,
    /// Ordered schedule entry list, serialized as one JSON blob.
    /// `None` means no scheduling is configured for this card.
    pub schedule_entries: Option<String>,
}

/// A single time window bound to an image.
///
/// Field names serialize in camelCase so blobs written by the portal UI
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Window start (inclusive).
    pub start_date: DateTime<Utc>,
    /// Window end (inclusive). Absent = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Image reference applied while the entry is active.
    pub image: String,
}

impl ScheduleEntry {
    /// Returns `true` when `now` falls inside the window.
    ///
    /// Boundaries are inclusive on both ends: an entry whose `end_date`
    /// equals `now` is still active.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.start_date > now {
            return false;
        }
        match self.end_date {
            None => true,
            Some(end) => now <= end,
        }
    }

    /// Returns `true` when the window is permanently over: `end_date` is
    /// present and strictly before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.end_date {
            None => false,
            Some(end) => end < now,
        }
    }
}

/// Parse a stored schedule blob into its entry list.
///
/// Malformed blobs are the caller's problem; the engine skips the card for
/// the cycle rather than aborting the scan.
pub fn parse_entries(blob: &str) -> serde_json::Result<Vec<ScheduleEntry>> {
    serde_json::from_str(blob)
}

/// Serialize an entry list back into a card blob.
///
/// An empty list becomes `None`: the store never carries an empty JSON
/// array, only NULL or a non-empty blob.
pub fn entries_to_blob(entries: &[ScheduleEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    serde_json::to_string(entries).ok()
}

/// Partial update payload for a card.
///
/// `schedule_entries` is tri-state: `None` leaves the column untouched,
/// `Some(None)` clears it to NULL, `Some(Some(blob))` replaces it. This lets
/// the engine write `image` and the entry list independently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardPatch {
    /// New image reference, when present.
    pub image: Option<String>,
    /// New schedule blob (outer `Some` = write the column).
    pub schedule_entries: Option<Option<String>>,
}

impl CardPatch {
    /// Patch that only replaces the card image.
    pub fn set_image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            schedule_entries: None,
        }
    }

    /// Patch that only replaces (or clears) the schedule blob.
    pub fn set_entries(blob: Option<String>) -> Self {
        Self {
            image: None,
            schedule_entries: Some(blob),
        }
    }

    /// Returns `true` when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.schedule_entries.is_none()
    }
}

/// A dashboard task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub done: bool,
    /// Owning category, when the task is filed under one.
    pub category_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

/// A task category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A directory contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub department: String,
    pub phone: String,
    pub email: String,
}
