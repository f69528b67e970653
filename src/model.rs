use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an activity-log entry records about a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEventKind {
    Created,
    Completed,
    Other,
}

/// A single activity-log entry attached to a work item.
///
/// Only `Created` events participate in analytics (as a fallback source for
/// the creation instant); the rest are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEvent {
    pub kind: ItemEventKind,
    pub at: DateTime<Utc>,
}

/// A unit of work, as normalized by the upstream provider adapter.
///
/// All references to stages, type tags, and assignees are non-owning ids
/// resolved against [`Catalogs`]. The struct is a read-only snapshot; nothing
/// in this crate mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub name: String,
    /// Explicit creation instant, when the provider supplied one.
    /// See [`WorkItem::creation_instant`] for the resolution chain.
    pub created_at: Option<DateTime<Utc>>,
    /// Resolved completion instant. Only meaningful when `is_complete` is set.
    pub completed_at: Option<DateTime<Utc>>,
    /// Completion flag, independent of whether `completed_at` resolved.
    pub is_complete: bool,
    pub is_archived: bool,
    pub stage_id: Option<String>,
    #[serde(default)]
    pub type_tag_ids: Vec<String>,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    /// Informational only; never used in flow classification.
    pub due_at: Option<DateTime<Utc>>,
    /// Activity log, used only as a creation-instant fallback.
    #[serde(default)]
    pub events: Vec<ItemEvent>,
}

impl WorkItem {
    /// Resolve the creation instant.
    ///
    /// Precedence, applied deterministically: the explicit `created_at` field,
    /// then the earliest `Created` activity event, then a timestamp decoded
    /// from the item's own id (see [`decode_id_timestamp`]). Returns `None`
    /// when no source resolves; never falls back to a clock.
    pub fn creation_instant(&self) -> Option<DateTime<Utc>> {
        if let Some(at) = self.created_at {
            return Some(at);
        }
        if let Some(at) = self
            .events
            .iter()
            .filter(|e| e.kind == ItemEventKind::Created)
            .map(|e| e.at)
            .min()
        {
            return Some(at);
        }
        decode_id_timestamp(&self.id)
    }

    /// Resolve the completion instant. `completed_at` counts only when the
    /// completion flag is set; a dangling date on an open item is ignored.
    pub fn completion_instant(&self) -> Option<DateTime<Utc>> {
        if self.is_complete {
            self.completed_at
        } else {
            None
        }
    }

    /// Days from creation to completion, when both instants resolve and the
    /// duration is non-negative. Negative durations are unusable for temporal
    /// metrics and yield `None`.
    pub fn cycle_time_days(&self) -> Option<f64> {
        let created = self.creation_instant()?;
        let completed = self.completion_instant()?;
        let secs = (completed - created).num_seconds();
        if secs < 0 {
            return None;
        }
        Some(secs as f64 / 86_400.0)
    }
}

/// Decode a creation timestamp from an opaque id.
///
/// Recognizes 24-character hex ids whose leading 8 hex digits encode seconds
/// since the Unix epoch (the ObjectId convention). Anything else yields
/// `None` — this must stay deterministic and must never invent a time.
pub fn decode_id_timestamp(id: &str) -> Option<DateTime<Utc>> {
    if id.len() != 24 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let secs = u32::from_str_radix(&id[..8], 16).ok()?;
    DateTime::from_timestamp(secs as i64, 0)
}

/// A pipeline stage. Lower `position` sorts earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub name: String,
    pub position: i64,
}

/// A categorical label with a display color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTag {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
}

/// A person or actor work items can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: String,
    pub name: String,
}

/// The reference catalogs a snapshot's items point into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalogs {
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub type_tags: Vec<TypeTag>,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
}

impl Catalogs {
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn type_tag(&self, id: &str) -> Option<&TypeTag> {
        self.type_tags.iter().find(|t| t.id == id)
    }

    pub fn assignee(&self, id: &str) -> Option<&Assignee> {
        self.assignees.iter().find(|a| a.id == id)
    }
}
