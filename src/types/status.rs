use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Closed,
    Archived,
}

impl CaseStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::Closed => "closed",
            CaseStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<CaseStatus> {
        match s {
            "open" => Some(CaseStatus::Open),
            "in_progress" => Some(CaseStatus::InProgress),
            "closed" => Some(CaseStatus::Closed),
            "archived" => Some(CaseStatus::Archived),
            _ => None,
        }
    }

    /// Returns true if a case may move from this status to `to`.
    /// The full table: open -> in_progress | closed, in_progress -> open | closed,
    /// closed -> open | archived, archived -> open. Everything else is rejected.
    /// `archived -> open` additionally requires admin; see
    /// [`CaseStatus::transition_requires_admin`].
    #[must_use]
    pub fn can_transition_to(self, to: CaseStatus) -> bool {
        use CaseStatus::*;
        matches!(
            (self, to),
            (Open, InProgress)
                | (Open, Closed)
                | (InProgress, Open)
                | (InProgress, Closed)
                | (Closed, Open)
                | (Closed, Archived)
                | (Archived, Open)
        )
    }

    /// Unarchiving is an explicit admin override.
    #[must_use]
    pub fn transition_requires_admin(self, to: CaseStatus) -> bool {
        self == CaseStatus::Archived && to == CaseStatus::Open
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case priority. Ordering follows urgency, so `High > Medium` holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CasePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl CasePriority {
    pub const fn as_str(self) -> &'static str {
        match self {
            CasePriority::Low => "low",
            CasePriority::Medium => "medium",
            CasePriority::High => "high",
            CasePriority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<CasePriority> {
        match s {
            "low" => Some(CasePriority::Low),
            "medium" => Some(CasePriority::Medium),
            "high" => Some(CasePriority::High),
            "urgent" => Some(CasePriority::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for CasePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an activity log entry records. Status changes into closed or
/// archived get their own kinds so the history reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    Updated,
    Assigned,
    StatusChanged,
    NoteAdded,
    Closed,
    Archived,
}

impl ActivityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Created => "created",
            ActivityKind::Updated => "updated",
            ActivityKind::Assigned => "assigned",
            ActivityKind::StatusChanged => "status_changed",
            ActivityKind::NoteAdded => "note_added",
            ActivityKind::Closed => "closed",
            ActivityKind::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<ActivityKind> {
        match s {
            "created" => Some(ActivityKind::Created),
            "updated" => Some(ActivityKind::Updated),
            "assigned" => Some(ActivityKind::Assigned),
            "status_changed" => Some(ActivityKind::StatusChanged),
            "note_added" => Some(ActivityKind::NoteAdded),
            "closed" => Some(ActivityKind::Closed),
            "archived" => Some(ActivityKind::Archived),
            _ => None,
        }
    }

    /// Kind recorded when a case enters `to`.
    pub fn for_transition(to: CaseStatus) -> ActivityKind {
        match to {
            CaseStatus::Closed => ActivityKind::Closed,
            CaseStatus::Archived => ActivityKind::Archived,
            _ => ActivityKind::StatusChanged,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
