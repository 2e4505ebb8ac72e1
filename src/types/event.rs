use super::{Case, CaseStatus, UserProfile};

/// Lifecycle event emitted by a committed case mutation. The mutation
/// returns its events to the caller instead of dispatching inline, so
/// persistence success stays decoupled from delivery success.
///
/// Events carry the post-mutation case snapshot and the acting profile;
/// the dispatcher resolves recipients from the store at dispatch time.
#[derive(Debug, Clone)]
pub enum CaseEvent {
    Created {
        case: Case,
        actor: UserProfile,
    },
    Assigned {
        case: Case,
        actor: UserProfile,
    },
    StatusChanged {
        case: Case,
        actor: UserProfile,
        from: CaseStatus,
        to: CaseStatus,
    },
    /// Plain field edits. Defined but currently notifies nobody.
    Updated {
        case: Case,
        actor: UserProfile,
    },
}

impl CaseEvent {
    pub fn case(&self) -> &Case {
        match self {
            CaseEvent::Created { case, .. }
            | CaseEvent::Assigned { case, .. }
            | CaseEvent::StatusChanged { case, .. }
            | CaseEvent::Updated { case, .. } => case,
        }
    }

    pub fn actor(&self) -> &UserProfile {
        match self {
            CaseEvent::Created { actor, .. }
            | CaseEvent::Assigned { actor, .. }
            | CaseEvent::StatusChanged { actor, .. }
            | CaseEvent::Updated { actor, .. } => actor,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            CaseEvent::Created { .. } => "case_created",
            CaseEvent::Assigned { .. } => "case_assigned",
            CaseEvent::StatusChanged { .. } => "case_status_changed",
            CaseEvent::Updated { .. } => "case_updated",
        }
    }
}
