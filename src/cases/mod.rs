mod diff;

pub use diff::{FieldChange, FieldDiff};

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::*;

/// Input for creating a case. The status is forced to open and the case
/// number is allocated server-side; neither is accepted from callers.
#[derive(Debug, Clone, Default)]
pub struct NewCase {
    pub title: String,
    pub description: Option<String>,
    pub case_type: String,
    pub priority: Option<CasePriority>,
    pub assigned_to: Option<String>,
    pub subject_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub contact_info: Option<String>,
    pub last_known_location: Option<String>,
}

/// Partial update. Outer None = leave unchanged. Nullable fields carry a
/// second Option so "set to value" and "clear" are distinct.
#[derive(Debug, Clone, Default)]
pub struct CasePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub case_type: Option<String>,
    pub status: Option<CaseStatus>,
    pub priority: Option<CasePriority>,
    pub assigned_to: Option<Option<String>>,
    pub subject_name: Option<Option<String>>,
    pub date_of_birth: Option<Option<String>>,
    pub contact_info: Option<Option<String>>,
    pub last_known_location: Option<Option<String>>,
}

impl CasePatch {
    fn apply(&self, case: &mut Case) {
        if let Some(title) = &self.title {
            case.title = title.clone();
        }
        if let Some(description) = &self.description {
            case.description = description.clone();
        }
        if let Some(case_type) = &self.case_type {
            case.case_type = case_type.clone();
        }
        if let Some(status) = self.status {
            case.status = status;
        }
        if let Some(priority) = self.priority {
            case.priority = priority;
        }
        if let Some(assigned_to) = &self.assigned_to {
            case.assigned_to = assigned_to.clone();
        }
        if let Some(subject_name) = &self.subject_name {
            case.subject_name = subject_name.clone();
        }
        if let Some(date_of_birth) = &self.date_of_birth {
            case.date_of_birth = date_of_birth.clone();
        }
        if let Some(contact_info) = &self.contact_info {
            case.contact_info = contact_info.clone();
        }
        if let Some(last_known_location) = &self.last_known_location {
            case.last_known_location = last_known_location.clone();
        }
    }
}

/// CaseService owns the case lifecycle rules: validation, the status state
/// machine, access policy enforcement, activity recording, and event
/// emission. Mutations return their lifecycle events to the caller instead
/// of dispatching inline, so a committed write never waits on (or fails
/// with) notification delivery.
pub struct CaseService {
    store: Arc<dyn Store>,
}

impl CaseService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn create(&self, input: NewCase, actor: &UserProfile) -> Result<(Case, Vec<CaseEvent>)> {
        if !actor.role.can_create_cases() {
            return Err(Error::permission("this role cannot create cases"));
        }

        let title = input.title.trim();
        if title.is_empty() {
            return Err(Error::validation("title is required"));
        }
        let case_type = input.case_type.trim();
        if case_type.is_empty() {
            return Err(Error::validation("case_type is required"));
        }
        if let Some(assignee) = &input.assigned_to {
            self.require_profile(assignee)?;
        }

        let now = Utc::now();
        let case = Case {
            id: Uuid::new_v4().to_string(),
            case_number: self.store.next_case_number(now)?,
            title: title.to_string(),
            description: input.description,
            case_type: case_type.to_string(),
            status: CaseStatus::Open,
            priority: input.priority.unwrap_or_default(),
            created_by: actor.user_id.clone(),
            assigned_to: input.assigned_to,
            subject_name: input.subject_name,
            date_of_birth: input.date_of_birth,
            contact_info: input.contact_info,
            last_known_location: input.last_known_location,
            created_at: now,
            updated_at: now,
            closed_at: None,
            archived_at: None,
        };
        self.store.create_case(&case)?;

        self.record_activity(ActivityEntry {
            id: Uuid::new_v4().to_string(),
            case_id: case.id.clone(),
            user_id: Some(actor.user_id.clone()),
            kind: ActivityKind::Created,
            description: format!("Case {} created", case.case_number),
            old_values: None,
            new_values: None,
            created_at: now,
        });

        let events = vec![CaseEvent::Created {
            case: case.clone(),
            actor: actor.clone(),
        }];
        Ok((case, events))
    }

    pub fn update(
        &self,
        case_id: &str,
        patch: CasePatch,
        actor: &UserProfile,
    ) -> Result<(Case, Vec<CaseEvent>)> {
        let old = self.get(case_id, actor)?;
        if !actor.role.can_edit_case(&actor.user_id, &old) {
            return Err(Error::permission("this role cannot edit this case"));
        }

        let mut updated = old.clone();
        patch.apply(&mut updated);

        if updated.title.trim().is_empty() {
            return Err(Error::validation("title cannot be empty"));
        }
        if updated.case_type.trim().is_empty() {
            return Err(Error::validation("case_type cannot be empty"));
        }

        let changes = FieldDiff::between(&old, &updated);
        if changes.is_empty() {
            return Ok((old, Vec::new()));
        }

        let now = Utc::now();
        let status_changed = changes.contains("status");

        if status_changed {
            let (from, to) = (old.status, updated.status);
            if !from.can_transition_to(to) {
                return Err(Error::InvalidTransition { from, to });
            }
            if from.transition_requires_admin(to) && actor.role != Role::Admin {
                return Err(Error::permission("only admins can reopen an archived case"));
            }
            match to {
                CaseStatus::Closed => updated.closed_at = Some(now),
                CaseStatus::Archived => updated.archived_at = Some(now),
                // Reopening drops the terminal stamps.
                CaseStatus::Open | CaseStatus::InProgress => {
                    updated.closed_at = None;
                    updated.archived_at = None;
                }
            }
        }

        let assignment_changed = changes.contains("assigned_to");
        let assignee = match (&updated.assigned_to, assignment_changed) {
            (Some(id), true) => Some(self.require_profile(id)?),
            _ => None,
        };

        updated.updated_at = now;
        self.store.update_case(&updated)?;

        let kind = if status_changed {
            ActivityKind::for_transition(updated.status)
        } else if assignment_changed {
            ActivityKind::Assigned
        } else {
            ActivityKind::Updated
        };
        let description = if status_changed {
            format!("Status changed from {} to {}", old.status, updated.status)
        } else if assignment_changed {
            match &assignee {
                Some(profile) => format!("Assigned to {}", profile.display_name()),
                None => "Assignment removed".to_string(),
            }
        } else {
            format!(
                "Updated {}",
                changes.fields().collect::<Vec<_>>().join(", ")
            )
        };

        self.record_activity(ActivityEntry {
            id: Uuid::new_v4().to_string(),
            case_id: updated.id.clone(),
            user_id: Some(actor.user_id.clone()),
            kind,
            description,
            old_values: Some(changes.old_values()),
            new_values: Some(changes.new_values()),
            created_at: now,
        });

        let mut events = Vec::new();
        if status_changed {
            events.push(CaseEvent::StatusChanged {
                case: updated.clone(),
                actor: actor.clone(),
                from: old.status,
                to: updated.status,
            });
        }
        if assignee.is_some() {
            events.push(CaseEvent::Assigned {
                case: updated.clone(),
                actor: actor.clone(),
            });
        }
        if events.is_empty() {
            events.push(CaseEvent::Updated {
                case: updated.clone(),
                actor: actor.clone(),
            });
        }

        Ok((updated, events))
    }

    /// Hard-deletes a case; the store cascade removes all child rows.
    /// Returns the orphaned document metadata so the caller can purge the
    /// stored blobs.
    pub fn delete(&self, case_id: &str, actor: &UserProfile) -> Result<Vec<CaseDocument>> {
        if !actor.role.can_delete_cases() {
            return Err(Error::permission("only admins can delete cases"));
        }
        if self.store.get_case(case_id)?.is_none() {
            return Err(Error::NotFound("case"));
        }
        let documents = self.store.list_case_documents(case_id)?;
        self.store.delete_case(case_id)?;
        Ok(documents)
    }

    pub fn get(&self, case_id: &str, actor: &UserProfile) -> Result<Case> {
        let case = self
            .store
            .get_case(case_id)?
            .ok_or(Error::NotFound("case"))?;
        // Invisible and absent are indistinguishable to the caller.
        if !actor.role.can_view_case(&actor.user_id, &case) {
            return Err(Error::NotFound("case"));
        }
        Ok(case)
    }

    pub fn list(&self, actor: &UserProfile) -> Result<Vec<Case>> {
        let cases = self.store.list_cases()?;
        Ok(cases
            .into_iter()
            .filter(|c| actor.role.can_view_case(&actor.user_id, c))
            .collect())
    }

    pub fn add_note(
        &self,
        case_id: &str,
        text: &str,
        is_private: bool,
        actor: &UserProfile,
    ) -> Result<CaseNote> {
        let case = self.get(case_id, actor)?;
        // Notes are writes; readonly users never make them.
        if !actor.role.can_edit_case(&actor.user_id, &case) {
            return Err(Error::permission("this role cannot add notes"));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(Error::validation("note cannot be empty"));
        }

        let now = Utc::now();
        let note = CaseNote {
            id: Uuid::new_v4().to_string(),
            case_id: case.id.clone(),
            user_id: actor.user_id.clone(),
            note: text.to_string(),
            is_private,
            created_at: now,
            updated_at: now,
        };
        self.store.create_note(&note)?;

        self.record_activity(ActivityEntry {
            id: Uuid::new_v4().to_string(),
            case_id: case.id,
            user_id: Some(actor.user_id.clone()),
            kind: ActivityKind::NoteAdded,
            description: if is_private {
                "Private note added".to_string()
            } else {
                "Note added".to_string()
            },
            old_values: None,
            new_values: None,
            created_at: now,
        });

        Ok(note)
    }

    /// Notes on a case, with private notes the actor may not see filtered
    /// out.
    pub fn list_notes(&self, case_id: &str, actor: &UserProfile) -> Result<Vec<CaseNote>> {
        self.get(case_id, actor)?;
        let notes = self.store.list_case_notes(case_id)?;
        Ok(notes
            .into_iter()
            .filter(|n| actor.role.can_see_note(&actor.user_id, n))
            .collect())
    }

    pub fn list_activity(&self, case_id: &str, actor: &UserProfile) -> Result<Vec<ActivityEntry>> {
        self.get(case_id, actor)?;
        self.store.list_case_activity(case_id)
    }

    /// Activity recording is a best-effort side effect of an already
    /// committed mutation; a failed write is logged, never propagated.
    fn record_activity(&self, entry: ActivityEntry) {
        if let Err(e) = self.store.append_activity(&entry) {
            tracing::warn!(case_id = %entry.case_id, "failed to record case activity: {}", e);
        }
    }

    fn require_profile(&self, user_id: &str) -> Result<UserProfile> {
        self.store
            .get_profile(user_id)?
            .ok_or_else(|| Error::validation(format!("assigned user '{user_id}' does not exist")))
    }
}
