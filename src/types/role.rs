use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Case, CaseNote};

/// Role is the sole authorization axis. Every policy decision in the crate
/// goes through these methods; handlers and services never re-derive role
/// logic inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Investigator,
    Volunteer,
    Readonly,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Investigator => "investigator",
            Role::Volunteer => "volunteer",
            Role::Readonly => "readonly",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "investigator" => Some(Role::Investigator),
            "volunteer" => Some(Role::Volunteer),
            "readonly" => Some(Role::Readonly),
            _ => None,
        }
    }

    /// Volunteers only see cases they created or are assigned to; everyone
    /// else sees the full set. Readonly users view everything but edit
    /// nothing.
    #[must_use]
    pub fn can_view_case(self, user_id: &str, case: &Case) -> bool {
        match self {
            Role::Admin | Role::Investigator | Role::Readonly => true,
            Role::Volunteer => case.involves(user_id),
        }
    }

    #[must_use]
    pub fn can_edit_case(self, user_id: &str, case: &Case) -> bool {
        match self {
            Role::Admin | Role::Investigator => true,
            Role::Volunteer => case.involves(user_id),
            Role::Readonly => false,
        }
    }

    #[must_use]
    pub fn can_create_cases(self) -> bool {
        matches!(self, Role::Admin | Role::Investigator)
    }

    /// Hard deletion is destructive and admin-only.
    #[must_use]
    pub fn can_delete_cases(self) -> bool {
        matches!(self, Role::Admin)
    }

    #[must_use]
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Dossier export includes private notes, so it is held to the same bar
    /// as full case access.
    #[must_use]
    pub fn can_export_cases(self) -> bool {
        matches!(self, Role::Admin | Role::Investigator)
    }

    /// Private notes are visible to their author and to admins only.
    #[must_use]
    pub fn can_see_note(self, user_id: &str, note: &CaseNote) -> bool {
        !note.is_private || self == Role::Admin || note.user_id == user_id
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{CasePriority, CaseStatus};

    fn case(created_by: &str, assigned_to: Option<&str>) -> Case {
        let now = Utc::now();
        Case {
            id: "c1".into(),
            case_number: "CF-202501-001".into(),
            title: "Test".into(),
            description: None,
            case_type: "fraud".into(),
            status: CaseStatus::Open,
            priority: CasePriority::Medium,
            created_by: created_by.into(),
            assigned_to: assigned_to.map(Into::into),
            subject_name: None,
            date_of_birth: None,
            contact_info: None,
            last_known_location: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
            archived_at: None,
        }
    }

    fn note(author: &str, is_private: bool) -> CaseNote {
        let now = Utc::now();
        CaseNote {
            id: "n1".into(),
            case_id: "c1".into(),
            user_id: author.into(),
            note: "observation".into(),
            is_private,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_volunteer_visibility() {
        let mine = case("vol", None);
        let assigned = case("other", Some("vol"));
        let unrelated = case("other", Some("someone"));

        assert!(Role::Volunteer.can_view_case("vol", &mine));
        assert!(Role::Volunteer.can_view_case("vol", &assigned));
        assert!(!Role::Volunteer.can_view_case("vol", &unrelated));
        assert!(Role::Volunteer.can_edit_case("vol", &assigned));
        assert!(!Role::Volunteer.can_edit_case("vol", &unrelated));
    }

    #[test]
    fn test_readonly_views_all_edits_none() {
        let unrelated = case("other", None);
        assert!(Role::Readonly.can_view_case("ro", &unrelated));
        assert!(!Role::Readonly.can_edit_case("ro", &unrelated));
        assert!(!Role::Readonly.can_create_cases());
        assert!(!Role::Readonly.can_export_cases());
    }

    #[test]
    fn test_admin_only_capabilities() {
        assert!(Role::Admin.can_delete_cases());
        assert!(Role::Admin.can_manage_users());
        for role in [Role::Investigator, Role::Volunteer, Role::Readonly] {
            assert!(!role.can_delete_cases());
            assert!(!role.can_manage_users());
        }
    }

    #[test]
    fn test_private_note_visibility() {
        let private = note("author", true);
        let public = note("author", false);

        assert!(Role::Volunteer.can_see_note("author", &private));
        assert!(!Role::Volunteer.can_see_note("other", &private));
        assert!(!Role::Investigator.can_see_note("other", &private));
        assert!(Role::Admin.can_see_note("other", &private));
        assert!(Role::Readonly.can_see_note("other", &public));
    }
}
