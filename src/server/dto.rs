use serde::{Deserialize, Deserializer, Serialize};

use crate::cases::{CasePatch, NewCase};
use crate::types::{CasePriority, CaseStatus, Role, UserProfile};

/// Distinguishes an absent PATCH field from an explicit null: absent stays
/// `None`, `null` becomes `Some(None)` and clears the stored value.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateCaseRequest {
    pub title: String,
    pub case_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<CasePriority>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub last_known_location: Option<String>,
}

impl From<CreateCaseRequest> for NewCase {
    fn from(req: CreateCaseRequest) -> Self {
        NewCase {
            title: req.title,
            description: req.description,
            case_type: req.case_type,
            priority: req.priority,
            assigned_to: req.assigned_to,
            subject_name: req.subject_name,
            date_of_birth: req.date_of_birth,
            contact_info: req.contact_info,
            last_known_location: req.last_known_location,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCaseRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub status: Option<CaseStatus>,
    #[serde(default)]
    pub priority: Option<CasePriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub subject_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_of_birth: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_info: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub last_known_location: Option<Option<String>>,
}

impl From<UpdateCaseRequest> for CasePatch {
    fn from(req: UpdateCaseRequest) -> Self {
        CasePatch {
            title: req.title,
            description: req.description,
            case_type: req.case_type,
            status: req.status,
            priority: req.priority,
            assigned_to: req.assigned_to,
            subject_name: req.subject_name,
            date_of_birth: req.date_of_birth,
            contact_info: req.contact_info,
            last_known_location: req.last_known_location,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub note: String,
    #[serde(default)]
    pub is_private: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub full_name: Option<Option<String>>,
}

/// Returned once, at user creation or token rotation. The raw token is not
/// recoverable afterwards.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub token: String,
    pub profile: UserProfile,
}
