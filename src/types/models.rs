use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActivityKind, CasePriority, CaseStatus, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub case_number: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub case_type: String,
    pub status: CaseStatus,
    pub priority: CasePriority,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_known_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Case {
    /// True when the user created the case or is currently assigned to it.
    pub fn involves(&self, user_id: &str) -> bool {
        self.created_by == user_id || self.assigned_to.as_deref() == Some(user_id)
    }
}

/// One immutable row of the case audit trail. `user_id` is None for
/// system-generated entries. `old_values`/`new_values` snapshot only the
/// fields that changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub case_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "activity_type")]
    pub kind: ActivityKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_values: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_values: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseNote {
    pub id: String,
    pub case_id: String,
    pub user_id: String,
    pub note: String,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for an uploaded file. The bytes themselves live in blob storage
/// under `file_path`, which is an opaque storage key and never serializes
/// out to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocument {
    pub id: String,
    pub case_id: String,
    pub file_name: String,
    #[serde(skip)]
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}
