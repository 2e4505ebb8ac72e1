mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    /// Allocates the next case number for the month of `now`, e.g.
    /// `CF-202501-042`. Atomic under concurrent callers; a number is never
    /// handed out twice.
    fn next_case_number(&self, now: DateTime<Utc>) -> Result<String>;

    // Case operations
    fn create_case(&self, case: &Case) -> Result<()>;
    fn get_case(&self, id: &str) -> Result<Option<Case>>;
    fn list_cases(&self) -> Result<Vec<Case>>;
    fn update_case(&self, case: &Case) -> Result<()>;
    fn delete_case(&self, id: &str) -> Result<bool>;

    // Activity log operations (append-only)
    fn append_activity(&self, entry: &ActivityEntry) -> Result<()>;
    fn list_case_activity(&self, case_id: &str) -> Result<Vec<ActivityEntry>>;

    // Note operations
    fn create_note(&self, note: &CaseNote) -> Result<()>;
    fn get_note(&self, id: &str) -> Result<Option<CaseNote>>;
    fn list_case_notes(&self, case_id: &str) -> Result<Vec<CaseNote>>;

    // Document metadata operations
    fn create_document(&self, doc: &CaseDocument) -> Result<()>;
    fn get_document(&self, id: &str) -> Result<Option<CaseDocument>>;
    fn list_case_documents(&self, case_id: &str) -> Result<Vec<CaseDocument>>;
    fn delete_document(&self, id: &str) -> Result<bool>;

    // Profile operations
    fn create_profile(&self, profile: &UserProfile) -> Result<()>;
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    fn get_profile_by_email(&self, email: &str) -> Result<Option<UserProfile>>;
    fn get_profile_by_token_hash(&self, token_hash: &str) -> Result<Option<UserProfile>>;
    fn list_profiles(&self) -> Result<Vec<UserProfile>>;
    fn list_active_profiles_by_roles(&self, roles: &[Role]) -> Result<Vec<UserProfile>>;
    fn update_profile(&self, profile: &UserProfile) -> Result<()>;

    // Bootstrap check
    fn has_admin_profile(&self) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
