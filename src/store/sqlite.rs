use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.map(|s| parse_datetime(&s))
}

fn parse_status(s: &str) -> CaseStatus {
    CaseStatus::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid case status in database: '{}'", s);
        CaseStatus::Open
    })
}

fn parse_priority(s: &str) -> CasePriority {
    CasePriority::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid case priority in database: '{}'", s);
        CasePriority::Medium
    })
}

fn parse_kind(s: &str) -> ActivityKind {
    ActivityKind::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid activity kind in database: '{}'", s);
        ActivityKind::Updated
    })
}

fn parse_role(s: &str) -> Role {
    Role::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid role in database: '{}'", s);
        Role::Readonly
    })
}

fn parse_json_column(s: Option<String>) -> Option<serde_json::Value> {
    let s = s?;
    match serde_json::from_str(&s) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Invalid JSON snapshot in database: {}", e);
            None
        }
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn next_case_number(&self, now: DateTime<Utc>) -> Result<String> {
        let month = now.format("%Y%m").to_string();
        // Single statement so concurrent callers never see the same counter.
        let counter: i64 = self.conn().query_row(
            "INSERT INTO case_counters (month, counter) VALUES (?1, 1)
             ON CONFLICT (month) DO UPDATE SET counter = counter + 1
             RETURNING counter",
            params![month],
            |row| row.get(0),
        )?;
        Ok(format!("CF-{month}-{counter:03}"))
    }

    // Case operations

    fn create_case(&self, case: &Case) -> Result<()> {
        self.conn().execute(
            "INSERT INTO cases (id, case_number, title, description, case_type, status, priority,
                                created_by, assigned_to, subject_name, date_of_birth, contact_info,
                                last_known_location, created_at, updated_at, closed_at, archived_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                case.id,
                case.case_number,
                case.title,
                case.description,
                case.case_type,
                case.status.as_str(),
                case.priority.as_str(),
                case.created_by,
                case.assigned_to,
                case.subject_name,
                case.date_of_birth,
                case.contact_info,
                case.last_known_location,
                format_datetime(&case.created_at),
                format_datetime(&case.updated_at),
                case.closed_at.as_ref().map(format_datetime),
                case.archived_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_case(&self, id: &str) -> Result<Option<Case>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, case_number, title, description, case_type, status, priority,
                    created_by, assigned_to, subject_name, date_of_birth, contact_info,
                    last_known_location, created_at, updated_at, closed_at, archived_at
             FROM cases WHERE id = ?1",
            params![id],
            |row| {
                Ok(Case {
                    id: row.get(0)?,
                    case_number: row.get(1)?,
                    title: row.get(2)?,
                    description: row.get(3)?,
                    case_type: row.get(4)?,
                    status: parse_status(&row.get::<_, String>(5)?),
                    priority: parse_priority(&row.get::<_, String>(6)?),
                    created_by: row.get(7)?,
                    assigned_to: row.get(8)?,
                    subject_name: row.get(9)?,
                    date_of_birth: row.get(10)?,
                    contact_info: row.get(11)?,
                    last_known_location: row.get(12)?,
                    created_at: parse_datetime(&row.get::<_, String>(13)?),
                    updated_at: parse_datetime(&row.get::<_, String>(14)?),
                    closed_at: parse_optional_datetime(row.get(15)?),
                    archived_at: parse_optional_datetime(row.get(16)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_cases(&self) -> Result<Vec<Case>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, case_number, title, description, case_type, status, priority,
                    created_by, assigned_to, subject_name, date_of_birth, contact_info,
                    last_known_location, created_at, updated_at, closed_at, archived_at
             FROM cases ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Case {
                id: row.get(0)?,
                case_number: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                case_type: row.get(4)?,
                status: parse_status(&row.get::<_, String>(5)?),
                priority: parse_priority(&row.get::<_, String>(6)?),
                created_by: row.get(7)?,
                assigned_to: row.get(8)?,
                subject_name: row.get(9)?,
                date_of_birth: row.get(10)?,
                contact_info: row.get(11)?,
                last_known_location: row.get(12)?,
                created_at: parse_datetime(&row.get::<_, String>(13)?),
                updated_at: parse_datetime(&row.get::<_, String>(14)?),
                closed_at: parse_optional_datetime(row.get(15)?),
                archived_at: parse_optional_datetime(row.get(16)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_case(&self, case: &Case) -> Result<()> {
        // case_number and created_by are immutable and deliberately absent.
        let rows = self.conn().execute(
            "UPDATE cases SET title = ?1, description = ?2, case_type = ?3, status = ?4,
                    priority = ?5, assigned_to = ?6, subject_name = ?7, date_of_birth = ?8,
                    contact_info = ?9, last_known_location = ?10, updated_at = ?11,
                    closed_at = ?12, archived_at = ?13
             WHERE id = ?14",
            params![
                case.title,
                case.description,
                case.case_type,
                case.status.as_str(),
                case.priority.as_str(),
                case.assigned_to,
                case.subject_name,
                case.date_of_birth,
                case.contact_info,
                case.last_known_location,
                format_datetime(&case.updated_at),
                case.closed_at.as_ref().map(format_datetime),
                case.archived_at.as_ref().map(format_datetime),
                case.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound("case"));
        }
        Ok(())
    }

    fn delete_case(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM cases WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Activity log operations

    fn append_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO case_activity (id, case_id, user_id, kind, description, old_values, new_values, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.case_id,
                entry.user_id,
                entry.kind.as_str(),
                entry.description,
                entry.old_values.as_ref().map(|v| v.to_string()),
                entry.new_values.as_ref().map(|v| v.to_string()),
                format_datetime(&entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_case_activity(&self, case_id: &str) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, case_id, user_id, kind, description, old_values, new_values, created_at
             FROM case_activity WHERE case_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![case_id], |row| {
            Ok(ActivityEntry {
                id: row.get(0)?,
                case_id: row.get(1)?,
                user_id: row.get(2)?,
                kind: parse_kind(&row.get::<_, String>(3)?),
                description: row.get(4)?,
                old_values: parse_json_column(row.get(5)?),
                new_values: parse_json_column(row.get(6)?),
                created_at: parse_datetime(&row.get::<_, String>(7)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Note operations

    fn create_note(&self, note: &CaseNote) -> Result<()> {
        self.conn().execute(
            "INSERT INTO case_notes (id, case_id, user_id, note, is_private, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                note.id,
                note.case_id,
                note.user_id,
                note.note,
                note.is_private,
                format_datetime(&note.created_at),
                format_datetime(&note.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_note(&self, id: &str) -> Result<Option<CaseNote>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, case_id, user_id, note, is_private, created_at, updated_at
             FROM case_notes WHERE id = ?1",
            params![id],
            |row| {
                Ok(CaseNote {
                    id: row.get(0)?,
                    case_id: row.get(1)?,
                    user_id: row.get(2)?,
                    note: row.get(3)?,
                    is_private: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    updated_at: parse_datetime(&row.get::<_, String>(6)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_case_notes(&self, case_id: &str) -> Result<Vec<CaseNote>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, case_id, user_id, note, is_private, created_at, updated_at
             FROM case_notes WHERE case_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![case_id], |row| {
            Ok(CaseNote {
                id: row.get(0)?,
                case_id: row.get(1)?,
                user_id: row.get(2)?,
                note: row.get(3)?,
                is_private: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Document metadata operations

    fn create_document(&self, doc: &CaseDocument) -> Result<()> {
        self.conn().execute(
            "INSERT INTO case_documents (id, case_id, file_name, file_path, file_size, mime_type, uploaded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                doc.id,
                doc.case_id,
                doc.file_name,
                doc.file_path,
                doc.file_size,
                doc.mime_type,
                doc.uploaded_by,
                format_datetime(&doc.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_document(&self, id: &str) -> Result<Option<CaseDocument>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, case_id, file_name, file_path, file_size, mime_type, uploaded_by, created_at
             FROM case_documents WHERE id = ?1",
            params![id],
            |row| {
                Ok(CaseDocument {
                    id: row.get(0)?,
                    case_id: row.get(1)?,
                    file_name: row.get(2)?,
                    file_path: row.get(3)?,
                    file_size: row.get(4)?,
                    mime_type: row.get(5)?,
                    uploaded_by: row.get(6)?,
                    created_at: parse_datetime(&row.get::<_, String>(7)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_case_documents(&self, case_id: &str) -> Result<Vec<CaseDocument>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, case_id, file_name, file_path, file_size, mime_type, uploaded_by, created_at
             FROM case_documents WHERE case_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![case_id], |row| {
            Ok(CaseDocument {
                id: row.get(0)?,
                case_id: row.get(1)?,
                file_name: row.get(2)?,
                file_path: row.get(3)?,
                file_size: row.get(4)?,
                mime_type: row.get(5)?,
                uploaded_by: row.get(6)?,
                created_at: parse_datetime(&row.get::<_, String>(7)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_document(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM case_documents WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Profile operations

    fn create_profile(&self, profile: &UserProfile) -> Result<()> {
        self.conn().execute(
            "INSERT INTO profiles (user_id, email, full_name, role, is_active, token_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                profile.user_id,
                profile.email,
                profile.full_name,
                profile.role.as_str(),
                profile.is_active,
                profile.token_hash,
                format_datetime(&profile.created_at),
                format_datetime(&profile.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, email, full_name, role, is_active, token_hash, created_at, updated_at
             FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(UserProfile {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    full_name: row.get(2)?,
                    role: parse_role(&row.get::<_, String>(3)?),
                    is_active: row.get(4)?,
                    token_hash: row.get(5)?,
                    created_at: parse_datetime(&row.get::<_, String>(6)?),
                    updated_at: parse_datetime(&row.get::<_, String>(7)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_profile_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, email, full_name, role, is_active, token_hash, created_at, updated_at
             FROM profiles WHERE email = ?1",
            params![email],
            |row| {
                Ok(UserProfile {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    full_name: row.get(2)?,
                    role: parse_role(&row.get::<_, String>(3)?),
                    is_active: row.get(4)?,
                    token_hash: row.get(5)?,
                    created_at: parse_datetime(&row.get::<_, String>(6)?),
                    updated_at: parse_datetime(&row.get::<_, String>(7)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_profile_by_token_hash(&self, token_hash: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, email, full_name, role, is_active, token_hash, created_at, updated_at
             FROM profiles WHERE token_hash = ?1",
            params![token_hash],
            |row| {
                Ok(UserProfile {
                    user_id: row.get(0)?,
                    email: row.get(1)?,
                    full_name: row.get(2)?,
                    role: parse_role(&row.get::<_, String>(3)?),
                    is_active: row.get(4)?,
                    token_hash: row.get(5)?,
                    created_at: parse_datetime(&row.get::<_, String>(6)?),
                    updated_at: parse_datetime(&row.get::<_, String>(7)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, email, full_name, role, is_active, token_hash, created_at, updated_at
             FROM profiles ORDER BY email",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(UserProfile {
                user_id: row.get(0)?,
                email: row.get(1)?,
                full_name: row.get(2)?,
                role: parse_role(&row.get::<_, String>(3)?),
                is_active: row.get(4)?,
                token_hash: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
                updated_at: parse_datetime(&row.get::<_, String>(7)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_active_profiles_by_roles(&self, roles: &[Role]) -> Result<Vec<UserProfile>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=roles.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT user_id, email, full_name, role, is_active, token_hash, created_at, updated_at
             FROM profiles WHERE is_active = 1 AND role IN ({placeholders}) ORDER BY email"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(roles.iter().map(|r| r.as_str())), |row| {
            Ok(UserProfile {
                user_id: row.get(0)?,
                email: row.get(1)?,
                full_name: row.get(2)?,
                role: parse_role(&row.get::<_, String>(3)?),
                is_active: row.get(4)?,
                token_hash: row.get(5)?,
                created_at: parse_datetime(&row.get::<_, String>(6)?),
                updated_at: parse_datetime(&row.get::<_, String>(7)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE profiles SET email = ?1, full_name = ?2, role = ?3, is_active = ?4,
                    token_hash = ?5, updated_at = ?6
             WHERE user_id = ?7",
            params![
                profile.email,
                profile.full_name,
                profile.role.as_str(),
                profile.is_active,
                profile.token_hash,
                format_datetime(&profile.updated_at),
                profile.user_id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound("profile"));
        }
        Ok(())
    }

    fn has_admin_profile(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM profiles WHERE role = 'admin' AND is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
