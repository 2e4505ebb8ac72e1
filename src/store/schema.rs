pub const SCHEMA: &str = r#"
-- Cases are the central investigation records
CREATE TABLE IF NOT EXISTS cases (
    id TEXT PRIMARY KEY,
    case_number TEXT NOT NULL UNIQUE,  -- assigned once at creation, never recomputed
    title TEXT NOT NULL,
    description TEXT,
    case_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'open',
    priority TEXT NOT NULL DEFAULT 'medium',

    -- Personnel (profiles are referenced, never owned)
    created_by TEXT NOT NULL REFERENCES profiles(user_id),
    assigned_to TEXT REFERENCES profiles(user_id),

    -- Subject of the investigation (free text, all optional)
    subject_name TEXT,
    date_of_birth TEXT,
    contact_info TEXT,
    last_known_location TEXT,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    closed_at TEXT,      -- set while status = 'closed', cleared on reopen
    archived_at TEXT     -- set while status = 'archived', cleared on reopen
);

-- Append-only audit trail; rows are never updated or deleted individually
CREATE TABLE IF NOT EXISTS case_activity (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    user_id TEXT,        -- NULL = system entry
    kind TEXT NOT NULL,
    description TEXT NOT NULL,
    old_values TEXT,     -- JSON snapshot of only the changed fields
    new_values TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- User-authored annotations
CREATE TABLE IF NOT EXISTS case_notes (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    note TEXT NOT NULL,
    is_private INTEGER NOT NULL DEFAULT 0,  -- visible only to author and admins
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Metadata for uploaded files; bytes live in blob storage under file_path
CREATE TABLE IF NOT EXISTS case_documents (
    id TEXT PRIMARY KEY,
    case_id TEXT NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    file_path TEXT NOT NULL,  -- opaque storage key
    file_size INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    uploaded_by TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Profiles are identities; the token hash is the only credential
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT,
    role TEXT NOT NULL DEFAULT 'readonly',
    is_active INTEGER NOT NULL DEFAULT 1,
    token_hash TEXT NOT NULL,  -- sha256 of the API token
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Per-month counters back case number generation
CREATE TABLE IF NOT EXISTS case_counters (
    month TEXT PRIMARY KEY,  -- YYYYMM
    counter INTEGER NOT NULL
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status);
CREATE INDEX IF NOT EXISTS idx_cases_created_by ON cases(created_by);
CREATE INDEX IF NOT EXISTS idx_cases_assigned ON cases(assigned_to);
CREATE INDEX IF NOT EXISTS idx_activity_case ON case_activity(case_id);
CREATE INDEX IF NOT EXISTS idx_notes_case ON case_notes(case_id);
CREATE INDEX IF NOT EXISTS idx_documents_case ON case_documents(case_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_token ON profiles(token_hash);
"#;
