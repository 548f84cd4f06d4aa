//! SQL schema for the Nutri SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS groups (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS clients (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    group_id    INTEGER REFERENCES groups(id),
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS diet_templates (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    deleted_at  TEXT
);

-- The ledger. Rows are appended; the only UPDATEs ever issued touch
-- content, weight/feedback, or deleted_at of the latest row of a sequence.
CREATE TABLE IF NOT EXISTS diet_assignments (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id    INTEGER REFERENCES clients(id),
    group_id     INTEGER REFERENCES groups(id),
    diet_type    INTEGER NOT NULL,          -- 1 regular | 2 detox diet | 3 detox water
    week_number  INTEGER NOT NULL,          -- 0 marks a placeholder row
    assigned_on  TEXT NOT NULL,             -- YYYY-MM-DD, UTC calendar day
    content      TEXT NOT NULL,
    template_id  INTEGER REFERENCES diet_templates(id),
    weight       REAL,
    feedback     TEXT,
    created_at   TEXT NOT NULL,             -- RFC 3339, fixed-width nanoseconds
    deleted_at   TEXT,
    CHECK ((client_id IS NULL) != (group_id IS NULL)),
    CHECK (diet_type IN (1, 2, 3)),
    CHECK (week_number >= 0)
);

-- One live row per week number and sequence. A writer that lost the race
-- for a week number fails here and retries with a fresh one.
CREATE UNIQUE INDEX IF NOT EXISTS diet_assignments_client_week_uniq
    ON diet_assignments(client_id, diet_type, week_number)
    WHERE client_id IS NOT NULL AND deleted_at IS NULL AND week_number > 0;

CREATE UNIQUE INDEX IF NOT EXISTS diet_assignments_group_week_uniq
    ON diet_assignments(group_id, diet_type, week_number)
    WHERE group_id IS NOT NULL AND deleted_at IS NULL AND week_number > 0;

CREATE INDEX IF NOT EXISTS diet_assignments_client_idx
    ON diet_assignments(client_id, diet_type, assigned_on);
CREATE INDEX IF NOT EXISTS diet_assignments_group_idx
    ON diet_assignments(group_id, diet_type, assigned_on);

PRAGMA user_version = 1;
";
