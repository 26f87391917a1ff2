//! SQL schema for the registry's SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS members (
    member_id           TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    email               TEXT NOT NULL,   -- trimmed, lower-cased
    phone               TEXT NOT NULL,   -- digits only
    kind                TEXT NOT NULL,   -- 'student' | 'non_student'
    category            TEXT,            -- course code or area of interest
    registration_number TEXT,
    membership_type     TEXT NOT NULL DEFAULT 'pending',
    payment_reference   TEXT NOT NULL,
    payment_status      TEXT NOT NULL DEFAULT 'pending',
    member_number       TEXT,            -- PREFIX/ABBR/NNN
    registration_date   TEXT NOT NULL,   -- RFC 3339 UTC; never updated
    last_updated        TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS members_email_idx
    ON members(email);
CREATE UNIQUE INDEX IF NOT EXISTS members_number_idx
    ON members(member_number) WHERE member_number IS NOT NULL;
CREATE INDEX IF NOT EXISTS members_status_idx
    ON members(payment_status);
CREATE INDEX IF NOT EXISTS members_registered_idx
    ON members(registration_date);

-- One counter per number prefix. Only ever advanced, so an abandoned or
-- deleted member's number is never handed out again.
CREATE TABLE IF NOT EXISTS number_sequences (
    abbreviation TEXT PRIMARY KEY,
    last_value   INTEGER NOT NULL CHECK (last_value >= 0),
    updated_at   TEXT NOT NULL
);

PRAGMA user_version = 1;
";
