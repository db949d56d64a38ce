//! SQL schema for the Quill SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,   -- normalised: trimmed, lowercased
    name        TEXT NOT NULL,
    role        TEXT NOT NULL DEFAULT 'user',   -- 'admin' | 'user'
    created_at  TEXT NOT NULL           -- ISO 8601 UTC; server-assigned
);

-- The slug UNIQUE constraint is the only slug-collision check: there is no
-- read-then-write pre-check, so concurrent writers cannot both win.
CREATE TABLE IF NOT EXISTS posts (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    content     TEXT NOT NULL,
    excerpt     TEXT NOT NULL,
    category    TEXT,
    image_url   TEXT,
    published   INTEGER NOT NULL DEFAULT 0,
    featured    INTEGER NOT NULL DEFAULT 0,
    upvotes     INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
    author_id   TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- post_id carries no foreign key on purpose: deleting a post must neither
-- block on nor delete its comments. Moderation views surface the missing
-- post as a null linkage. parent_id does cascade — removing a top-level
-- comment removes its direct replies.
CREATE TABLE IF NOT EXISTS comments (
    id          TEXT PRIMARY KEY,
    post_id     TEXT NOT NULL,
    user_id     TEXT NOT NULL REFERENCES profiles(id),
    parent_id   TEXT REFERENCES comments(id) ON DELETE CASCADE,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- One outstanding sign-in code per email; issuing replaces, verifying
-- deletes.
CREATE TABLE IF NOT EXISTS auth_email_otps (
    email       TEXT PRIMARY KEY,
    code        TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS comments_post_idx    ON comments(post_id);
CREATE INDEX IF NOT EXISTS comments_parent_idx  ON comments(parent_id);
CREATE INDEX IF NOT EXISTS posts_published_idx  ON posts(published, created_at);

PRAGMA user_version = 1;
";
