//! SQL schema for the Agora SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,   -- stored lowercased
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a bearer token is ever stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    issued_at  TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS forums (
    forum_id    TEXT PRIMARY KEY,
    author_id   TEXT NOT NULL REFERENCES users(user_id),
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    tags        TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    likes       INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    forum_id   TEXT NOT NULL REFERENCES forums(forum_id) ON DELETE CASCADE,
    author_id  TEXT NOT NULL REFERENCES users(user_id),
    content    TEXT NOT NULL,
    likes      INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Like memberships. The primary key is the at-most-once guarantee.
CREATE TABLE IF NOT EXISTS forum_likes (
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    forum_id   TEXT NOT NULL REFERENCES forums(forum_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, forum_id)
);

CREATE TABLE IF NOT EXISTS comment_likes (
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    comment_id TEXT NOT NULL REFERENCES comments(comment_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, comment_id)
);

CREATE INDEX IF NOT EXISTS sessions_user_idx       ON sessions(user_id);
CREATE INDEX IF NOT EXISTS forums_created_idx      ON forums(created_at);
CREATE INDEX IF NOT EXISTS comments_forum_idx      ON comments(forum_id, created_at);
CREATE INDEX IF NOT EXISTS forum_likes_forum_idx   ON forum_likes(forum_id);
CREATE INDEX IF NOT EXISTS comment_likes_item_idx  ON comment_likes(comment_id);

PRAGMA user_version = 1;
";
