//! SQL schema for the ParkQuest SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! There are no point or completion-count columns anywhere: scores are
//! derived from `posts` joined to `challenges` on every read.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    username     TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    role         TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    created_at   TEXT NOT NULL
);

-- Assignment and completion columns move together; the CHECKs below abort
-- any statement that would leave them disagreeing with `status`.
CREATE TABLE IF NOT EXISTS challenges (
    challenge_id   TEXT PRIMARY KEY,
    title          TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description    TEXT NOT NULL,
    image_url      TEXT,
    points         INTEGER NOT NULL CHECK (points > 0),
    challenge_type TEXT NOT NULL CHECK (challenge_type IN ('exclusive', 'open')),
    status         TEXT NOT NULL DEFAULT 'available'
                   CHECK (status IN ('available', 'in_progress', 'completed')),
    starts_at      TEXT,            -- NULL = unbounded
    ends_at        TEXT,            -- NULL = unbounded
    assigned_to    TEXT REFERENCES users(user_id),
    completed_by   TEXT REFERENCES users(user_id),
    completed_post TEXT,            -- posts(post_id); cleared before the post goes
    completed_at   TEXT,
    created_at     TEXT NOT NULL,
    CHECK ((assigned_to IS NOT NULL) = (status = 'in_progress')),
    CHECK ((completed_by IS NOT NULL) = (status = 'completed')),
    CHECK ((completed_post IS NOT NULL) = (status = 'completed')),
    CHECK ((completed_at IS NOT NULL) = (status = 'completed')),
    CHECK (challenge_type = 'exclusive' OR status != 'in_progress')
);

CREATE TABLE IF NOT EXISTS posts (
    post_id      TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    challenge_id TEXT NOT NULL REFERENCES challenges(challenge_id),
    media_url    TEXT NOT NULL,
    media_kind   TEXT NOT NULL CHECK (media_kind IN ('photo', 'video')),
    caption      TEXT,
    created_at   TEXT NOT NULL,
    revoked      INTEGER NOT NULL DEFAULT 0 CHECK (revoked IN (0, 1))
);

-- Open-challenge entries. `post_id` stays NULL until proof is submitted.
CREATE TABLE IF NOT EXISTS submissions (
    submission_id TEXT PRIMARY KEY,
    challenge_id  TEXT NOT NULL REFERENCES challenges(challenge_id),
    user_id       TEXT NOT NULL REFERENCES users(user_id),
    post_id       TEXT REFERENCES posts(post_id),
    created_at    TEXT NOT NULL,
    UNIQUE (challenge_id, user_id)
);

CREATE TABLE IF NOT EXISTS likes (
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    post_id    TEXT NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, post_id)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    post_id    TEXT NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    content    TEXT NOT NULL CHECK (length(trim(content)) > 0),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS posts_created_idx     ON posts(created_at);
CREATE INDEX IF NOT EXISTS posts_challenge_idx   ON posts(challenge_id);
CREATE INDEX IF NOT EXISTS submissions_post_idx  ON submissions(post_id);
CREATE INDEX IF NOT EXISTS likes_post_idx        ON likes(post_id);
CREATE INDEX IF NOT EXISTS comments_post_idx     ON comments(post_id);

PRAGMA user_version = 1;
";
