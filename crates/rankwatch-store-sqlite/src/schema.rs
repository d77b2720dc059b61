//! SQL schema for the rankwatch SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,   -- lower-cased
    name        TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS places (
    place_id     TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL REFERENCES users(user_id),
    external_id  TEXT NOT NULL UNIQUE,
    name         TEXT NOT NULL,
    category     TEXT,
    address      TEXT,
    url          TEXT,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS keywords (
    keyword_id  TEXT PRIMARY KEY,
    text        TEXT NOT NULL UNIQUE,   -- normalised
    created_at  TEXT NOT NULL
);

-- region is '' when absent so that the UNIQUE key never contains NULL.
CREATE TABLE IF NOT EXISTS place_keywords (
    place_keyword_id TEXT PRIMARY KEY,
    place_id         TEXT NOT NULL REFERENCES places(place_id),
    keyword_id       TEXT NOT NULL REFERENCES keywords(keyword_id),
    region           TEXT NOT NULL DEFAULT '',
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (place_id, keyword_id, region)
);

CREATE TABLE IF NOT EXISTS competitors (
    competitor_id TEXT PRIMARY KEY,
    place_id      TEXT NOT NULL REFERENCES places(place_id),
    external_id   TEXT NOT NULL,
    name          TEXT NOT NULL,
    category      TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (place_id, external_id)
);

-- Fact tables are strictly append-only.
-- No UPDATE or DELETE is ever issued against them. Ties on the observation
-- timestamp are broken by rowid (insertion order).
CREATE TABLE IF NOT EXISTS ranking_history (
    ranking_id          TEXT PRIMARY KEY,
    place_keyword_id    TEXT NOT NULL REFERENCES place_keywords(place_keyword_id),
    rank                INTEGER,          -- NULL = not found in results
    search_result_count INTEGER,
    checked_at          TEXT NOT NULL,    -- fixed-width RFC 3339 UTC
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS review_history (
    review_history_id    TEXT PRIMARY KEY,
    place_id             TEXT NOT NULL REFERENCES places(place_id),
    blog_review_count    INTEGER NOT NULL CHECK (blog_review_count >= 0),
    visitor_review_count INTEGER NOT NULL CHECK (visitor_review_count >= 0),
    average_rating       REAL,
    checked_at           TEXT NOT NULL,
    created_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS competitor_snapshots (
    snapshot_id          TEXT PRIMARY KEY,
    competitor_id        TEXT NOT NULL REFERENCES competitors(competitor_id),
    rank                 INTEGER,
    blog_review_count    INTEGER,
    visitor_review_count INTEGER,
    average_rating       REAL,
    checked_at           TEXT NOT NULL,
    created_at           TEXT NOT NULL
);

-- NULL external ids never collide, so only scraped ids are deduplicated.
CREATE TABLE IF NOT EXISTS reviews (
    review_id          TEXT PRIMARY KEY,
    place_id           TEXT NOT NULL REFERENCES places(place_id),
    review_type        TEXT NOT NULL,   -- 'BLOG' | 'VISITOR' | 'OTHER'
    content            TEXT,
    author             TEXT,
    rating             INTEGER,
    sentiment          TEXT,            -- 'POSITIVE' | 'NEGATIVE' | 'NEUTRAL'
    sentiment_score    REAL,
    external_review_id TEXT,
    published_at       TEXT,
    collected_at       TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    UNIQUE (place_id, external_review_id)
);

CREATE TABLE IF NOT EXISTS notification_settings (
    setting_id        TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL REFERENCES users(user_id),
    place_id          TEXT REFERENCES places(place_id),   -- NULL = all places
    notification_type TEXT NOT NULL,
    channel           TEXT NOT NULL,
    is_enabled        INTEGER NOT NULL DEFAULT 1,
    conditions        TEXT NOT NULL DEFAULT '{}',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notification_logs (
    log_id        TEXT PRIMARY KEY,
    setting_id    TEXT NOT NULL REFERENCES notification_settings(setting_id),
    place_id      TEXT NOT NULL REFERENCES places(place_id),
    message       TEXT NOT NULL,
    is_sent       INTEGER NOT NULL DEFAULT 0,
    sent_at       TEXT,
    error_message TEXT,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ranking_history_parent_idx
    ON ranking_history(place_keyword_id, checked_at);
CREATE INDEX IF NOT EXISTS review_history_parent_idx
    ON review_history(place_id, checked_at);
CREATE INDEX IF NOT EXISTS competitor_snapshots_parent_idx
    ON competitor_snapshots(competitor_id, checked_at);
CREATE INDEX IF NOT EXISTS reviews_parent_idx
    ON reviews(place_id, collected_at);
CREATE INDEX IF NOT EXISTS notification_settings_user_idx
    ON notification_settings(user_id, notification_type);
CREATE INDEX IF NOT EXISTS notification_logs_pending_idx
    ON notification_logs(is_sent, created_at);

PRAGMA user_version = 1;
";
