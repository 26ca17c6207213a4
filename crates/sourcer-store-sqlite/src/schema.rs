//! SQL schema for the sourcer SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS searches (
    search_id       TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    query_text      TEXT NOT NULL,
    criteria_json   TEXT NOT NULL,
    status          TEXT NOT NULL,   -- see SearchStatus::as_str
    progress        INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS strategies (
    strategy_id TEXT PRIMARY KEY,
    search_id   TEXT NOT NULL REFERENCES searches(search_id),
    params_json TEXT NOT NULL,
    status      TEXT NOT NULL,      -- 'pending' | 'running' | 'completed' | 'failed'
    run_count   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- One row per person; shared across searches.
CREATE TABLE IF NOT EXISTS candidates (
    candidate_id    TEXT PRIMARY KEY,
    profile_url     TEXT NOT NULL UNIQUE,  -- canonical form
    full_name       TEXT,
    headline        TEXT,
    location        TEXT,
    experience_json TEXT NOT NULL DEFAULT 'null',
    education_json  TEXT NOT NULL DEFAULT 'null',
    skills_json     TEXT NOT NULL DEFAULT 'null',
    emails_json     TEXT NOT NULL DEFAULT '[]',
    phones_json     TEXT NOT NULL DEFAULT '[]',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS search_candidates (
    search_candidate_id TEXT PRIMARY KEY,
    search_id           TEXT NOT NULL REFERENCES searches(search_id),
    candidate_id        TEXT NOT NULL REFERENCES candidates(candidate_id),
    match_score         REAL,          -- NULL until scored
    score_notes_json    TEXT,
    status              TEXT NOT NULL DEFAULT 'new',
    notes               TEXT,
    source              TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (search_id, candidate_id)
);

CREATE TABLE IF NOT EXISTS strategy_attributions (
    search_candidate_id TEXT NOT NULL REFERENCES search_candidates(search_candidate_id),
    strategy_id         TEXT NOT NULL REFERENCES strategies(strategy_id),
    created_at          TEXT NOT NULL,
    PRIMARY KEY (search_candidate_id, strategy_id)
);

CREATE INDEX IF NOT EXISTS strategies_search_idx        ON strategies(search_id);
CREATE INDEX IF NOT EXISTS search_candidates_search_idx ON search_candidates(search_id, created_at);
CREATE INDEX IF NOT EXISTS search_candidates_score_idx  ON search_candidates(search_id, match_score);
CREATE INDEX IF NOT EXISTS attributions_strategy_idx    ON strategy_attributions(strategy_id);

PRAGMA user_version = 1;
";
