use rusqlite::Connection;

/// Creates tables and indexes when missing. Safe to run on every open.
pub(super) fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS actors (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name       TEXT NOT NULL,
            email           TEXT NOT NULL UNIQUE,
            credential_hash TEXT,
            access_level    INTEGER NOT NULL DEFAULT 1 CHECK (access_level IN (1, 2, 3)),
            department      TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tracks (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL,
            status     TEXT NOT NULL DEFAULT 'archived' CHECK (status IN ('active', 'archived')),
            created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_single_active
            ON tracks (status) WHERE status = 'active';

        CREATE TABLE IF NOT EXISTS candidates (
            id                    INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name             TEXT NOT NULL,
            email                 TEXT NOT NULL UNIQUE,
            phone                 TEXT,
            degree_type           TEXT,
            current_stage         TEXT NOT NULL DEFAULT 'Phase 1 (Forms)' CHECK (current_stage IN (
                'Phase 1 (Forms)',
                'Phase 2 (Dynamics)',
                'Phase 3 (Interviews)',
                'Phase 4 (Motivational)',
                'Waiting List',
                'Approved',
                'Rejected'
            )),
            evaluation_notes      TEXT,
            intermediate_decision TEXT,
            final_decision        TEXT,
            private_admin_notes   TEXT,
            track_id              INTEGER REFERENCES tracks (id),
            locked_by             INTEGER REFERENCES actors (id) ON DELETE SET NULL,
            locked_at             TEXT,
            created_at            TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_candidates_stage ON candidates (current_stage);
        CREATE INDEX IF NOT EXISTS idx_candidates_track ON candidates (track_id);

        CREATE TABLE IF NOT EXISTS evaluations (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            candidate_id    INTEGER NOT NULL REFERENCES candidates (id),
            reviewer_id     INTEGER NOT NULL REFERENCES actors (id),
            score           INTEGER NOT NULL CHECK (score BETWEEN 1 AND 5),
            feedback        TEXT NOT NULL DEFAULT '',
            stage_evaluated TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_evaluations_candidate
            ON evaluations (candidate_id, created_at);

        CREATE TABLE IF NOT EXISTS email_templates (
            name    TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            body    TEXT NOT NULL
        );
        "#,
    )
}
