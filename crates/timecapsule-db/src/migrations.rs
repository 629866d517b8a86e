use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                name        TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                owner_id            TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipient_email     TEXT NOT NULL,
                encrypted_subject   TEXT NOT NULL,
                encrypted_body      TEXT NOT NULL,
                delivery_at         TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'SCHEDULED'
                                    CHECK (status IN ('SCHEDULED', 'DELIVERED', 'FAILED')),
                created_at          TEXT NOT NULL,
                delivered_at        TEXT,
                CHECK ((status = 'DELIVERED') = (delivered_at IS NOT NULL))
            );

            CREATE INDEX idx_messages_due
                ON messages(status, delivery_at);

            CREATE INDEX idx_messages_owner
                ON messages(owner_id, delivery_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
