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
            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                email           TEXT NOT NULL UNIQUE,
                username        TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                is_premium      INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE stories (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                takeoff     TEXT NOT NULL,
                turbulence  TEXT NOT NULL,
                touchdown   TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_stories_author ON stories(author_id, id);

            CREATE TABLE media_links (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                story_id    INTEGER NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                media_type  TEXT NOT NULL,
                url         TEXT NOT NULL
            );

            CREATE INDEX idx_media_links_story ON media_links(story_id, position);

            CREATE TABLE premium_orders (
                order_id    TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                amount      INTEGER NOT NULL,
                currency    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE payments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                payment_id  TEXT NOT NULL UNIQUE,
                order_id    TEXT NOT NULL UNIQUE,
                amount      INTEGER NOT NULL,
                currency    TEXT NOT NULL,
                status      TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_payments_user ON payments(user_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
