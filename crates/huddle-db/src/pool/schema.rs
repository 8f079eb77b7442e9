//! Schema bootstrap, applied on every connect

use sqlx::sqlite::SqlitePool;

const STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS hosted_servers (
        id INTEGER PRIMARY KEY
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS hosted_server_users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id INTEGER NOT NULL REFERENCES hosted_servers(id),
        ip_address TEXT NOT NULL,
        username TEXT NOT NULL,
        user_type INTEGER NOT NULL DEFAULT 0,
        UNIQUE (server_id, ip_address)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS server_chat_channels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        hosted_server_id INTEGER NOT NULL REFERENCES hosted_servers(id)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS channel_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        message TEXT NOT NULL,
        channel_id INTEGER NOT NULL REFERENCES server_chat_channels(id),
        sender_id INTEGER NOT NULL REFERENCES hosted_server_users(id),
        sender_username TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_channel_messages_channel ON channel_messages(channel_id, id)",
];

/// Create every table and index that does not exist yet
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(statements = STATEMENTS.len(), "Database schema ready");
    Ok(())
}
