use rusqlite::Connection;

use crate::error::Result;

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS callers (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_number    TEXT NOT NULL UNIQUE,
            created_at      TEXT NOT NULL,
            last_call       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS calls (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            sip_call_id     TEXT NOT NULL UNIQUE,
            caller_id       INTEGER NOT NULL REFERENCES callers(id),
            line_id         INTEGER NOT NULL,
            phone_number    TEXT NOT NULL,
            start_time      TEXT NOT NULL,
            end_time        TEXT,
            transcription   TEXT NOT NULL DEFAULT '',
            llm_response    TEXT NOT NULL DEFAULT '',
            status          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sip_lines (
            line_id         INTEGER PRIMARY KEY,
            username        TEXT NOT NULL,
            password        TEXT NOT NULL,
            server_ip       TEXT NOT NULL,
            server_port     INTEGER NOT NULL,
            enabled         INTEGER NOT NULL DEFAULT 1,
            status          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS system_config (
            key             TEXT PRIMARY KEY,
            value           TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_calls_caller_id ON calls(caller_id);
        ",
    )?;
    Ok(())
}
