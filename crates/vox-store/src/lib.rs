//! The SQLite-backed persistence contract cited by spec §3/§6: callers,
//! calls, sip_lines, and a system_config key/value store. The engines
//! that actually transcribe/generate/synthesize are out of scope; this
//! crate only owns their side-effect trail.

mod error;
mod schema;
mod status;

pub use error::{Error, Result};
pub use status::{CallStatus, LineStatus, ServiceStatus};

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone)]
pub struct Caller {
    pub id: i64,
    pub phone_number: String,
    pub created_at: String,
    pub last_call: String,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub id: i64,
    pub sip_call_id: String,
    pub caller_id: i64,
    pub line_id: u32,
    pub phone_number: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub transcription: String,
    pub llm_response: String,
    pub status: CallStatus,
}

#[derive(Debug, Clone)]
pub struct SipLineRow {
    pub line_id: u32,
    pub username: String,
    pub password: String,
    pub server_ip: String,
    pub server_port: u16,
    pub enabled: bool,
    pub status: LineStatus,
}

/// A process-wide mutex guarding the single SQLite connection, matching
/// spec §5's "Persistence is guarded by a process-wide mutex."
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        let conn = Connection::open(path)?;
        schema::create_tables(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Store> {
        let conn = Connection::open_in_memory()?;
        schema::create_tables(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    // -- callers --------------------------------------------------------

    pub fn get_or_create_caller(&self, phone_number: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM callers WHERE phone_number = ?1",
                params![phone_number],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        let now = now_iso();
        conn.execute(
            "INSERT INTO callers (phone_number, created_at, last_call) VALUES (?1, ?2, ?2)",
            params![phone_number, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_caller_last_call(&self, caller_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE callers SET last_call = ?1 WHERE id = ?2",
            params![now_iso(), caller_id],
        )?;
        Ok(())
    }

    pub fn get_all_callers(&self) -> Result<Vec<Caller>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, phone_number, created_at, last_call FROM callers ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Caller {
                id: row.get(0)?,
                phone_number: row.get(1)?,
                created_at: row.get(2)?,
                last_call: row.get(3)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    // -- calls ------------------------------------------------------------

    /// Create a call record; the returned row id is the `call_id` that
    /// derives every per-call port and shared-memory channel name.
    pub fn create_call(
        &self,
        sip_call_id: &str,
        caller_id: i64,
        line_id: u32,
        phone_number: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO calls (sip_call_id, caller_id, line_id, phone_number, start_time, \
             transcription, llm_response, status) VALUES (?1, ?2, ?3, ?4, ?5, '', '', ?6)",
            params![
                sip_call_id,
                caller_id,
                line_id,
                phone_number,
                now_iso(),
                CallStatus::Active.as_str()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn end_call(&self, call_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE calls SET end_time = ?1, status = ?2 WHERE id = ?3",
            params![now_iso(), CallStatus::Ended.as_str(), call_id],
        )?;
        Ok(())
    }

    pub fn mark_missed(&self, call_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE calls SET end_time = ?1, status = ?2 WHERE id = ?3",
            params![now_iso(), CallStatus::Missed.as_str(), call_id],
        )?;
        Ok(())
    }

    /// Append-only growth of the transcription column, space-separated
    /// (spec §6 "Append-only columns ... grow with space-separated text").
    pub fn append_transcription(&self, call_id: i64, text: &str) -> Result<()> {
        self.append_column(call_id, "transcription", text)
    }

    pub fn append_llm_response(&self, call_id: i64, text: &str) -> Result<()> {
        self.append_column(call_id, "llm_response", text)
    }

    fn append_column(&self, call_id: i64, column: &str, text: &str) -> Result<()> {
        let conn = self.conn.lock();
        let sql = format!(
            "UPDATE calls SET {column} = TRIM({column} || ' ' || ?1) WHERE id = ?2"
        );
        conn.execute(&sql, params![text, call_id])?;
        Ok(())
    }

    pub fn get_call(&self, call_id: i64) -> Result<Call> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, sip_call_id, caller_id, line_id, phone_number, start_time, end_time, \
             transcription, llm_response, status FROM calls WHERE id = ?1",
            params![call_id],
            |row| {
                let status: String = row.get(9)?;
                Ok(Call {
                    id: row.get(0)?,
                    sip_call_id: row.get(1)?,
                    caller_id: row.get(2)?,
                    line_id: row.get(3)?,
                    phone_number: row.get(4)?,
                    start_time: row.get(5)?,
                    end_time: row.get(6)?,
                    transcription: row.get(7)?,
                    llm_response: row.get(8)?,
                    status: CallStatus::from_str(&status),
                })
            },
        )
        .map_err(Error::from)
    }

    // -- sip_lines --------------------------------------------------------

    pub fn create_sip_line(
        &self,
        line_id: u32,
        username: &str,
        password: &str,
        server_ip: &str,
        server_port: u16,
    ) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO sip_lines \
             (line_id, username, password, server_ip, server_port, enabled, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                line_id,
                username,
                password,
                server_ip,
                server_port,
                LineStatus::Disconnected.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn get_all_sip_lines(&self) -> Result<Vec<SipLineRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT line_id, username, password, server_ip, server_port, enabled, status \
             FROM sip_lines ORDER BY line_id",
        )?;
        let rows = stmt.query_map([], Self::row_to_sip_line)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    pub fn get_sip_line(&self, line_id: u32) -> Result<SipLineRow> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT line_id, username, password, server_ip, server_port, enabled, status \
             FROM sip_lines WHERE line_id = ?1",
            params![line_id],
            Self::row_to_sip_line,
        )
        .map_err(Error::from)
    }

    fn row_to_sip_line(row: &rusqlite::Row) -> rusqlite::Result<SipLineRow> {
        let status: String = row.get(6)?;
        Ok(SipLineRow {
            line_id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            server_ip: row.get(3)?,
            server_port: row.get(4)?,
            enabled: row.get(5)?,
            status: LineStatus::from_str(&status),
        })
    }

    pub fn update_sip_line_status(&self, line_id: u32, status: LineStatus) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE sip_lines SET status = ?1 WHERE line_id = ?2",
            params![status.as_str(), line_id],
        )?;
        Ok(())
    }

    pub fn toggle_sip_line(&self, line_id: u32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE sip_lines SET enabled = NOT enabled WHERE line_id = ?1",
            params![line_id],
        )?;
        Ok(())
    }

    pub fn delete_sip_line(&self, line_id: u32) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sip_lines WHERE line_id = ?1", params![line_id])?;
        Ok(())
    }

    // -- system_config ----------------------------------------------------

    pub fn get_config_string(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM system_config WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    pub fn set_config_string(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO system_config (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_config_int(&self, key: &str) -> Result<Option<i64>> {
        Ok(self
            .get_config_string(key)?
            .and_then(|v| v.parse::<i64>().ok()))
    }

    pub fn set_config_int(&self, key: &str, value: i64) -> Result<()> {
        self.set_config_string(key, &value.to_string())
    }

    pub fn get_config_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get_config_string(key)?.map(|v| v == "1" || v == "true"))
    }

    pub fn set_config_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_config_string(key, if value { "1" } else { "0" })
    }

    /// Atomically update a service's enabled flag, model path, and status
    /// in one transaction, so a crash mid-update can't leave the service
    /// half-configured (ported from `database.h`
    /// `set_piper_service_config_atomic`, generalized across services).
    pub fn set_service_config_atomic(
        &self,
        service: &str,
        enabled: bool,
        model_path: &str,
        status: ServiceStatus,
    ) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let upsert = |key: &str, value: &str, tx: &rusqlite::Transaction| -> Result<()> {
            tx.execute(
                "INSERT INTO system_config (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        };
        upsert(&format!("{service}_enabled"), if enabled { "1" } else { "0" }, &tx)?;
        upsert(&format!("{service}_model_path"), model_path, &tx)?;
        upsert(&format!("{service}_status"), status.as_str(), &tx)?;
        tx.commit()?;
        Ok(())
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_lookup_is_idempotent_by_phone_number() {
        let store = Store::open_in_memory().unwrap();
        let a = store.get_or_create_caller("+15551234567").unwrap();
        let b = store.get_or_create_caller("+15551234567").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn call_lifecycle_transitions_active_to_ended() {
        let store = Store::open_in_memory().unwrap();
        let caller = store.get_or_create_caller("+15551234567").unwrap();
        let call_id = store.create_call("A@pbx", caller, 1, "+15551234567").unwrap();

        let call = store.get_call(call_id).unwrap();
        assert_eq!(call.status, CallStatus::Active);
        assert!(call.end_time.is_none());

        store.append_transcription(call_id, "hello").unwrap();
        store.append_transcription(call_id, "world").unwrap();
        store.end_call(call_id).unwrap();

        let call = store.get_call(call_id).unwrap();
        assert_eq!(call.status, CallStatus::Ended);
        assert!(call.end_time.is_some());
        assert_eq!(call.transcription, "hello world");
    }

    #[test]
    fn service_config_atomic_write_round_trips() {
        let store = Store::open_in_memory().unwrap();
        store
            .set_service_config_atomic("tts", true, "/models/tts.bin", ServiceStatus::Running)
            .unwrap();
        assert_eq!(store.get_config_bool("tts_enabled").unwrap(), Some(true));
        assert_eq!(
            store.get_config_string("tts_model_path").unwrap().as_deref(),
            Some("/models/tts.bin")
        );
        assert_eq!(
            store.get_config_string("tts_status").unwrap().as_deref(),
            Some("running")
        );
    }

    #[test]
    fn sip_line_toggle_flips_enabled_flag() {
        let store = Store::open_in_memory().unwrap();
        store.create_sip_line(1, "1002", "secret", "10.0.0.1", 5060).unwrap();
        assert!(store.get_sip_line(1).unwrap().enabled);
        store.toggle_sip_line(1).unwrap();
        assert!(!store.get_sip_line(1).unwrap().enabled);
    }
}
