//! SQLite-backed implementation of `EventStore`.
//!
//! Schema and trigger setup follow the rusqlite hash-chain pattern used
//! elsewhere in the retrieval pack (a `ledger_events` table keyed by
//! `sequence_number`, with `BEFORE UPDATE`/`BEFORE DELETE` triggers that
//! `RAISE(ABORT, ...)` so the append-only invariant holds
//! even against a buggy or malicious caller with direct SQL access, not
//! just against this crate's own API). `verify_chain` generalizes that
//! pattern's `verify_chain(conn)` free function from a single flat event
//! table to this spec's `(payload, previous_event_hash) -> event_hash`
//! composition plus signature fields.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_contracts::event::{Event, EventType};
use ledger_core::traits::{ChainVerification, EventStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ledger_events (
    sequence_number     INTEGER PRIMARY KEY,
    event_id            TEXT UNIQUE NOT NULL,
    event_type          TEXT NOT NULL,
    claim_id            TEXT,
    payload             TEXT NOT NULL,
    previous_event_hash TEXT,
    event_hash          TEXT NOT NULL,
    created_by          TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    editor_signature    TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS ledger_events_no_update
BEFORE UPDATE ON ledger_events
BEGIN
    SELECT RAISE(ABORT, 'ledger_events is append-only: UPDATE is forbidden');
END;

CREATE TRIGGER IF NOT EXISTS ledger_events_no_delete
BEFORE DELETE ON ledger_events
BEGIN
    SELECT RAISE(ABORT, 'ledger_events is append-only: DELETE is forbidden');
END;
";

/// A durable `EventStore` backed by a single SQLite connection.
///
/// Follows a single logical appender model: one `Mutex<Connection>`
/// serializes every write, so there is no `SELECT... FOR UPDATE` to manage
/// and no multi-writer contention to reason about.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    pub fn open(path: &str) -> LedgerResult<Self> {
        let conn = Connection::open(path).map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("failed to open sqlite database at '{path}': {e}"),
        })?;
        conn.execute_batch(SCHEMA).map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("failed to initialize schema: {e}"),
        })?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory SQLite database. Used by tests that want real SQL
    /// semantics (triggers, constraints) without touching disk.
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("failed to open in-memory sqlite database: {e}"),
        })?;
        conn.execute_batch(SCHEMA).map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("failed to initialize schema: {e}"),
        })?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("sqlite connection lock poisoned: {e}"),
        })
    }
}

fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    let event_type_str: String = row.get("event_type")?;
    let event_type = parse_event_type(&event_type_str).map_err(|reason| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, reason)),
        )
    })?;

    let claim_id: Option<String> = row.get("claim_id")?;
    let payload: String = row.get("payload")?;
    let created_at: String = row.get("created_at")?;

    Ok(Event {
        event_id: parse_uuid(row.get::<_, String>("event_id")?)?,
        sequence_number: row.get::<_, i64>("sequence_number")? as u64,
        event_type,
        claim_id: claim_id.map(parse_uuid).transpose()?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        previous_event_hash: row.get("previous_event_hash")?,
        event_hash: row.get("event_hash")?,
        created_by: parse_uuid(row.get::<_, String>("created_by")?)?,
        created_at: parse_timestamp(&created_at)?,
        editor_signature: row.get("editor_signature")?,
    })
}

fn parse_uuid(s: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_event_type(s: &str) -> Result<EventType, String> {
    match s {
        "CLAIM_DECLARED" => Ok(EventType::ClaimDeclared),
        "CLAIM_OPERATIONALIZED" => Ok(EventType::ClaimOperationalized),
        "EVIDENCE_ADDED" => Ok(EventType::EvidenceAdded),
        "CLAIM_RESOLVED" => Ok(EventType::ClaimResolved),
        "EDITOR_REGISTERED" => Ok(EventType::EditorRegistered),
        "EDITOR_DEACTIVATED" => Ok(EventType::EditorDeactivated),
        other => Err(format!("unknown event_type '{other}'")),
    }
}

fn event_type_str(event_type: EventType) -> &'static str {
    match event_type {
        EventType::ClaimDeclared => "CLAIM_DECLARED",
        EventType::ClaimOperationalized => "CLAIM_OPERATIONALIZED",
        EventType::EvidenceAdded => "EVIDENCE_ADDED",
        EventType::ClaimResolved => "CLAIM_RESOLVED",
        EventType::EditorRegistered => "EDITOR_REGISTERED",
        EventType::EditorDeactivated => "EDITOR_DEACTIVATED",
    }
}

impl EventStore for SqliteEventStore {
    fn append(&self, event: Event) -> LedgerResult<Event> {
        let conn = self.lock()?;

        let expected_prev: Option<String> = conn
            .query_row(
                "SELECT event_hash FROM ledger_events ORDER BY sequence_number DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok();

        if event.previous_event_hash != expected_prev {
            return Err(LedgerError::HashChainBroken {
                expected: expected_prev.unwrap_or_default(),
                actual: event.previous_event_hash.clone().unwrap_or_default(),
            });
        }

        let payload_json = serde_json::to_string(&event.payload).map_err(|e| {
            LedgerError::CanonicalizationError { reason: format!("failed to serialize payload: {e}") }
        })?;

        let result = conn.execute(
            "INSERT INTO ledger_events (
                sequence_number, event_id, event_type, claim_id, payload,
                previous_event_hash, event_hash, created_by, created_at, editor_signature
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.sequence_number as i64,
                event.event_id.to_string(),
                event_type_str(event.event_type),
                event.claim_id.map(|c| c.to_string()),
                payload_json,
                event.previous_event_hash,
                event.event_hash,
                event.created_by.to_string(),
                event.created_at.to_rfc3339(),
                event.editor_signature,
            ],
        );

        match result {
            Ok(_) => Ok(event),
            Err(rusqlite::Error::SqliteFailure(_, Some(msg)))
                if msg.contains("UNIQUE constraint failed: ledger_events.event_id") =>
            {
                Err(LedgerError::DuplicateEventId { event_id: event.event_id.to_string() })
            }
            Err(e) => Err(LedgerError::StorageUnavailable { reason: format!("insert failed: {e}") }),
        }
    }

    fn get(&self, event_id: Uuid) -> LedgerResult<Option<Event>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM ledger_events WHERE event_id = ?1",
            params![event_id.to_string()],
            row_to_event,
        )
        .map(Some)
        .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(e) })
        .map_err(|e| LedgerError::StorageUnavailable { reason: format!("query failed: {e}") })
    }

    fn get_by_sequence(&self, sequence_number: u64) -> LedgerResult<Option<Event>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM ledger_events WHERE sequence_number = ?1",
            params![sequence_number as i64],
            row_to_event,
        )
        .map(Some)
        .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(e) })
        .map_err(|e| LedgerError::StorageUnavailable { reason: format!("query failed: {e}") })
    }

    fn range(&self, from: u64, to: u64) -> LedgerResult<Vec<Event>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM ledger_events WHERE sequence_number >= ?1 AND sequence_number < ?2 \
                 ORDER BY sequence_number ASC",
            )
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;
        let rows = stmt
            .query_map(params![from as i64, to as i64], row_to_event)
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })
    }

    fn tail(&self) -> LedgerResult<Option<Event>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT * FROM ledger_events ORDER BY sequence_number DESC LIMIT 1",
            [],
            row_to_event,
        )
        .map(Some)
        .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(e) })
        .map_err(|e| LedgerError::StorageUnavailable { reason: format!("query failed: {e}") })
    }

    fn count(&self) -> LedgerResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ledger_events", [], |row| row.get(0))
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;
        Ok(count as u64)
    }

    fn events_for_claim(&self, claim_id: Uuid) -> LedgerResult<Vec<Event>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT * FROM ledger_events WHERE claim_id = ?1 ORDER BY sequence_number ASC")
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;
        let rows = stmt
            .query_map(params![claim_id.to_string()], row_to_event)
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })
    }

    fn verify_chain(&self) -> LedgerResult<ChainVerification> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT * FROM ledger_events ORDER BY sequence_number ASC")
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;
        let rows = stmt
            .query_map([], row_to_event)
            .map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;

        let mut expected_prev: Option<String> = None;
        let mut checked = 0u64;

        for row in rows {
            let event = row.map_err(|e| LedgerError::StorageUnavailable { reason: e.to_string() })?;

            if event.previous_event_hash != expected_prev {
                return Ok(ChainVerification::Broken {
                    sequence: event.sequence_number,
                    reason: format!(
                        "previous_event_hash mismatch: expected {:?}, stored {:?}",
                        expected_prev, event.previous_event_hash
                    ),
                });
            }

            let canonical = ledger_crypto::canonicalize(&event.payload)?;
            let recomputed = ledger_crypto::event_hash(&canonical, expected_prev.as_deref());
            if !ledger_crypto::hashes_equal(&recomputed, &event.event_hash) {
                return Ok(ChainVerification::Broken {
                    sequence: event.sequence_number,
                    reason: format!(
                        "event_hash mismatch: recomputed {recomputed}, stored {}",
                        event.event_hash
                    ),
                });
            }

            expected_prev = Some(event.event_hash.clone());
            checked += 1;
        }

        Ok(ChainVerification::Intact { checked })
    }
}
