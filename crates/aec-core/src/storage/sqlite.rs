//! SQLite-backed record store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations, Config, RecordStore};
use crate::audit::{AuditAction, AuditEntry, EntityType};
use crate::error::{StoreError, StoreResult};
use crate::schedule::RecurringSlot;
use crate::session::{SessionRecord, SessionStatus};
use crate::substitution::{SubstitutionRequest, SubstitutionStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

// === Helper Functions ===

fn corrupt(table: &'static str, id: &str, message: impl Into<String>) -> StoreError {
    StoreError::CorruptRow {
        table,
        id: id.to_string(),
        message: message.into(),
    }
}

fn parse_date(table: &'static str, id: &str, value: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| corrupt(table, id, format!("bad date '{value}': {e}")))
}

fn parse_time(table: &'static str, id: &str, value: &str) -> StoreResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| corrupt(table, id, format!("bad time '{value}': {e}")))
}

fn parse_timestamp(table: &'static str, id: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, id, format!("bad timestamp '{value}': {e}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

// === Raw rows ===
//
// rusqlite row closures can only fail with rusqlite errors, so rows are read
// as plain strings first and decoded into domain types afterwards.

struct SlotRow {
    id: String,
    school_id: String,
    class_id: String,
    technician_id: String,
    activity: String,
    weekday: u8,
    start_time: String,
    end_time: String,
    valid_from: String,
    valid_to: String,
    active: bool,
}

const SLOT_COLUMNS: &str = "id, school_id, class_id, technician_id, activity, weekday,
     start_time, end_time, valid_from, valid_to, active";

impl SlotRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            school_id: row.get(1)?,
            class_id: row.get(2)?,
            technician_id: row.get(3)?,
            activity: row.get(4)?,
            weekday: row.get(5)?,
            start_time: row.get(6)?,
            end_time: row.get(7)?,
            valid_from: row.get(8)?,
            valid_to: row.get(9)?,
            active: row.get(10)?,
        })
    }

    fn decode(self) -> StoreResult<RecurringSlot> {
        const T: &str = "recurring_slots";
        Ok(RecurringSlot {
            start_time: parse_time(T, &self.id, &self.start_time)?,
            end_time: parse_time(T, &self.id, &self.end_time)?,
            valid_from: parse_date(T, &self.id, &self.valid_from)?,
            valid_to: parse_date(T, &self.id, &self.valid_to)?,
            id: self.id,
            school_id: self.school_id,
            class_id: self.class_id,
            technician_id: self.technician_id,
            activity: self.activity,
            weekday: self.weekday,
            active: self.active,
        })
    }
}

struct SessionRow {
    id: String,
    slot_id: String,
    date: String,
    status: String,
    assigned_technician_id: String,
    attendee_count: Option<u32>,
    summary: Option<String>,
    incidents: Option<String>,
    signed_off: bool,
}

const SESSION_COLUMNS: &str = "id, slot_id, date, status, assigned_technician_id,
     attendee_count, summary, incidents, signed_off";

impl SessionRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            slot_id: row.get(1)?,
            date: row.get(2)?,
            status: row.get(3)?,
            assigned_technician_id: row.get(4)?,
            attendee_count: row.get(5)?,
            summary: row.get(6)?,
            incidents: row.get(7)?,
            signed_off: row.get(8)?,
        })
    }

    fn decode(self) -> StoreResult<SessionRecord> {
        const T: &str = "session_records";
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| corrupt(T, &self.id, format!("unknown status '{}'", self.status)))?;
        Ok(SessionRecord {
            date: parse_date(T, &self.id, &self.date)?,
            status,
            id: self.id,
            slot_id: self.slot_id,
            assigned_technician_id: self.assigned_technician_id,
            attendee_count: self.attendee_count,
            summary: self.summary,
            incidents: self.incidents,
            signed_off: self.signed_off,
        })
    }
}

struct RequestRow {
    id: String,
    session_id: String,
    origin_technician_id: String,
    substitute_technician_id: String,
    status: String,
    reason: String,
    created_at: String,
    updated_at: String,
}

const REQUEST_COLUMNS: &str = "id, session_id, origin_technician_id, substitute_technician_id,
     status, reason, created_at, updated_at";

impl RequestRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            origin_technician_id: row.get(2)?,
            substitute_technician_id: row.get(3)?,
            status: row.get(4)?,
            reason: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn decode(self) -> StoreResult<SubstitutionRequest> {
        const T: &str = "substitution_requests";
        let status = SubstitutionStatus::parse(&self.status)
            .ok_or_else(|| corrupt(T, &self.id, format!("unknown status '{}'", self.status)))?;
        Ok(SubstitutionRequest {
            created_at: parse_timestamp(T, &self.id, &self.created_at)?,
            updated_at: parse_timestamp(T, &self.id, &self.updated_at)?,
            status,
            id: self.id,
            session_id: self.session_id,
            origin_technician_id: self.origin_technician_id,
            substitute_technician_id: self.substitute_technician_id,
            reason: self.reason,
        })
    }
}

struct AuditRow {
    id: String,
    actor_user_id: String,
    actor_email: String,
    action: String,
    entity_type: String,
    entity_id: String,
    description: String,
    timestamp: String,
}

impl AuditRow {
    fn read(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            actor_user_id: row.get(1)?,
            actor_email: row.get(2)?,
            action: row.get(3)?,
            entity_type: row.get(4)?,
            entity_id: row.get(5)?,
            description: row.get(6)?,
            timestamp: row.get(7)?,
        })
    }

    fn decode(self) -> StoreResult<AuditEntry> {
        const T: &str = "audit_entries";
        let action = AuditAction::parse(&self.action)
            .ok_or_else(|| corrupt(T, &self.id, format!("unknown action '{}'", self.action)))?;
        let entity_type = EntityType::parse(&self.entity_type).ok_or_else(|| {
            corrupt(T, &self.id, format!("unknown entity type '{}'", self.entity_type))
        })?;
        Ok(AuditEntry {
            timestamp: parse_timestamp(T, &self.id, &self.timestamp)?,
            action,
            entity_type,
            id: self.id,
            actor_user_id: self.actor_user_id,
            actor_email: self.actor_email,
            entity_id: self.entity_id,
            description: self.description,
        })
    }
}

/// SQLite database holding all four collections.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database named in `config` inside the data directory.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> StoreResult<Self> {
        let path = data_dir()?.join(&config.storage.database_file);
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }

    fn query_all<R>(
        &self,
        sql: &str,
        read: fn(&Row) -> rusqlite::Result<R>,
    ) -> StoreResult<Vec<R>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], read)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn query_one<R>(
        &self,
        sql: &str,
        id: &str,
        read: fn(&Row) -> rusqlite::Result<R>,
    ) -> StoreResult<Option<R>> {
        let conn = self.conn()?;
        Ok(conn.query_row(sql, params![id], read).optional()?)
    }
}

impl RecordStore for SqliteStore {
    fn slots(&self) -> StoreResult<Vec<RecurringSlot>> {
        self.query_all(
            &format!("SELECT {SLOT_COLUMNS} FROM recurring_slots ORDER BY seq"),
            SlotRow::read,
        )?
        .into_iter()
        .map(SlotRow::decode)
        .collect()
    }

    fn slot(&self, id: &str) -> StoreResult<Option<RecurringSlot>> {
        self.query_one(
            &format!("SELECT {SLOT_COLUMNS} FROM recurring_slots WHERE id = ?1"),
            id,
            SlotRow::read,
        )?
        .map(SlotRow::decode)
        .transpose()
    }

    fn insert_slot(&self, slot: &RecurringSlot) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO recurring_slots
                 (id, school_id, class_id, technician_id, activity, weekday,
                  start_time, end_time, valid_from, valid_to, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                slot.id,
                slot.school_id,
                slot.class_id,
                slot.technician_id,
                slot.activity,
                slot.weekday,
                format_time(slot.start_time),
                format_time(slot.end_time),
                format_date(slot.valid_from),
                format_date(slot.valid_to),
                slot.active,
            ],
        )?;
        Ok(())
    }

    fn update_slot(&self, slot: &RecurringSlot) -> StoreResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE recurring_slots
             SET school_id = ?2, class_id = ?3, technician_id = ?4, activity = ?5, weekday = ?6,
                 start_time = ?7, end_time = ?8, valid_from = ?9, valid_to = ?10, active = ?11
             WHERE id = ?1",
            params![
                slot.id,
                slot.school_id,
                slot.class_id,
                slot.technician_id,
                slot.activity,
                slot.weekday,
                format_time(slot.start_time),
                format_time(slot.end_time),
                format_date(slot.valid_from),
                format_date(slot.valid_to),
                slot.active,
            ],
        )?;
        Ok(changed == 1)
    }

    fn delete_slot(&self, id: &str) -> StoreResult<bool> {
        let changed = self
            .conn()?
            .execute("DELETE FROM recurring_slots WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    }

    fn sessions(&self) -> StoreResult<Vec<SessionRecord>> {
        self.query_all(
            &format!("SELECT {SESSION_COLUMNS} FROM session_records ORDER BY seq"),
            SessionRow::read,
        )?
        .into_iter()
        .map(SessionRow::decode)
        .collect()
    }

    fn session(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        self.query_one(
            &format!("SELECT {SESSION_COLUMNS} FROM session_records WHERE id = ?1"),
            id,
            SessionRow::read,
        )?
        .map(SessionRow::decode)
        .transpose()
    }

    fn insert_session_if_absent(&self, session: &SessionRecord) -> StoreResult<bool> {
        let changed = self.conn()?.execute(
            "INSERT OR IGNORE INTO session_records
                 (id, slot_id, date, status, assigned_technician_id,
                  attendee_count, summary, incidents, signed_off)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.id,
                session.slot_id,
                format_date(session.date),
                session.status.as_str(),
                session.assigned_technician_id,
                session.attendee_count,
                session.summary,
                session.incidents,
                session.signed_off,
            ],
        )?;
        Ok(changed == 1)
    }

    fn update_session(&self, session: &SessionRecord, expected: SessionStatus) -> StoreResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE session_records
             SET status = ?2, assigned_technician_id = ?3, attendee_count = ?4,
                 summary = ?5, incidents = ?6, signed_off = ?7
             WHERE id = ?1 AND status = ?8",
            params![
                session.id,
                session.status.as_str(),
                session.assigned_technician_id,
                session.attendee_count,
                session.summary,
                session.incidents,
                session.signed_off,
                expected.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn requests(&self) -> StoreResult<Vec<SubstitutionRequest>> {
        self.query_all(
            &format!("SELECT {REQUEST_COLUMNS} FROM substitution_requests ORDER BY seq"),
            RequestRow::read,
        )?
        .into_iter()
        .map(RequestRow::decode)
        .collect()
    }

    fn request(&self, id: &str) -> StoreResult<Option<SubstitutionRequest>> {
        self.query_one(
            &format!("SELECT {REQUEST_COLUMNS} FROM substitution_requests WHERE id = ?1"),
            id,
            RequestRow::read,
        )?
        .map(RequestRow::decode)
        .transpose()
    }

    fn insert_request(&self, request: &SubstitutionRequest) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO substitution_requests
                 (id, session_id, origin_technician_id, substitute_technician_id,
                  status, reason, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                request.id,
                request.session_id,
                request.origin_technician_id,
                request.substitute_technician_id,
                request.status.as_str(),
                request.reason,
                request.created_at.to_rfc3339(),
                request.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn update_request(
        &self,
        request: &SubstitutionRequest,
        expected: SubstitutionStatus,
    ) -> StoreResult<bool> {
        let changed = self.conn()?.execute(
            "UPDATE substitution_requests
             SET status = ?2, updated_at = ?3
             WHERE id = ?1 AND status = ?4",
            params![
                request.id,
                request.status.as_str(),
                request.updated_at.to_rfc3339(),
                expected.as_str(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn append_audit(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.conn()?.execute(
            "INSERT INTO audit_entries
                 (id, actor_user_id, actor_email, action, entity_type, entity_id, description, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.actor_user_id,
                entry.actor_email,
                entry.action.as_str(),
                entry.entity_type.as_str(),
                entry.entity_id,
                entry.description,
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn audit_entries(&self) -> StoreResult<Vec<AuditEntry>> {
        self.query_all(
            "SELECT id, actor_user_id, actor_email, action, entity_type, entity_id, description, timestamp
             FROM audit_entries ORDER BY seq",
            AuditRow::read,
        )?
        .into_iter()
        .map(AuditRow::decode)
        .collect()
    }
}
