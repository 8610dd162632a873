//! Record storage.
//!
//! The engines only see [`RecordStore`]: keyed, insertion-ordered collections
//! of slots, sessions, substitution requests and audit entries. Two adapters
//! ship with the crate, [`MemoryStore`] and [`SqliteStore`].

mod config;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use config::{Config, MaterializationConfig, SlotsConfig, StorageConfig};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::PathBuf;

use crate::audit::AuditEntry;
use crate::error::StoreResult;
use crate::schedule::RecurringSlot;
use crate::session::{SessionRecord, SessionStatus};
use crate::substitution::{SubstitutionRequest, SubstitutionStatus};

/// Keyed, insertion-ordered CRUD over the four collections.
///
/// State-machine writes are compare-and-set on the expected current status:
/// `update_session` and `update_request` return `Ok(false)` when the stored
/// record is missing or no longer in `expected`, and write nothing.
pub trait RecordStore: Send + Sync {
    fn slots(&self) -> StoreResult<Vec<RecurringSlot>>;
    fn slot(&self, id: &str) -> StoreResult<Option<RecurringSlot>>;
    fn insert_slot(&self, slot: &RecurringSlot) -> StoreResult<()>;
    /// Replace a slot. Returns `false` if it does not exist.
    fn update_slot(&self, slot: &RecurringSlot) -> StoreResult<bool>;
    /// Remove a slot. Sessions referencing it are left alone.
    fn delete_slot(&self, id: &str) -> StoreResult<bool>;

    fn sessions(&self) -> StoreResult<Vec<SessionRecord>>;
    fn session(&self, id: &str) -> StoreResult<Option<SessionRecord>>;
    /// Insert unless a record with the same id exists. Returns whether it was inserted.
    fn insert_session_if_absent(&self, session: &SessionRecord) -> StoreResult<bool>;
    fn update_session(&self, session: &SessionRecord, expected: SessionStatus) -> StoreResult<bool>;

    fn requests(&self) -> StoreResult<Vec<SubstitutionRequest>>;
    fn request(&self, id: &str) -> StoreResult<Option<SubstitutionRequest>>;
    fn insert_request(&self, request: &SubstitutionRequest) -> StoreResult<()>;
    fn update_request(
        &self,
        request: &SubstitutionRequest,
        expected: SubstitutionStatus,
    ) -> StoreResult<bool>;

    fn append_audit(&self, entry: &AuditEntry) -> StoreResult<()>;
    fn audit_entries(&self) -> StoreResult<Vec<AuditEntry>>;
}

/// Returns the data directory.
///
/// `AEC_DATA_DIR` wins if set. Otherwise `~/.config/aec-roster[-dev]/`,
/// with `AEC_ENV=dev` selecting the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("AEC_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("AEC_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("aec-roster-dev")
            } else {
                base_dir.join("aec-roster")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
