//! In-memory record store.
//!
//! Collections are insertion-ordered maps behind one mutex, so every call is
//! atomic with respect to every other. Fault switches let callers exercise
//! the store-outage and audit-failure paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use indexmap::IndexMap;

use super::RecordStore;
use crate::audit::AuditEntry;
use crate::error::{StoreError, StoreResult};
use crate::schedule::RecurringSlot;
use crate::session::{SessionRecord, SessionStatus};
use crate::substitution::{SubstitutionRequest, SubstitutionStatus};

#[derive(Default)]
struct Collections {
    slots: IndexMap<String, RecurringSlot>,
    sessions: IndexMap<String, SessionRecord>,
    requests: IndexMap<String, SubstitutionRequest>,
    audit: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
    offline: AtomicBool,
    fail_audit: AtomicBool,
    fail_session_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreError::Offline`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make audit appends fail while everything else keeps working.
    pub fn fail_audit_appends(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Make session inserts and updates fail while everything else keeps working.
    pub fn fail_session_writes(&self, fail: bool) {
        self.fail_session_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Collections>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Offline);
        }
        Ok(self.inner.lock()?)
    }

    fn check_session_writes(&self) -> StoreResult<()> {
        if self.fail_session_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Offline);
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn slots(&self) -> StoreResult<Vec<RecurringSlot>> {
        Ok(self.lock()?.slots.values().cloned().collect())
    }

    fn slot(&self, id: &str) -> StoreResult<Option<RecurringSlot>> {
        Ok(self.lock()?.slots.get(id).cloned())
    }

    fn insert_slot(&self, slot: &RecurringSlot) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.slots.contains_key(&slot.id) {
            return Err(StoreError::QueryFailed(format!("duplicate slot id '{}'", slot.id)));
        }
        inner.slots.insert(slot.id.clone(), slot.clone());
        Ok(())
    }

    fn update_slot(&self, slot: &RecurringSlot) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        match inner.slots.get_mut(&slot.id) {
            Some(existing) => {
                *existing = slot.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_slot(&self, id: &str) -> StoreResult<bool> {
        Ok(self.lock()?.slots.shift_remove(id).is_some())
    }

    fn sessions(&self) -> StoreResult<Vec<SessionRecord>> {
        Ok(self.lock()?.sessions.values().cloned().collect())
    }

    fn session(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        Ok(self.lock()?.sessions.get(id).cloned())
    }

    fn insert_session_if_absent(&self, session: &SessionRecord) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        self.check_session_writes()?;
        if inner.sessions.contains_key(&session.id) {
            return Ok(false);
        }
        inner.sessions.insert(session.id.clone(), session.clone());
        Ok(true)
    }

    fn update_session(&self, session: &SessionRecord, expected: SessionStatus) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        self.check_session_writes()?;
        match inner.sessions.get_mut(&session.id) {
            Some(existing) if existing.status == expected => {
                *existing = session.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn requests(&self) -> StoreResult<Vec<SubstitutionRequest>> {
        Ok(self.lock()?.requests.values().cloned().collect())
    }

    fn request(&self, id: &str) -> StoreResult<Option<SubstitutionRequest>> {
        Ok(self.lock()?.requests.get(id).cloned())
    }

    fn insert_request(&self, request: &SubstitutionRequest) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.requests.contains_key(&request.id) {
            return Err(StoreError::QueryFailed(format!(
                "duplicate substitution request id '{}'",
                request.id
            )));
        }
        inner.requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    fn update_request(
        &self,
        request: &SubstitutionRequest,
        expected: SubstitutionStatus,
    ) -> StoreResult<bool> {
        let mut inner = self.lock()?;
        match inner.requests.get_mut(&request.id) {
            Some(existing) if existing.status == expected => {
                *existing = request.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn append_audit(&self, entry: &AuditEntry) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(StoreError::Offline);
        }
        inner.audit.push(entry.clone());
        Ok(())
    }

    fn audit_entries(&self) -> StoreResult<Vec<AuditEntry>> {
        Ok(self.lock()?.audit.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_support::{date, slot};

    #[test]
    fn sessions_insert_once() {
        let store = MemoryStore::new();
        let record = SessionRecord::planned(&slot("1", 2, "2024-01-01", "2024-01-31"), date("2024-01-02"));
        assert!(store.insert_session_if_absent(&record).unwrap());
        assert!(!store.insert_session_if_absent(&record).unwrap());
        assert_eq!(store.sessions().unwrap().len(), 1);
    }

    #[test]
    fn update_session_is_compare_and_set() {
        let store = MemoryStore::new();
        let mut record = SessionRecord::planned(&slot("1", 2, "2024-01-01", "2024-01-31"), date("2024-01-02"));
        store.insert_session_if_absent(&record).unwrap();

        record.status = SessionStatus::Cancelled;
        assert!(!store.update_session(&record, SessionStatus::Completed).unwrap());
        assert_eq!(store.session(&record.id).unwrap().unwrap().status, SessionStatus::Planned);

        assert!(store.update_session(&record, SessionStatus::Planned).unwrap());
        assert_eq!(store.session(&record.id).unwrap().unwrap().status, SessionStatus::Cancelled);
    }

    #[test]
    fn slots_keep_insertion_order_after_delete() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            store.insert_slot(&slot(id, 2, "2024-01-01", "2024-01-31")).unwrap();
        }
        assert!(store.delete_slot("b").unwrap());
        assert!(!store.delete_slot("b").unwrap());
        let ids: Vec<String> = store.slots().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(store.slots(), Err(StoreError::Offline)));
        store.set_offline(false);
        assert!(store.slots().unwrap().is_empty());
    }
}
