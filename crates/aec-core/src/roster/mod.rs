//! The roster: every state-changing operation, bound to one record store.
//!
//! Each operation takes the acting user explicitly, applies its mutation
//! through the store and then appends the matching audit entry. Operations
//! are grouped by what they act on:
//!
//! - `slots`: recurring slot CRUD
//! - `sessions`: materialization and the session state machine
//! - `substitutions`: the substitution approval protocol

mod sessions;
mod slots;
mod substitutions;

use chrono::{DateTime, NaiveDate, Utc};

use crate::actor::Actor;
use crate::audit::{AuditEntry, AuditRecorder, IdentityEvent, EntityType};
use crate::error::Result;
use crate::storage::{Config, RecordStore};

/// Source of the current time.
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Roster operations over a record store.
pub struct Roster<S: RecordStore> {
    store: S,
    config: Config,
    clock: Clock,
}

impl<S: RecordStore> Roster<S> {
    /// Create a roster reading the wall clock.
    pub fn new(store: S, config: Config) -> Self {
        Self::with_clock(store, config, Utc::now)
    }

    /// Create a roster with an injected clock.
    pub fn with_clock(
        store: S,
        config: Config,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        Self {
            store,
            config,
            clock: Box::new(clock),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Calendar date of [`now`](Self::now) in UTC.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn audit(&self) -> AuditRecorder<'_, S> {
        AuditRecorder::new(&self.store)
    }

    /// Record an event reported by the identity collaborator.
    pub fn record_identity_event(&self, actor: &Actor, event: &IdentityEvent) -> Result<AuditEntry> {
        let subject = event.subject_id(&actor.id);
        tracing::debug!(actor = %actor.id, action = %event.action(), subject, "identity event");
        self.audit().record(
            actor,
            event.action(),
            EntityType::User,
            subject,
            event.description(&actor.email),
            self.now(),
        )
    }

    /// All audit entries, oldest first.
    pub fn list_audit_entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.store.audit_entries()?)
    }
}
