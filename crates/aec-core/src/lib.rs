//! # AEC Roster Core Library
//!
//! Scheduling core for after-school enrichment activities (AEC): recurring
//! weekly slots are materialized into dated sessions, technicians record
//! attendance, and sessions can be handed to a substitute through a two-step
//! approval protocol. Every mutation lands in an append-only audit trail.
//!
//! The `aec` CLI is a thin front end over this crate.
//!
//! ## Architecture
//!
//! - **Schedule**: recurring slots and the pure slot-to-session expansion
//! - **Session**: the session record and its transition rule table
//! - **Substitution**: the approval protocol for handing a session over
//! - **Audit**: immutable entries written after every state change
//! - **Storage**: the [`RecordStore`] trait with in-memory and SQLite adapters,
//!   plus TOML configuration
//!
//! ## Key Components
//!
//! - [`Roster`]: every operation, bound to a store and a clock
//! - [`Actor`]: the acting user, passed explicitly to each call
//! - [`Config`]: application configuration management

pub mod actor;
pub mod audit;
pub mod error;
pub mod roster;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod substitution;

pub use actor::{Actor, Role};
pub use audit::{AuditAction, AuditEntry, AuditRecorder, EntityType, IdentityEvent};
pub use error::{ConfigError, CoreError, Result, StoreError};
pub use roster::{Clock, Roster};
pub use schedule::{RecurringSlot, SlotDraft};
pub use session::{session_key, AttendanceReport, SessionRecord, SessionStatus, SessionTransition};
pub use storage::{Config, MemoryStore, RecordStore, SqliteStore};
pub use substitution::{NewSubstitution, SubstitutionAction, SubstitutionRequest, SubstitutionStatus};
