//! Subcommand implementations and the helpers they share.

pub mod audit;
pub mod config;
pub mod session;
pub mod slot;
pub mod substitution;

use std::error::Error;

use aec_core::{Actor, Config, Role, Roster, SqliteStore};
use chrono::{NaiveDate, NaiveTime};
use clap::Args;

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Who is running the command, as reported by the identity provider.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// Acting user id
    #[arg(long, global = true, env = "AEC_ACTOR_ID")]
    pub actor_id: Option<String>,
    /// Acting user email, stamped on audit entries
    #[arg(long, global = true, env = "AEC_ACTOR_EMAIL")]
    pub actor_email: Option<String>,
    /// Acting user role: administrator, coordinator or technician
    #[arg(long, global = true, env = "AEC_ACTOR_ROLE")]
    pub role: Option<Role>,
}

impl ActorArgs {
    pub fn actor(&self) -> Result<Actor, Box<dyn Error>> {
        let id = self
            .actor_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or("no acting user: pass --actor-id or set AEC_ACTOR_ID")?;
        let role = self
            .role
            .ok_or("no acting role: pass --role or set AEC_ACTOR_ROLE")?;
        let email = self.actor_email.clone().unwrap_or_default();
        Ok(Actor::new(id, email, role))
    }
}

/// Open the roster over the configured SQLite database.
pub fn open_roster() -> Result<Roster<SqliteStore>, Box<dyn Error>> {
    let config = Config::load_or_default();
    tracing::debug!(database = %config.storage.database_file, "opening roster");
    let store = SqliteStore::open(&config)?;
    Ok(Roster::new(store, config))
}

pub fn require_approver(actor: &Actor, what: &str) -> CmdResult {
    if actor.role.can_approve_substitutions() {
        Ok(())
    } else {
        Err(format!("{what} requires an administrator or coordinator, not {}", actor.role).into())
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}' (want YYYY-MM-DD): {e}"))
}

pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("invalid time '{s}' (want HH:MM): {e}"))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
