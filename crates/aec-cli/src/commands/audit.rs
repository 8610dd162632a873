use aec_core::{AuditEntry, EntityType};
use clap::Subcommand;

use super::{open_roster, print_json, CmdResult};

#[derive(Subcommand)]
pub enum AuditCommand {
    /// List audit entries, oldest first
    List {
        /// Only entries about this kind of entity (e.g. SessionRecord)
        #[arg(long)]
        entity_type: Option<String>,
        /// Only entries about this entity id
        #[arg(long)]
        entity_id: Option<String>,
        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: AuditCommand) -> CmdResult {
    let roster = open_roster()?;

    match action {
        AuditCommand::List {
            entity_type,
            entity_id,
            limit,
            json,
        } => {
            let entity_type = match entity_type {
                Some(t) => Some(EntityType::parse(&t).ok_or_else(|| format!("unknown entity type '{t}'"))?),
                None => None,
            };
            let mut entries: Vec<AuditEntry> = roster
                .list_audit_entries()?
                .into_iter()
                .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
                .filter(|e| entity_id.as_deref().map_or(true, |id| e.entity_id == id))
                .collect();
            if let Some(limit) = limit {
                let skip = entries.len().saturating_sub(limit);
                entries.drain(..skip);
            }

            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No audit entries.");
            } else {
                for e in &entries {
                    println!(
                        "{}  {:<30}  {}:{}  by {} <{}>  {}",
                        e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        e.action.as_str(),
                        e.entity_type,
                        e.entity_id,
                        e.actor_user_id,
                        e.actor_email,
                        e.description
                    );
                }
            }
        }
    }
    Ok(())
}
