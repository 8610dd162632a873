//! Substitution request commands.

use std::error::Error;

use aec_core::{
    Actor, NewSubstitution, Roster, SqliteStore, SubstitutionRequest, SubstitutionStatus,
};
use chrono::NaiveDate;
use clap::Subcommand;

use super::{open_roster, parse_date, print_json, require_approver, ActorArgs, CmdResult};

#[derive(Subcommand)]
pub enum SubstitutionCommand {
    /// Ask for someone to cover a session
    Request {
        /// Session id (slot id + date)
        session: String,
        /// Technician who would take the session over
        #[arg(long)]
        substitute: String,
        #[arg(long)]
        reason: String,
        /// Technician giving the session away (default: the assigned technician)
        #[arg(long)]
        origin: Option<String>,
        /// Reference date for the upcoming-session check (default: today)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
    },
    /// Approve a pending request
    Approve { id: String },
    /// Reject a pending request
    Reject { id: String },
    /// Accept an approved request as the substitute
    Accept { id: String },
    /// Decline an approved request as the substitute
    Decline { id: String },
    /// List requests
    List {
        /// Only requests in this status (e.g. PENDING_APPROVAL)
        #[arg(long)]
        status: Option<String>,
        /// Only requests still waiting on someone
        #[arg(long, conflicts_with = "status")]
        open: bool,
        #[arg(long)]
        json: bool,
    },
}

fn print_request(request: &SubstitutionRequest) {
    println!(
        "{}  {}  {:<23}  {} -> {}  \"{}\"",
        request.id,
        request.session_id,
        request.status.as_str(),
        request.origin_technician_id,
        request.substitute_technician_id,
        request.reason
    );
}

/// Only the designated substitute answers an approved request.
fn require_substitute(
    roster: &Roster<SqliteStore>,
    actor: &Actor,
    id: &str,
) -> Result<(), Box<dyn Error>> {
    let request = roster
        .request(id)?
        .ok_or_else(|| format!("substitution request '{id}' not found"))?;
    if !request.is_substitute(&actor.id) {
        return Err(format!(
            "only technician {} can answer substitution request '{id}'",
            request.substitute_technician_id
        )
        .into());
    }
    Ok(())
}

/// Reject and decline share one core transition; the CLI pins each to its source state.
fn require_status(
    roster: &Roster<SqliteStore>,
    id: &str,
    expected: SubstitutionStatus,
    verb: &str,
) -> Result<(), Box<dyn Error>> {
    let current = roster
        .request(id)?
        .ok_or_else(|| format!("substitution request '{id}' not found"))?;
    if current.status != expected {
        return Err(format!(
            "substitution request '{id}' is {}, only {expected} requests can be {verb}",
            current.status
        )
        .into());
    }
    Ok(())
}

pub fn run(action: SubstitutionCommand, who: &ActorArgs) -> CmdResult {
    let roster = open_roster()?;

    match action {
        SubstitutionCommand::Request {
            session,
            substitute,
            reason,
            origin,
            today,
        } => {
            let actor = who.actor()?;
            let record = roster
                .session(&session)?
                .ok_or_else(|| format!("session '{session}' not found"))?;
            let origin = origin.unwrap_or_else(|| record.assigned_technician_id.clone());
            if record.assigned_technician_id != actor.id || origin != actor.id {
                require_approver(&actor, "requesting cover for another technician's session")?;
            }
            let request = roster.create_request(
                &actor,
                NewSubstitution {
                    session_id: session,
                    origin_technician_id: origin,
                    substitute_technician_id: substitute,
                    reason,
                },
                today.unwrap_or_else(|| roster.today()),
            )?;
            println!("Substitution requested: {}", request.id);
            print_request(&request);
        }
        SubstitutionCommand::Approve { id } => {
            let actor = who.actor()?;
            require_approver(&actor, "approving substitutions")?;
            print_request(&roster.approve(&actor, &id)?);
        }
        SubstitutionCommand::Reject { id } => {
            let actor = who.actor()?;
            require_approver(&actor, "rejecting substitutions")?;
            require_status(&roster, &id, SubstitutionStatus::PendingApproval, "rejected")?;
            print_request(&roster.reject(&actor, &id)?);
        }
        SubstitutionCommand::Accept { id } => {
            let actor = who.actor()?;
            require_substitute(&roster, &actor, &id)?;
            print_request(&roster.accept(&actor, &id)?);
        }
        SubstitutionCommand::Decline { id } => {
            let actor = who.actor()?;
            require_substitute(&roster, &actor, &id)?;
            require_status(&roster, &id, SubstitutionStatus::PendingTechAcceptance, "declined")?;
            print_request(&roster.reject(&actor, &id)?);
        }
        SubstitutionCommand::List { status, open, json } => {
            let status = match status {
                Some(s) => Some(
                    SubstitutionStatus::parse(&s.to_ascii_uppercase())
                        .ok_or_else(|| format!("unknown request status '{s}'"))?,
                ),
                None => None,
            };
            let requests: Vec<SubstitutionRequest> = roster
                .list_requests()?
                .into_iter()
                .filter(|r| status.map_or(true, |s| r.status == s))
                .filter(|r| !open || !r.status.is_terminal())
                .collect();
            if json {
                print_json(&requests)?;
            } else if requests.is_empty() {
                println!("No substitution requests.");
            } else {
                requests.iter().for_each(print_request);
            }
        }
    }
    Ok(())
}
