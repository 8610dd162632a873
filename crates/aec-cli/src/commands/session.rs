//! Session commands: materialization, attendance and status changes.

use aec_core::{AttendanceReport, SessionRecord, SessionStatus};
use chrono::{Days, NaiveDate};
use clap::Subcommand;

use super::{open_roster, parse_date, print_json, require_approver, ActorArgs, CmdResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create the missing sessions of every active slot in a window
    Materialize {
        /// Window start (default: today)
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        /// Window end (default: materialization.lookahead_days after the start)
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
    },
    /// List sessions
    List {
        /// Only sessions on this date
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Only sessions assigned to this technician
        #[arg(long)]
        technician: Option<String>,
        /// Only sessions in this status (e.g. PLANNED)
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Record attendance for a session
    Attend {
        id: String,
        #[arg(long)]
        attendees: u32,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long, default_value = "")]
        incidents: String,
        /// Sign the sheet, closing the session as COMPLETED
        #[arg(long)]
        sign_off: bool,
    },
    /// Mark the technician absent
    Absent { id: String },
    /// Cancel a session
    Cancel { id: String },
}

fn print_session(record: &SessionRecord) {
    let attendance = match record.attendee_count {
        Some(n) => format!("  {n} attendees"),
        None => String::new(),
    };
    println!(
        "{}  {}  {:<17}  tech {}{}{}",
        record.id,
        record.date,
        record.status.as_str(),
        record.assigned_technician_id,
        attendance,
        if record.signed_off { "  signed" } else { "" }
    );
}

pub fn run(action: SessionAction, who: &ActorArgs) -> CmdResult {
    let roster = open_roster()?;

    match action {
        SessionAction::Materialize { from, to } => {
            let actor = who.actor()?;
            require_approver(&actor, "materializing sessions")?;
            let created = match (from, to) {
                (None, None) => roster.materialize_ahead(&actor, roster.today())?,
                (from, to) => {
                    let from = from.unwrap_or_else(|| roster.today());
                    let days = u64::from(roster.config().materialization.lookahead_days);
                    let to = to
                        .or_else(|| from.checked_add_days(Days::new(days)))
                        .unwrap_or(NaiveDate::MAX);
                    roster.materialize(&actor, from, to)?
                }
            };
            println!("Created {} session(s).", created.len());
            created.iter().for_each(print_session);
        }
        SessionAction::List {
            date,
            technician,
            status,
            json,
        } => {
            let status = match status {
                Some(s) => Some(
                    SessionStatus::parse(&s.to_ascii_uppercase())
                        .ok_or_else(|| format!("unknown session status '{s}'"))?,
                ),
                None => None,
            };
            let sessions: Vec<SessionRecord> = roster
                .list_sessions()?
                .into_iter()
                .filter(|r| date.map_or(true, |d| r.date == d))
                .filter(|r| technician.as_deref().map_or(true, |t| r.assigned_technician_id == t))
                .filter(|r| status.map_or(true, |s| r.status == s))
                .collect();
            if json {
                print_json(&sessions)?;
            } else if sessions.is_empty() {
                println!("No sessions.");
            } else {
                sessions.iter().for_each(print_session);
            }
        }
        SessionAction::Attend {
            id,
            attendees,
            summary,
            incidents,
            sign_off,
        } => {
            let actor = who.actor()?;
            let session = roster
                .session(&id)?
                .ok_or_else(|| format!("session '{id}' not found"))?;
            if session.assigned_technician_id != actor.id {
                require_approver(&actor, "recording attendance for another technician's session")?;
            }
            let record = roster.register_attendance(
                &actor,
                &id,
                &AttendanceReport {
                    attendee_count: attendees,
                    summary,
                    incidents,
                    sign_off,
                },
            )?;
            println!("Attendance recorded.");
            print_session(&record);
        }
        SessionAction::Absent { id } => {
            let actor = who.actor()?;
            require_approver(&actor, "marking a technician absent")?;
            let record = roster.mark_absent(&actor, &id)?;
            print_session(&record);
        }
        SessionAction::Cancel { id } => {
            let actor = who.actor()?;
            require_approver(&actor, "cancelling sessions")?;
            let record = roster.cancel_session(&actor, &id)?;
            print_session(&record);
        }
    }
    Ok(())
}
