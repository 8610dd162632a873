//! Recurring slot commands.

use aec_core::schedule::weekday_name;
use aec_core::{RecurringSlot, SlotDraft};
use chrono::{NaiveDate, NaiveTime};
use clap::Subcommand;

use super::{open_roster, parse_date, parse_time, print_json, require_approver, ActorArgs, CmdResult};

#[derive(Subcommand)]
pub enum SlotAction {
    /// Create a recurring slot
    Create {
        #[arg(long)]
        school: String,
        #[arg(long)]
        class: String,
        /// Technician running the sessions
        #[arg(long)]
        technician: String,
        #[arg(long)]
        activity: String,
        /// Day of week, 0 = Sunday ... 6 = Saturday
        #[arg(long)]
        weekday: u8,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        /// End time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
        /// First valid date (default: today)
        #[arg(long, value_parser = parse_date)]
        valid_from: Option<NaiveDate>,
        /// Last valid date (default: slots.default_validity_months after valid-from)
        #[arg(long, value_parser = parse_date)]
        valid_to: Option<NaiveDate>,
        /// Create the slot switched off
        #[arg(long)]
        inactive: bool,
    },
    /// List slots
    List {
        #[arg(long)]
        json: bool,
    },
    /// Edit a slot; omitted fields keep their value
    Edit {
        id: String,
        #[arg(long)]
        school: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        technician: Option<String>,
        #[arg(long)]
        activity: Option<String>,
        #[arg(long)]
        weekday: Option<u8>,
        #[arg(long, value_parser = parse_time)]
        start: Option<NaiveTime>,
        #[arg(long, value_parser = parse_time)]
        end: Option<NaiveTime>,
        #[arg(long, value_parser = parse_date)]
        valid_from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_date)]
        valid_to: Option<NaiveDate>,
        /// Switch the slot on or off
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a slot (its sessions are kept)
    Delete { id: String },
}

fn print_slot(slot: &RecurringSlot) {
    println!(
        "{}  {:<9} {}-{}  {} / class {} / school {}  tech {}  {}..{}{}",
        slot.id,
        weekday_name(slot.weekday),
        slot.start_time.format("%H:%M"),
        slot.end_time.format("%H:%M"),
        slot.activity,
        slot.class_id,
        slot.school_id,
        slot.technician_id,
        slot.valid_from,
        slot.valid_to,
        if slot.active { "" } else { "  (inactive)" }
    );
}

pub fn run(action: SlotAction, who: &ActorArgs) -> CmdResult {
    let roster = open_roster()?;

    match action {
        SlotAction::Create {
            school,
            class,
            technician,
            activity,
            weekday,
            start,
            end,
            valid_from,
            valid_to,
            inactive,
        } => {
            let actor = who.actor()?;
            require_approver(&actor, "creating slots")?;
            let valid_from = valid_from.unwrap_or_else(|| roster.today());
            let valid_to = valid_to.unwrap_or_else(|| roster.config().slots.default_valid_to(valid_from));
            let slot = roster.create_slot(
                &actor,
                SlotDraft {
                    school_id: school,
                    class_id: class,
                    technician_id: technician,
                    activity,
                    weekday,
                    start_time: start,
                    end_time: end,
                    valid_from,
                    valid_to,
                    active: !inactive,
                },
            )?;
            println!("Slot created: {}", slot.id);
            print_slot(&slot);
        }
        SlotAction::List { json } => {
            let slots = roster.list_slots()?;
            if json {
                print_json(&slots)?;
            } else if slots.is_empty() {
                println!("No slots.");
            } else {
                slots.iter().for_each(print_slot);
            }
        }
        SlotAction::Edit {
            id,
            school,
            class,
            technician,
            activity,
            weekday,
            start,
            end,
            valid_from,
            valid_to,
            active,
        } => {
            let actor = who.actor()?;
            require_approver(&actor, "editing slots")?;
            let current = roster
                .slot(&id)?
                .ok_or_else(|| format!("slot '{id}' not found"))?;
            let draft = SlotDraft {
                school_id: school.unwrap_or(current.school_id),
                class_id: class.unwrap_or(current.class_id),
                technician_id: technician.unwrap_or(current.technician_id),
                activity: activity.unwrap_or(current.activity),
                weekday: weekday.unwrap_or(current.weekday),
                start_time: start.unwrap_or(current.start_time),
                end_time: end.unwrap_or(current.end_time),
                valid_from: valid_from.unwrap_or(current.valid_from),
                valid_to: valid_to.unwrap_or(current.valid_to),
                active: active.unwrap_or(current.active),
            };
            let slot = roster.update_slot(&actor, &id, draft)?;
            println!("Slot updated: {}", slot.id);
            print_slot(&slot);
        }
        SlotAction::Delete { id } => {
            let actor = who.actor()?;
            require_approver(&actor, "deleting slots")?;
            let slot = roster.delete_slot(&actor, &id)?;
            println!("Slot deleted: {} ({})", slot.id, slot.label());
        }
    }
    Ok(())
}
