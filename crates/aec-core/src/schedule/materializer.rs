//! Expansion of recurring slots into dated session records.
//!
//! This half is pure: it decides which dates a slot produces inside a window.
//! Persisting the records, skipping ones that already exist and auditing the
//! new ones is done by [`Roster::materialize`](crate::Roster::materialize).

use chrono::NaiveDate;

use super::RecurringSlot;
use crate::session::SessionRecord;

/// Dates in `[window_start, window_end]` on which `slot` has a session.
///
/// Inactive slots and inverted windows produce nothing.
pub fn occurrence_dates(
    slot: &RecurringSlot,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<NaiveDate> {
    if !slot.active {
        return Vec::new();
    }
    let first = window_start.max(slot.valid_from);
    let last = window_end.min(slot.valid_to);
    if first > last {
        return Vec::new();
    }
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .filter(|d| slot.occurs_on(*d))
        .collect()
}

/// Fresh PLANNED records for every occurrence of `slot` in the window.
pub fn expand_slot(
    slot: &RecurringSlot,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<SessionRecord> {
    occurrence_dates(slot, window_start, window_end)
        .into_iter()
        .map(|date| SessionRecord::planned(slot, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_support::{date, slot};
    use crate::session::SessionStatus;

    #[test]
    fn tuesdays_in_january_2024() {
        let slot = slot("1", 2, "2024-01-01", "2024-01-31");
        let dates = occurrence_dates(&slot, date("2024-01-01"), date("2024-01-31"));
        let expected: Vec<NaiveDate> = ["2024-01-02", "2024-01-09", "2024-01-16", "2024-01-23", "2024-01-30"]
            .iter()
            .map(|d| date(d))
            .collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn window_is_clamped_to_validity() {
        let slot = slot("1", 2, "2024-01-10", "2024-01-20");
        let dates = occurrence_dates(&slot, date("2024-01-01"), date("2024-01-31"));
        assert_eq!(dates, vec![date("2024-01-16")]);
    }

    #[test]
    fn single_day_window() {
        let slot = slot("1", 2, "2024-01-01", "2024-01-31");
        assert_eq!(
            occurrence_dates(&slot, date("2024-01-09"), date("2024-01-09")),
            vec![date("2024-01-09")]
        );
        assert!(occurrence_dates(&slot, date("2024-01-10"), date("2024-01-10")).is_empty());
    }

    #[test]
    fn inactive_slot_and_inverted_window_yield_nothing() {
        let mut inactive = slot("1", 2, "2024-01-01", "2024-01-31");
        inactive.active = false;
        assert!(expand_slot(&inactive, date("2024-01-01"), date("2024-01-31")).is_empty());

        let active = slot("1", 2, "2024-01-01", "2024-01-31");
        assert!(expand_slot(&active, date("2024-01-31"), date("2024-01-01")).is_empty());
    }

    #[test]
    fn expanded_records_are_planned_and_keyed() {
        let slot = slot("7", 4, "2024-01-01", "2024-01-31");
        let records = expand_slot(&slot, date("2024-01-01"), date("2024-01-07"));
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, "7_2024-01-04");
        assert_eq!(record.slot_id, "7");
        assert_eq!(record.status, SessionStatus::Planned);
        assert_eq!(record.assigned_technician_id, "3");
        assert!(!record.signed_off);
        assert!(record.attendee_count.is_none());
    }
}
