//! Weekly recurring slots: the template sessions are materialized from.

pub mod materializer;

pub use materializer::{expand_slot, occurrence_dates};

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Day-of-week index used by slots: 0 = Sunday ... 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn weekday_name(weekday: u8) -> &'static str {
    match weekday {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "?",
    }
}

/// One technician, one class, one weekly time slot, valid over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSlot {
    pub id: String,
    pub school_id: String,
    pub class_id: String,
    pub technician_id: String,
    pub activity: String,
    pub weekday: u8, // 0=Sun ... 6=Sat
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// First valid date, inclusive.
    pub valid_from: NaiveDate,
    /// Last valid date, inclusive.
    pub valid_to: NaiveDate,
    pub active: bool,
}

impl RecurringSlot {
    pub fn from_draft(id: impl Into<String>, draft: SlotDraft) -> Self {
        Self {
            id: id.into(),
            school_id: draft.school_id,
            class_id: draft.class_id,
            technician_id: draft.technician_id,
            activity: draft.activity,
            weekday: draft.weekday,
            start_time: draft.start_time,
            end_time: draft.end_time,
            valid_from: draft.valid_from,
            valid_to: draft.valid_to,
            active: draft.active,
        }
    }

    /// True when a session of this slot falls on `date`. Ignores `active`.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        weekday_index(date) == self.weekday && self.valid_from <= date && date <= self.valid_to
    }

    pub fn label(&self) -> String {
        format!(
            "{} - class {} ({} {}-{})",
            self.activity,
            self.class_id,
            weekday_name(self.weekday),
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

/// Caller-supplied fields of a slot, used for create and edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDraft {
    pub school_id: String,
    pub class_id: String,
    pub technician_id: String,
    pub activity: String,
    pub weekday: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl SlotDraft {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("school_id", &self.school_id),
            ("class_id", &self.class_id),
            ("technician_id", &self.technician_id),
            ("activity", &self.activity),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::precondition(format!("slot {field} must not be empty")));
            }
        }
        if self.weekday > 6 {
            return Err(CoreError::precondition(format!(
                "slot weekday must be 0-6, got {}",
                self.weekday
            )));
        }
        if self.start_time >= self.end_time {
            return Err(CoreError::precondition(format!(
                "slot must end after it starts ({} >= {})",
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M")
            )));
        }
        if self.valid_from > self.valid_to {
            return Err(CoreError::precondition(format!(
                "slot validity is inverted ({} > {})",
                self.valid_from, self.valid_to
            )));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn weekday_index_starts_on_sunday() {
        assert_eq!(weekday_index(date("2024-01-07")), 0); // Sunday
        assert_eq!(weekday_index(date("2024-01-02")), 2); // Tuesday
        assert_eq!(weekday_index(date("2024-01-06")), 6); // Saturday
    }

    #[test]
    fn occurs_on_checks_weekday_and_bounds() {
        let slot = slot("1", 2, "2024-01-01", "2024-01-31");
        assert!(slot.occurs_on(date("2024-01-02")));
        assert!(slot.occurs_on(date("2024-01-30")));
        assert!(!slot.occurs_on(date("2024-01-03")));
        assert!(!slot.occurs_on(date("2024-02-06")));
        assert!(!slot.occurs_on(date("2023-12-26")));
    }

    #[test]
    fn draft_validation() {
        assert!(draft(2, "2024-01-01", "2024-01-31").validate().is_ok());
        assert!(draft(7, "2024-01-01", "2024-01-31").validate().is_err());
        assert!(draft(2, "2024-02-01", "2024-01-31").validate().is_err());

        let mut reversed = draft(2, "2024-01-01", "2024-01-31");
        reversed.end_time = time("13:00");
        assert!(reversed.validate().is_err());

        let mut unnamed = draft(2, "2024-01-01", "2024-01-31");
        unnamed.activity = "  ".into();
        assert!(matches!(
            unnamed.validate(),
            Err(CoreError::PreconditionViolation(msg)) if msg.contains("activity")
        ));
    }

    #[test]
    fn label_is_readable() {
        let slot = slot("1", 2, "2024-01-01", "2024-01-31");
        assert_eq!(slot.label(), "Music - class 3A (Tuesday 14:00-15:30)");
    }
}
