//! Daily scheduling window and quarter-hour slot arithmetic
//!
//! A window is configured as a pair of local wall-clock hours. `resolve`
//! anchors it to concrete UTC instants for the cycle at hand, handling windows
//! that span midnight and DST transitions of the configured zone.

use crate::error::{DischargeError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Length of a forecast/price slot
pub const SLOT_MINUTES: i64 = 15;

/// Duration of one quarter-hour slot
pub fn slot_duration() -> TimeDelta {
    TimeDelta::minutes(SLOT_MINUTES)
}

/// Round an instant down to the start of the slot containing it
///
/// Slots are aligned to the Unix epoch, which keeps them aligned to local
/// quarter hours in every zone with a whole quarter-hour offset.
pub fn round_down_to_slot(instant: DateTime<Utc>, slot: TimeDelta) -> DateTime<Utc> {
    let secs = slot.num_seconds().max(1);
    let ts = instant.timestamp();
    let floored = ts - ts.rem_euclid(secs);
    DateTime::from_timestamp(floored, 0).unwrap_or(instant)
}

/// Configured daily window, in local hours of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingWindow {
    /// First hour inside the window (0..=23)
    pub start_hour: u8,
    /// First hour after the window (0..=23)
    pub end_hour: u8,
}

/// A window anchored to concrete instants, `start <= t < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActiveWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Quarter-hour slot starts from the slot containing `now` up to the window end
    pub fn remaining_slots(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let step = slot_duration();
        let mut slot = round_down_to_slot(now.max(self.start), step);
        let mut slots = Vec::new();
        while slot < self.end {
            slots.push(slot);
            slot += step;
        }
        slots
    }
}

impl SchedulingWindow {
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self> {
        let window = Self {
            start_hour,
            end_hour,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(DischargeError::validation(
                "controller.window",
                format!(
                    "Hours must be within 0..=23 (got {}..{})",
                    self.start_hour, self.end_hour
                ),
            ));
        }
        if self.start_hour == self.end_hour {
            return Err(DischargeError::validation(
                "controller.window",
                format!(
                    "Start and end hour are both {}; the window would be empty",
                    self.start_hour
                ),
            ));
        }
        Ok(())
    }

    /// Whether the window wraps past midnight (e.g. 22 -> 6)
    pub fn spans_midnight(&self) -> bool {
        self.start_hour > self.end_hour
    }

    /// Nominal length in hours, ignoring DST
    pub fn length_hours(&self) -> u32 {
        let start = u32::from(self.start_hour);
        let end = u32::from(self.end_hour);
        if self.spans_midnight() {
            24 - start + end
        } else {
            end - start
        }
    }

    /// Whether a local hour of day falls inside the window
    pub fn contains_hour(&self, hour: u32) -> bool {
        let start = u32::from(self.start_hour);
        let end = u32::from(self.end_hour);
        if self.spans_midnight() {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }

    pub fn contains(&self, now: DateTime<Utc>, tz: Tz) -> bool {
        self.contains_hour(now.with_timezone(&tz).hour())
    }

    /// Anchor the window instance containing `now`, if any
    pub fn resolve(&self, now: DateTime<Utc>, tz: Tz) -> Option<ActiveWindow> {
        let local = now.with_timezone(&tz);
        if !self.contains_hour(local.hour()) {
            return None;
        }

        let today = local.date_naive();
        let start_date = if self.spans_midnight() && local.hour() < u32::from(self.end_hour) {
            today.pred_opt()?
        } else {
            today
        };
        let end_date = if self.spans_midnight() {
            start_date.succ_opt()?
        } else {
            start_date
        };

        let start = localize(tz, at_hour(start_date, self.start_hour)?)?;
        let end = localize(tz, at_hour(end_date, self.end_hour)?)?;
        let window = ActiveWindow { start, end };
        window.contains(now).then_some(window)
    }
}

fn at_hour(date: NaiveDate, hour: u8) -> Option<NaiveDateTime> {
    date.and_hms_opt(u32::from(hour), 0, 0)
}

/// Map a local wall-clock time to UTC; ambiguous times take the earlier
/// instant and times skipped by a DST jump move forward by an hour
fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + TimeDelta::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}
