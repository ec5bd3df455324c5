//! Attendance state engine.
//!
//! Derives `late_minutes`, `overtime_hours` and `status` from the raw
//! check-in/check-out timestamps. Runs before every attendance persist, in
//! the order late, overtime, status.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use entity::{attendances, attendances::Status, money};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{clock::local_instant, settings::PayrollRules};

/// The mutable part of an attendance row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttendanceDraft {
    pub date: NaiveDate,
    pub check_in: Option<DateTime<FixedOffset>>,
    pub check_out: Option<DateTime<FixedOffset>>,
    pub late_minutes: i32,
    pub overtime_hours: Decimal,
    pub status: Status,
}

impl AttendanceDraft {
    /// A fresh row: no timestamps, absent.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            check_in: None,
            check_out: None,
            late_minutes: 0,
            overtime_hours: Decimal::ZERO,
            status: Status::Absent,
        }
    }
}

impl From<&attendances::Model> for AttendanceDraft {
    fn from(row: &attendances::Model) -> Self {
        Self {
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
            late_minutes: row.late_minutes,
            overtime_hours: row.overtime_hours(),
            status: row.status,
        }
    }
}

/// Recomputes every derived field of `draft`.
pub fn recompute(mut draft: AttendanceDraft, rules: &PayrollRules, tz: Tz) -> AttendanceDraft {
    draft.late_minutes = late_minutes(&draft, rules, tz);
    draft.overtime_hours = overtime_hours(&draft, rules, tz);
    draft.status = derive_status(&draft);
    draft
}

fn workday_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<FixedOffset> {
    local_instant(tz, date.and_time(time)).fixed_offset()
}

/// Whole minutes after work start, once the check-in passes the grace cutoff.
/// The threshold gates lateness; it is not subtracted.
pub fn late_minutes(draft: &AttendanceDraft, rules: &PayrollRules, tz: Tz) -> i32 {
    let Some(check_in) = draft.check_in else {
        return 0;
    };
    let work_start = workday_instant(draft.date, rules.work_start, tz);
    let cutoff = Duration::try_minutes(rules.late_threshold_minutes)
        .and_then(|grace| work_start.checked_add_signed(grace));
    // A grace period past the representable range never makes anyone late.
    match cutoff {
        Some(cutoff) if check_in > cutoff => {}
        _ => return 0,
    }
    let minutes = (check_in - work_start).num_minutes();
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

/// Hours worked past work end, from whole minutes, rounded to 2 dp.
pub fn overtime_hours(draft: &AttendanceDraft, rules: &PayrollRules, tz: Tz) -> Decimal {
    let (Some(_), Some(check_out)) = (draft.check_in, draft.check_out) else {
        return Decimal::ZERO;
    };
    let work_end = workday_instant(draft.date, rules.work_end, tz);
    if check_out <= work_end {
        return Decimal::ZERO;
    }
    let minutes = (check_out - work_end).num_minutes();
    money::round2(Decimal::from(minutes) / Decimal::from(60))
}

/// First matching rule wins; leave is never overwritten.
pub fn derive_status(draft: &AttendanceDraft) -> Status {
    if draft.status.is_leave() {
        return draft.status;
    }
    match (draft.check_in, draft.check_out) {
        (None, None) => Status::Absent,
        (Some(_), _) if draft.late_minutes > 0 => Status::Late,
        (Some(_), Some(_)) => Status::Present,
        _ => draft.status,
    }
}
