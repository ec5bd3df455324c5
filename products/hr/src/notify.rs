//! Attendance alerts handed to the caller. Delivery lives outside the core.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use entity::attendances::{self, Status};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CheckIn,
    CheckOut,
    Updated,
    Leave,
}

impl AlertKind {
    fn label(self) -> &'static str {
        match self {
            AlertKind::CheckIn => "Check-In",
            AlertKind::CheckOut => "Check-Out",
            AlertKind::Updated => "Updated",
            AlertKind::Leave => "Leave",
        }
    }
}

/// Computed fields of an attendance transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttendanceAlert {
    pub kind: AlertKind,
    pub attendance_id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub date: NaiveDate,
    pub at: Option<DateTime<FixedOffset>>,
    pub status: Status,
    pub late_minutes: i32,
    pub overtime_hours: Decimal,
}

impl AttendanceAlert {
    pub fn new(kind: AlertKind, row: &attendances::Model, employee_name: &str) -> Self {
        let at = match kind {
            AlertKind::CheckOut => row.check_out,
            _ => row.check_in,
        };
        Self {
            kind,
            attendance_id: row.id,
            employee_id: row.employee_id,
            employee_name: employee_name.to_string(),
            date: row.date,
            at,
            status: row.status,
            late_minutes: row.late_minutes,
            overtime_hours: row.overtime_hours(),
        }
    }

    /// Human readable text, times shown in `tz`.
    pub fn message(&self, tz: Tz) -> String {
        let mut lines = vec![
            "Attendance Alert".to_string(),
            format!("Employee: {}", self.employee_name),
            format!("Action: {}", self.kind.label()),
        ];
        if let Some(at) = self.at {
            lines.push(format!("Time: {}", at.with_timezone(&tz).format("%I:%M %p")));
        }
        lines.push(format!("Date: {}", self.date.format("%d-%b-%Y")));
        lines.push(format!("Status: {}", self.status.as_str().to_uppercase()));
        if self.kind == AlertKind::CheckIn && self.late_minutes > 0 {
            lines.push(format!("Late: {}", late_label(self.late_minutes)));
        }
        if self.kind == AlertKind::CheckOut && !self.overtime_hours.is_zero() {
            lines.push(format!("Overtime: {}h", self.overtime_hours));
        }
        lines.join("\n")
    }
}

fn late_label(minutes: i32) -> String {
    let (hours, mins) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &AttendanceAlert);
}

/// Writes alerts to the log.
#[derive(Clone, Copy, Debug)]
pub struct TracingSink {
    tz: Tz,
}

impl TracingSink {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[async_trait]
impl AlertSink for TracingSink {
    async fn deliver(&self, alert: &AttendanceAlert) {
        info!(
            employee_id = %alert.employee_id,
            status = alert.status.as_str(),
            late_minutes = alert.late_minutes,
            overtime_hours = %alert.overtime_hours,
            message = %alert.message(self.tz),
            "attendance alert"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn alert(kind: AlertKind, late_minutes: i32) -> AttendanceAlert {
        let tz = chrono_tz::Asia::Phnom_Penh;
        AttendanceAlert {
            kind,
            attendance_id: Uuid::nil(),
            employee_id: Uuid::nil(),
            employee_name: "Dara".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            at: Some(
                tz.with_ymd_and_hms(2026, 3, 10, 10, 5, 0)
                    .unwrap()
                    .fixed_offset(),
            ),
            status: if late_minutes > 0 { Status::Late } else { Status::Present },
            late_minutes,
            overtime_hours: dec!(1.25),
        }
    }

    #[test]
    fn payload_serializes_with_wire_names() {
        let json = serde_json::to_value(alert(AlertKind::CheckIn, 65)).unwrap();
        assert_eq!(json["kind"], "check_in");
        assert_eq!(json["status"], "late");
        assert_eq!(json["late_minutes"], 65);
        assert_eq!(json["overtime_hours"], "1.25");

        let leave = AttendanceAlert {
            status: Status::LeaveUnpaid,
            ..alert(AlertKind::Leave, 0)
        };
        assert_eq!(serde_json::to_value(leave).unwrap()["status"], "leave_unpaid");
    }

    #[test]
    fn late_check_in_message() {
        let text = alert(AlertKind::CheckIn, 65).message(chrono_tz::Asia::Phnom_Penh);
        assert!(text.contains("Employee: Dara"));
        assert!(text.contains("Time: 10:05 AM"));
        assert!(text.contains("Date: 10-Mar-2026"));
        assert!(text.contains("Status: LATE"));
        assert!(text.ends_with("Late: 1h 5m"));
    }

    #[test]
    fn check_out_reports_overtime() {
        let text = alert(AlertKind::CheckOut, 0).message(chrono_tz::Asia::Phnom_Penh);
        assert!(text.contains("Action: Check-Out"));
        assert!(text.contains("Overtime: 1.25h"));
        assert!(!text.contains("Late:"));
    }

    #[test]
    fn late_label_formats() {
        assert_eq!(late_label(7), "7m");
        assert_eq!(late_label(120), "2h 0m");
    }
}
