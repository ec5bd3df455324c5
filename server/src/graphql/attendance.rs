use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, MaybeUndefined, Object, SimpleObject};
use chrono::{DateTime, FixedOffset, NaiveDate};
use entity::attendances;
use products_hr::{AlertSink, AttendanceEvent, AttendancePatch, AttendanceStats};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use super::{hr, hr_error, patch_value, period};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AttendanceStatus {
    #[graphql(name = "PRESENT")]
    Present,
    #[graphql(name = "LATE")]
    Late,
    #[graphql(name = "ABSENT")]
    Absent,
    #[graphql(name = "LEAVE_PAID")]
    LeavePaid,
    #[graphql(name = "LEAVE_UNPAID")]
    LeaveUnpaid,
}

impl From<attendances::Status> for AttendanceStatus {
    fn from(value: attendances::Status) -> Self {
        match value {
            attendances::Status::Present => Self::Present,
            attendances::Status::Late => Self::Late,
            attendances::Status::Absent => Self::Absent,
            attendances::Status::LeavePaid => Self::LeavePaid,
            attendances::Status::LeaveUnpaid => Self::LeaveUnpaid,
        }
    }
}

impl From<AttendanceStatus> for attendances::Status {
    fn from(value: AttendanceStatus) -> Self {
        match value {
            AttendanceStatus::Present => Self::Present,
            AttendanceStatus::Late => Self::Late,
            AttendanceStatus::Absent => Self::Absent,
            AttendanceStatus::LeavePaid => Self::LeavePaid,
            AttendanceStatus::LeaveUnpaid => Self::LeaveUnpaid,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendanceNode {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<FixedOffset>>,
    pub check_out: Option<DateTime<FixedOffset>>,
    pub late_minutes: i32,
    pub overtime_hours: Decimal,
    pub status: AttendanceStatus,
}

impl From<attendances::Model> for AttendanceNode {
    fn from(model: attendances::Model) -> Self {
        Self {
            id: model.id,
            employee_id: model.employee_id,
            date: model.date,
            check_in: model.check_in,
            check_out: model.check_out,
            late_minutes: model.late_minutes,
            overtime_hours: model.overtime_hours(),
            status: model.status.into(),
        }
    }
}

/// A write result plus the alert text handed to the notification sink.
#[derive(Clone, Debug, SimpleObject)]
pub struct AttendancePayload {
    pub attendance: AttendanceNode,
    pub message: String,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct AttendanceStatsNode {
    pub present: i32,
    pub late: i32,
    pub absent: i32,
    pub leave: i32,
    pub total_records: i32,
    pub total_late_minutes: i64,
    pub total_overtime_hours: Decimal,
}

impl From<AttendanceStats> for AttendanceStatsNode {
    fn from(stats: AttendanceStats) -> Self {
        Self {
            present: stats.present,
            late: stats.late,
            absent: stats.absent,
            leave: stats.leave,
            total_records: stats.total_records,
            total_late_minutes: stats.total_late_minutes,
            total_overtime_hours: stats.total_overtime_hours,
        }
    }
}

/// Omitted fields stay unchanged; an explicit `null` clears a timestamp.
#[derive(InputObject, Default)]
pub struct UpdateAttendanceInput {
    pub date: Option<NaiveDate>,
    pub check_in: MaybeUndefined<DateTime<FixedOffset>>,
    pub check_out: MaybeUndefined<DateTime<FixedOffset>>,
    pub status: Option<AttendanceStatus>,
}

async fn publish(
    ctx: &Context<'_>,
    event: AttendanceEvent,
) -> async_graphql::Result<AttendancePayload> {
    let sink = ctx.data::<Arc<dyn AlertSink>>()?;
    let tz = hr(ctx)?.clock().timezone();
    sink.deliver(&event.alert).await;
    Ok(AttendancePayload {
        message: event.alert.message(tz),
        attendance: event.record.into(),
    })
}

#[derive(Default)]
pub struct AttendanceQuery;

#[Object]
impl AttendanceQuery {
    #[graphql(name = "attendanceByMonth")]
    async fn attendance_by_month(
        &self,
        ctx: &Context<'_>,
        employee_id: Uuid,
        month: i32,
        year: i32,
    ) -> async_graphql::Result<Vec<AttendanceNode>> {
        let rows = hr(ctx)?
            .attendance()
            .month_records(employee_id, period(month, year)?)
            .await
            .map_err(hr_error)?;
        Ok(rows.into_iter().map(AttendanceNode::from).collect())
    }

    /// Month totals for one employee, or for everyone when `employeeId` is omitted.
    #[graphql(name = "attendanceStats")]
    async fn attendance_stats(
        &self,
        ctx: &Context<'_>,
        employee_id: Option<Uuid>,
        month: Option<i32>,
        year: Option<i32>,
    ) -> async_graphql::Result<AttendanceStatsNode> {
        let hr = hr(ctx)?;
        let today = hr.clock().today();
        let current = products_hr::SalaryPeriod::containing(today);
        let period = period(
            month.unwrap_or(current.month() as i32),
            year.unwrap_or(current.year()),
        )?;
        let stats = hr
            .attendance()
            .month_stats(employee_id, period)
            .await
            .map_err(hr_error)?;
        Ok(stats.into())
    }
}

#[derive(Default)]
pub struct AttendanceMutation;

#[Object]
impl AttendanceMutation {
    #[instrument(name = "graphql.attendance.check_in", skip(self, ctx))]
    async fn check_in(
        &self,
        ctx: &Context<'_>,
        employee_id: Uuid,
    ) -> async_graphql::Result<AttendancePayload> {
        let event = hr(ctx)?
            .attendance()
            .check_in(employee_id)
            .await
            .map_err(hr_error)?;
        publish(ctx, event).await
    }

    #[instrument(name = "graphql.attendance.check_out", skip(self, ctx))]
    async fn check_out(
        &self,
        ctx: &Context<'_>,
        employee_id: Uuid,
    ) -> async_graphql::Result<AttendancePayload> {
        let event = hr(ctx)?
            .attendance()
            .check_out(employee_id)
            .await
            .map_err(hr_error)?;
        publish(ctx, event).await
    }

    #[instrument(name = "graphql.attendance.scan", skip(self, ctx))]
    async fn scan(
        &self,
        ctx: &Context<'_>,
        employee_id: Uuid,
    ) -> async_graphql::Result<AttendancePayload> {
        let event = hr(ctx)?
            .attendance()
            .scan(employee_id)
            .await
            .map_err(hr_error)?;
        publish(ctx, event).await
    }

    /// Kiosk scan of a personal badge.
    #[graphql(name = "scanQr")]
    #[instrument(name = "graphql.attendance.scan_qr", skip_all)]
    async fn scan_qr(
        &self,
        ctx: &Context<'_>,
        qr_code: String,
    ) -> async_graphql::Result<AttendancePayload> {
        let event = hr(ctx)?
            .attendance()
            .scan_qr(&qr_code)
            .await
            .map_err(hr_error)?;
        publish(ctx, event).await
    }

    /// Scan of the shared office code on behalf of `employeeId`.
    #[graphql(name = "scanCompanyQr")]
    #[instrument(name = "graphql.attendance.scan_company_qr", skip(self, ctx, token))]
    async fn scan_company_qr(
        &self,
        ctx: &Context<'_>,
        token: String,
        employee_id: Uuid,
    ) -> async_graphql::Result<AttendancePayload> {
        let event = hr(ctx)?
            .attendance()
            .scan_company_qr(&token, employee_id)
            .await
            .map_err(hr_error)?;
        publish(ctx, event).await
    }

    #[instrument(name = "graphql.attendance.update", skip(self, ctx, input))]
    async fn update_attendance(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateAttendanceInput,
    ) -> async_graphql::Result<AttendancePayload> {
        let patch = AttendancePatch {
            date: input.date,
            check_in: patch_value(input.check_in),
            check_out: patch_value(input.check_out),
            status: input.status.map(Into::into),
        };
        let event = hr(ctx)?
            .attendance()
            .update(id, patch)
            .await
            .map_err(hr_error)?;
        publish(ctx, event).await
    }

    #[instrument(name = "graphql.attendance.mark_leave", skip(self, ctx))]
    async fn mark_leave(
        &self,
        ctx: &Context<'_>,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        paid: bool,
    ) -> async_graphql::Result<Vec<AttendanceNode>> {
        let events = hr(ctx)?
            .attendance()
            .mark_leave(employee_id, from, to, paid)
            .await
            .map_err(hr_error)?;
        let sink = ctx.data::<Arc<dyn AlertSink>>()?;
        let mut nodes = Vec::with_capacity(events.len());
        for event in events {
            sink.deliver(&event.alert).await;
            nodes.push(event.record.into());
        }
        Ok(nodes)
    }

    /// Closes a past day; returns the number of rows marked present.
    #[instrument(name = "graphql.attendance.reconcile_day", skip(self, ctx))]
    async fn reconcile_day(&self, ctx: &Context<'_>, date: NaiveDate) -> async_graphql::Result<u64> {
        hr(ctx)?
            .attendance()
            .reconcile_day(date)
            .await
            .map_err(hr_error)
    }

    #[instrument(name = "graphql.attendance.delete", skip(self, ctx))]
    async fn delete_attendance(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<bool> {
        hr(ctx)?.attendance().delete(id).await.map_err(hr_error)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maybe_undefined_maps_to_patch() {
        assert_eq!(patch_value::<i32>(MaybeUndefined::Undefined), None);
        assert_eq!(patch_value::<i32>(MaybeUndefined::Null), Some(None));
        assert_eq!(patch_value(MaybeUndefined::Value(3)), Some(Some(3)));
    }

    #[test]
    fn statuses_map_both_ways() {
        for status in [
            attendances::Status::Present,
            attendances::Status::Late,
            attendances::Status::Absent,
            attendances::Status::LeavePaid,
            attendances::Status::LeaveUnpaid,
        ] {
            let gql = AttendanceStatus::from(status);
            assert_eq!(attendances::Status::from(gql), status);
        }
    }
}
