//! Attendance writes and reads. Every write runs the state engine and is a
//! single transaction; alerts are returned to the caller, never sent.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use entity::{
    attendances::{self, Status},
    employees, money,
};
use platform_db::is_unique_violation;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    attendance::{AttendanceDraft, recompute},
    clock::OrgClock,
    error::{HrError, HrResult},
    notify::{AlertKind, AttendanceAlert},
    payroll::DayTally,
    period::SalaryPeriod,
    settings::{COMPANY_ATTENDANCE_QR, PayrollRules, SettingsProvider},
};

/// Longest leave range accepted in one call.
const MAX_LEAVE_DAYS: i64 = 366;

/// A persisted row together with the alert describing the transition.
#[derive(Clone, Debug)]
pub struct AttendanceEvent {
    pub record: attendances::Model,
    pub alert: AttendanceAlert,
}

/// Manual edit. The outer `Option` of a timestamp means "leave as is", the
/// inner one clears the value.
#[derive(Clone, Debug, Default)]
pub struct AttendancePatch {
    pub date: Option<NaiveDate>,
    pub check_in: Option<Option<DateTime<FixedOffset>>>,
    pub check_out: Option<Option<DateTime<FixedOffset>>>,
    pub status: Option<Status>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub present: i32,
    pub late: i32,
    pub absent: i32,
    /// Paid and unpaid leave together.
    pub leave: i32,
    pub total_records: i32,
    pub total_late_minutes: i64,
    pub total_overtime_hours: Decimal,
}

#[derive(Clone)]
pub struct AttendanceService {
    db: DatabaseConnection,
    clock: OrgClock,
    settings: Arc<dyn SettingsProvider>,
}

impl AttendanceService {
    pub fn new(
        db: DatabaseConnection,
        clock: OrgClock,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            db,
            clock,
            settings,
        }
    }

    #[instrument(name = "hr.attendance.check_in", skip(self))]
    pub async fn check_in(&self, employee_id: Uuid) -> HrResult<AttendanceEvent> {
        let employee = find_employee(&self.db, employee_id).await?;
        let rules = PayrollRules::load(self.settings.as_ref()).await?;
        let now = self.clock.now().fixed_offset();
        let today = now.date_naive();

        let txn = self.db.begin().await?;
        let existing = find_day(&txn, employee_id, today).await?;
        let mut draft = match &existing {
            Some(row) if row.check_in.is_some() => return Err(HrError::AlreadyCheckedIn),
            Some(row) => AttendanceDraft::from(row),
            None => AttendanceDraft::new(today),
        };
        draft.check_in = Some(now);
        let draft = recompute(draft, &rules, self.clock.timezone());

        let saved = match existing {
            Some(row) => {
                let saved = update_row(&txn, row, draft, now).await?;
                txn.commit().await?;
                saved
            }
            None => insert_check_in(txn, employee_id, draft, now).await?,
        };

        info!(
            %employee_id,
            status = saved.status.as_str(),
            late_minutes = saved.late_minutes,
            "checked in"
        );
        Ok(event(AlertKind::CheckIn, saved, &employee))
    }

    #[instrument(name = "hr.attendance.check_out", skip(self))]
    pub async fn check_out(&self, employee_id: Uuid) -> HrResult<AttendanceEvent> {
        let employee = find_employee(&self.db, employee_id).await?;
        let rules = PayrollRules::load(self.settings.as_ref()).await?;
        let now = self.clock.now().fixed_offset();

        let txn = self.db.begin().await?;
        let row = match find_day(&txn, employee_id, now.date_naive()).await? {
            Some(row) if row.check_in.is_none() => return Err(HrError::NotCheckedIn),
            Some(row) if row.check_out.is_some() => return Err(HrError::AlreadyCheckedOut),
            Some(row) => row,
            None => return Err(HrError::NotCheckedIn),
        };
        let mut draft = AttendanceDraft::from(&row);
        draft.check_out = Some(now);
        let draft = recompute(draft, &rules, self.clock.timezone());
        let saved = update_row(&txn, row, draft, now).await?;
        txn.commit().await?;

        info!(
            %employee_id,
            status = saved.status.as_str(),
            overtime_hours = %saved.overtime_hours(),
            "checked out"
        );
        Ok(event(AlertKind::CheckOut, saved, &employee))
    }

    /// Badge scan: checks in, then out, then refuses.
    pub async fn scan(&self, employee_id: Uuid) -> HrResult<AttendanceEvent> {
        let today = self.clock.today();
        match find_day(&self.db, employee_id, today).await? {
            Some(row) if row.check_in.is_some() && row.check_out.is_some() => {
                Err(HrError::AttendanceComplete)
            }
            Some(row) if row.check_in.is_some() => self.check_out(employee_id).await,
            _ => self.check_in(employee_id).await,
        }
    }

    /// Kiosk scan of an employee's personal badge.
    #[instrument(name = "hr.attendance.scan_qr", skip_all)]
    pub async fn scan_qr(&self, qr_code: &str) -> HrResult<AttendanceEvent> {
        let qr_code = qr_code.trim();
        let employee = employees::Entity::find()
            .filter(employees::Column::QrCode.eq(qr_code))
            .one(&self.db)
            .await?
            .ok_or_else(|| HrError::UnknownQrCode(qr_code.to_string()))?;
        self.scan(employee.id).await
    }

    /// Scan of the shared office code by an already identified employee. The
    /// token must match the `company_attendance_qr` setting; with no token
    /// configured every scan is refused.
    #[instrument(name = "hr.attendance.scan_company_qr", skip(self, token))]
    pub async fn scan_company_qr(
        &self,
        token: &str,
        employee_id: Uuid,
    ) -> HrResult<AttendanceEvent> {
        let expected = self.settings.get_setting(COMPANY_ATTENDANCE_QR).await?;
        match expected.as_deref().map(str::trim) {
            Some(expected) if !expected.is_empty() && expected == token.trim() => {
                self.scan(employee_id).await
            }
            _ => {
                warn!(%employee_id, "office attendance code rejected");
                Err(HrError::InvalidQrToken)
            }
        }
    }

    #[instrument(name = "hr.attendance.update", skip(self, patch))]
    pub async fn update(
        &self,
        attendance_id: Uuid,
        patch: AttendancePatch,
    ) -> HrResult<AttendanceEvent> {
        let rules = PayrollRules::load(self.settings.as_ref()).await?;
        let now = self.clock.now().fixed_offset();

        let txn = self.db.begin().await?;
        let row = attendances::Entity::find_by_id(attendance_id)
            .one(&txn)
            .await?
            .ok_or(HrError::AttendanceNotFound(attendance_id))?;
        let employee = find_employee(&txn, row.employee_id).await?;

        let mut draft = AttendanceDraft::from(&row);
        if let Some(date) = patch.date {
            draft.date = date;
        }
        if let Some(check_in) = patch.check_in {
            draft.check_in = check_in;
        }
        if let Some(check_out) = patch.check_out {
            draft.check_out = check_out;
        }
        if let Some(status) = patch.status {
            draft.status = status;
        }
        if let (Some(check_in), Some(check_out)) = (draft.check_in, draft.check_out) {
            if check_out < check_in {
                return Err(HrError::InvalidInput(
                    "check_out must not be before check_in".into(),
                ));
            }
        }
        let draft = recompute(draft, &rules, self.clock.timezone());
        let (employee_id, date) = (row.employee_id, draft.date);

        let saved = match update_row(&txn, row, draft, now).await {
            Ok(saved) => saved,
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                return Err(HrError::DuplicateAttendance { employee_id, date });
            }
            Err(err) => return Err(err.into()),
        };
        txn.commit().await?;
        Ok(event(AlertKind::Updated, saved, &employee))
    }

    /// Marks every day of `from..=to` as paid or unpaid leave, creating rows
    /// where none exist.
    #[instrument(name = "hr.attendance.mark_leave", skip(self))]
    pub async fn mark_leave(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        paid: bool,
    ) -> HrResult<Vec<AttendanceEvent>> {
        if to < from {
            return Err(HrError::InvalidInput("leave must end on or after its start".into()));
        }
        if (to - from).num_days() >= MAX_LEAVE_DAYS {
            return Err(HrError::InvalidInput(format!(
                "leave may span at most {MAX_LEAVE_DAYS} days"
            )));
        }
        let employee = find_employee(&self.db, employee_id).await?;
        let rules = PayrollRules::load(self.settings.as_ref()).await?;
        let now = self.clock.now().fixed_offset();
        let status = if paid { Status::LeavePaid } else { Status::LeaveUnpaid };

        let txn = self.db.begin().await?;
        let mut saved = Vec::new();
        for date in from.iter_days().take_while(|day| *day <= to) {
            let existing = find_day(&txn, employee_id, date).await?;
            let mut draft = existing
                .as_ref()
                .map(AttendanceDraft::from)
                .unwrap_or_else(|| AttendanceDraft::new(date));
            draft.status = status;
            let draft = recompute(draft, &rules, self.clock.timezone());
            let row = match existing {
                Some(row) => update_row(&txn, row, draft, now).await?,
                None => insert_row(&txn, employee_id, draft, now).await?,
            };
            saved.push(row);
        }
        txn.commit().await?;

        info!(%employee_id, days = saved.len(), status = status.as_str(), "leave recorded");
        Ok(saved
            .into_iter()
            .map(|row| event(AlertKind::Leave, row, &employee))
            .collect())
    }

    /// Closes a past day: rows checked in on time but never checked out
    /// become `present`. Returns how many rows changed.
    #[instrument(name = "hr.attendance.reconcile_day", skip(self))]
    pub async fn reconcile_day(&self, date: NaiveDate) -> HrResult<u64> {
        if date >= self.clock.today() {
            return Err(HrError::InvalidInput(format!(
                "{date} is not over yet in the organization timezone"
            )));
        }
        let now = self.clock.now().fixed_offset();
        let result = attendances::Entity::update_many()
            .col_expr(attendances::Column::Status, Expr::value(Status::Present))
            .col_expr(attendances::Column::UpdatedAt, Expr::value(now))
            .filter(attendances::Column::Date.eq(date))
            .filter(attendances::Column::CheckIn.is_not_null())
            .filter(attendances::Column::CheckOut.is_null())
            .filter(attendances::Column::LateMinutes.eq(0))
            .filter(attendances::Column::Status.eq(Status::Absent))
            .exec(&self.db)
            .await?;
        info!(%date, rows = result.rows_affected, "day reconciled");
        Ok(result.rows_affected)
    }

    pub async fn month_records(
        &self,
        employee_id: Uuid,
        period: SalaryPeriod,
    ) -> HrResult<Vec<attendances::Model>> {
        find_employee(&self.db, employee_id).await?;
        month_rows(&self.db, Some(employee_id), period).await
    }

    /// Counts for one employee, or everyone when `employee_id` is `None`.
    pub async fn month_stats(
        &self,
        employee_id: Option<Uuid>,
        period: SalaryPeriod,
    ) -> HrResult<AttendanceStats> {
        let rows = month_rows(&self.db, employee_id, period).await?;
        Ok(stats(&rows))
    }

    pub async fn get(&self, attendance_id: Uuid) -> HrResult<attendances::Model> {
        attendances::Entity::find_by_id(attendance_id)
            .one(&self.db)
            .await?
            .ok_or(HrError::AttendanceNotFound(attendance_id))
    }

    #[instrument(name = "hr.attendance.delete", skip(self))]
    pub async fn delete(&self, attendance_id: Uuid) -> HrResult<()> {
        let result = attendances::Entity::delete_by_id(attendance_id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(HrError::AttendanceNotFound(attendance_id));
        }
        Ok(())
    }
}

async fn find_employee<C: ConnectionTrait>(
    conn: &C,
    employee_id: Uuid,
) -> HrResult<employees::Model> {
    employees::Entity::find_by_id(employee_id)
        .one(conn)
        .await?
        .ok_or(HrError::EmployeeNotFound(employee_id))
}

/// Creates the day's row and commits. Losing the race on (employee, date)
/// to a concurrent check-in reports `AlreadyCheckedIn`.
async fn insert_check_in(
    txn: DatabaseTransaction,
    employee_id: Uuid,
    draft: AttendanceDraft,
    now: DateTime<FixedOffset>,
) -> HrResult<attendances::Model> {
    let date = draft.date;
    match insert_row(&txn, employee_id, draft, now).await {
        Ok(row) => {
            txn.commit().await?;
            Ok(row)
        }
        Err(err) if is_unique_violation(&err) => {
            txn.rollback().await?;
            warn!(%employee_id, %date, "concurrent check-in lost the race");
            Err(HrError::AlreadyCheckedIn)
        }
        Err(err) => Err(err.into()),
    }
}

fn event(
    kind: AlertKind,
    record: attendances::Model,
    employee: &employees::Model,
) -> AttendanceEvent {
    let alert = AttendanceAlert::new(kind, &record, &employee.name);
    AttendanceEvent { record, alert }
}

pub(crate) fn stats(rows: &[attendances::Model]) -> AttendanceStats {
    let mut tally = DayTally::default();
    let mut total_late_minutes = 0_i64;
    let mut total_overtime_hours = Decimal::ZERO;
    for row in rows {
        tally.add(row.status);
        total_late_minutes += i64::from(row.late_minutes);
        total_overtime_hours += row.overtime_hours();
    }
    AttendanceStats {
        present: tally.present,
        late: tally.late,
        absent: tally.absent,
        leave: tally.leave_paid + tally.leave_unpaid,
        total_records: tally.total(),
        total_late_minutes,
        total_overtime_hours,
    }
}

/// Rows whose date falls inside the period, oldest first.
pub(crate) async fn month_rows<C: ConnectionTrait>(
    conn: &C,
    employee_id: Option<Uuid>,
    period: SalaryPeriod,
) -> HrResult<Vec<attendances::Model>> {
    let (first, last) = period.bounds();
    let mut query = attendances::Entity::find()
        .filter(attendances::Column::Date.between(first, last));
    if let Some(employee_id) = employee_id {
        query = query.filter(attendances::Column::EmployeeId.eq(employee_id));
    }
    Ok(query
        .order_by_asc(attendances::Column::Date)
        .all(conn)
        .await?)
}

async fn find_day<C: ConnectionTrait>(
    conn: &C,
    employee_id: Uuid,
    date: NaiveDate,
) -> HrResult<Option<attendances::Model>> {
    Ok(attendances::Entity::find()
        .filter(attendances::Column::EmployeeId.eq(employee_id))
        .filter(attendances::Column::Date.eq(date))
        .one(conn)
        .await?)
}

async fn insert_row(
    txn: &DatabaseTransaction,
    employee_id: Uuid,
    draft: AttendanceDraft,
    now: DateTime<FixedOffset>,
) -> Result<attendances::Model, sea_orm::DbErr> {
    attendances::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(employee_id),
        date: Set(draft.date),
        check_in: Set(draft.check_in),
        check_out: Set(draft.check_out),
        late_minutes: Set(draft.late_minutes),
        overtime_centihours: Set(centihours(draft.overtime_hours)),
        status: Set(draft.status),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await
}

async fn update_row(
    txn: &DatabaseTransaction,
    row: attendances::Model,
    draft: AttendanceDraft,
    now: DateTime<FixedOffset>,
) -> Result<attendances::Model, sea_orm::DbErr> {
    let mut active: attendances::ActiveModel = row.into();
    active.date = Set(draft.date);
    active.check_in = Set(draft.check_in);
    active.check_out = Set(draft.check_out);
    active.late_minutes = Set(draft.late_minutes);
    active.overtime_centihours = Set(centihours(draft.overtime_hours));
    active.status = Set(draft.status);
    active.updated_at = Set(now);
    active.update(txn).await
}

fn centihours(hours: Decimal) -> i32 {
    i32::try_from(money::to_minor(hours)).unwrap_or(i32::MAX)
}
