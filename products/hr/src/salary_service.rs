//! Salary generation, bonus adjustment, slips and the monthly batch.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use entity::{employees, money, salaries};
use platform_db::is_unique_violation;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use tracing::{error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::{
    attendance_service::month_rows,
    clock::OrgClock,
    error::{HrError, HrResult},
    payroll::{self, DayRecord, PayTerms, SalaryFigures},
    period::SalaryPeriod,
    settings::{PayrollRules, SettingsProvider},
};

const MAX_HISTORY_PAGE: u64 = 200;

#[derive(Clone, Debug, Default)]
pub struct SalaryFilter {
    pub employee_id: Option<Uuid>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct BatchFailure {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub error: String,
}

/// Result of one monthly batch. A failed employee never aborts the rest.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub period: SalaryPeriod,
    pub generated: Vec<salaries::Model>,
    pub failures: Vec<BatchFailure>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SlipEmployee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub position: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SlipPeriod {
    pub month: u32,
    pub year: i32,
    pub month_name: &'static str,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct SlipAttendance {
    pub present_days: i32,
    pub absent_days: i32,
    pub leave_paid_days: i32,
    pub leave_unpaid_days: i32,
    pub late_days: i32,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct SlipBreakdown {
    pub base_salary: Decimal,
    pub overtime_pay: Decimal,
    pub bonus: Decimal,
    pub deduction: Decimal,
    pub total_salary: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct SalarySlip {
    pub salary_id: Uuid,
    pub employee: SlipEmployee,
    pub period: SlipPeriod,
    pub attendance_summary: SlipAttendance,
    pub salary_breakdown: SlipBreakdown,
    pub generated_at: DateTime<FixedOffset>,
}

#[derive(Clone)]
pub struct SalaryService {
    db: DatabaseConnection,
    clock: OrgClock,
    settings: Arc<dyn SettingsProvider>,
}

impl SalaryService {
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

    /// Returns the salary for the period, creating it on first request.
    /// An existing row is returned untouched.
    #[instrument(
        name = "hr.salary.generate",
        skip(self),
        fields(month = period.month(), year = period.year())
    )]
    pub async fn generate(
        &self,
        employee_id: Uuid,
        period: SalaryPeriod,
    ) -> HrResult<salaries::Model> {
        let employee = employees::Entity::find_by_id(employee_id)
            .one(&self.db)
            .await?
            .ok_or(HrError::EmployeeNotFound(employee_id))?;
        let rules = PayrollRules::load(self.settings.as_ref()).await?;

        let txn = self.db.begin().await?;
        if let Some(existing) = find_period(&txn, employee_id, period).await? {
            txn.commit().await?;
            return Ok(existing);
        }
        if employee.working_days <= 0 {
            return Err(HrError::InvalidEmployee {
                id: employee_id,
                reason: format!("working_days is {}", employee.working_days),
            });
        }

        let days: Vec<DayRecord> = month_rows(&txn, Some(employee_id), period)
            .await?
            .iter()
            .map(DayRecord::from)
            .collect();
        let figures = payroll::compute_salary(PayTerms::from(&employee), &days, &rules);

        let row = salary_row(employee_id, period, &figures, self.clock.now().fixed_offset());
        store_or_existing(&self.db, txn, row, employee_id, period).await
    }

    /// Generates salaries for every active employee.
    pub async fn generate_for_month(&self, period: SalaryPeriod) -> HrResult<BatchOutcome> {
        let span = info_span!(
            "hr.salary.generate_for_month",
            month = period.month(),
            year = period.year()
        );
        async move {
            let employees = employees::Entity::find()
                .filter(employees::Column::Status.eq(employees::Status::Active))
                .order_by_asc(employees::Column::Name)
                .all(&self.db)
                .await?;

            let mut outcome = BatchOutcome {
                period,
                generated: Vec::with_capacity(employees.len()),
                failures: Vec::new(),
            };
            for employee in employees {
                match self.generate(employee.id, period).await {
                    Ok(salary) => outcome.generated.push(salary),
                    Err(err) => {
                        error!(employee_id = %employee.id, error = %err, "salary generation failed");
                        outcome.failures.push(BatchFailure {
                            employee_id: employee.id,
                            employee_name: employee.name,
                            error: err.to_string(),
                        });
                    }
                }
            }
            info!(
                generated = outcome.generated.len(),
                failed = outcome.failures.len(),
                "salary batch finished"
            );
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Missing month or year is taken from the previous calendar month.
    pub async fn generate_for_period(
        &self,
        month: Option<u32>,
        year: Option<i32>,
    ) -> HrResult<BatchOutcome> {
        let period = self.resolve_period(month, year)?;
        self.generate_for_month(period).await
    }

    pub fn resolve_period(&self, month: Option<u32>, year: Option<i32>) -> HrResult<SalaryPeriod> {
        let previous = self.clock.previous_period();
        SalaryPeriod::new(
            month.unwrap_or(previous.month()),
            year.unwrap_or(previous.year()),
        )
    }

    /// Sets the bonus and re-derives the total from the current base salary.
    #[instrument(name = "hr.salary.update_bonus", skip(self))]
    pub async fn update_bonus(&self, salary_id: Uuid, bonus: Decimal) -> HrResult<salaries::Model> {
        if bonus.is_sign_negative() && !bonus.is_zero() {
            return Err(HrError::InvalidInput("bonus must not be negative".into()));
        }
        let txn = self.db.begin().await?;
        let salary = salaries::Entity::find_by_id(salary_id)
            .one(&txn)
            .await?
            .ok_or(HrError::SalaryNotFound(salary_id))?;
        let employee = employees::Entity::find_by_id(salary.employee_id)
            .one(&txn)
            .await?
            .ok_or(HrError::EmployeeNotFound(salary.employee_id))?;

        let bonus = money::round2(bonus);
        let total = payroll::total_salary(
            employee.base_salary(),
            salary.deduction(),
            salary.overtime_pay(),
            bonus,
        );
        let mut active: salaries::ActiveModel = salary.into();
        active.bonus_cents = Set(money::to_minor(bonus));
        active.total_salary_cents = Set(money::to_minor(total));
        active.updated_at = Set(self.clock.now().fixed_offset());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn get(&self, salary_id: Uuid) -> HrResult<salaries::Model> {
        salaries::Entity::find_by_id(salary_id)
            .one(&self.db)
            .await?
            .ok_or(HrError::SalaryNotFound(salary_id))
    }

    pub async fn salary_slip(&self, salary_id: Uuid) -> HrResult<SalarySlip> {
        let (salary, employee) = salaries::Entity::find_by_id(salary_id)
            .find_also_related(employees::Entity)
            .one(&self.db)
            .await?
            .ok_or(HrError::SalaryNotFound(salary_id))?;
        let employee = employee.ok_or(HrError::EmployeeNotFound(salary.employee_id))?;
        let period = SalaryPeriod::new(u32::try_from(salary.month).unwrap_or(0), salary.year)?;
        Ok(SalarySlip {
            salary_id: salary.id,
            employee: SlipEmployee {
                id: employee.id,
                name: employee.name.clone(),
                email: employee.email.clone(),
                position: employee.position.clone(),
            },
            period: SlipPeriod {
                month: period.month(),
                year: period.year(),
                month_name: period.month_name(),
            },
            attendance_summary: SlipAttendance {
                present_days: salary.present_days,
                absent_days: salary.absent_days,
                leave_paid_days: salary.leave_paid_days,
                leave_unpaid_days: salary.leave_unpaid_days,
                late_days: salary.late_days,
            },
            salary_breakdown: SlipBreakdown {
                base_salary: employee.base_salary(),
                overtime_pay: salary.overtime_pay(),
                bonus: salary.bonus(),
                deduction: salary.deduction(),
                total_salary: salary.total_salary(),
            },
            generated_at: salary.created_at,
        })
    }

    /// Newest period first.
    pub async fn history(&self, filter: SalaryFilter) -> HrResult<Vec<salaries::Model>> {
        let mut query = salaries::Entity::find();
        if let Some(employee_id) = filter.employee_id {
            query = query.filter(salaries::Column::EmployeeId.eq(employee_id));
        }
        if let Some(month) = filter.month {
            query = query.filter(salaries::Column::Month.eq(month as i32));
        }
        if let Some(year) = filter.year {
            query = query.filter(salaries::Column::Year.eq(year));
        }
        Ok(query
            .order_by_desc(salaries::Column::Year)
            .order_by_desc(salaries::Column::Month)
            .limit(filter.limit.unwrap_or(50).clamp(1, MAX_HISTORY_PAGE))
            .offset(filter.offset.unwrap_or(0))
            .all(&self.db)
            .await?)
    }
}

fn salary_row(
    employee_id: Uuid,
    period: SalaryPeriod,
    figures: &SalaryFigures,
    now: DateTime<FixedOffset>,
) -> salaries::ActiveModel {
    salaries::ActiveModel {
        id: Set(Uuid::new_v4()),
        employee_id: Set(employee_id),
        month: Set(period.month() as i32),
        year: Set(period.year()),
        present_days: Set(figures.tally.present),
        late_days: Set(figures.tally.late),
        absent_days: Set(figures.tally.absent),
        leave_paid_days: Set(figures.tally.leave_paid),
        leave_unpaid_days: Set(figures.tally.leave_unpaid),
        overtime_pay_cents: Set(money::to_minor(figures.overtime_pay)),
        deduction_cents: Set(money::to_minor(figures.deduction)),
        bonus_cents: Set(money::to_minor(figures.bonus)),
        total_salary_cents: Set(money::to_minor(figures.total_salary)),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Inserts and commits `row`. When a concurrent generation stored the period
/// first, rolls back and returns the stored row instead.
async fn store_or_existing(
    db: &DatabaseConnection,
    txn: DatabaseTransaction,
    row: salaries::ActiveModel,
    employee_id: Uuid,
    period: SalaryPeriod,
) -> HrResult<salaries::Model> {
    match row.insert(&txn).await {
        Ok(created) => {
            txn.commit().await?;
            info!(
                %employee_id,
                total_salary = %created.total_salary(),
                deduction = %created.deduction(),
                "salary generated"
            );
            Ok(created)
        }
        Err(err) if is_unique_violation(&err) => {
            txn.rollback().await?;
            warn!(%employee_id, "salary created concurrently, returning stored row");
            find_period(db, employee_id, period)
                .await?
                .ok_or_else(|| HrError::Db(err))
        }
        Err(err) => Err(err.into()),
    }
}

async fn find_period<C: ConnectionTrait>(
    conn: &C,
    employee_id: Uuid,
    period: SalaryPeriod,
) -> HrResult<Option<salaries::Model>> {
    Ok(salaries::Entity::find()
        .filter(salaries::Column::EmployeeId.eq(employee_id))
        .filter(salaries::Column::Month.eq(period.month() as i32))
        .filter(salaries::Column::Year.eq(period.year()))
        .one(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal_macros::dec;
    use sea_orm::{ConnectOptions, Database};

    use crate::employees::{EmployeeService, NewEmployee};

    async fn migrated() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn lost_insert_race_returns_stored_salary() {
        let db = migrated().await;
        let employee = EmployeeService::new(db.clone())
            .create_employee(NewEmployee {
                name: "Vanna".into(),
                email: "vanna@clinic.test".into(),
                phone: None,
                position: None,
                base_salary: dec!(900),
                working_days: 30,
                overtime_rate: dec!(6),
                qr_code: None,
            })
            .await
            .unwrap();
        let period = SalaryPeriod::new(3, 2026).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 1, 0, 0).unwrap().fixed_offset();
        let rules = PayrollRules::default();
        let no_days: [DayRecord; 0] = [];
        let figures = payroll::compute_salary(PayTerms::from(&employee), &no_days, &rules);

        // Stored by the competing generation after our existence check.
        let txn = db.begin().await.unwrap();
        let stored = salary_row(employee.id, period, &figures, now)
            .insert(&txn)
            .await
            .unwrap();
        txn.commit().await.unwrap();

        let mut late = figures;
        late.total_salary = dec!(1);
        let row = salary_row(employee.id, period, &late, now);
        let returned = store_or_existing(&db, db.begin().await.unwrap(), row, employee.id, period)
            .await
            .unwrap();
        assert_eq!(returned.id, stored.id);
        assert_eq!(returned.total_salary(), dec!(900));
        assert_eq!(salaries::Entity::find().all(&db).await.unwrap().len(), 1);
    }
}
