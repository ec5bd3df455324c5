use async_graphql::{Context, Json, Object, SimpleObject};
use chrono::{DateTime, FixedOffset};
use entity::salaries;
use products_hr::{BatchOutcome, SalaryFilter, SalarySlip};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use super::{hr, hr_error, period};

const MAX_HISTORY_PAGE: i32 = 200;

#[derive(Clone, Debug, SimpleObject)]
pub struct SalaryNode {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub present_days: i32,
    pub late_days: i32,
    pub absent_days: i32,
    pub leave_paid_days: i32,
    pub leave_unpaid_days: i32,
    pub overtime_pay: Decimal,
    pub deduction: Decimal,
    pub bonus: Decimal,
    pub total_salary: Decimal,
    pub created_at: DateTime<FixedOffset>,
}

impl From<salaries::Model> for SalaryNode {
    fn from(model: salaries::Model) -> Self {
        Self {
            id: model.id,
            employee_id: model.employee_id,
            month: model.month,
            year: model.year,
            present_days: model.present_days,
            late_days: model.late_days,
            absent_days: model.absent_days,
            leave_paid_days: model.leave_paid_days,
            leave_unpaid_days: model.leave_unpaid_days,
            overtime_pay: model.overtime_pay(),
            deduction: model.deduction(),
            bonus: model.bonus(),
            total_salary: model.total_salary(),
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct BatchFailureNode {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub error: String,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct BatchPayload {
    pub month: i32,
    pub year: i32,
    pub generated: Vec<SalaryNode>,
    pub failures: Vec<BatchFailureNode>,
}

impl From<BatchOutcome> for BatchPayload {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            month: outcome.period.month() as i32,
            year: outcome.period.year(),
            generated: outcome.generated.into_iter().map(SalaryNode::from).collect(),
            failures: outcome
                .failures
                .into_iter()
                .map(|failure| BatchFailureNode {
                    employee_id: failure.employee_id,
                    employee_name: failure.employee_name,
                    error: failure.error,
                })
                .collect(),
        }
    }
}

#[derive(Default)]
pub struct PayrollQuery;

#[Object]
impl PayrollQuery {
    async fn salary(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<SalaryNode> {
        let row = hr(ctx)?.salaries().get(id).await.map_err(hr_error)?;
        Ok(row.into())
    }

    #[graphql(name = "salaryHistory")]
    async fn salary_history(
        &self,
        ctx: &Context<'_>,
        employee_id: Option<Uuid>,
        month: Option<i32>,
        year: Option<i32>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<SalaryNode>> {
        let filter = SalaryFilter {
            employee_id,
            month: month.and_then(|m| u32::try_from(m).ok()),
            year,
            limit: Some(first.unwrap_or(10).clamp(1, MAX_HISTORY_PAGE) as u64),
            offset: Some(offset.unwrap_or(0).max(0) as u64),
        };
        let rows = hr(ctx)?
            .salaries()
            .history(filter)
            .await
            .map_err(hr_error)?;
        Ok(rows.into_iter().map(SalaryNode::from).collect())
    }

    /// Printable slip: employee, period, attendance summary and breakdown.
    #[graphql(name = "salarySlip")]
    async fn salary_slip(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
    ) -> async_graphql::Result<Json<SalarySlip>> {
        let slip = hr(ctx)?.salaries().salary_slip(id).await.map_err(hr_error)?;
        Ok(Json(slip))
    }
}

#[derive(Default)]
pub struct PayrollMutation;

#[Object]
impl PayrollMutation {
    #[instrument(name = "graphql.salary.generate", skip(self, ctx))]
    async fn generate_salary(
        &self,
        ctx: &Context<'_>,
        employee_id: Uuid,
        month: i32,
        year: i32,
    ) -> async_graphql::Result<SalaryNode> {
        let row = hr(ctx)?
            .salaries()
            .generate(employee_id, period(month, year)?)
            .await
            .map_err(hr_error)?;
        Ok(row.into())
    }

    /// Every active employee; defaults to the previous month.
    #[instrument(name = "graphql.salary.generate_monthly", skip(self, ctx))]
    async fn generate_monthly_salaries(
        &self,
        ctx: &Context<'_>,
        month: Option<i32>,
        year: Option<i32>,
    ) -> async_graphql::Result<BatchPayload> {
        let salaries = hr(ctx)?.salaries();
        let fallback = salaries.resolve_period(None, None).map_err(hr_error)?;
        let target = period(
            month.unwrap_or(fallback.month() as i32),
            year.unwrap_or(fallback.year()),
        )?;
        let outcome = salaries
            .generate_for_month(target)
            .await
            .map_err(hr_error)?;
        Ok(outcome.into())
    }

    #[instrument(name = "graphql.salary.update_bonus", skip(self, ctx))]
    async fn update_bonus(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        bonus: Decimal,
    ) -> async_graphql::Result<SalaryNode> {
        let row = hr(ctx)?
            .salaries()
            .update_bonus(id, bonus)
            .await
            .map_err(hr_error)?;
        Ok(row.into())
    }
}
