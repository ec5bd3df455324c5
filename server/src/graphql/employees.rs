use async_graphql::{Context, Enum, InputObject, MaybeUndefined, Object, SimpleObject};
use chrono::{DateTime, FixedOffset};
use entity::employees;
use products_hr::{EmployeePatch, NewEmployee};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use super::{hr, hr_error, patch_value};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum EmployeeStatus {
    #[graphql(name = "ACTIVE")]
    Active,
    #[graphql(name = "INACTIVE")]
    Inactive,
}

impl From<employees::Status> for EmployeeStatus {
    fn from(value: employees::Status) -> Self {
        match value {
            employees::Status::Active => Self::Active,
            employees::Status::Inactive => Self::Inactive,
        }
    }
}

impl From<EmployeeStatus> for employees::Status {
    fn from(value: EmployeeStatus) -> Self {
        match value {
            EmployeeStatus::Active => Self::Active,
            EmployeeStatus::Inactive => Self::Inactive,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeeNode {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub base_salary: Decimal,
    pub working_days: i32,
    pub salary_per_day: Decimal,
    pub overtime_rate: Decimal,
    pub status: EmployeeStatus,
    pub qr_code: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<employees::Model> for EmployeeNode {
    fn from(model: employees::Model) -> Self {
        Self {
            id: model.id,
            base_salary: model.base_salary(),
            salary_per_day: model.salary_per_day(),
            overtime_rate: model.overtime_rate(),
            name: model.name,
            email: model.email,
            phone: model.phone,
            position: model.position,
            working_days: model.working_days,
            status: model.status.into(),
            qr_code: model.qr_code,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(InputObject)]
pub struct CreateEmployeeInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub base_salary: Decimal,
    pub working_days: i32,
    pub overtime_rate: Decimal,
    pub qr_code: Option<String>,
}

/// Omitted fields stay unchanged; `qrCode: null` removes the badge.
#[derive(InputObject, Default)]
pub struct UpdateEmployeeInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub base_salary: Option<Decimal>,
    pub working_days: Option<i32>,
    pub overtime_rate: Option<Decimal>,
    pub status: Option<EmployeeStatus>,
    pub qr_code: MaybeUndefined<String>,
}

#[derive(Default)]
pub struct EmployeeQuery;

#[Object]
impl EmployeeQuery {
    async fn employees(
        &self,
        ctx: &Context<'_>,
        status: Option<EmployeeStatus>,
    ) -> async_graphql::Result<Vec<EmployeeNode>> {
        let rows = hr(ctx)?
            .employees()
            .list_employees(status.map(Into::into))
            .await
            .map_err(hr_error)?;
        Ok(rows.into_iter().map(EmployeeNode::from).collect())
    }

    async fn employee(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<EmployeeNode> {
        let row = hr(ctx)?
            .employees()
            .get_employee(id)
            .await
            .map_err(hr_error)?;
        Ok(row.into())
    }
}

#[derive(Default)]
pub struct EmployeeMutation;

#[Object]
impl EmployeeMutation {
    #[instrument(name = "graphql.employees.create", skip_all)]
    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: CreateEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let row = hr(ctx)?
            .employees()
            .create_employee(NewEmployee {
                name: input.name,
                email: input.email,
                phone: input.phone,
                position: input.position,
                base_salary: input.base_salary,
                working_days: input.working_days,
                overtime_rate: input.overtime_rate,
                qr_code: input.qr_code,
            })
            .await
            .map_err(hr_error)?;
        Ok(row.into())
    }

    #[instrument(name = "graphql.employees.update", skip(self, ctx, input))]
    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let patch = EmployeePatch {
            name: input.name,
            email: input.email,
            phone: input.phone,
            position: input.position,
            base_salary: input.base_salary,
            working_days: input.working_days,
            overtime_rate: input.overtime_rate,
            status: input.status.map(Into::into),
            qr_code: patch_value(input.qr_code),
        };
        let row = hr(ctx)?
            .employees()
            .update_employee(id, patch)
            .await
            .map_err(hr_error)?;
        Ok(row.into())
    }

    #[instrument(name = "graphql.employees.delete", skip(self, ctx))]
    async fn delete_employee(&self, ctx: &Context<'_>, id: Uuid) -> async_graphql::Result<bool> {
        hr(ctx)?
            .employees()
            .delete_employee(id)
            .await
            .map_err(hr_error)?;
        Ok(true)
    }
}
