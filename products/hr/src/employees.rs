//! Employee records and the derived daily rate.

use chrono::Utc;
use entity::{employees, employees::Status, money};
use platform_db::is_unique_violation;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{HrError, HrResult},
    payroll,
};

#[derive(Clone, Debug, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub base_salary: Decimal,
    pub working_days: i32,
    pub overtime_rate: Decimal,
    #[serde(default)]
    pub qr_code: Option<String>,
}

/// Fields left as `None` keep their stored value. `qr_code: Some(None)`
/// removes the badge.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub base_salary: Option<Decimal>,
    pub working_days: Option<i32>,
    pub overtime_rate: Option<Decimal>,
    pub status: Option<Status>,
    #[serde(default)]
    pub qr_code: Option<Option<String>>,
}

#[derive(Clone, Debug)]
pub struct EmployeeService {
    db: DatabaseConnection,
}

impl EmployeeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[instrument(name = "hr.employees.create", skip_all, fields(email = %input.email))]
    pub async fn create_employee(&self, input: NewEmployee) -> HrResult<employees::Model> {
        let name = required("name", &input.name)?;
        let email = normalize_email(&input.email)?;
        non_negative("base_salary", input.base_salary)?;
        non_negative("overtime_rate", input.overtime_rate)?;
        let qr_code = input.qr_code.as_deref().and_then(badge);

        let now = Utc::now();
        let row = employees::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            email: Set(email.clone()),
            phone: Set(input.phone),
            position: Set(input.position),
            base_salary_cents: Set(money::to_minor(input.base_salary)),
            working_days: Set(input.working_days),
            salary_per_day_cents: Set(daily_rate_cents(input.base_salary, input.working_days)),
            overtime_rate_cents: Set(money::to_minor(input.overtime_rate)),
            status: Set(Status::Active),
            qr_code: Set(qr_code.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let created = match row.insert(&self.db).await {
            Ok(created) => created,
            Err(err) => {
                return Err(self
                    .unique_conflict(err, None, Some(&email), qr_code.as_deref())
                    .await);
            }
        };
        info!(employee_id = %created.id, "employee created");
        Ok(created)
    }

    /// Applies `patch` and recomputes `salary_per_day` from the resulting pair.
    #[instrument(name = "hr.employees.update", skip(self, patch))]
    pub async fn update_employee(
        &self,
        id: Uuid,
        patch: EmployeePatch,
    ) -> HrResult<employees::Model> {
        let existing = self.get_employee(id).await?;
        let base_salary = patch.base_salary.unwrap_or_else(|| existing.base_salary());
        let working_days = patch.working_days.unwrap_or(existing.working_days);
        non_negative("base_salary", base_salary)?;

        let mut row: employees::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            row.name = Set(required("name", &name)?);
        }
        let email = match patch.email {
            Some(email) => {
                let email = normalize_email(&email)?;
                row.email = Set(email.clone());
                Some(email)
            }
            None => None,
        };
        if let Some(phone) = patch.phone {
            row.phone = Set(Some(phone));
        }
        if let Some(position) = patch.position {
            row.position = Set(Some(position));
        }
        if let Some(rate) = patch.overtime_rate {
            non_negative("overtime_rate", rate)?;
            row.overtime_rate_cents = Set(money::to_minor(rate));
        }
        if let Some(status) = patch.status {
            row.status = Set(status);
        }
        let qr_code = match patch.qr_code {
            Some(code) => {
                let code = code.as_deref().and_then(badge);
                row.qr_code = Set(code.clone());
                code
            }
            None => None,
        };
        row.base_salary_cents = Set(money::to_minor(base_salary));
        row.working_days = Set(working_days);
        row.salary_per_day_cents = Set(daily_rate_cents(base_salary, working_days));
        row.updated_at = Set(Utc::now().into());

        match row.update(&self.db).await {
            Ok(updated) => Ok(updated),
            Err(err) => Err(self
                .unique_conflict(err, Some(id), email.as_deref(), qr_code.as_deref())
                .await),
        }
    }

    pub async fn get_employee(&self, id: Uuid) -> HrResult<employees::Model> {
        employees::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(HrError::EmployeeNotFound(id))
    }

    pub async fn list_employees(&self, status: Option<Status>) -> HrResult<Vec<employees::Model>> {
        let mut query = employees::Entity::find();
        if let Some(status) = status {
            query = query.filter(employees::Column::Status.eq(status));
        }
        Ok(query
            .order_by_asc(employees::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn list_active(&self) -> HrResult<Vec<employees::Model>> {
        self.list_employees(Some(Status::Active)).await
    }

    /// Names the unique key an insert or update collided with.
    async fn unique_conflict(
        &self,
        err: DbErr,
        id: Option<Uuid>,
        email: Option<&str>,
        qr_code: Option<&str>,
    ) -> HrError {
        if !is_unique_violation(&err) {
            return err.into();
        }
        if let Some(email) = email {
            match self.held_by_other(employees::Column::Email, email, id).await {
                Ok(true) => return HrError::DuplicateEmail(email.to_string()),
                Ok(false) => {}
                Err(lookup) => return lookup,
            }
        }
        if let Some(qr_code) = qr_code {
            match self.held_by_other(employees::Column::QrCode, qr_code, id).await {
                Ok(true) => return HrError::DuplicateQrCode(qr_code.to_string()),
                Ok(false) => {}
                Err(lookup) => return lookup,
            }
        }
        err.into()
    }

    async fn held_by_other(
        &self,
        column: employees::Column,
        value: &str,
        id: Option<Uuid>,
    ) -> HrResult<bool> {
        let mut query = employees::Entity::find().filter(column.eq(value));
        if let Some(id) = id {
            query = query.filter(employees::Column::Id.ne(id));
        }
        Ok(query.one(&self.db).await?.is_some())
    }

    /// Removes the employee together with their attendance and salary rows.
    #[instrument(name = "hr.employees.delete", skip(self))]
    pub async fn delete_employee(&self, id: Uuid) -> HrResult<()> {
        let result = employees::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(HrError::EmployeeNotFound(id));
        }
        Ok(())
    }
}

fn daily_rate_cents(base_salary: Decimal, working_days: i32) -> i64 {
    money::to_minor(payroll::salary_per_day(base_salary, working_days))
}

fn required(field: &str, value: &str) -> HrResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HrError::InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn normalize_email(raw: &str) -> HrResult<String> {
    let email = required("email", raw)?.to_lowercase();
    if !email.contains('@') {
        return Err(HrError::InvalidInput(format!("{email} is not an email address")));
    }
    Ok(email)
}

fn non_negative(field: &str, value: Decimal) -> HrResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(HrError::InvalidInput(format!("{field} must not be negative")));
    }
    Ok(())
}

/// Trimmed badge text; blank means no badge.
fn badge(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
