use crate::{employees, money};
use rust_decimal::Decimal;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

/// One row per salary period (employee, month, year). Never regenerated.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "salaries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub employee_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub present_days: i32,
    pub late_days: i32,
    pub absent_days: i32,
    pub leave_paid_days: i32,
    pub leave_unpaid_days: i32,
    pub overtime_pay_cents: i64,
    pub deduction_cents: i64,
    pub bonus_cents: i64,
    pub total_salary_cents: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn overtime_pay(&self) -> Decimal {
        money::from_minor(self.overtime_pay_cents)
    }

    pub fn deduction(&self) -> Decimal {
        money::from_minor(self.deduction_cents)
    }

    pub fn bonus(&self) -> Decimal {
        money::from_minor(self.bonus_cents)
    }

    pub fn total_salary(&self) -> Decimal {
        money::from_minor(self.total_salary_cents)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "employees::Entity",
        from = "Column::EmployeeId",
        to = "employees::Column::Id",
        on_delete = "Cascade"
    )]
    Employee,
}

impl Related<employees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
