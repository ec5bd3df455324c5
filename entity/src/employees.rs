use crate::{attendances, money, salaries};
use rust_decimal::Decimal;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub base_salary_cents: i64,
    pub working_days: i32,
    /// Always `base_salary / working_days` for the last saved pair.
    pub salary_per_day_cents: i64,
    pub overtime_rate_cents: i64,
    pub status: Status,
    /// Personal badge scanned at the attendance kiosk.
    #[sea_orm(unique)]
    pub qr_code: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn base_salary(&self) -> Decimal {
        money::from_minor(self.base_salary_cents)
    }

    pub fn salary_per_day(&self) -> Decimal {
        money::from_minor(self.salary_per_day_cents)
    }

    pub fn overtime_rate(&self) -> Decimal {
        money::from_minor(self.overtime_rate_cents)
    }
}

#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Attendance,
    Salary,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Attendance => Entity::has_many(attendances::Entity).into(),
            Relation::Salary => Entity::has_many(salaries::Entity).into(),
        }
    }
}

impl Related<attendances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl Related<salaries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Salary.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
