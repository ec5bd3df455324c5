use crate::{employees, money};
use rust_decimal::Decimal;
use sea_orm::prelude::{Date, DateTimeWithTimeZone, *};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per (employee, calendar date in the organization timezone).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "attendances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub employee_id: Uuid,
    pub date: Date,
    pub check_in: Option<DateTimeWithTimeZone>,
    pub check_out: Option<DateTimeWithTimeZone>,
    pub late_minutes: i32,
    /// Overtime in hundredths of an hour.
    pub overtime_centihours: i32,
    pub status: Status,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn overtime_hours(&self) -> Decimal {
        money::from_minor(i64::from(self.overtime_centihours))
    }
}

#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "late")]
    Late,
    #[sea_orm(string_value = "absent")]
    Absent,
    #[sea_orm(string_value = "leave_paid")]
    LeavePaid,
    #[sea_orm(string_value = "leave_unpaid")]
    LeaveUnpaid,
}

impl Status {
    /// Manually assigned leave; automatic derivation never overwrites it.
    pub fn is_leave(self) -> bool {
        matches!(self, Status::LeavePaid | Status::LeaveUnpaid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Late => "late",
            Status::Absent => "absent",
            Status::LeavePaid => "leave_paid",
            Status::LeaveUnpaid => "leave_unpaid",
        }
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
