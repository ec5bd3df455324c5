use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum HrError {
    #[error("employee {0} not found")]
    EmployeeNotFound(Uuid),
    #[error("attendance {0} not found")]
    AttendanceNotFound(Uuid),
    #[error("salary {0} not found")]
    SalaryNotFound(Uuid),
    #[error("employee already checked in today")]
    AlreadyCheckedIn,
    #[error("employee must check in first")]
    NotCheckedIn,
    #[error("employee already checked out today")]
    AlreadyCheckedOut,
    #[error("attendance already completed (check-in and check-out) for today")]
    AttendanceComplete,
    #[error("employee {employee_id} already has attendance on {date}")]
    DuplicateAttendance { employee_id: Uuid, date: NaiveDate },
    #[error("invalid salary period {month}/{year}")]
    InvalidPeriod { month: u32, year: i32 },
    #[error("employee {id} cannot be paid: {reason}")]
    InvalidEmployee { id: Uuid, reason: String },
    #[error("email {0} is already registered")]
    DuplicateEmail(String),
    #[error("qr code {0} is already assigned")]
    DuplicateQrCode(String),
    #[error("no employee holds qr code {0}")]
    UnknownQrCode(String),
    #[error("invalid attendance code for this office")]
    InvalidQrToken,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

pub type HrResult<T> = Result<T, HrError>;
