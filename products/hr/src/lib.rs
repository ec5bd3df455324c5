//! Attendance and payroll for the clinic back office.
//!
//! Pure rules live in [`attendance`] and [`payroll`]; the `*_service`
//! modules wrap them in transactions against the shared store.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub mod attendance;
pub mod attendance_service;
pub mod clock;
pub mod employees;
pub mod error;
pub mod notify;
pub mod payroll;
pub mod period;
pub mod salary_service;
pub mod settings;

pub use attendance_service::{
    AttendanceEvent, AttendancePatch, AttendanceService, AttendanceStats,
};
pub use clock::{Clock, FixedClock, OrgClock, SystemClock};
pub use employees::{EmployeePatch, EmployeeService, NewEmployee};
pub use error::{HrError, HrResult};
pub use notify::{AlertKind, AlertSink, AttendanceAlert, TracingSink};
pub use period::SalaryPeriod;
pub use salary_service::{BatchFailure, BatchOutcome, SalaryFilter, SalaryService, SalarySlip};
pub use settings::{DbSettings, PayrollRules, SettingsProvider, StaticSettings};

/// Services sharing one connection, clock and settings source.
#[derive(Clone)]
pub struct HrModule {
    clock: OrgClock,
    employees: EmployeeService,
    attendance: AttendanceService,
    salaries: SalaryService,
}

impl HrModule {
    pub fn new(
        db: DatabaseConnection,
        clock: OrgClock,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            employees: EmployeeService::new(db.clone()),
            attendance: AttendanceService::new(db.clone(), clock.clone(), settings.clone()),
            salaries: SalaryService::new(db, clock.clone(), settings),
            clock,
        }
    }

    /// Settings read from the `settings` table.
    pub fn with_db_settings(db: DatabaseConnection, clock: OrgClock) -> Self {
        let settings = Arc::new(DbSettings::new(db.clone()));
        Self::new(db, clock, settings)
    }

    pub fn clock(&self) -> &OrgClock {
        &self.clock
    }

    pub fn employees(&self) -> &EmployeeService {
        &self.employees
    }

    pub fn attendance(&self) -> &AttendanceService {
        &self.attendance
    }

    pub fn salaries(&self) -> &SalaryService {
        &self.salaries
    }
}
