pub use sea_orm_migration::prelude::*;

mod m20260122_000001_employees_attendance;
mod m20260122_000002_settings_salaries;
mod m20260123_000003_employee_qr_codes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260122_000001_employees_attendance::Migration),
            Box::new(m20260122_000002_settings_salaries::Migration),
            Box::new(m20260123_000003_employee_qr_codes::Migration),
        ]
    }
}
