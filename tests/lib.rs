//! Shared fixtures for the sqlite-backed integration tests.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use entity::{attendances, employees, money};
use migration::{Migrator, MigratorTrait};
use products_hr::{
    DbSettings, FixedClock, HrModule, NewEmployee, OrgClock, clock::local_instant,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

pub const TZ: Tz = chrono_tz::Asia::Phnom_Penh;

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub clock: FixedClock,
    pub hr: HrModule,
    pub settings: DbSettings,
}

impl TestEnv {
    /// Fresh migrated in-memory database; the clock starts at 08:00 local on `date`.
    pub async fn at(date: NaiveDate) -> Self {
        // A single connection keeps every query on the same in-memory database.
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.expect("sqlite connect");
        Migrator::up(&db, None).await.expect("migrate");

        let clock = FixedClock::new(Utc::now());
        let env = Self {
            hr: HrModule::with_db_settings(
                db.clone(),
                OrgClock::new(TZ, Arc::new(clock.clone())),
            ),
            settings: DbSettings::new(db.clone()),
            db,
            clock,
        };
        env.set_local(date, 8, 0, 0);
        env
    }

    pub fn set_local(&self, date: NaiveDate, hour: u32, minute: u32, second: u32) {
        let time = NaiveTime::from_hms_opt(hour, minute, second).expect("valid time");
        let instant = local_instant(TZ, date.and_time(time)).with_timezone(&Utc);
        self.clock.set(instant);
    }

    pub async fn employee(
        &self,
        name: &str,
        base_salary: Decimal,
        working_days: i32,
        overtime_rate: Decimal,
    ) -> employees::Model {
        self.hr
            .employees()
            .create_employee(NewEmployee {
                name: name.to_string(),
                email: format!("{}@clinic.test", name.to_lowercase()),
                phone: None,
                position: Some("Nurse".into()),
                base_salary,
                working_days,
                overtime_rate,
                qr_code: None,
            })
            .await
            .expect("create employee")
    }

    /// Writes an attendance row directly, bypassing the engine.
    pub async fn raw_attendance(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
        status: attendances::Status,
        late_minutes: i32,
        overtime_hours: Decimal,
    ) -> attendances::Model {
        let now = Utc::now();
        attendances::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee_id),
            date: Set(date),
            check_in: Set(None),
            check_out: Set(None),
            late_minutes: Set(late_minutes),
            overtime_centihours: Set(money::to_minor(overtime_hours) as i32),
            status: Set(status),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&self.db)
        .await
        .expect("insert attendance")
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
