use entity::{attendances, attendances::Status, employees, salaries};
use products_hr::{EmployeePatch, HrError, SalaryFilter, SalaryPeriod, settings};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use suite_tests::{TestEnv, date};

fn march() -> SalaryPeriod {
    SalaryPeriod::new(3, 2026).unwrap()
}

/// 20 present days (three with an hour of overtime), 2 absent, 1 unpaid leave.
async fn seed_example_month(env: &TestEnv, employee_id: uuid::Uuid) {
    for day in 1..=20 {
        let overtime = if day <= 3 { dec!(1) } else { Decimal::ZERO };
        env.raw_attendance(employee_id, date(2026, 3, day), Status::Present, 0, overtime)
            .await;
    }
    env.raw_attendance(employee_id, date(2026, 3, 21), Status::Absent, 0, Decimal::ZERO)
        .await;
    env.raw_attendance(employee_id, date(2026, 3, 22), Status::Absent, 0, Decimal::ZERO)
        .await;
    env.raw_attendance(employee_id, date(2026, 3, 23), Status::LeaveUnpaid, 0, Decimal::ZERO)
        .await;
}

#[tokio::test]
async fn aggregates_the_calendar_month() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    assert_eq!(nurse.salary_per_day(), dec!(30));
    seed_example_month(&env, nurse.id).await;
    // Neighbouring months stay out of the window.
    env.raw_attendance(nurse.id, date(2026, 2, 28), Status::Absent, 0, Decimal::ZERO)
        .await;
    env.raw_attendance(nurse.id, date(2026, 4, 1), Status::Absent, 0, Decimal::ZERO)
        .await;

    let salary = env.hr.salaries().generate(nurse.id, march()).await.unwrap();
    assert_eq!((salary.month, salary.year), (3, 2026));
    assert_eq!(salary.present_days, 20);
    assert_eq!(salary.absent_days, 2);
    assert_eq!(salary.leave_unpaid_days, 1);
    assert_eq!(salary.late_days, 0);
    assert_eq!(salary.deduction(), dec!(90));
    assert_eq!(salary.overtime_pay(), dec!(6));
    assert_eq!(salary.bonus(), Decimal::ZERO);
    assert_eq!(salary.total_salary(), dec!(816));
}

#[tokio::test]
async fn late_tiers_use_configured_percentages() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    env.raw_attendance(nurse.id, date(2026, 3, 2), Status::Late, 15, Decimal::ZERO)
        .await;
    env.raw_attendance(nurse.id, date(2026, 3, 3), Status::Late, 45, Decimal::ZERO)
        .await;
    env.raw_attendance(nurse.id, date(2026, 3, 4), Status::Late, 5, Decimal::ZERO)
        .await;

    let salary = env.hr.salaries().generate(nurse.id, march()).await.unwrap();
    assert_eq!(salary.late_days, 3);
    assert_eq!(salary.deduction(), dec!(4.50));
    assert_eq!(salary.total_salary(), dec!(895.50));

    let other = env.employee("Sok", dec!(900), 30, dec!(2)).await;
    env.settings
        .put_setting(settings::LATE_30_MIN_PENALTY, "50", None)
        .await
        .unwrap();
    env.raw_attendance(other.id, date(2026, 3, 3), Status::Late, 45, Decimal::ZERO)
        .await;
    let salary = env.hr.salaries().generate(other.id, march()).await.unwrap();
    assert_eq!(salary.deduction(), dec!(15));
}

#[tokio::test]
async fn regeneration_returns_the_stored_row() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    seed_example_month(&env, nurse.id).await;

    let first = env.hr.salaries().generate(nurse.id, march()).await.unwrap();
    env.raw_attendance(nurse.id, date(2026, 3, 24), Status::Absent, 0, Decimal::ZERO)
        .await;
    let second = env.hr.salaries().generate(nurse.id, march()).await.unwrap();
    assert_eq!(first, second);

    let stored = salaries::Entity::find()
        .filter(salaries::Column::EmployeeId.eq(nurse.id))
        .count(&env.db)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn concurrent_generation_yields_one_row() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    seed_example_month(&env, nurse.id).await;

    let salaries = env.hr.salaries();
    let (a, b) = tokio::join!(
        salaries.generate(nurse.id, march()),
        salaries.generate(nurse.id, march())
    );
    assert_eq!(a.unwrap().id, b.unwrap().id);
    let history = salaries
        .history(SalaryFilter {
            employee_id: Some(nurse.id),
            ..SalaryFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn employees_without_working_days_cannot_be_paid() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let intern = env.employee("Intern", dec!(500), 0, dec!(1)).await;
    assert_eq!(intern.salary_per_day(), Decimal::ZERO);
    assert!(matches!(
        env.hr.salaries().generate(intern.id, march()).await,
        Err(HrError::InvalidEmployee { .. })
    ));
    assert!(matches!(
        env.hr.salaries().generate(uuid::Uuid::new_v4(), march()).await,
        Err(HrError::EmployeeNotFound(_))
    ));
}

#[tokio::test]
async fn bonus_rederives_total_from_current_base() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    seed_example_month(&env, nurse.id).await;
    let salary = env.hr.salaries().generate(nurse.id, march()).await.unwrap();

    let updated = env.hr.salaries().update_bonus(salary.id, dec!(50)).await.unwrap();
    assert_eq!(updated.bonus(), dec!(50));
    assert_eq!(updated.total_salary(), dec!(866));
    assert_eq!(updated.deduction(), salary.deduction());

    env.hr
        .employees()
        .update_employee(
            nurse.id,
            EmployeePatch {
                base_salary: Some(dec!(1000)),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap();
    let updated = env.hr.salaries().update_bonus(salary.id, dec!(0)).await.unwrap();
    assert_eq!(updated.total_salary(), dec!(916));

    assert!(matches!(
        env.hr.salaries().update_bonus(salary.id, dec!(-1)).await,
        Err(HrError::InvalidInput(_))
    ));
    assert!(matches!(
        env.hr.salaries().update_bonus(uuid::Uuid::new_v4(), dec!(1)).await,
        Err(HrError::SalaryNotFound(_))
    ));
}

#[tokio::test]
async fn slip_names_the_month() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    seed_example_month(&env, nurse.id).await;
    let salary = env.hr.salaries().generate(nurse.id, march()).await.unwrap();
    env.hr.salaries().update_bonus(salary.id, dec!(25)).await.unwrap();

    let slip = env.hr.salaries().salary_slip(salary.id).await.unwrap();
    assert_eq!(slip.employee.email, "dara@clinic.test");
    assert_eq!(slip.period.month_name, "March");
    assert_eq!(slip.attendance_summary.present_days, 20);
    assert_eq!(slip.attendance_summary.leave_unpaid_days, 1);
    assert_eq!(slip.salary_breakdown.base_salary, dec!(900));
    assert_eq!(slip.salary_breakdown.bonus, dec!(25));
    assert_eq!(slip.salary_breakdown.total_salary, dec!(841));
}

#[tokio::test]
async fn batch_isolates_failures() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let a = env.employee("Alpha", dec!(900), 30, dec!(2)).await;
    let broken = env.employee("Broken", dec!(900), 0, dec!(2)).await;
    let c = env.employee("Charlie", dec!(600), 20, dec!(2)).await;
    let gone = env.employee("Gone", dec!(600), 20, dec!(2)).await;
    env.hr
        .employees()
        .update_employee(
            gone.id,
            EmployeePatch {
                status: Some(employees::Status::Inactive),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap();

    let outcome = env.hr.salaries().generate_for_month(march()).await.unwrap();
    let mut paid: Vec<_> = outcome.generated.iter().map(|s| s.employee_id).collect();
    paid.sort();
    let mut expected = vec![a.id, c.id];
    expected.sort();
    assert_eq!(paid, expected);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].employee_id, broken.id);
    assert_eq!(outcome.failures[0].employee_name, "Broken");

    let rerun = env.hr.salaries().generate_for_month(march()).await.unwrap();
    let mut first_ids: Vec<_> = outcome.generated.iter().map(|s| s.id).collect();
    let mut rerun_ids: Vec<_> = rerun.generated.iter().map(|s| s.id).collect();
    first_ids.sort();
    rerun_ids.sort();
    assert_eq!(first_ids, rerun_ids);
}

#[tokio::test]
async fn batch_defaults_to_previous_month() {
    let env = TestEnv::at(date(2026, 1, 15)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;

    let outcome = env.hr.salaries().generate_for_period(None, None).await.unwrap();
    assert_eq!((outcome.period.month(), outcome.period.year()), (12, 2025));
    assert_eq!(outcome.generated[0].employee_id, nurse.id);
    assert_eq!(outcome.generated[0].total_salary(), dec!(900));

    let outcome = env.hr.salaries().generate_for_period(Some(6), None).await.unwrap();
    assert_eq!((outcome.period.month(), outcome.period.year()), (6, 2025));

    assert!(matches!(
        env.hr.salaries().generate_for_period(Some(13), Some(2026)).await,
        Err(HrError::InvalidPeriod { .. })
    ));
}

#[tokio::test]
async fn history_is_newest_first() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    for (month, year) in [(11, 2025), (1, 2026), (12, 2025)] {
        env.hr
            .salaries()
            .generate(nurse.id, SalaryPeriod::new(month, year).unwrap())
            .await
            .unwrap();
    }

    let history = env.hr.salaries().history(SalaryFilter::default()).await.unwrap();
    let periods: Vec<_> = history.iter().map(|s| (s.month, s.year)).collect();
    assert_eq!(periods, vec![(1, 2026), (12, 2025), (11, 2025)]);

    let only_2025 = env
        .hr
        .salaries()
        .history(SalaryFilter {
            year: Some(2025),
            limit: Some(1),
            ..SalaryFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(only_2025.len(), 1);
    assert_eq!(only_2025[0].month, 12);
}

#[tokio::test]
async fn deleting_an_employee_cascades() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(900), 30, dec!(2)).await;
    seed_example_month(&env, nurse.id).await;
    env.hr.salaries().generate(nurse.id, march()).await.unwrap();

    env.hr.employees().delete_employee(nurse.id).await.unwrap();
    let attendance_left = attendances::Entity::find().count(&env.db).await.unwrap();
    let salaries_left = salaries::Entity::find().count(&env.db).await.unwrap();
    assert_eq!((attendance_left, salaries_left), (0, 0));
}

#[tokio::test]
async fn employee_saves_keep_daily_rate_consistent() {
    let env = TestEnv::at(date(2026, 4, 2)).await;
    let nurse = env.employee("Dara", dec!(1000), 3, dec!(2)).await;
    assert_eq!(nurse.salary_per_day(), dec!(333.33));

    let updated = env
        .hr
        .employees()
        .update_employee(
            nurse.id,
            EmployeePatch {
                working_days: Some(25),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.salary_per_day(), dec!(40));

    let duplicate = env.hr.employees().update_employee(
        env.employee("Sok", dec!(1), 1, dec!(0)).await.id,
        EmployeePatch {
            email: Some("DARA@clinic.test".into()),
            ..EmployeePatch::default()
        },
    );
    assert!(matches!(duplicate.await, Err(HrError::DuplicateEmail(_))));

    let active = env.hr.employees().list_active().await.unwrap();
    assert_eq!(active.len(), 2);
}
