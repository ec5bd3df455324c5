//! Monthly salary arithmetic. No I/O; the salary service feeds it rows.

use entity::{attendances, attendances::Status, employees, money};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::settings::PayrollRules;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Employee pay inputs frozen for one computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayTerms {
    pub base_salary: Decimal,
    pub salary_per_day: Decimal,
    pub overtime_rate: Decimal,
}

impl From<&employees::Model> for PayTerms {
    fn from(employee: &employees::Model) -> Self {
        Self {
            base_salary: employee.base_salary(),
            salary_per_day: employee.salary_per_day(),
            overtime_rate: employee.overtime_rate(),
        }
    }
}

/// One attendance row as seen by the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayRecord {
    pub status: Status,
    pub late_minutes: i32,
    pub overtime_hours: Decimal,
}

impl From<&attendances::Model> for DayRecord {
    fn from(row: &attendances::Model) -> Self {
        Self {
            status: row.status,
            late_minutes: row.late_minutes,
            overtime_hours: row.overtime_hours(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DayTally {
    pub present: i32,
    pub late: i32,
    pub absent: i32,
    pub leave_paid: i32,
    pub leave_unpaid: i32,
}

impl DayTally {
    pub fn add(&mut self, status: Status) {
        let bucket = match status {
            Status::Present => &mut self.present,
            Status::Late => &mut self.late,
            Status::Absent => &mut self.absent,
            Status::LeavePaid => &mut self.leave_paid,
            Status::LeaveUnpaid => &mut self.leave_unpaid,
        };
        *bucket += 1;
    }

    pub fn total(&self) -> i32 {
        self.present + self.late + self.absent + self.leave_paid + self.leave_unpaid
    }

    /// Days deducted at the full daily rate.
    pub fn unpaid(&self) -> i32 {
        self.absent + self.leave_unpaid
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SalaryFigures {
    pub tally: DayTally,
    pub overtime_hours: Decimal,
    pub overtime_pay: Decimal,
    pub deduction: Decimal,
    pub bonus: Decimal,
    pub total_salary: Decimal,
}

/// Penalty for a single late row: 30+ minutes and 10-29 minutes use their
/// own percentage of the daily rate, anything shorter costs nothing.
pub fn late_penalty(late_minutes: i32, salary_per_day: Decimal, rules: &PayrollRules) -> Decimal {
    let percent = if late_minutes >= 30 {
        rules.late_30_min_penalty
    } else if late_minutes >= 10 {
        rules.late_10_min_penalty
    } else {
        return Decimal::ZERO;
    };
    salary_per_day * percent / HUNDRED
}

pub fn total_salary(
    base_salary: Decimal,
    deduction: Decimal,
    overtime_pay: Decimal,
    bonus: Decimal,
) -> Decimal {
    money::round2(base_salary - deduction + overtime_pay + bonus)
}

pub fn compute_salary<'a>(
    terms: PayTerms,
    days: impl IntoIterator<Item = &'a DayRecord>,
    rules: &PayrollRules,
) -> SalaryFigures {
    let mut tally = DayTally::default();
    let mut overtime_hours = Decimal::ZERO;
    let mut late_penalties = Decimal::ZERO;

    for day in days {
        tally.add(day.status);
        overtime_hours += day.overtime_hours;
        if day.status == Status::Late {
            late_penalties += late_penalty(day.late_minutes, terms.salary_per_day, rules);
        }
    }

    let overtime_pay = money::round2(overtime_hours * terms.overtime_rate);
    let deduction =
        money::round2(Decimal::from(tally.unpaid()) * terms.salary_per_day + late_penalties);

    SalaryFigures {
        tally,
        overtime_hours,
        overtime_pay,
        deduction,
        bonus: Decimal::ZERO,
        total_salary: total_salary(terms.base_salary, deduction, overtime_pay, Decimal::ZERO),
    }
}

/// `base / working_days`, or zero when there are no working days.
pub fn salary_per_day(base_salary: Decimal, working_days: i32) -> Decimal {
    if working_days <= 0 {
        return Decimal::ZERO;
    }
    money::round2(base_salary / Decimal::from(working_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms() -> PayTerms {
        PayTerms {
            base_salary: dec!(900),
            salary_per_day: dec!(30),
            overtime_rate: dec!(2),
        }
    }

    fn day(status: Status, late_minutes: i32, overtime_hours: Decimal) -> DayRecord {
        DayRecord {
            status,
            late_minutes,
            overtime_hours,
        }
    }

    #[test]
    fn deduction_tiers() {
        let rules = PayrollRules::default();
        assert_eq!(late_penalty(15, dec!(30), &rules), dec!(1.50));
        assert_eq!(late_penalty(45, dec!(30), &rules), dec!(3.00));
        assert_eq!(late_penalty(5, dec!(30), &rules), Decimal::ZERO);
        assert_eq!(late_penalty(10, dec!(30), &rules), dec!(1.50));
        assert_eq!(late_penalty(30, dec!(30), &rules), dec!(3.00));
    }

    #[test]
    fn aggregates_a_month() {
        let mut days = vec![day(Status::Present, 0, Decimal::ZERO); 20];
        days[0].overtime_hours = dec!(1.5);
        days[1].overtime_hours = dec!(1.5);
        days.push(day(Status::Absent, 0, Decimal::ZERO));
        days.push(day(Status::Absent, 0, Decimal::ZERO));
        days.push(day(Status::LeaveUnpaid, 0, Decimal::ZERO));

        let figures = compute_salary(terms(), &days, &PayrollRules::default());
        assert_eq!(figures.tally.present, 20);
        assert_eq!(figures.tally.absent, 2);
        assert_eq!(figures.tally.leave_unpaid, 1);
        assert_eq!(figures.tally.total(), 23);
        assert_eq!(figures.deduction, dec!(90));
        assert_eq!(figures.overtime_pay, dec!(6));
        assert_eq!(figures.bonus, Decimal::ZERO);
        assert_eq!(figures.total_salary, dec!(900) - dec!(90) + dec!(6));
    }

    #[test]
    fn only_late_rows_are_penalised() {
        // A present row carrying late minutes (e.g. a manual edit) is not charged.
        let days = [
            day(Status::Late, 15, Decimal::ZERO),
            day(Status::Late, 45, Decimal::ZERO),
            day(Status::Late, 5, Decimal::ZERO),
            day(Status::Present, 40, Decimal::ZERO),
            day(Status::LeavePaid, 0, Decimal::ZERO),
        ];
        let figures = compute_salary(terms(), &days, &PayrollRules::default());
        assert_eq!(figures.tally.late, 3);
        assert_eq!(figures.tally.leave_paid, 1);
        assert_eq!(figures.deduction, dec!(4.50));
        assert_eq!(figures.total_salary, dec!(895.50));
    }

    #[test]
    fn deduction_is_rounded_once() {
        let terms = PayTerms {
            salary_per_day: dec!(33.33),
            ..terms()
        };
        let rules = PayrollRules {
            late_10_min_penalty: dec!(7),
            ..PayrollRules::default()
        };
        // 3 x 2.3331 = 6.9993 -> 7.00
        let days = [day(Status::Late, 12, Decimal::ZERO); 3];
        let figures = compute_salary(terms, &days, &rules);
        assert_eq!(figures.deduction, dec!(7.00));
    }

    #[test]
    fn empty_month_pays_base() {
        let figures = compute_salary(terms(), &[], &PayrollRules::default());
        assert_eq!(figures.tally, DayTally::default());
        assert_eq!(figures.total_salary, dec!(900));
    }

    #[test]
    fn salary_per_day_rounds_half_up() {
        assert_eq!(salary_per_day(dec!(1000), 3), dec!(333.33));
        assert_eq!(salary_per_day(dec!(100.01), 2), dec!(50.01));
        assert_eq!(salary_per_day(dec!(900), 0), Decimal::ZERO);
        assert_eq!(salary_per_day(dec!(900), -1), Decimal::ZERO);
    }
}
