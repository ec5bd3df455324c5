use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Settings {
    Table,
    Key,
    Value,
    Description,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Salaries {
    Table,
    Id,
    EmployeeId,
    Month,
    Year,
    PresentDays,
    LateDays,
    AbsentDays,
    LeavePaidDays,
    LeaveUnpaidDays,
    OvertimePayCents,
    DeductionCents,
    BonusCents,
    TotalSalaryCents,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Employees {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

fn counter(column: Salaries) -> ColumnDef {
    ColumnDef::new(column).integer().not_null().default(0).to_owned()
}

fn cents(column: Salaries) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Key)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .col(ColumnDef::new(Settings::Description).text())
                    .col(
                        ColumnDef::new(Settings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Salaries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Salaries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Salaries::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Salaries::Month).integer().not_null())
                    .col(ColumnDef::new(Salaries::Year).integer().not_null())
                    .col(&mut counter(Salaries::PresentDays))
                    .col(&mut counter(Salaries::LateDays))
                    .col(&mut counter(Salaries::AbsentDays))
                    .col(&mut counter(Salaries::LeavePaidDays))
                    .col(&mut counter(Salaries::LeaveUnpaidDays))
                    .col(&mut cents(Salaries::OvertimePayCents))
                    .col(&mut cents(Salaries::DeductionCents))
                    .col(&mut cents(Salaries::BonusCents))
                    .col(&mut cents(Salaries::TotalSalaryCents))
                    .col(
                        ColumnDef::new(Salaries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Salaries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_salaries_employee")
                            .from(Salaries::Table, Salaries::EmployeeId)
                            .to(Employees::Table, Employees::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One salary per period; concurrent generation resolves to the existing row.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_salaries_employee_period")
                    .table(Salaries::Table)
                    .col(Salaries::EmployeeId)
                    .col(Salaries::Month)
                    .col(Salaries::Year)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Salaries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        Ok(())
    }
}
