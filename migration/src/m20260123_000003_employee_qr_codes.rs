use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Employees {
    Table,
    QrCode,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Employees::Table)
                    .add_column_if_not_exists(ColumnDef::new(Employees::QrCode).string_len(128))
                    .to_owned(),
            )
            .await?;

        // Unassigned badges stay NULL, which the unique index ignores.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_employees_qr_code")
                    .table(Employees::Table)
                    .col(Employees::QrCode)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uq_employees_qr_code")
                    .table(Employees::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(Employees::Table)
                    .drop_column(Employees::QrCode)
                    .to_owned(),
            )
            .await
    }
}
