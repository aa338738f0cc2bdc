use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SleepSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SleepSessions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SleepSessions::UserId).string().not_null())
                    .col(ColumnDef::new(SleepSessions::Date).date().not_null())
                    .col(
                        ColumnDef::new(SleepSessions::SleepStart)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SleepSessions::SleepEnd).date_time().not_null())
                    .col(ColumnDef::new(SleepSessions::Duration).double().not_null())
                    .col(ColumnDef::new(SleepSessions::Quality).double().not_null())
                    .col(
                        ColumnDef::new(SleepSessions::TotalMovements)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SleepSessions::RestlessPeriods)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SleepSessions::IsManual)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SleepSessions::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sleep_sessions_user_date")
                    .table(SleepSessions::Table)
                    .col(SleepSessions::UserId)
                    .col(SleepSessions::Date)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SleepSessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SleepSessions {
    Table,
    Id,
    UserId,
    Date,
    SleepStart,
    SleepEnd,
    Duration,
    Quality,
    TotalMovements,
    RestlessPeriods,
    IsManual,
    UpdatedAt,
}
