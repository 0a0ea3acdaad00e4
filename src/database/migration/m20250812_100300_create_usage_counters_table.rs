use super::UsageCounters;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The composite primary key doubles as the uniqueness guarantee the
        // ledger's insert-or-increment relies on.
        manager
            .create_table(
                Table::create()
                    .table(UsageCounters::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsageCounters::UserId).string().not_null())
                    .col(ColumnDef::new(UsageCounters::Counter).string().not_null())
                    .col(
                        ColumnDef::new(UsageCounters::PeriodBucket)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageCounters::Value)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(UsageCounters::UserId)
                            .col(UsageCounters::Counter)
                            .col(UsageCounters::PeriodBucket),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageCounters::Table).to_owned())
            .await
    }
}
