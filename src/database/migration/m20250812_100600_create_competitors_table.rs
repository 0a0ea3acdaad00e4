use super::{Brands, Competitors};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Competitors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Competitors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Competitors::MainBrandId).uuid().not_null())
                    .col(ColumnDef::new(Competitors::BrandKey).string().not_null())
                    .col(
                        ColumnDef::new(Competitors::BrandDisplay)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Competitors::Domain).string().not_null())
                    .col(ColumnDef::new(Competitors::Status).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Create foreign key constraint only for PostgreSQL (SQLite doesn't support adding FK after table creation)
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_competitors_main_brand_id")
                        .from(Competitors::Table, Competitors::MainBrandId)
                        .to(Brands::Table, Brands::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_competitors_main_brand_key")
                    .table(Competitors::Table)
                    .col(Competitors::MainBrandId)
                    .col(Competitors::BrandKey)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Competitors::Table).to_owned())
            .await
    }
}
