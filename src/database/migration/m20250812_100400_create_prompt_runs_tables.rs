use super::{PromptRunDomainCitations, PromptRunSources, Prompts, PromptsRun};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PromptsRun::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromptsRun::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PromptsRun::PromptId).uuid().not_null())
                    .col(ColumnDef::new(PromptsRun::BrandId).uuid().not_null())
                    .col(ColumnDef::new(PromptsRun::RunDate).date().not_null())
                    .col(ColumnDef::new(PromptsRun::Sentiment).string().not_null())
                    .col(ColumnDef::new(PromptsRun::Provider).string().not_null())
                    .col(
                        ColumnDef::new(PromptsRun::ResponseText)
                            .text()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromptRunSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromptRunSources::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PromptRunSources::PromptRunId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PromptRunSources::Url).string().not_null())
                    .col(ColumnDef::new(PromptRunSources::Type).string().not_null())
                    .col(
                        ColumnDef::new(PromptRunSources::IsMentioned)
                            .boolean()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromptRunDomainCitations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromptRunDomainCitations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PromptRunDomainCitations::PromptRunId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunDomainCitations::Domain)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunDomainCitations::IsMentioned)
                            .boolean()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create foreign key constraints only for PostgreSQL (SQLite doesn't support adding FK after table creation)
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_prompts_run_prompt_id")
                        .from(PromptsRun::Table, PromptsRun::PromptId)
                        .to(Prompts::Table, Prompts::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_prompt_run_sources_run_id")
                        .from(PromptRunSources::Table, PromptRunSources::PromptRunId)
                        .to(PromptsRun::Table, PromptsRun::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_prompt_run_domain_citations_run_id")
                        .from(
                            PromptRunDomainCitations::Table,
                            PromptRunDomainCitations::PromptRunId,
                        )
                        .to(PromptsRun::Table, PromptsRun::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_prompts_run_prompt_id")
                    .table(PromptsRun::Table)
                    .col(PromptsRun::PromptId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_prompt_run_sources_run_id")
                    .table(PromptRunSources::Table)
                    .col(PromptRunSources::PromptRunId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_prompt_run_domain_citations_run_id")
                    .table(PromptRunDomainCitations::Table)
                    .col(PromptRunDomainCitations::PromptRunId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PromptRunDomainCitations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(PromptRunSources::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PromptsRun::Table).to_owned())
            .await
    }
}
