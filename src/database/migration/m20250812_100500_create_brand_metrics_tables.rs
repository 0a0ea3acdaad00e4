use super::{PromptRunBrandMetricSources, PromptRunBrandMetrics, PromptRunSources, PromptsRun};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PromptRunBrandMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::MainBrandId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::PromptRunId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::BrandKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::BrandDisplay)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::IsMain)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::Mentions)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetrics::Sentiment)
                            .string()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PromptRunBrandMetricSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PromptRunBrandMetricSources::MetricId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PromptRunBrandMetricSources::SourceId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(PromptRunBrandMetricSources::MetricId)
                            .col(PromptRunBrandMetricSources::SourceId),
                    )
                    .to_owned(),
            )
            .await?;

        // Create foreign key constraints only for PostgreSQL (SQLite doesn't support adding FK after table creation)
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_prompt_run_brand_metrics_run_id")
                        .from(
                            PromptRunBrandMetrics::Table,
                            PromptRunBrandMetrics::PromptRunId,
                        )
                        .to(PromptsRun::Table, PromptsRun::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_brand_metric_sources_metric_id")
                        .from(
                            PromptRunBrandMetricSources::Table,
                            PromptRunBrandMetricSources::MetricId,
                        )
                        .to(PromptRunBrandMetrics::Table, PromptRunBrandMetrics::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name("fk_brand_metric_sources_source_id")
                        .from(
                            PromptRunBrandMetricSources::Table,
                            PromptRunBrandMetricSources::SourceId,
                        )
                        .to(PromptRunSources::Table, PromptRunSources::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_prompt_run_brand_metrics_run_id")
                    .table(PromptRunBrandMetrics::Table)
                    .col(PromptRunBrandMetrics::PromptRunId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PromptRunBrandMetricSources::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(PromptRunBrandMetrics::Table).to_owned())
            .await
    }
}
