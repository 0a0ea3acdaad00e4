use sea_orm_migration::prelude::*;

pub use sea_orm_migration::MigratorTrait;

mod m20250812_100000_create_users_table;
mod m20250812_100100_create_brands_table;
mod m20250812_100200_create_prompts_table;
mod m20250812_100300_create_usage_counters_table;
mod m20250812_100400_create_prompt_runs_tables;
mod m20250812_100500_create_brand_metrics_tables;
mod m20250812_100600_create_competitors_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250812_100000_create_users_table::Migration),
            Box::new(m20250812_100100_create_brands_table::Migration),
            Box::new(m20250812_100200_create_prompts_table::Migration),
            Box::new(m20250812_100300_create_usage_counters_table::Migration),
            Box::new(m20250812_100400_create_prompt_runs_tables::Migration),
            Box::new(m20250812_100500_create_brand_metrics_tables::Migration),
            Box::new(m20250812_100600_create_competitors_table::Migration),
        ]
    }
}

/// Common table and column identifiers
#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Tier,
    ExpiredAt,
}

#[derive(Iden)]
pub enum Brands {
    Table,
    Id,
    Name,
    Url,
    UserId,
}

#[derive(Iden)]
pub enum Prompts {
    Table,
    Id,
    BrandId,
    Text,
    LastRun,
    LastRunStatus,
}

#[derive(Iden)]
pub enum UsageCounters {
    Table,
    UserId,
    Counter,
    PeriodBucket,
    Value,
}

#[derive(Iden)]
pub enum PromptsRun {
    Table,
    Id,
    PromptId,
    BrandId,
    RunDate,
    Sentiment,
    Provider,
    ResponseText,
}

#[derive(Iden)]
pub enum PromptRunSources {
    Table,
    Id,
    PromptRunId,
    Url,
    Type,
    IsMentioned,
}

#[derive(Iden)]
pub enum PromptRunDomainCitations {
    Table,
    Id,
    PromptRunId,
    Domain,
    IsMentioned,
}

#[derive(Iden)]
pub enum PromptRunBrandMetrics {
    Table,
    Id,
    MainBrandId,
    PromptRunId,
    BrandKey,
    BrandDisplay,
    IsMain,
    Mentions,
    Sentiment,
}

#[derive(Iden)]
pub enum PromptRunBrandMetricSources {
    Table,
    MetricId,
    SourceId,
}

#[derive(Iden)]
pub enum Competitors {
    Table,
    Id,
    MainBrandId,
    BrandKey,
    BrandDisplay,
    Domain,
    Status,
}
