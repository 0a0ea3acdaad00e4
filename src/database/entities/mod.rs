pub mod brands;
pub mod competitors;
pub mod prompt_run_brand_metric_sources;
pub mod prompt_run_brand_metrics;
pub mod prompt_run_domain_citations;
pub mod prompt_run_sources;
pub mod prompt_runs;
pub mod prompts;
pub mod usage_counters;
pub mod users;

pub use brands::Entity as Brands;
pub use competitors::Entity as Competitors;
pub use prompt_run_brand_metric_sources::Entity as PromptRunBrandMetricSources;
pub use prompt_run_brand_metrics::Entity as PromptRunBrandMetrics;
pub use prompt_run_domain_citations::Entity as PromptRunDomainCitations;
pub use prompt_run_sources::Entity as PromptRunSources;
pub use prompt_runs::Entity as PromptRuns;
pub use prompts::Entity as Prompts;
pub use usage_counters::Entity as UsageCounters;
pub use users::Entity as Users;

// Type aliases
pub type BrandRecord = brands::Model;
pub type CompetitorRecord = competitors::Model;
pub type PromptRecord = prompts::Model;
pub type PromptRunRecord = prompt_runs::Model;
pub type UsageCounterRecord = usage_counters::Model;
pub type UserRecord = users::Model;
