mod common;

use common::{cited, plans_with_monthly_runs, StaticClassifier, StaticProvider, TestHarness};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;
use std::sync::Arc;
use visibility_worker::database::dao::UsersDao;
use visibility_worker::database::entities::{
    competitors, prompt_run_brand_metrics, prompt_runs, prompts, usage_counters,
};
use visibility_worker::plans::ConfigPlanSource;
use visibility_worker::providers::ProviderRegistry;
use visibility_worker::visibility::classify::{Sentiment, SourceType};
use visibility_worker::visibility::{BatchRunner, BrandInput, PromptInput, VisibilityJob};

async fn seed_job(harness: &TestHarness, user_id: &str, prompt_count: usize) -> VisibilityJob {
    let brand_id = harness.seed_brand(user_id, "Acme").await;
    let mut prompt_inputs = Vec::new();
    for i in 0..prompt_count {
        let text = format!("prompt {}", i);
        let id = harness.seed_prompt(brand_id, &text).await;
        prompt_inputs.push(PromptInput { id, text });
    }

    VisibilityJob {
        user_id: user_id.to_string(),
        brand: BrandInput {
            id: brand_id,
            name: "Acme".to_string(),
            url: "https://acme.example".to_string(),
            user_id: user_id.to_string(),
        },
        prompts: prompt_inputs,
        providers: vec!["openai-gpt".to_string()],
    }
}

fn runner(harness: &TestHarness, limit: serde_json::Value) -> BatchRunner {
    BatchRunner::new(
        harness.ledger(),
        harness.persister(),
        harness.prompts_dao(),
        Arc::new(ConfigPlanSource::new(
            UsersDao::new(harness.db.clone()),
            plans_with_monthly_runs("2", limit),
        )),
        ProviderRegistry::new().with_openai(Arc::new(StaticProvider {
            response: "Acme and Rival both came up".to_string(),
        })),
        Arc::new(StaticClassifier {
            sentiment: Sentiment::Positive,
            cited: vec![
                cited("Acme", "acme.example", SourceType::Owned),
                cited("Rival", "rival.example", SourceType::Competitor),
            ],
        }),
    )
}

#[tokio::test]
async fn test_job_persists_full_result_graph() {
    let harness = TestHarness::new().await;
    harness.seed_user("user-1", "2").await;
    let job = seed_job(&harness, "user-1", 2).await;

    let summaries = runner(&harness, json!(10)).run_job(&job).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].processed, 2);
    assert_eq!(summaries[0].requested, 2);
    assert_eq!(summaries[0].limit, 10.0);

    let runs = prompt_runs::Entity::find().all(&harness.db).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.provider == "openai-gpt"));
    assert!(runs.iter().all(|r| r.sentiment == "positive"));

    // Two brands per run, main flagged on the job's brand
    let metrics = prompt_run_brand_metrics::Entity::find()
        .all(&harness.db)
        .await
        .unwrap();
    assert_eq!(metrics.len(), 4);
    for metric in &metrics {
        assert_eq!(metric.is_main, metric.brand_key == "acme");
    }

    // Competitor suggestions are deduplicated across runs
    let suggestions = competitors::Entity::find().all(&harness.db).await.unwrap();
    assert_eq!(suggestions.len(), 2);
    assert!(suggestions.iter().all(|c| c.status == "suggested"));

    // Both runs were charged against the monthly counter
    let counter = usage_counters::Entity::find()
        .filter(usage_counters::Column::UserId.eq("user-1"))
        .filter(usage_counters::Column::Counter.eq("runs"))
        .one(&harness.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.value, 2);
}

#[tokio::test]
async fn test_exhausted_quota_produces_an_empty_batch() {
    let harness = TestHarness::new().await;
    harness.seed_user("user-1", "2").await;
    let job = seed_job(&harness, "user-1", 3).await;

    // Spend the whole budget up front
    harness
        .ledger()
        .consume("user-1", "runs", 4, 4.0, visibility_worker::usage::Period::Month)
        .await
        .unwrap();

    let summaries = runner(&harness, json!(4)).run_job(&job).await.unwrap();
    assert_eq!(summaries[0].processed, 0);
    assert_eq!(summaries[0].requested, 3);

    assert!(prompt_runs::Entity::find()
        .all(&harness.db)
        .await
        .unwrap()
        .is_empty());

    // The ledger rejection marked the first prompt; the rest stayed untouched
    let rows = prompts::Entity::find().all(&harness.db).await.unwrap();
    let failed = rows
        .iter()
        .filter(|p| p.last_run_status.as_deref() == Some("failed"))
        .count();
    assert_eq!(failed, 1);
}

#[tokio::test]
async fn test_batch_stops_at_the_limit_boundary() {
    let harness = TestHarness::new().await;
    harness.seed_user("user-1", "2").await;
    let job = seed_job(&harness, "user-1", 5).await;

    let summaries = runner(&harness, json!(3)).run_job(&job).await.unwrap();
    assert_eq!(summaries[0].processed, 3);
    assert_eq!(summaries[0].requested, 5);

    assert_eq!(
        prompt_runs::Entity::find().all(&harness.db).await.unwrap().len(),
        3
    );
}
