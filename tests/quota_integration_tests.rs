mod common;

use common::{plans_with_monthly_runs, TestHarness};
use serde_json::json;
use visibility_worker::database::dao::UsersDao;
use visibility_worker::error::AppError;
use visibility_worker::plans::{ConfigPlanSource, PlanSource};
use visibility_worker::usage::Period;

#[tokio::test]
async fn test_plan_limit_enforced_end_to_end() {
    let harness = TestHarness::new().await;
    harness.seed_user("user-1", "2").await;

    let plans = ConfigPlanSource::new(
        UsersDao::new(harness.db.clone()),
        plans_with_monthly_runs("2", json!(2)),
    );
    let limit = plans.monthly_runs_limit("user-1").await.unwrap();
    assert_eq!(limit, 2.0);

    let ledger = harness.ledger();
    ledger.consume("user-1", "runs", 1, limit, Period::Month).await.unwrap();
    ledger.consume("user-1", "runs", 1, limit, Period::Month).await.unwrap();

    let err = ledger
        .consume("user-1", "runs", 1, limit, Period::Month)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::QuotaExceeded {
            attempted: 3,
            ..
        }
    ));
}

#[tokio::test]
async fn test_trial_tier_uses_the_fallback_plan() {
    let harness = TestHarness::new().await;
    harness.seed_user("trial-user", "trial").await;

    let plans = ConfigPlanSource::new(
        UsersDao::new(harness.db.clone()),
        plans_with_monthly_runs("1", json!(5)),
    );
    assert_eq!(plans.monthly_runs_limit("trial-user").await.unwrap(), 5.0);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let harness = TestHarness::new().await;
    let plans = ConfigPlanSource::new(
        UsersDao::new(harness.db.clone()),
        plans_with_monthly_runs("1", json!(5)),
    );

    let err = plans.monthly_runs_limit("ghost").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "user", .. }));
}

#[tokio::test]
async fn test_unknown_plan_resolves_to_zero_limit() {
    let harness = TestHarness::new().await;
    harness.seed_user("user-1", "99").await;

    let plans = ConfigPlanSource::new(
        UsersDao::new(harness.db.clone()),
        plans_with_monthly_runs("1", json!(5)),
    );
    let limit = plans.monthly_runs_limit("user-1").await.unwrap();
    assert_eq!(limit, 0.0);

    // A zero limit rejects the first charge outright
    let err = harness
        .ledger()
        .consume("user-1", "runs", 1, limit, Period::Month)
        .await
        .unwrap_err();
    assert!(err.is_quota_exceeded());
}

#[tokio::test]
async fn test_periods_keep_independent_counters() {
    let harness = TestHarness::new().await;
    let ledger = harness.ledger();

    ledger.consume("user-1", "runs", 3, 10.0, Period::Hour).await.unwrap();

    // The month window has its own row
    let monthly = ledger
        .get_current("user-1", &["runs"], Period::Month)
        .await
        .unwrap();
    assert_eq!(monthly.get("runs"), Some(&0));

    let hourly = ledger
        .get_current("user-1", &["runs"], Period::Hour)
        .await
        .unwrap();
    assert_eq!(hourly.get("runs"), Some(&3));
}

#[tokio::test]
async fn test_estimates_survive_cache_loss() {
    let harness = TestHarness::new().await;
    harness
        .ledger()
        .consume("user-1", "runs", 4, 10.0, Period::Month)
        .await
        .unwrap();

    // A fresh cache stands in for an evicted or restarted one
    let cold = visibility_worker::usage::UsageLedger::new(
        harness.db.clone(),
        visibility_worker::cache::CacheManager::new_memory().counters(),
    );
    let current = cold
        .get_current("user-1", &["runs"], Period::Month)
        .await
        .unwrap();
    assert_eq!(current.get("runs"), Some(&4));
}
