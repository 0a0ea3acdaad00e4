#![allow(dead_code)]

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectOptions, DatabaseConnection, Set};
use std::collections::HashMap;
use uuid::Uuid;
use visibility_worker::cache::CacheManager;
use visibility_worker::database::dao::PromptsDao;
use visibility_worker::database::entities::{brands, prompts, users};
use visibility_worker::database::migration::{Migrator, MigratorTrait};
use visibility_worker::error::AppError;
use visibility_worker::plans::{PlansConfig, QuotaPlan, RUNS_MONTHLY};
use visibility_worker::providers::Provider;
use visibility_worker::usage::UsageLedger;
use visibility_worker::visibility::classify::{
    Classification, Classifier, CitedSource, Sentiment, SourceType,
};
use visibility_worker::visibility::persist::RunPersister;

/// Shared fixture: migrated in-memory database plus an in-process cache.
/// One pooled connection so concurrent transactions serialize.
pub struct TestHarness {
    pub db: DatabaseConnection,
    pub cache: CacheManager,
}

impl TestHarness {
    pub async fn new() -> Self {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = sea_orm::Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        Self {
            db,
            cache: CacheManager::new_memory(),
        }
    }

    pub fn ledger(&self) -> UsageLedger {
        UsageLedger::new(self.db.clone(), self.cache.counters())
    }

    pub fn persister(&self) -> RunPersister {
        RunPersister::new(self.db.clone())
    }

    pub fn prompts_dao(&self) -> PromptsDao {
        PromptsDao::new(self.db.clone())
    }

    pub async fn seed_user(&self, id: &str, tier: &str) {
        users::ActiveModel {
            id: Set(id.to_string()),
            tier: Set(tier.to_string()),
            expired_at: Set(None),
        }
        .insert(&self.db)
        .await
        .unwrap();
    }

    pub async fn seed_brand(&self, user_id: &str, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        brands::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            url: Set(format!("https://{}.example", name.to_lowercase())),
            user_id: Set(user_id.to_string()),
        }
        .insert(&self.db)
        .await
        .unwrap();
        id
    }

    pub async fn seed_prompt(&self, brand_id: Uuid, text: &str) -> Uuid {
        let id = Uuid::new_v4();
        prompts::ActiveModel {
            id: Set(id),
            brand_id: Set(brand_id),
            text: Set(text.to_string()),
            last_run: Set(None),
            last_run_status: Set(None),
        }
        .insert(&self.db)
        .await
        .unwrap();
        id
    }
}

/// Plan catalog with a single plan carrying a monthly runs limit
pub fn plans_with_monthly_runs(plan_id: &str, limit: serde_json::Value) -> PlansConfig {
    let mut limits = HashMap::new();
    limits.insert(RUNS_MONTHLY.to_string(), limit);
    let mut plans = HashMap::new();
    plans.insert(plan_id.to_string(), QuotaPlan { limits });
    PlansConfig { plans }
}

/// Provider that always answers with the same text
pub struct StaticProvider {
    pub response: String,
}

#[async_trait]
impl Provider for StaticProvider {
    fn name(&self) -> &'static str {
        "openai-gpt"
    }

    async fn run(&self, _prompt: &str) -> Result<String, AppError> {
        Ok(self.response.clone())
    }
}

/// Classifier that always reports the given citations
pub struct StaticClassifier {
    pub sentiment: Sentiment,
    pub cited: Vec<CitedSource>,
}

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(
        &self,
        _brand_name: &str,
        _response_text: &str,
    ) -> Result<Classification, AppError> {
        Ok(Classification {
            sentiment: self.sentiment,
            cited: self.cited.clone(),
        })
    }
}

pub fn cited(brand_name: &str, domain: &str, source_type: SourceType) -> CitedSource {
    CitedSource {
        url: format!("https://{}/article", domain),
        domain: domain.to_string(),
        brand_name: brand_name.to_string(),
        is_mentioned: true,
        source_type,
    }
}
