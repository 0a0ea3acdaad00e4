//! All-or-nothing persistence of one classified run
//!
//! One transaction turns a classified provider response into the run row,
//! its citation and domain rows, the per-brand mention aggregates and the
//! competitor suggestions. Any failure rolls the whole thing back; no
//! partial rows survive.

use crate::database::entities::{
    brands, competitors, prompt_run_brand_metric_sources, prompt_run_brand_metrics,
    prompt_run_domain_citations, prompt_run_sources, prompt_runs, prompts,
};
use crate::database::DatabaseError;
use crate::error::AppError;
use crate::providers::ProviderKind;
use crate::visibility::classify::{CitedSource, Sentiment};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, Set, TransactionTrait,
};
use std::collections::BTreeMap;
use tracing::{debug, error};
use uuid::Uuid;

/// One assembled run ready for persistence
#[derive(Debug, Clone)]
pub struct SavePromptRun {
    pub prompt_id: Uuid,
    pub brand_id: Uuid,
    /// Display name of the main brand, used for the is_main flag
    pub brand_name: String,
    pub run_date: NaiveDate,
    pub provider: ProviderKind,
    pub response_text: String,
    pub sentiment: Sentiment,
    pub cited: Vec<CitedSource>,
}

/// Per-brand mention aggregate built from the citation list
#[derive(Debug, Clone, PartialEq)]
pub struct BrandMention {
    pub display: String,
    pub domain: String,
    pub mentions: i32,
    pub source_ids: Vec<Uuid>,
}

/// Pure fold of the citation list into mention aggregates keyed by the
/// lowercased brand name. The first occurrence of a key fixes the display
/// casing and domain; every occurrence counts one mention and contributes
/// its source row. Citations without a brand name are skipped.
pub fn aggregate_brand_mentions(
    cited: &[CitedSource],
    source_ids: &[Uuid],
) -> BTreeMap<String, BrandMention> {
    let mut mentions: BTreeMap<String, BrandMention> = BTreeMap::new();

    for (citation, source_id) in cited.iter().zip(source_ids) {
        if citation.brand_name.is_empty() {
            continue;
        }
        let key = citation.brand_name.to_lowercase();
        let entry = mentions.entry(key).or_insert_with(|| BrandMention {
            display: citation.brand_name.clone(),
            domain: citation.domain.clone(),
            mentions: 0,
            source_ids: Vec::new(),
        });
        entry.mentions += 1;
        entry.source_ids.push(*source_id);
    }

    mentions
}

fn db_err(e: sea_orm::DbErr) -> AppError {
    AppError::Database(DatabaseError::Database(e.to_string()))
}

/// Persists one classified run inside a single transaction
#[derive(Clone)]
pub struct RunPersister {
    db: DatabaseConnection,
}

impl RunPersister {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist the run; returns the generated run id. The transaction is
    /// rolled back in full on any failure.
    pub async fn save(&self, run: &SavePromptRun) -> Result<Uuid, AppError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        match Self::save_in_txn(&txn, run).await {
            Ok(run_id) => {
                txn.commit().await.map_err(db_err)?;
                debug!(prompt_id = %run.prompt_id, run_id = %run_id, "prompt run persisted");
                Ok(run_id)
            }
            Err(err) => {
                error!(prompt_id = %run.prompt_id, error = %err, "prompt run persistence failed");
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn save_in_txn(txn: &DatabaseTransaction, run: &SavePromptRun) -> Result<Uuid, AppError> {
        // Validate prompt and brand
        let prompt = prompts::Entity::find_by_id(run.prompt_id)
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(AppError::NotFound {
                entity: "prompt",
                id: run.prompt_id.to_string(),
            })?;

        if prompt.brand_id != run.brand_id {
            let brand = brands::Entity::find_by_id(run.brand_id)
                .one(txn)
                .await
                .map_err(db_err)?
                .ok_or(AppError::NotFound {
                    entity: "brand",
                    id: run.brand_id.to_string(),
                })?;
            if prompt.brand_id != brand.id {
                return Err(AppError::BrandMismatch {
                    prompt_id: run.prompt_id,
                    brand_id: run.brand_id,
                });
            }
        }

        let run_id = Uuid::new_v4();
        prompt_runs::ActiveModel {
            id: Set(run_id),
            prompt_id: Set(prompt.id),
            brand_id: Set(prompt.brand_id),
            run_date: Set(run.run_date),
            sentiment: Set(run.sentiment.as_str().to_string()),
            provider: Set(run.provider.as_str().to_string()),
            response_text: Set(run.response_text.clone()),
        }
        .insert(txn)
        .await
        .map_err(db_err)?;

        // Cited pages and their domain citations, ids collected in input order
        let mut source_ids = Vec::with_capacity(run.cited.len());
        for citation in &run.cited {
            let source_id = Uuid::new_v4();
            prompt_run_sources::ActiveModel {
                id: Set(source_id),
                prompt_run_id: Set(run_id),
                url: Set(citation.url.clone()),
                source_type: Set(citation.source_type.as_str().to_string()),
                is_mentioned: Set(citation.is_mentioned),
            }
            .insert(txn)
            .await
            .map_err(db_err)?;
            source_ids.push(source_id);

            prompt_run_domain_citations::ActiveModel {
                id: Set(Uuid::new_v4()),
                prompt_run_id: Set(run_id),
                domain: Set(citation.domain.clone()),
                is_mentioned: Set(citation.is_mentioned),
            }
            .insert(txn)
            .await
            .map_err(db_err)?;
        }

        // Brand metrics from the aggregated mentions
        let main_key = run.brand_name.to_lowercase();
        for (brand_key, mention) in aggregate_brand_mentions(&run.cited, &source_ids) {
            let metric_id = Uuid::new_v4();
            prompt_run_brand_metrics::ActiveModel {
                id: Set(metric_id),
                main_brand_id: Set(run.brand_id),
                prompt_run_id: Set(run_id),
                brand_key: Set(brand_key.clone()),
                brand_display: Set(mention.display.clone()),
                is_main: Set(brand_key == main_key),
                mentions: Set(mention.mentions),
                sentiment: Set(run.sentiment.as_str().to_string()),
            }
            .insert(txn)
            .await
            .map_err(db_err)?;

            Self::upsert_competitor(txn, run.brand_id, &brand_key, &mention).await?;

            for source_id in &mention.source_ids {
                prompt_run_brand_metric_sources::ActiveModel {
                    metric_id: Set(metric_id),
                    source_id: Set(*source_id),
                }
                .insert(txn)
                .await
                .map_err(db_err)?;
            }
        }

        Ok(run_id)
    }

    /// Insert-if-absent: an existing competitor row for the same
    /// (main brand, brand key) is never overwritten.
    async fn upsert_competitor<C: ConnectionTrait>(
        conn: &C,
        main_brand_id: Uuid,
        brand_key: &str,
        mention: &BrandMention,
    ) -> Result<(), AppError> {
        let existing = competitors::Entity::find()
            .filter(competitors::Column::MainBrandId.eq(main_brand_id))
            .filter(competitors::Column::BrandKey.eq(brand_key))
            .one(conn)
            .await
            .map_err(db_err)?;

        if existing.is_none() {
            competitors::ActiveModel {
                id: Set(Uuid::new_v4()),
                main_brand_id: Set(main_brand_id),
                brand_key: Set(brand_key.to_string()),
                brand_display: Set(mention.display.clone()),
                domain: Set(mention.domain.clone()),
                status: Set("suggested".to_string()),
            }
            .insert(conn)
            .await
            .map_err(db_err)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migration::{Migrator, MigratorTrait};
    use crate::visibility::classify::SourceType;
    use sea_orm::ConnectOptions;

    async fn setup_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = sea_orm::Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_brand_and_prompt(db: &DatabaseConnection) -> (Uuid, Uuid) {
        let brand_id = Uuid::new_v4();
        brands::ActiveModel {
            id: Set(brand_id),
            name: Set("Acme".to_string()),
            url: Set("https://acme.example".to_string()),
            user_id: Set("user-1".to_string()),
        }
        .insert(db)
        .await
        .unwrap();

        let prompt_id = Uuid::new_v4();
        prompts::ActiveModel {
            id: Set(prompt_id),
            brand_id: Set(brand_id),
            text: Set("best anvil brands".to_string()),
            last_run: Set(None),
            last_run_status: Set(None),
        }
        .insert(db)
        .await
        .unwrap();

        (brand_id, prompt_id)
    }

    fn citation(brand_name: &str, domain: &str, mentioned: bool) -> CitedSource {
        CitedSource {
            url: format!("https://{}/page", domain),
            domain: domain.to_string(),
            brand_name: brand_name.to_string(),
            is_mentioned: mentioned,
            source_type: SourceType::Other,
        }
    }

    fn run_dto(prompt_id: Uuid, brand_id: Uuid, cited: Vec<CitedSource>) -> SavePromptRun {
        SavePromptRun {
            prompt_id,
            brand_id,
            brand_name: "Acme".to_string(),
            run_date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            provider: ProviderKind::OpenAiGpt,
            response_text: "raw answer".to_string(),
            sentiment: Sentiment::Positive,
            cited,
        }
    }

    #[test]
    fn test_aggregation_counts_and_first_seen_display() {
        let cited = vec![
            citation("Acme", "acme.example", true),
            citation("ACME", "acme-mirror.example", true),
            citation("Rival", "rival.example", false),
            citation("", "nobrand.example", false),
        ];
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        let aggregated = aggregate_brand_mentions(&cited, &ids);
        assert_eq!(aggregated.len(), 2);

        let acme = &aggregated["acme"];
        assert_eq!(acme.mentions, 2);
        assert_eq!(acme.display, "Acme", "first-seen casing wins");
        assert_eq!(acme.domain, "acme.example");
        assert_eq!(acme.source_ids, vec![ids[0], ids[1]]);

        let rival = &aggregated["rival"];
        assert_eq!(rival.mentions, 1);
        assert_eq!(rival.source_ids, vec![ids[2]]);
    }

    #[test]
    fn test_aggregation_of_empty_citations() {
        assert!(aggregate_brand_mentions(&[], &[]).is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_all_rows_atomically() {
        let db = setup_db().await;
        let (brand_id, prompt_id) = seed_brand_and_prompt(&db).await;
        let persister = RunPersister::new(db.clone());

        let cited = vec![
            citation("Acme", "acme.example", true),
            citation("Acme", "news.example", true),
            citation("Rival", "rival.example", false),
        ];
        let run_id = persister
            .save(&run_dto(prompt_id, brand_id, cited))
            .await
            .unwrap();

        let runs = prompt_runs::Entity::find().all(&db).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run_id);
        assert_eq!(runs[0].sentiment, "positive");
        assert_eq!(runs[0].provider, "openai-gpt");

        let sources = prompt_run_sources::Entity::find().all(&db).await.unwrap();
        assert_eq!(sources.len(), 3);

        let domains = prompt_run_domain_citations::Entity::find()
            .all(&db)
            .await
            .unwrap();
        assert_eq!(domains.len(), 3, "one domain citation per source, not deduplicated");

        let metrics = prompt_run_brand_metrics::Entity::find().all(&db).await.unwrap();
        assert_eq!(metrics.len(), 2);

        // mentions equals the per-key citation count, and the metric links
        // to exactly that many sources
        for metric in &metrics {
            let expected = if metric.brand_key == "acme" { 2 } else { 1 };
            assert_eq!(metric.mentions, expected);
            assert_eq!(metric.is_main, metric.brand_key == "acme");
            assert_eq!(metric.sentiment, "positive");

            let links = prompt_run_brand_metric_sources::Entity::find()
                .filter(prompt_run_brand_metric_sources::Column::MetricId.eq(metric.id))
                .all(&db)
                .await
                .unwrap();
            assert_eq!(links.len() as i32, expected);
        }

        let competitor_rows = competitors::Entity::find().all(&db).await.unwrap();
        assert_eq!(competitor_rows.len(), 2);
        assert!(competitor_rows.iter().all(|c| c.status == "suggested"));
    }

    #[tokio::test]
    async fn test_save_without_citations_creates_only_the_run_row() {
        let db = setup_db().await;
        let (brand_id, prompt_id) = seed_brand_and_prompt(&db).await;
        let persister = RunPersister::new(db.clone());

        persister
            .save(&run_dto(prompt_id, brand_id, vec![]))
            .await
            .unwrap();

        assert_eq!(prompt_runs::Entity::find().all(&db).await.unwrap().len(), 1);
        assert!(prompt_run_sources::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(prompt_run_brand_metrics::Entity::find()
            .all(&db)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_competitor_is_never_overwritten() {
        let db = setup_db().await;
        let (brand_id, prompt_id) = seed_brand_and_prompt(&db).await;
        let persister = RunPersister::new(db.clone());

        persister
            .save(&run_dto(
                prompt_id,
                brand_id,
                vec![citation("Rival", "rival.example", true)],
            ))
            .await
            .unwrap();

        // Second run sees the same competitor under different casing/domain
        persister
            .save(&run_dto(
                prompt_id,
                brand_id,
                vec![citation("RIVAL", "rival-new.example", true)],
            ))
            .await
            .unwrap();

        let rows = competitors::Entity::find()
            .filter(competitors::Column::BrandKey.eq("rival"))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].brand_display, "Rival");
        assert_eq!(rows[0].domain, "rival.example");
    }

    #[tokio::test]
    async fn test_missing_prompt_fails_with_not_found() {
        let db = setup_db().await;
        let (brand_id, _) = seed_brand_and_prompt(&db).await;
        let persister = RunPersister::new(db.clone());

        let err = persister
            .save(&run_dto(Uuid::new_v4(), brand_id, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "prompt", .. }));
    }

    #[tokio::test]
    async fn test_missing_brand_rolls_back_everything() {
        let db = setup_db().await;
        let (_, prompt_id) = seed_brand_and_prompt(&db).await;
        let persister = RunPersister::new(db.clone());

        // Supplied brand differs from the prompt's brand and does not exist
        let err = persister
            .save(&run_dto(
                prompt_id,
                Uuid::new_v4(),
                vec![citation("Rival", "rival.example", true)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: "brand", .. }));

        // No partial rows survive the rollback
        assert!(prompt_runs::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(prompt_run_sources::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(competitors::Entity::find().all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_brand_fails_with_mismatch() {
        let db = setup_db().await;
        let (_, prompt_id) = seed_brand_and_prompt(&db).await;

        // A real brand that does not own the prompt
        let other_brand_id = Uuid::new_v4();
        brands::ActiveModel {
            id: Set(other_brand_id),
            name: Set("Other".to_string()),
            url: Set("https://other.example".to_string()),
            user_id: Set("user-2".to_string()),
        }
        .insert(&db)
        .await
        .unwrap();

        let persister = RunPersister::new(db.clone());
        let err = persister
            .save(&run_dto(prompt_id, other_brand_id, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BrandMismatch { .. }));
        assert!(prompt_runs::Entity::find().all(&db).await.unwrap().is_empty());
    }
}
