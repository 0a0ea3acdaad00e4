//! Visibility batch pipeline
//!
//! A job carries a brand and its prompts. For each requested provider the
//! runner walks the prompts sequentially: charge one run against the user's
//! monthly quota, execute the provider, classify the answer, persist the
//! result. A provider or classification failure skips that prompt; a quota
//! rejection ends the batch.

use crate::database::dao::{PromptsDao, RunStatus};
use crate::error::AppError;
use crate::plans::PlanSource;
use crate::providers::{Provider, ProviderKind, ProviderRegistry};
use crate::usage::{Period, UsageLedger};
use crate::visibility::classify::Classifier;
use crate::visibility::persist::{RunPersister, SavePromptRun};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub mod classify;
pub mod persist;

/// Job type accepted by the worker
pub const VISIBILITY_JOB_TYPE: &str = "visibility.check";

/// Counter charged per prompt run
pub const RUNS_COUNTER: &str = "runs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptInput {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandInput {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityJob {
    pub user_id: String,
    pub brand: BrandInput,
    pub prompts: Vec<PromptInput>,
    pub providers: Vec<String>,
}

/// Queue envelope around a job payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    #[serde(rename = "type")]
    pub job_type: String,
    pub data: VisibilityJob,
}

/// Outcome of one provider batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub ok: bool,
    /// Prompts that completed end to end
    pub processed: usize,
    /// Prompts the job asked for
    pub requested: usize,
    /// Monthly limit the batch ran under
    pub limit: f64,
}

/// Runs visibility jobs against the quota ledger and the provider set
pub struct BatchRunner {
    ledger: UsageLedger,
    persister: RunPersister,
    prompts: PromptsDao,
    plans: Arc<dyn PlanSource>,
    providers: ProviderRegistry,
    classifier: Arc<dyn Classifier>,
}

impl BatchRunner {
    pub fn new(
        ledger: UsageLedger,
        persister: RunPersister,
        prompts: PromptsDao,
        plans: Arc<dyn PlanSource>,
        providers: ProviderRegistry,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            ledger,
            persister,
            prompts,
            plans,
            providers,
            classifier,
        }
    }

    /// Run the job once per requested provider. Providers without an
    /// implementation are logged and skipped; they produce no summary.
    pub async fn run_job(&self, job: &VisibilityJob) -> Result<Vec<BatchSummary>, AppError> {
        let mut summaries = Vec::new();

        for name in &job.providers {
            let kind = ProviderKind::parse(name);
            let Some(provider) = self.providers.get(&kind) else {
                warn!(provider = %kind, "provider not implemented, skipping");
                continue;
            };
            summaries.push(self.run_batch(job, &kind, provider.as_ref()).await?);
        }

        Ok(summaries)
    }

    async fn run_batch(
        &self,
        job: &VisibilityJob,
        kind: &ProviderKind,
        provider: &dyn Provider,
    ) -> Result<BatchSummary, AppError> {
        let user_id = job.user_id.as_str();
        let limit = self.plans.monthly_runs_limit(user_id).await?;

        // Pre-size from the cached estimate. Zero remaining means no cap
        // here: the ledger is the authority and rejects the first charge.
        let used = self
            .ledger
            .get_current(user_id, &[RUNS_COUNTER], Period::Month)
            .await?
            .get(RUNS_COUNTER)
            .copied()
            .unwrap_or(0);
        let remaining = (limit - used as f64).max(0.0);
        let to_process = if remaining > 0.0 {
            // Fractional limits pre-size to the whole runs that fit
            job.prompts.len().min(remaining.floor() as usize)
        } else {
            job.prompts.len()
        };

        info!(
            provider = %kind,
            user_id,
            requested = job.prompts.len(),
            to_process,
            limit,
            "starting visibility batch"
        );

        let mut processed = 0;
        for prompt in &job.prompts[..to_process] {
            match self.run_one(job, prompt, kind, provider, limit).await {
                Ok(()) => processed += 1,
                Err(err) => {
                    error!(prompt_id = %prompt.id, error = %err, "prompt run failed");
                    if let Err(mark_err) =
                        self.prompts.mark_last_run(prompt.id, RunStatus::Failed).await
                    {
                        error!(prompt_id = %prompt.id, error = %mark_err, "failed to mark prompt failed");
                    }
                    // Quota rejection is terminal for the batch; anything
                    // else only skips this prompt
                    if err.is_quota_exceeded() {
                        warn!(user_id, "monthly run quota exhausted, stopping batch");
                        break;
                    }
                }
            }
        }

        Ok(BatchSummary {
            ok: true,
            processed,
            requested: job.prompts.len(),
            limit,
        })
    }

    /// One prompt end to end. The quota charge comes first and is not
    /// refunded on later failure: a failed provider call still spent the run.
    async fn run_one(
        &self,
        job: &VisibilityJob,
        prompt: &PromptInput,
        kind: &ProviderKind,
        provider: &dyn Provider,
        limit: f64,
    ) -> Result<(), AppError> {
        self.ledger
            .consume(&job.user_id, RUNS_COUNTER, 1, limit, Period::Month)
            .await?;

        self.prompts.mark_last_run(prompt.id, RunStatus::Running).await?;

        let response_text = provider.run(&prompt.text).await?;
        let classification = self.classifier.classify(&job.brand.name, &response_text).await?;

        self.prompts.mark_last_run(prompt.id, RunStatus::Completed).await?;

        self.persister
            .save(&SavePromptRun {
                prompt_id: prompt.id,
                brand_id: job.brand.id,
                brand_name: job.brand.name.clone(),
                run_date: Utc::now().date_naive(),
                provider: kind.clone(),
                response_text,
                sentiment: classification.sentiment,
                cited: classification.cited,
            })
            .await?;

        Ok(())
    }
}
