//! Quota plan resolution
//!
//! Plans are owned by an external configuration service; this module only
//! reads them. A plan is a mapping of limit names to JSON values, e.g.
//! `"runs.monthly" -> 25`. Non-numeric or missing limits resolve to 0.

use crate::database::dao::UsersDao;
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Limit name for the monthly runs counter
pub const RUNS_MONTHLY: &str = "runs.monthly";

/// Plan id trial users resolve to
const TRIAL_PLAN_ID: &str = "1";

/// A single plan: limit-name to numeric/boolean/string limit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaPlan {
    #[serde(default)]
    pub limits: HashMap<String, serde_json::Value>,
}

impl QuotaPlan {
    /// Numeric limit by name, coerced to a finite f64; 0 if missing or
    /// non-numeric (matching the upstream plan contract).
    pub fn numeric_limit(&self, name: &str) -> f64 {
        let value = match self.limits.get(name) {
            Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0.0),
            _ => 0.0,
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

/// Plan catalog configuration: plan id to plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlansConfig {
    #[serde(default)]
    pub plans: HashMap<String, QuotaPlan>,
}

/// Read-only source of the plan a user is on
#[async_trait]
pub trait PlanSource: Send + Sync {
    async fn plan_for_user(&self, user_id: &str) -> Result<QuotaPlan, AppError>;

    /// Convenience: the monthly runs limit for a user
    async fn monthly_runs_limit(&self, user_id: &str) -> Result<f64, AppError> {
        Ok(self.plan_for_user(user_id).await?.numeric_limit(RUNS_MONTHLY))
    }
}

/// Plan source backed by the configured plan catalog and the users table.
/// The user's `tier` column carries the plan id; trial users fall back to
/// plan `"1"`.
pub struct ConfigPlanSource {
    users: UsersDao,
    config: PlansConfig,
}

impl ConfigPlanSource {
    pub fn new(users: UsersDao, config: PlansConfig) -> Self {
        Self { users, config }
    }

    fn resolve_plan_id(tier: &str) -> &str {
        if tier == "trial" {
            TRIAL_PLAN_ID
        } else {
            tier
        }
    }
}

#[async_trait]
impl PlanSource for ConfigPlanSource {
    async fn plan_for_user(&self, user_id: &str) -> Result<QuotaPlan, AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;

        let plan_id = Self::resolve_plan_id(&user.tier);
        let plan = self.config.plans.get(plan_id).cloned().unwrap_or_default();
        debug!(user_id, plan_id, "resolved quota plan");
        Ok(plan)
    }
}
