//! In-memory plan catalogue.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};
use crate::ports::PlanRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanRepository {
    plans: Arc<RwLock<HashMap<PlanId, Plan>>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        let plans = plans.into_iter().map(|plan| (plan.id, plan)).collect();
        Self {
            plans: Arc::new(RwLock::new(plans)),
        }
    }

    /// Adds or replaces a plan.
    pub async fn upsert(&self, plan: Plan) {
        self.plans.write().await.insert(plan.id, plan);
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.plans.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn finds_upserted_plan() {
        let repo = InMemoryPlanRepository::new();
        let plan = Plan {
            id: PlanId::new(),
            name: "Annual".to_string(),
            description: Some("Twelve months".to_string()),
            price: dec!(900.00),
            duration_months: 12,
            currency: "PEN".to_string(),
            is_active: true,
        };
        repo.upsert(plan.clone()).await;

        assert_eq!(repo.find_by_id(&plan.id).await.unwrap(), Some(plan));
        assert_eq!(repo.find_by_id(&PlanId::new()).await.unwrap(), None);
    }
}
