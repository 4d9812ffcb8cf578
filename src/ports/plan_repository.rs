//! PlanRepository port - read access to subscription plans.

use async_trait::async_trait;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError>;
}
