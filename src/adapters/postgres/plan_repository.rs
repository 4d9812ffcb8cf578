//! PostgreSQL implementation of PlanRepository (read-only).

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, ErrorCode, PlanId};
use crate::ports::PlanRepository;

pub struct PostgresPlanRepository {
    pool: PgPool,
}

impl PostgresPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    duration_months: i32,
    currency: String,
    is_active: bool,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let duration_months = u32::try_from(row.duration_months).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid duration_months value: {}", row.duration_months),
            )
        })?;
        Ok(Plan {
            id: PlanId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            duration_months,
            currency: row.currency,
            is_active: row.is_active,
        })
    }
}

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn find_by_id(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, price, duration_months, currency, is_active
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load plan: {}", e)))?;
        row.map(Plan::try_from).transpose()
    }
}
