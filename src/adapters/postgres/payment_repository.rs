//! PostgreSQL implementation of PaymentRepository.
//!
//! Creation relies on the unique constraints on `external_reference` and
//! `gateway_payment_id`; updates are compare-and-set on `version`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{PayerInfo, Payment, PaymentStatus};
use crate::domain::foundation::{
    DomainError, ErrorCode, GatewayPaymentId, PaymentId, PlanId, Timestamp, UserId,
};
use crate::ports::{InsertResult, PaymentRepository, UpdateResult};

const SELECT_COLUMNS: &str = r#"
    SELECT id, external_reference, gateway_payment_id, user_id, plan_id, amount, currency,
           installments, payment_method_id, payment_type_id, status, status_detail,
           authorization_code, transaction_id, payer_email, payer_first_name, payer_last_name,
           payer_identification_type, payer_identification_number, created_at, approved_at,
           updated_at, version
    FROM payments
"#;

/// PostgreSQL implementation of the PaymentRepository port.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    external_reference: String,
    gateway_payment_id: Option<String>,
    user_id: Uuid,
    plan_id: Uuid,
    amount: Decimal,
    currency: String,
    installments: i32,
    payment_method_id: Option<String>,
    payment_type_id: Option<String>,
    status: String,
    status_detail: Option<String>,
    authorization_code: Option<String>,
    transaction_id: Option<String>,
    payer_email: String,
    payer_first_name: String,
    payer_last_name: String,
    payer_identification_type: Option<String>,
    payer_identification_number: Option<String>,
    created_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let gateway_payment_id = row
            .gateway_payment_id
            .map(GatewayPaymentId::new)
            .transpose()
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid gateway_payment_id: {}", e))
            })?;
        let installments = u32::try_from(row.installments).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid installments value: {}", row.installments),
            )
        })?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            external_reference: row.external_reference,
            gateway_payment_id,
            user_id: UserId::from_uuid(row.user_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            amount: row.amount,
            currency: row.currency,
            installments,
            payment_method_id: row.payment_method_id,
            payment_type_id: row.payment_type_id,
            status: PaymentStatus::parse(&row.status),
            status_detail: row.status_detail,
            authorization_code: row.authorization_code,
            transaction_id: row.transaction_id,
            payer: PayerInfo {
                email: row.payer_email,
                first_name: row.payer_first_name,
                last_name: row.payer_last_name,
                identification_type: row.payer_identification_type,
                identification_number: row.payer_identification_number,
            },
            created_at: Timestamp::from_datetime(row.created_at),
            approved_at: row.approved_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn installments_column(payment: &Payment) -> Result<i32, DomainError> {
    i32::try_from(payment.installments)
        .map_err(|_| DomainError::validation("installments", "does not fit the installments column"))
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<InsertResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, external_reference, gateway_payment_id, user_id, plan_id, amount, currency,
                installments, payment_method_id, payment_type_id, status, status_detail,
                authorization_code, transaction_id, payer_email, payer_first_name,
                payer_last_name, payer_identification_type, payer_identification_number,
                created_at, approved_at, updated_at, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.external_reference)
        .bind(payment.gateway_payment_id.as_ref().map(|id| id.as_str()))
        .bind(payment.user_id.as_uuid())
        .bind(payment.plan_id.as_uuid())
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(installments_column(payment)?)
        .bind(&payment.payment_method_id)
        .bind(&payment.payment_type_id)
        .bind(payment.status.as_str())
        .bind(&payment.status_detail)
        .bind(&payment.authorization_code)
        .bind(&payment.transaction_id)
        .bind(&payment.payer.email)
        .bind(&payment.payer.first_name)
        .bind(&payment.payer.last_name)
        .bind(&payment.payer.identification_type)
        .bind(&payment.payer.identification_number)
        .bind(payment.created_at.as_datetime())
        .bind(payment.approved_at.as_ref().map(|t| *t.as_datetime()))
        .bind(payment.updated_at.as_datetime())
        .bind(payment.version)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert payment", e))?;

        if result.rows_affected() == 0 {
            Ok(InsertResult::AlreadyExists)
        } else {
            Ok(InsertResult::Inserted)
        }
    }

    async fn update(&self, payment: &Payment) -> Result<UpdateResult, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                gateway_payment_id = COALESCE(gateway_payment_id, $3),
                status = $4,
                status_detail = $5,
                authorization_code = $6,
                approved_at = $7,
                payment_type_id = $8,
                updated_at = $9,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.version)
        .bind(payment.gateway_payment_id.as_ref().map(|id| id.as_str()))
        .bind(payment.status.as_str())
        .bind(&payment.status_detail)
        .bind(&payment.authorization_code)
        .bind(payment.approved_at.as_ref().map(|t| *t.as_datetime()))
        .bind(&payment.payment_type_id)
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update payment", e))?;

        if result.rows_affected() == 1 {
            return Ok(UpdateResult::Updated);
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT version FROM payments WHERE id = $1")
            .bind(payment.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check payment version", e))?;
        match exists {
            Some(_) => Ok(UpdateResult::VersionConflict),
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment {} not found", payment.id),
            )),
        }
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let sql = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load payment", e))?;
        row.map(Payment::try_from).transpose()
    }

    async fn find_by_external_reference(
        &self,
        external_reference: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let sql = format!("{} WHERE external_reference = $1", SELECT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(external_reference)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load payment by external reference", e))?;
        row.map(Payment::try_from).transpose()
    }

    async fn find_by_gateway_payment_id(
        &self,
        id: &GatewayPaymentId,
    ) -> Result<Option<Payment>, DomainError> {
        let sql = format!("{} WHERE gateway_payment_id = $1", SELECT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load payment by gateway id", e))?;
        row.map(Payment::try_from).transpose()
    }

    async fn find_by_statuses(&self, statuses: &[PaymentStatus]) -> Result<Vec<Payment>, DomainError> {
        let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!("{} WHERE status = ANY($1) ORDER BY created_at", SELECT_COLUMNS);
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
            .bind(names)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list payments by status", e))?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn find_latest_approved_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Payment>, DomainError> {
        let sql = format!(
            "{} WHERE user_id = $1 AND status = 'approved' \
             ORDER BY COALESCE(approved_at, created_at) DESC, created_at DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let row: Option<PaymentRow> = sqlx::query_as(&sql)
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load active subscription", e))?;
        row.map(Payment::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> PaymentRow {
        let now = Utc::now();
        PaymentRow {
            id: Uuid::new_v4(),
            external_reference: "order-1".to_string(),
            gateway_payment_id: Some("9001".to_string()),
            user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            amount: dec!(100.00),
            currency: "PEN".to_string(),
            installments: 3,
            payment_method_id: Some("visa".to_string()),
            payment_type_id: Some("credit_card".to_string()),
            status: "in_process".to_string(),
            status_detail: Some("pending_contingency".to_string()),
            authorization_code: Some("PENDING".to_string()),
            transaction_id: Some("9001".to_string()),
            payer_email: "ana@example.com".to_string(),
            payer_first_name: "Ana".to_string(),
            payer_last_name: "Quispe".to_string(),
            payer_identification_type: None,
            payer_identification_number: None,
            created_at: now,
            approved_at: None,
            updated_at: now,
            version: 4,
        }
    }

    #[test]
    fn row_converts_to_payment() {
        let payment = Payment::try_from(row()).unwrap();

        assert_eq!(payment.status, PaymentStatus::InProcess);
        assert_eq!(payment.installments, 3);
        assert_eq!(payment.version, 4);
        assert_eq!(payment.gateway_payment_id.unwrap().as_str(), "9001");
        assert_eq!(payment.payer.full_name(), "Ana Quispe");
    }

    #[test]
    fn unrecognised_status_reads_as_unknown() {
        let mut raw = row();
        raw.status = "charged_back".to_string();

        let payment = Payment::try_from(raw).unwrap();

        assert_eq!(payment.status, PaymentStatus::Unknown);
    }

    #[test]
    fn negative_installments_are_rejected() {
        let mut raw = row();
        raw.installments = -1;

        let err = Payment::try_from(raw).unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
