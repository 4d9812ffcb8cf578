//! ReconciliationScheduler - periodic sweep over payments the gateway has
//! not settled yet.
//!
//! Webhooks can be lost. Every `interval` the scheduler fetches each
//! non-terminal payment from the gateway and runs it through the same
//! reconciliation path the webhook ingestor uses, so both paths converge.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 300s | Time between sweeps |
//! | `statuses` | `in_process` | Statuses the sweep polls |
//! | `webhook_retention` | none | Age after which processed webhook rows are purged |
//!
//! ## Graceful Shutdown
//!
//! A sweep in flight is never cancelled; the loop exits after it finishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::billing::{BillingError, EventDeduplicator, Payment, PaymentStatus};
use crate::ports::PaymentGateway;

use super::payment_ledger::PaymentLedger;

/// Configuration for the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct ReconciliationSchedulerConfig {
    pub interval: Duration,
    pub statuses: Vec<PaymentStatus>,
    pub webhook_retention: Option<chrono::Duration>,
}

impl Default for ReconciliationSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            statuses: vec![PaymentStatus::InProcess],
            webhook_retention: None,
        }
    }
}

impl ReconciliationSchedulerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<PaymentStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_webhook_retention(mut self, retention: chrono::Duration) -> Self {
        self.webhook_retention = Some(retention);
        self
    }
}

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub updated: usize,
    pub published: usize,
    pub failed: usize,
    pub skipped: usize,
}

enum ItemOutcome {
    Skipped,
    Unchanged,
    Updated { published: bool },
}

pub struct ReconciliationScheduler {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<PaymentLedger>,
    deduplicator: Option<EventDeduplicator>,
    config: ReconciliationSchedulerConfig,
}

impl ReconciliationScheduler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, ledger: Arc<PaymentLedger>) -> Self {
        Self::with_config(gateway, ledger, ReconciliationSchedulerConfig::default())
    }

    pub fn with_config(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<PaymentLedger>,
        config: ReconciliationSchedulerConfig,
    ) -> Self {
        Self {
            gateway,
            ledger,
            deduplicator: None,
            config,
        }
    }

    /// Purges old webhook records after each sweep when a retention is configured.
    pub fn with_deduplicator(mut self, deduplicator: EventDeduplicator) -> Self {
        self.deduplicator = Some(deduplicator);
        self
    }

    pub fn config(&self) -> &ReconciliationSchedulerConfig {
        &self.config
    }

    /// Sweeps until the shutdown flag flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            statuses = ?self.config.statuses,
            "Reconciliation scheduler started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Reconciliation scheduler stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::error!(error = %e, "Reconciliation sweep failed");
                    }
                    self.purge_webhook_events().await;
                }
            }
        }
    }

    /// Runs one sweep. Only the initial listing can fail; per-payment
    /// failures are counted and logged.
    pub async fn sweep_once(&self) -> Result<SweepReport, BillingError> {
        let payments = self.ledger.find_by_statuses(&self.config.statuses).await?;
        let mut report = SweepReport::default();

        for payment in payments {
            report.examined += 1;
            let payment_id = payment.id;

            match self.reconcile_one(payment).await {
                Ok(ItemOutcome::Skipped) => report.skipped += 1,
                Ok(ItemOutcome::Unchanged) => {}
                Ok(ItemOutcome::Updated { published }) => {
                    report.updated += 1;
                    if published {
                        report.published += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(payment_id = %payment_id, error = %e, "Failed to reconcile payment");
                }
            }
        }

        if report.examined > 0 {
            tracing::info!(
                examined = report.examined,
                updated = report.updated,
                published = report.published,
                failed = report.failed,
                skipped = report.skipped,
                "Reconciliation sweep finished"
            );
        }
        Ok(report)
    }

    async fn reconcile_one(&self, payment: Payment) -> Result<ItemOutcome, BillingError> {
        let Some(gateway_payment_id) = payment.gateway_payment_id.clone() else {
            tracing::debug!(payment_id = %payment.id, "No gateway id yet, skipping");
            return Ok(ItemOutcome::Skipped);
        };

        let Some(snapshot) = self.gateway.get_payment(&gateway_payment_id).await? else {
            tracing::warn!(
                payment_id = %payment.id,
                gateway_payment_id = %gateway_payment_id,
                "Gateway does not know payment"
            );
            return Ok(ItemOutcome::Skipped);
        };

        let update = self.ledger.reconcile_payment(payment, Some(&snapshot)).await?;
        if update.changed {
            Ok(ItemOutcome::Updated {
                published: update.published,
            })
        } else {
            Ok(ItemOutcome::Unchanged)
        }
    }

    async fn purge_webhook_events(&self) {
        let (Some(deduplicator), Some(retention)) =
            (&self.deduplicator, self.config.webhook_retention)
        else {
            return;
        };
        if let Err(e) = deduplicator.purge_older_than(retention).await {
            tracing::warn!(error = %e, "Failed to purge processed webhook events");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryPaymentRepository, InMemoryPlanRepository, InMemoryWebhookEventRepository,
    };
    use crate::domain::billing::{fixtures, PaymentSnapshot, Plan};
    use crate::domain::foundation::{GatewayPaymentId, PaymentId};
    use crate::ports::{GatewayError, PaymentRepository, WebhookEventRecord, WebhookEventRepository};
    use rust_decimal_macros::dec;

    struct Harness {
        scheduler: ReconciliationScheduler,
        gateway: MockPaymentGateway,
        payments: Arc<InMemoryPaymentRepository>,
        bus: Arc<InMemoryEventBus>,
    }

    fn harness(config: ReconciliationSchedulerConfig) -> Harness {
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let plans = Arc::new(InMemoryPlanRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let gateway = MockPaymentGateway::new();
        let ledger = Arc::new(PaymentLedger::new(payments.clone(), plans, bus.clone()));

        Harness {
            scheduler: ReconciliationScheduler::with_config(Arc::new(gateway.clone()), ledger, config),
            gateway,
            payments,
            bus,
        }
    }

    fn plan_for(payment: &Payment) -> Plan {
        Plan {
            id: payment.plan_id,
            name: "Monthly".to_string(),
            description: None,
            price: dec!(100.00),
            duration_months: 1,
            currency: "PEN".to_string(),
            is_active: true,
        }
    }

    async fn pending_payment(h: &Harness, reference: &str, gateway_id: Option<&str>) -> Payment {
        let mut payment = fixtures::payment_with_status(PaymentStatus::InProcess);
        payment.id = PaymentId::new();
        payment.external_reference = reference.to_string();
        payment.gateway_payment_id = gateway_id.map(|id| GatewayPaymentId::new(id).unwrap());
        h.payments.insert(&payment).await.unwrap();
        payment
    }

    fn gateway_reports(h: &Harness, gateway_id: &str, status: PaymentStatus) {
        h.gateway.insert_snapshot(
            PaymentSnapshot::new(GatewayPaymentId::new(gateway_id).unwrap())
                .with_status(status)
                .with_authorization_code("AUTH1"),
        );
    }

    // ══════════════════════════════════════════════════════════════
    // sweep_once
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn sweep_with_no_pending_payments_is_empty() {
        let h = harness(ReconciliationSchedulerConfig::default());

        let report = h.scheduler.sweep_once().await.unwrap();

        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn sweep_approves_and_publishes() {
        let h = harness(ReconciliationSchedulerConfig::default());
        let payment = pending_payment(&h, "order-1", Some("100")).await;
        let ledger_plans = InMemoryPlanRepository::with_plans([plan_for(&payment)]);
        let ledger = Arc::new(PaymentLedger::new(h.payments.clone(), Arc::new(ledger_plans), h.bus.clone()));
        let scheduler = ReconciliationScheduler::new(Arc::new(h.gateway.clone()), ledger);
        gateway_reports(&h, "100", PaymentStatus::Approved);

        let report = scheduler.sweep_once().await.unwrap();

        assert_eq!(report.examined, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.published, 1);
        let stored = h.payments.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Approved);
        assert!(stored.approved_at.is_some());
        assert_eq!(h.bus.event_count(), 1);
    }

    #[tokio::test]
    async fn sweep_skips_payments_without_gateway_id() {
        let h = harness(ReconciliationSchedulerConfig::default());
        pending_payment(&h, "order-1", None).await;

        let report = h.scheduler.sweep_once().await.unwrap();

        assert_eq!(report.examined, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(h.gateway.get_calls(), 0);
    }

    #[tokio::test]
    async fn gateway_failure_is_isolated_per_payment() {
        let h = harness(ReconciliationSchedulerConfig::default());
        pending_payment(&h, "order-1", Some("100")).await;
        pending_payment(&h, "order-2", Some("200")).await;
        h.gateway.fail_lookups(GatewayError::network("connection reset"));

        let report = h.scheduler.sweep_once().await.unwrap();

        assert_eq!(report.examined, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(h.gateway.get_calls(), 2);
    }

    #[tokio::test]
    async fn unchanged_status_is_not_written() {
        let h = harness(ReconciliationSchedulerConfig::default());
        let payment = pending_payment(&h, "order-1", Some("100")).await;
        h.gateway.insert_snapshot(
            PaymentSnapshot::new(GatewayPaymentId::new("100").unwrap())
                .with_status(PaymentStatus::InProcess),
        );

        let report = h.scheduler.sweep_once().await.unwrap();

        assert_eq!(report.updated, 0);
        let stored = h.payments.find_by_id(&payment.id).await.unwrap().unwrap();
        assert_eq!(stored.version, payment.version);
    }

    #[tokio::test]
    async fn second_sweep_does_not_republish() {
        let h = harness(
            ReconciliationSchedulerConfig::default()
                .with_statuses(vec![PaymentStatus::InProcess, PaymentStatus::Pending]),
        );
        pending_payment(&h, "order-1", Some("100")).await;
        gateway_reports(&h, "100", PaymentStatus::Rejected);

        let first = h.scheduler.sweep_once().await.unwrap();
        let second = h.scheduler.sweep_once().await.unwrap();

        assert_eq!(first.updated, 1);
        assert_eq!(second.examined, 0);
        assert_eq!(h.bus.event_count(), 0);
    }

    // ══════════════════════════════════════════════════════════════
    // run
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let h = harness(
            ReconciliationSchedulerConfig::default().with_interval(Duration::from_millis(10)),
        );
        pending_payment(&h, "order-1", Some("100")).await;
        gateway_reports(&h, "100", PaymentStatus::Rejected);
        let payments = h.payments.clone();
        let scheduler = h.scheduler;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let stored = payments.find_by_external_reference("order-1").await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Rejected);
    }

    #[tokio::test]
    async fn tick_purges_expired_webhook_events() {
        let events = Arc::new(InMemoryWebhookEventRepository::new());
        let mut stale = WebhookEventRecord::new("evt-old", "payment", None, "{}".to_string());
        stale.processed_at = chrono::Utc::now() - chrono::Duration::days(40);
        events.save(stale).await.unwrap();
        events
            .save(WebhookEventRecord::new("evt-new", "payment", None, "{}".to_string()))
            .await
            .unwrap();

        let h = harness(
            ReconciliationSchedulerConfig::default()
                .with_interval(Duration::from_millis(10))
                .with_webhook_retention(chrono::Duration::days(30)),
        );
        let scheduler = h.scheduler.with_deduplicator(EventDeduplicator::new(events.clone()));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(events.get("evt-old").await.is_none());
        assert!(events.get("evt-new").await.is_some());
    }

    #[test]
    fn config_defaults_poll_in_process_every_five_minutes() {
        let config = ReconciliationSchedulerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.statuses, vec![PaymentStatus::InProcess]);
        assert!(config.webhook_retention.is_none());
    }
}
