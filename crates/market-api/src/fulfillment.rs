//! # Purchase Fulfillment
//!
//! [`WebhookHandler`] that drives purchase status from verified Stripe
//! events. This is the only code path that moves a purchase past
//! `pending`.

use async_trait::async_trait;
use market_core::{
    BoxedMarketStore, MarketError, MarketResult, PluginStore, Price, Purchase, PurchaseStatus,
    PurchaseStore, StatusUpdate, TransitionOutcome, TransitionReport,
};
use market_stripe::{CheckoutSessionData, RefundData, WebhookHandler};
use tracing::{info, instrument, warn};

pub struct PurchaseFulfillment {
    store: BoxedMarketStore,
}

impl PurchaseFulfillment {
    pub fn new(store: BoxedMarketStore) -> Self {
        Self { store }
    }

    /// Advance the purchase for a session. When checkout could not record
    /// the pending row, it is rebuilt from the session metadata first.
    async fn advance_session(
        &self,
        data: &CheckoutSessionData,
        update: &StatusUpdate,
    ) -> MarketResult<Option<TransitionReport>> {
        if let Some(report) = self
            .store
            .transition_by_session(&data.session_id, update)
            .await?
        {
            return Ok(Some(report));
        }

        let (Some(plugin_id), Some(user_id)) = (data.plugin_id(), data.user_id()) else {
            warn!(
                "No purchase for session {} and no metadata to rebuild it",
                data.session_id
            );
            return Ok(None);
        };

        warn!(
            "No purchase for session {}; recording it from metadata",
            data.session_id
        );
        let amount = Price::from_cents(data.amount_total, data.currency);
        self.store
            .insert_purchase(&Purchase::pending(plugin_id, user_id, &data.session_id, amount))
            .await?;

        self.store
            .transition_by_session(&data.session_id, update)
            .await?
            .map(Some)
            .ok_or_else(|| {
                MarketError::Internal(format!(
                    "Purchase for session {} vanished after insert",
                    data.session_id
                ))
            })
    }
}

fn log_report(report: &TransitionReport) {
    match report.outcome {
        TransitionOutcome::Applied => info!(
            "Purchase {} moved {} -> {}",
            report.purchase_id, report.from, report.to
        ),
        TransitionOutcome::Unchanged => info!(
            "Purchase {} already {}; duplicate delivery",
            report.purchase_id, report.to
        ),
        TransitionOutcome::Rejected => warn!(
            "Purchase {} cannot move {} -> {}; ignored",
            report.purchase_id, report.from, report.to
        ),
    }
}

#[async_trait]
impl WebhookHandler for PurchaseFulfillment {
    #[instrument(skip(self, data), fields(session = %data.session_id))]
    async fn on_checkout_completed(&self, data: CheckoutSessionData) -> MarketResult<()> {
        if !data.is_paid() {
            info!(
                "Checkout completed without payment (status {}); nothing to fulfil",
                data.payment_status
            );
            return Ok(());
        }

        let update = StatusUpdate::new(PurchaseStatus::Completed)
            .with_payment_intent(data.payment_intent_id.clone());

        let Some(report) = self.advance_session(&data, &update).await? else {
            return Ok(());
        };
        log_report(&report);

        // The purchase is already completed; a redelivery would see it
        // unchanged and never retry the counter
        if report.applied() {
            if let Err(e) = self.store.increment_downloads(&report.plugin_id).await {
                warn!(
                    "Download count not updated for plugin {}: {}",
                    report.plugin_id, e
                );
            }
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(session = %data.session_id))]
    async fn on_checkout_expired(&self, data: CheckoutSessionData) -> MarketResult<()> {
        let update = StatusUpdate::new(PurchaseStatus::Failed);
        match self
            .store
            .transition_by_session(&data.session_id, &update)
            .await?
        {
            Some(report) => log_report(&report),
            None => warn!("Expired session {} has no purchase", data.session_id),
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(payment_intent = %data.payment_intent_id))]
    async fn on_refund_issued(&self, data: RefundData) -> MarketResult<()> {
        let update = StatusUpdate::new(PurchaseStatus::Refunded);
        let reports = self
            .store
            .transition_by_payment_intent(&data.payment_intent_id, &update)
            .await?;

        if reports.is_empty() {
            warn!(
                "Refund for {} (charge {}) matches no purchase",
                data.payment_intent_id, data.charge_id
            );
        }
        reports.iter().for_each(log_report);
        Ok(())
    }
}
