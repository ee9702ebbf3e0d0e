//! # Purchase Types
//!
//! A purchase is recorded as `pending` when a checkout session is created
//! and only moves forward from there:
//!
//! ```text
//!            ┌──────────► completed ──────┐
//!  pending ──┼──────────► failed          ├──► refunded
//!            └────────────────────────────┘
//! ```
//!
//! `failed` and `refunded` are terminal. Repeating the current status is
//! reported as `Unchanged` so duplicate webhook deliveries are harmless.

use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Result of asking a purchase to move to a new status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Status changed
    Applied,
    /// Already in the requested status
    Unchanged,
    /// Would move backwards or out of a terminal status
    Rejected,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::Refunded => "refunded",
        }
    }

    /// Decide what moving from `self` to `to` means
    pub fn transition(self, to: PurchaseStatus) -> TransitionOutcome {
        use PurchaseStatus::*;

        if self == to {
            return TransitionOutcome::Unchanged;
        }
        match (self, to) {
            (Pending, Completed) | (Pending, Failed) | (Pending, Refunded) => {
                TransitionOutcome::Applied
            }
            (Completed, Refunded) => TransitionOutcome::Applied,
            _ => TransitionOutcome::Rejected,
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's transaction for a plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub plugin_id: String,
    pub user_id: String,
    #[serde(default)]
    pub status: PurchaseStatus,
    /// Payment session the purchase was created for
    pub session_id: String,
    /// Known once the payment completes; refunds are matched on it
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    pub amount: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// A new pending purchase for a freshly created session
    pub fn pending(
        plugin_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        amount: Price,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            plugin_id: plugin_id.into(),
            user_id: user_id.into(),
            status: PurchaseStatus::Pending,
            session_id: session_id.into(),
            payment_intent_id: None,
            amount,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PurchaseStatus::Completed
    }

    /// Move to `to` if allowed. Sets the payment intent when one is given
    /// and none is recorded yet.
    pub fn advance(
        &mut self,
        to: PurchaseStatus,
        payment_intent_id: Option<&str>,
    ) -> TransitionOutcome {
        let outcome = self.status.transition(to);
        if outcome == TransitionOutcome::Applied {
            self.status = to;
            if self.payment_intent_id.is_none() {
                self.payment_intent_id = payment_intent_id.map(String::from);
            }
            self.updated_at = Utc::now();
        }
        outcome
    }
}

/// Status change requested by a webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub to: PurchaseStatus,
    pub payment_intent_id: Option<String>,
}

impl StatusUpdate {
    pub fn new(to: PurchaseStatus) -> Self {
        Self {
            to,
            payment_intent_id: None,
        }
    }

    pub fn with_payment_intent(mut self, payment_intent_id: Option<String>) -> Self {
        self.payment_intent_id = payment_intent_id;
        self
    }
}

/// What happened to one purchase row
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReport {
    pub purchase_id: String,
    pub plugin_id: String,
    pub from: PurchaseStatus,
    pub to: PurchaseStatus,
    pub outcome: TransitionOutcome,
}

impl TransitionReport {
    pub fn new(
        purchase: &Purchase,
        from: PurchaseStatus,
        to: PurchaseStatus,
        outcome: TransitionOutcome,
    ) -> Self {
        Self {
            purchase_id: purchase.id.clone(),
            plugin_id: purchase.plugin_id.clone(),
            from,
            to,
            outcome,
        }
    }

    pub fn applied(&self) -> bool {
        self.outcome == TransitionOutcome::Applied
    }
}
