//! # market-stripe
//!
//! Stripe payment strategy for the plugin marketplace.
//!
//! - **StripeCheckoutStrategy** creates customers and hosted one-time
//!   checkout sessions, and verifies webhook signatures.
//! - **webhook** turns verified events into typed data and dispatches them
//!   to a [`WebhookHandler`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use market_core::{CheckoutRequest, PaymentStrategy};
//! use market_stripe::StripeCheckoutStrategy;
//!
//! let strategy = StripeCheckoutStrategy::from_env()?;
//! let request = CheckoutRequest::for_plugin(&plugin, &user.id, success, cancel);
//! let session = strategy.create_checkout(&request).await?;
//!
//! // Redirect the buyer to session.checkout_url
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! let event = strategy.verify_webhook(&body, signature).await?;
//! dispatch_webhook_event(&handler, event).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod signature;
pub mod webhook;

// Re-exports
pub use checkout::StripeCheckoutStrategy;
pub use config::StripeConfig;
pub use signature::{signature_header, verify_signature, DEFAULT_TOLERANCE_SECS};
pub use webhook::{
    dispatch_webhook_event, CheckoutSessionData, RefundData, WebhookHandler,
    REQUIRED_WEBHOOK_EVENTS,
};
