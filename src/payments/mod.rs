//! # Payments
//!
//! The payment gateway seam. Handlers talk to a [`PaymentProvider`] held as a trait
//! object in application state; the in-process [`MockPaymentProvider`] is the only
//! implementation shipped.

mod mock;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mock::MockPaymentProvider;

/// Metadata key tagging intents with the product being purchased.
pub const METADATA_PRODUCT: &str = "product";
/// Metadata key recording the tenant that created the intent.
pub const METADATA_TENANT_ID: &str = "tenant_id";
/// Product tag for the Pro subscription.
pub const PRO_SUBSCRIPTION_PRODUCT: &str = "pro_subscription";

/// Payment operation errors.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("payment intent not found: {0}")]
    NotFound(String),
}

/// Lifecycle state of a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    Succeeded,
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct PaymentIntentParams {
    /// Amount in minor currency units (cents)
    pub amount: u64,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

/// A payment intent as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: u64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == PaymentIntentStatus::Succeeded
    }

    /// Tenant recorded in the intent's metadata, if any.
    pub fn tenant_id(&self) -> Option<i64> {
        self.metadata
            .get(METADATA_TENANT_ID)
            .and_then(|value| value.parse().ok())
    }
}

/// Payment gateway operations used by the subscription flow.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_intent(
        &self,
        params: PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Fetch an intent. Unknown ids yield `Ok(None)`.
    async fn retrieve_payment_intent(&self, id: &str)
    -> Result<Option<PaymentIntent>, PaymentError>;
}
