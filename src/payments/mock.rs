//! In-memory payment provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PaymentError, PaymentIntent, PaymentIntentParams, PaymentIntentStatus, PaymentProvider};

/// Mock gateway that keeps intents in memory.
///
/// With `auto_succeed` every new intent settles immediately, the way a test-mode
/// card does against a real gateway. Otherwise intents wait for
/// [`MockPaymentProvider::mark_succeeded`].
#[derive(Clone)]
pub struct MockPaymentProvider {
    auto_succeed: bool,
    payment_intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
}

impl MockPaymentProvider {
    pub fn new(auto_succeed: bool) -> Self {
        Self {
            auto_succeed,
            payment_intents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Settle a pending intent.
    pub async fn mark_succeeded(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        let mut intents = self.payment_intents.write().await;
        let intent = intents
            .get_mut(id)
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))?;

        intent.status = PaymentIntentStatus::Succeeded;
        Ok(intent.clone())
    }

    /// Gets the number of stored payment intents.
    pub async fn payment_intent_count(&self) -> usize {
        self.payment_intents.read().await.len()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_intent(
        &self,
        params: PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        if params.amount == 0 {
            return Err(PaymentError::InvalidParameters(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let id = format!("pi_mock_{}", Uuid::new_v4().simple());
        let intent = PaymentIntent {
            client_secret: format!("{id}_secret_{}", Uuid::new_v4().simple()),
            id: id.clone(),
            amount: params.amount,
            currency: params.currency,
            status: if self.auto_succeed {
                PaymentIntentStatus::Succeeded
            } else {
                PaymentIntentStatus::RequiresPaymentMethod
            },
            metadata: params.metadata,
        };

        tracing::debug!(
            payment_intent_id = %intent.id,
            amount = intent.amount,
            status = ?intent.status,
            "Mock payment intent created"
        );

        self.payment_intents
            .write()
            .await
            .insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(
        &self,
        id: &str,
    ) -> Result<Option<PaymentIntent>, PaymentError> {
        Ok(self.payment_intents.read().await.get(id).cloned())
    }
}
