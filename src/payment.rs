use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Caller;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::Offer;
use crate::store::Store;

/// Client-confirmable payment handle returned by the provider.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ProviderIntentResponse {
    id: String,
    client_secret: String,
}

enum Mode {
    Live {
        http: reqwest::Client,
        api_url: String,
        secret_key: String,
    },
    /// Local deterministic handles; used when no provider key is configured
    /// and by the test suite.
    Simulated,
}

/// External payment collaborator: turns an amount into a handle the client
/// can confirm. Creating an intent never touches offer state.
pub struct PaymentClient {
    mode: Mode,
}

impl PaymentClient {
    pub fn from_config(config: &AppConfig) -> Self {
        match (&config.payment_api_url, &config.payment_secret_key) {
            (Some(api_url), Some(secret_key)) => Self {
                mode: Mode::Live {
                    http: reqwest::Client::new(),
                    api_url: api_url.clone(),
                    secret_key: secret_key.clone(),
                },
            },
            _ => {
                log::warn!("no payment provider configured, running in simulated mode");
                Self::simulated()
            }
        }
    }

    pub fn simulated() -> Self {
        Self {
            mode: Mode::Simulated,
        }
    }

    pub async fn create_intent(&self, amount: i64) -> Result<PaymentIntent, ApiError> {
        match &self.mode {
            Mode::Live {
                http,
                api_url,
                secret_key,
            } => {
                let response = http
                    .post(format!("{}/v1/payment_intents", api_url))
                    .bearer_auth(secret_key)
                    .form(&[
                        ("amount", amount.to_string()),
                        ("currency", "usd".to_string()),
                    ])
                    .send()
                    .await
                    .map_err(|e| ApiError::Upstream(format!("provider unreachable: {}", e)))?;
                if !response.status().is_success() {
                    return Err(ApiError::Upstream(format!(
                        "provider returned {}",
                        response.status()
                    )));
                }
                let intent: ProviderIntentResponse = response
                    .json()
                    .await
                    .map_err(|e| ApiError::Upstream(format!("malformed provider response: {}", e)))?;
                Ok(PaymentIntent {
                    id: intent.id,
                    client_secret: intent.client_secret,
                })
            }
            Mode::Simulated => {
                let id = format!("pi_{}", Uuid::new_v4().simple());
                let client_secret = format!("{}_secret_{}", id, Uuid::new_v4().simple());
                Ok(PaymentIntent { id, client_secret })
            }
        }
    }
}

/// Consumes an externally confirmed transaction id and finalizes the accepted
/// offer. Shares the offer store with the ledger.
#[derive(Clone)]
pub struct PaymentFinalizer {
    store: Arc<Store>,
    client: Arc<PaymentClient>,
}

impl PaymentFinalizer {
    pub fn new(store: Arc<Store>, client: Arc<PaymentClient>) -> Self {
        Self { store, client }
    }

    /// Obtain a payment handle for the given amount. No offer mutation.
    pub async fn begin_payment(&self, amount: i64) -> Result<PaymentIntent, ApiError> {
        if amount <= 0 {
            return Err(ApiError::Validation(
                "price must be a positive value".to_string(),
            ));
        }
        self.client.create_intent(amount).await
    }

    /// ACCEPTED -> PAID with the confirmed transaction id. Only the bidding
    /// user may finalize their own offer.
    pub async fn finalize_payment(
        &self,
        property_id: Uuid,
        offer_id: Uuid,
        caller: &Caller,
        transaction_id: &str,
    ) -> Result<Offer, ApiError> {
        if transaction_id.trim().is_empty() {
            return Err(ApiError::Validation(
                "transaction_id must not be empty".to_string(),
            ));
        }
        let offer = self
            .store
            .find_offer(offer_id)
            .await
            .ok_or_else(|| ApiError::NotFound("offer".to_string()))?;
        if offer.bidder_id != caller.id {
            return Err(ApiError::Unauthorized(
                "only the bidding user may finalize this offer".to_string(),
            ));
        }
        if offer.property_id != property_id {
            return Err(ApiError::Validation(
                "offer does not belong to the given property".to_string(),
            ));
        }
        let paid = self.store.finalize_offer(offer_id, transaction_id).await?;
        log::info!(
            "offer {} paid with transaction {}",
            offer_id,
            transaction_id
        );
        Ok(paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OfferStatus, Role};

    #[tokio::test]
    async fn simulated_intents_are_unique_and_well_formed() {
        let client = PaymentClient::simulated();
        let a = client.create_intent(450_000).await.unwrap();
        let b = client.create_intent(450_000).await.unwrap();
        assert_ne!(a.client_secret, b.client_secret);
        assert!(a.client_secret.starts_with(&a.id));
    }

    #[tokio::test]
    async fn begin_payment_validates_the_amount() {
        let finalizer = PaymentFinalizer::new(
            Arc::new(Store::new()),
            Arc::new(PaymentClient::simulated()),
        );
        let err = finalizer.begin_payment(0).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn finalize_is_guarded_by_bidder_and_status() {
        let store = Arc::new(Store::new());
        let finalizer =
            PaymentFinalizer::new(Arc::clone(&store), Arc::new(PaymentClient::simulated()));

        let (agent, _) = store.upsert_account("Ana", "ana@estatehive.test").await;
        store.set_account_role(agent.id, Role::Agent).await.unwrap();
        let (bidder, _) = store.upsert_account("Bob", "bob@estatehive.test").await;
        let (stranger, _) = store.upsert_account("Sam", "sam@estatehive.test").await;
        let property = store
            .insert_property(agent.id, "Lakeside Villa", "Springfield", 450_000)
            .await;
        let (offer, _) = store
            .upsert_offer(property.id, bidder.id, agent.id, 300_000)
            .await
            .unwrap();
        let as_caller = |a: &crate::models::Account| Caller {
            id: a.id,
            email: a.email.clone(),
            role: a.role,
        };

        // Still pending: conflict, no mutation.
        let err = finalizer
            .finalize_payment(property.id, offer.id, &as_caller(&bidder), "tx123")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        store.accept_offer(offer.id).await.unwrap();

        // Wrong caller.
        let err = finalizer
            .finalize_payment(property.id, offer.id, &as_caller(&stranger), "tx123")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        // Empty transaction id.
        let err = finalizer
            .finalize_payment(property.id, offer.id, &as_caller(&bidder), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let paid = finalizer
            .finalize_payment(property.id, offer.id, &as_caller(&bidder), "tx123")
            .await
            .unwrap();
        assert_eq!(paid.status, OfferStatus::Paid);
        assert_eq!(paid.transaction_id.as_deref(), Some("tx123"));
    }
}
