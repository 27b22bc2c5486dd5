use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::models::{Offer, OfferStatus, OfferView};
use crate::store::Store;

/// Owns offer creation, amendment, acceptance and rejection, and enforces
/// the per-property single-winner invariant via the store's conditional
/// transitions.
#[derive(Clone)]
pub struct OfferLedger {
    store: Arc<Store>,
}

impl OfferLedger {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Submit or amend a bid. Keyed on (property, bidder): a repeat bid from
    /// the same caller amends the pending offer's amount instead of creating
    /// a duplicate. Returns the offer and whether a new record was created.
    pub async fn submit_offer(
        &self,
        property_id: Uuid,
        claimed_agent_id: Uuid,
        bidder: &Caller,
        amount: i64,
    ) -> Result<(Offer, bool), ApiError> {
        if amount <= 0 {
            return Err(ApiError::Validation(
                "offer_amount must be a positive value".to_string(),
            ));
        }
        let property = self
            .store
            .find_property(property_id)
            .await
            .ok_or_else(|| ApiError::NotFound("property".to_string()))?;
        if property.agent_id != claimed_agent_id {
            return Err(ApiError::Validation(
                "agent_id does not match the property's owning agent".to_string(),
            ));
        }
        let (offer, created) = self
            .store
            .upsert_offer(property_id, bidder.id, property.agent_id, amount)
            .await?;
        log::info!(
            "offer {} for property {}: amount {} ({})",
            offer.id,
            property_id,
            amount,
            if created { "created" } else { "amended" }
        );
        Ok((offer, created))
    }

    /// Accept one pending offer; every other pending offer on the property is
    /// rejected in the same store transaction. Only the owning agent may call.
    pub async fn accept_offer(
        &self,
        property_id: Uuid,
        offer_id: Uuid,
        acting_agent: &Caller,
    ) -> Result<Offer, ApiError> {
        self.check_ownership(property_id, offer_id, acting_agent).await?;
        let offer = self.store.accept_offer(offer_id).await?;
        log::info!(
            "offer {} accepted for property {}; pending siblings rejected",
            offer_id,
            property_id
        );
        Ok(offer)
    }

    pub async fn reject_offer(
        &self,
        property_id: Uuid,
        offer_id: Uuid,
        acting_agent: &Caller,
    ) -> Result<Offer, ApiError> {
        self.check_ownership(property_id, offer_id, acting_agent).await?;
        let offer = self.store.reject_offer(offer_id).await?;
        log::info!("offer {} rejected for property {}", offer_id, property_id);
        Ok(offer)
    }

    async fn check_ownership(
        &self,
        property_id: Uuid,
        offer_id: Uuid,
        acting_agent: &Caller,
    ) -> Result<(), ApiError> {
        let property = self
            .store
            .find_property(property_id)
            .await
            .ok_or_else(|| ApiError::NotFound("property".to_string()))?;
        if property.agent_id != acting_agent.id {
            return Err(ApiError::Unauthorized(
                "only the property's owning agent may act on its offers".to_string(),
            ));
        }
        let offer = self
            .store
            .find_offer(offer_id)
            .await
            .ok_or_else(|| ApiError::NotFound("offer".to_string()))?;
        if offer.property_id != property_id {
            return Err(ApiError::Validation(
                "offer does not belong to the given property".to_string(),
            ));
        }
        Ok(())
    }

    /// Offers the caller has placed, joined for display. Rejected offers are
    /// excluded unless asked for.
    pub async fn offers_for_user(
        &self,
        caller: &Caller,
        include_rejected: bool,
    ) -> Vec<OfferView> {
        let offers = self.store.offers_by_bidder(caller.id).await;
        self.into_views(offers, include_rejected).await
    }

    /// Offers placed against the agent's listings.
    pub async fn offers_for_agent(
        &self,
        caller: &Caller,
        include_rejected: bool,
    ) -> Vec<OfferView> {
        let offers = self.store.offers_by_agent(caller.id).await;
        self.into_views(offers, include_rejected).await
    }

    /// Completed sales: PAID offers on the agent's listings.
    pub async fn paid_offers_for_agent(&self, caller: &Caller) -> Vec<OfferView> {
        let offers = self
            .store
            .offers_by_agent(caller.id)
            .await
            .into_iter()
            .filter(|o| o.status == OfferStatus::Paid)
            .collect();
        self.into_views(offers, true).await
    }

    async fn into_views(&self, offers: Vec<Offer>, include_rejected: bool) -> Vec<OfferView> {
        let mut views = Vec::with_capacity(offers.len());
        for offer in offers {
            if !include_rejected && offer.status == OfferStatus::Rejected {
                continue;
            }
            let property = self.store.find_property(offer.property_id).await;
            let bidder = self.store.find_account(offer.bidder_id).await;
            match (property, bidder) {
                (Some(property), Some(bidder)) => {
                    views.push(OfferView::new(&offer, &property, &bidder))
                }
                _ => log::warn!("offer {} references a missing property or account", offer.id),
            }
        }
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    async fn caller_for(store: &Store, name: &str, email: &str, role: Role) -> Caller {
        let (account, _) = store.upsert_account(name, email).await;
        let account = store.set_account_role(account.id, role).await.unwrap();
        Caller {
            id: account.id,
            email: account.email,
            role: account.role,
        }
    }

    #[tokio::test]
    async fn submit_rejects_non_positive_amounts() {
        let store = Arc::new(Store::new());
        let ledger = OfferLedger::new(Arc::clone(&store));
        let agent = caller_for(&store, "Ana", "ana@estatehive.test", Role::Agent).await;
        let bidder = caller_for(&store, "Bob", "bob@estatehive.test", Role::User).await;
        let property = store
            .insert_property(agent.id, "Lakeside Villa", "Springfield", 450_000)
            .await;

        for amount in [0, -5] {
            let err = ledger
                .submit_offer(property.id, agent.id, &bidder, amount)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn submit_checks_property_and_agent_references() {
        let store = Arc::new(Store::new());
        let ledger = OfferLedger::new(Arc::clone(&store));
        let agent = caller_for(&store, "Ana", "ana@estatehive.test", Role::Agent).await;
        let other = caller_for(&store, "Eve", "eve@estatehive.test", Role::Agent).await;
        let bidder = caller_for(&store, "Bob", "bob@estatehive.test", Role::User).await;
        let property = store
            .insert_property(agent.id, "Lakeside Villa", "Springfield", 450_000)
            .await;

        let err = ledger
            .submit_offer(Uuid::new_v4(), agent.id, &bidder, 300_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = ledger
            .submit_offer(property.id, other.id, &bidder, 300_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn only_the_owning_agent_may_accept_or_reject() {
        let store = Arc::new(Store::new());
        let ledger = OfferLedger::new(Arc::clone(&store));
        let agent = caller_for(&store, "Ana", "ana@estatehive.test", Role::Agent).await;
        let other = caller_for(&store, "Eve", "eve@estatehive.test", Role::Agent).await;
        let bidder = caller_for(&store, "Bob", "bob@estatehive.test", Role::User).await;
        let property = store
            .insert_property(agent.id, "Lakeside Villa", "Springfield", 450_000)
            .await;
        let (offer, _) = ledger
            .submit_offer(property.id, agent.id, &bidder, 300_000)
            .await
            .unwrap();

        let err = ledger
            .accept_offer(property.id, offer.id, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        let err = ledger
            .reject_offer(property.id, offer.id, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let accepted = ledger
            .accept_offer(property.id, offer.id, &agent)
            .await
            .unwrap();
        assert_eq!(accepted.status, OfferStatus::Accepted);
    }

    #[tokio::test]
    async fn projections_exclude_rejected_unless_asked() {
        let store = Arc::new(Store::new());
        let ledger = OfferLedger::new(Arc::clone(&store));
        let agent = caller_for(&store, "Ana", "ana@estatehive.test", Role::Agent).await;
        let bidder = caller_for(&store, "Bob", "bob@estatehive.test", Role::User).await;
        let rival = caller_for(&store, "Rita", "rita@estatehive.test", Role::User).await;
        let property = store
            .insert_property(agent.id, "Lakeside Villa", "Springfield", 450_000)
            .await;

        let (losing, _) = ledger
            .submit_offer(property.id, agent.id, &bidder, 300_000)
            .await
            .unwrap();
        let (winning, _) = ledger
            .submit_offer(property.id, agent.id, &rival, 310_000)
            .await
            .unwrap();
        ledger
            .accept_offer(property.id, winning.id, &agent)
            .await
            .unwrap();

        assert!(ledger.offers_for_user(&bidder, false).await.is_empty());
        let with_rejected = ledger.offers_for_user(&bidder, true).await;
        assert_eq!(with_rejected.len(), 1);
        assert_eq!(with_rejected[0].offer_id, losing.id);

        let agent_view = ledger.offers_for_agent(&agent, false).await;
        assert_eq!(agent_view.len(), 1);
        assert_eq!(agent_view[0].offer_id, winning.id);
        assert_eq!(agent_view[0].bidder_email, "rita@estatehive.test");
    }
}
