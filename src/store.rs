use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Account, Offer, OfferStatus, Property, Role, VerificationStatus};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
}

/// Document-store client shared by the ledger and the payment finalizer.
///
/// Each collection sits behind its own `RwLock`; every compound offer
/// transition runs under a single offers write guard, so it behaves as one
/// conditional transaction. Mutating calls never hold more than one lock.
#[derive(Default)]
pub struct Store {
    accounts: RwLock<HashMap<Uuid, Account>>,
    properties: RwLock<HashMap<Uuid, Property>>,
    offers: RwLock<HashMap<Uuid, Offer>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- accounts ----

    /// Registration upsert keyed on email. Returns the account and whether a
    /// new record was created; an existing account is returned unchanged.
    pub async fn upsert_account(&self, name: &str, email: &str) -> (Account, bool) {
        let mut accounts = self.accounts.write().await;
        if let Some(existing) = accounts.values().find(|a| a.email == email) {
            return (existing.clone(), false);
        }
        let account = Account {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::User,
            created_at: Utc::now(),
        };
        accounts.insert(account.id, account.clone());
        (account, true)
    }

    pub async fn find_account(&self, id: Uuid) -> Option<Account> {
        self.accounts.read().await.get(&id).cloned()
    }

    pub async fn find_account_by_email(&self, email: &str) -> Option<Account> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned()
    }

    pub async fn set_account_role(&self, id: Uuid, role: Role) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(&id).ok_or(StoreError::NotFound("account"))?;
        account.role = role;
        Ok(account.clone())
    }

    // ---- properties ----

    pub async fn insert_property(
        &self,
        agent_id: Uuid,
        title: &str,
        location: &str,
        price: i64,
    ) -> Property {
        let property = Property {
            id: Uuid::new_v4(),
            agent_id,
            title: title.to_string(),
            location: location.to_string(),
            price,
            verification: VerificationStatus::Unverified,
            created_at: Utc::now(),
        };
        self.properties
            .write()
            .await
            .insert(property.id, property.clone());
        property
    }

    pub async fn find_property(&self, id: Uuid) -> Option<Property> {
        self.properties.read().await.get(&id).cloned()
    }

    // ---- offers ----

    /// Idempotent upsert keyed on (property, bidder). A repeat bid amends the
    /// amount while the offer is still pending; a bid against an offer that
    /// has already left PENDING is a conflict and mutates nothing.
    pub async fn upsert_offer(
        &self,
        property_id: Uuid,
        bidder_id: Uuid,
        agent_id: Uuid,
        amount: i64,
    ) -> Result<(Offer, bool), StoreError> {
        let mut offers = self.offers.write().await;
        if let Some(existing) = offers
            .values_mut()
            .find(|o| o.property_id == property_id && o.bidder_id == bidder_id)
        {
            if existing.status != OfferStatus::Pending {
                return Err(StoreError::Conflict(format!(
                    "offer is already {}",
                    existing.status.as_str()
                )));
            }
            existing.amount = amount;
            existing.updated_at = Utc::now();
            return Ok((existing.clone(), false));
        }
        let now = Utc::now();
        let offer = Offer {
            id: Uuid::new_v4(),
            property_id,
            bidder_id,
            agent_id,
            amount,
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
            transaction_id: None,
            buying_date: None,
        };
        offers.insert(offer.id, offer.clone());
        Ok((offer, true))
    }

    pub async fn find_offer(&self, id: Uuid) -> Option<Offer> {
        self.offers.read().await.get(&id).cloned()
    }

    /// Accept one offer and reject its pending siblings as a single
    /// conditional transaction. The write is conditioned on the target still
    /// being PENDING under the guard, so two concurrent accepts on the same
    /// property cannot both win.
    pub async fn accept_offer(&self, offer_id: Uuid) -> Result<Offer, StoreError> {
        let mut offers = self.offers.write().await;
        let target = offers.get(&offer_id).ok_or(StoreError::NotFound("offer"))?;
        if target.status != OfferStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "offer is already {}",
                target.status.as_str()
            )));
        }
        let property_id = target.property_id;
        let now = Utc::now();
        for offer in offers.values_mut() {
            if offer.property_id != property_id || offer.status != OfferStatus::Pending {
                continue;
            }
            offer.status = if offer.id == offer_id {
                OfferStatus::Accepted
            } else {
                OfferStatus::Rejected
            };
            offer.updated_at = now;
        }
        Ok(offers[&offer_id].clone())
    }

    pub async fn reject_offer(&self, offer_id: Uuid) -> Result<Offer, StoreError> {
        let mut offers = self.offers.write().await;
        let offer = offers.get_mut(&offer_id).ok_or(StoreError::NotFound("offer"))?;
        if offer.status != OfferStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "offer is already {}",
                offer.status.as_str()
            )));
        }
        offer.status = OfferStatus::Rejected;
        offer.updated_at = Utc::now();
        Ok(offer.clone())
    }

    /// ACCEPTED -> PAID, recording the confirmed transaction id and the
    /// buying date. Conditional on the offer being ACCEPTED at write time.
    pub async fn finalize_offer(
        &self,
        offer_id: Uuid,
        transaction_id: &str,
    ) -> Result<Offer, StoreError> {
        let mut offers = self.offers.write().await;
        let offer = offers.get_mut(&offer_id).ok_or(StoreError::NotFound("offer"))?;
        if offer.status != OfferStatus::Accepted {
            return Err(StoreError::Conflict(format!(
                "offer is {}, not accepted",
                offer.status.as_str()
            )));
        }
        let now = Utc::now();
        offer.status = OfferStatus::Paid;
        offer.transaction_id = Some(transaction_id.to_string());
        offer.buying_date = Some(now);
        offer.updated_at = now;
        Ok(offer.clone())
    }

    pub async fn offers_by_bidder(&self, bidder_id: Uuid) -> Vec<Offer> {
        self.offers
            .read()
            .await
            .values()
            .filter(|o| o.bidder_id == bidder_id)
            .cloned()
            .collect()
    }

    pub async fn offers_by_agent(&self, agent_id: Uuid) -> Vec<Offer> {
        self.offers
            .read()
            .await
            .values()
            .filter(|o| o.agent_id == agent_id)
            .cloned()
            .collect()
    }
}
