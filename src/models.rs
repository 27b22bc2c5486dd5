use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Rejected,
}

/// Offer lifecycle. Rejected and Paid are terminal; nothing re-enters Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Paid,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub title: String,
    pub location: String,
    pub price: i64,
    pub verification: VerificationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub property_id: Uuid,
    pub bidder_id: Uuid,
    /// Owning agent, copied from the property when the offer is first created.
    pub agent_id: Uuid,
    pub amount: i64,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transaction_id: Option<String>,
    pub buying_date: Option<DateTime<Utc>>,
}

/// Offer joined with its property and bidder for display.
#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    pub offer_id: Uuid,
    pub property_id: Uuid,
    pub property_title: String,
    pub property_location: String,
    pub agent_id: Uuid,
    pub bidder_id: Uuid,
    pub bidder_email: String,
    pub amount: i64,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transaction_id: Option<String>,
    pub buying_date: Option<DateTime<Utc>>,
}

impl OfferView {
    pub fn new(offer: &Offer, property: &Property, bidder: &Account) -> Self {
        Self {
            offer_id: offer.id,
            property_id: property.id,
            property_title: property.title.clone(),
            property_location: property.location.clone(),
            agent_id: offer.agent_id,
            bidder_id: offer.bidder_id,
            bidder_email: bidder.email.clone(),
            amount: offer.amount,
            status: offer.status,
            created_at: offer.created_at,
            updated_at: offer.updated_at,
            transaction_id: offer.transaction_id.clone(),
            buying_date: offer.buying_date,
        }
    }
}
