use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{create_token, AuthorizationGate, Capability};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::Role;
use crate::offers::OfferLedger;
use crate::payment::{PaymentClient, PaymentFinalizer};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub gate: AuthorizationGate,
    pub ledger: OfferLedger,
    pub finalizer: PaymentFinalizer,
    pub store: Arc<Store>,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<Store>, payment: Arc<PaymentClient>) -> Self {
        Self {
            gate: AuthorizationGate::new(Arc::clone(&store), &config.jwt_secret),
            ledger: OfferLedger::new(Arc::clone(&store)),
            finalizer: PaymentFinalizer::new(Arc::clone(&store), payment),
            store,
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/users", post(register))
        .route("/jwt", post(issue_token))
        .route("/users/:id/role", patch(set_role))
        .route("/properties", post(create_property))
        .route("/bid-property", post(bid_property))
        .route("/offered-properties", get(offered_properties))
        .route("/bought-properties", get(bought_properties))
        .route("/offered-property/update", patch(update_offer))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payment", patch(confirm_payment))
        .with_state(state)
}

async fn root() -> &'static str {
    "EstateHive is a Real Estate Website"
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(ApiError::Validation("email is required".to_string()));
    }
    let (account, created) = state.store.upsert_account(&body.name, &body.email).await;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(json!({ "account": account, "created": created }))))
}

#[derive(Deserialize)]
struct TokenRequest {
    email: String,
}

async fn issue_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<Value>, ApiError> {
    let account = state
        .store
        .find_account_by_email(&body.email)
        .await
        .ok_or_else(|| ApiError::NotFound("account".to_string()))?;
    let token = create_token(&account, &state.jwt_secret)?;
    Ok(Json(json!({ "token": token })))
}

#[derive(Deserialize)]
struct RoleRequest {
    role: Role,
}

async fn set_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<Value>, ApiError> {
    state.gate.authorize(&headers, Capability::Admin).await?;
    let account = state.store.set_account_role(id, body.role).await?;
    log::info!("account {} role set to {:?}", id, body.role);
    Ok(Json(json!({ "account": account })))
}

#[derive(Deserialize)]
struct CreatePropertyRequest {
    title: String,
    location: String,
    price: i64,
}

async fn create_property(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let caller = state.gate.authorize(&headers, Capability::Agent).await?;
    if body.price <= 0 {
        return Err(ApiError::Validation(
            "price must be a positive value".to_string(),
        ));
    }
    let property = state
        .store
        .insert_property(caller.id, &body.title, &body.location, body.price)
        .await;
    Ok((StatusCode::CREATED, Json(json!({ "property": property }))))
}

#[derive(Deserialize)]
struct BidRequest {
    agent_id: Uuid,
    property_id: Uuid,
    offer_amount: i64,
}

async fn bid_property(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BidRequest>,
) -> Result<Json<Value>, ApiError> {
    let caller = state.gate.authorize(&headers, Capability::User).await?;
    let (offer, created) = state
        .ledger
        .submit_offer(body.property_id, body.agent_id, &caller, body.offer_amount)
        .await?;
    Ok(Json(json!({ "offer": offer, "created": created })))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    include_rejected: bool,
}

async fn offered_properties(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let caller = state
        .gate
        .authorize(&headers, Capability::Authenticated)
        .await?;
    let offers = match caller.role {
        Role::Agent => state.ledger.offers_for_agent(&caller, query.include_rejected).await,
        _ => state.ledger.offers_for_user(&caller, query.include_rejected).await,
    };
    Ok(Json(json!({ "offers": offers })))
}

async fn bought_properties(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let caller = state.gate.authorize(&headers, Capability::Agent).await?;
    let offers = state.ledger.paid_offers_for_agent(&caller).await;
    Ok(Json(json!({ "offers": offers })))
}

#[derive(Deserialize)]
struct UpdateOfferRequest {
    #[serde(rename = "offerId")]
    offer_id: Uuid,
    #[serde(rename = "propertyId")]
    property_id: Uuid,
    status: String,
}

async fn update_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateOfferRequest>,
) -> Result<Json<Value>, ApiError> {
    let caller = state.gate.authorize(&headers, Capability::Agent).await?;
    let offer = match body.status.as_str() {
        "accepted" => {
            state
                .ledger
                .accept_offer(body.property_id, body.offer_id, &caller)
                .await?
        }
        "rejected" => {
            state
                .ledger
                .reject_offer(body.property_id, body.offer_id, &caller)
                .await?
        }
        other => {
            return Err(ApiError::Validation(format!(
                "status must be accepted or rejected, got {}",
                other
            )))
        }
    };
    Ok(Json(json!({
        "message": format!("offer {}", offer.status.as_str()),
        "offer": offer,
    })))
}

#[derive(Deserialize)]
struct PaymentIntentRequest {
    price: i64,
}

async fn create_payment_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PaymentIntentRequest>,
) -> Result<Json<Value>, ApiError> {
    state.gate.authorize(&headers, Capability::User).await?;
    let intent = state.finalizer.begin_payment(body.price).await?;
    Ok(Json(json!({ "clientSecret": intent.client_secret })))
}

#[derive(Deserialize)]
struct PaymentRequest {
    transaction_id: String,
    property_id: Uuid,
    offer_id: Uuid,
}

async fn confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<Value>, ApiError> {
    let caller = state.gate.authorize(&headers, Capability::User).await?;
    let offer = state
        .finalizer
        .finalize_payment(
            body.property_id,
            body.offer_id,
            &caller,
            &body.transaction_id,
        )
        .await?;
    Ok(Json(json!({ "offer": offer })))
}
