use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Account, Role};
use crate::store::Store;

/// Decoded bearer credential. The embedded role is a snapshot taken at
/// issuance and is advisory only; the gate re-reads the live role from the
/// account store on every gated call.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

pub fn create_token(account: &Account, jwt_secret: &str) -> Result<String, ApiError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| ApiError::Internal("token expiry overflow".to_string()))?
        .timestamp() as usize;
    let claims = Claims {
        sub: account.id,
        email: account.email.clone(),
        role: account.role,
        exp: expiration,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
}

/// What a gated operation requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Authenticated,
    User,
    Agent,
    Admin,
}

/// Resolved caller identity after the gate has passed.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct AuthorizationGate {
    store: Arc<Store>,
    jwt_secret: String,
}

impl AuthorizationGate {
    pub fn new(store: Arc<Store>, jwt_secret: &str) -> Self {
        Self {
            store,
            jwt_secret: jwt_secret.to_string(),
        }
    }

    /// Verifies the bearer credential and checks the caller's live role
    /// against the required capability. Read-only; no state is touched.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        capability: Capability,
    ) -> Result<Caller, ApiError> {
        let claims = self.verify_bearer(headers)?;
        // The role claim inside the token may be stale after a promotion or
        // demotion; only the account record decides.
        let account = self
            .store
            .find_account(claims.sub)
            .await
            .ok_or_else(|| ApiError::Unauthenticated("unknown token subject".to_string()))?;
        let allowed = match capability {
            Capability::Authenticated => true,
            Capability::User => account.role == Role::User,
            Capability::Agent => account.role == Role::Agent,
            Capability::Admin => account.role == Role::Admin,
        };
        if !allowed {
            return Err(ApiError::Unauthorized(format!(
                "requires {:?} role",
                capability
            )));
        }
        Ok(Caller {
            id: account.id,
            email: account.email,
            role: account.role,
        })
    }

    fn verify_bearer(&self, headers: &HeaderMap) -> Result<Claims, ApiError> {
        let header = headers
            .get("Authorization")
            .ok_or_else(|| ApiError::Unauthenticated("missing Authorization header".to_string()))?;
        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                ApiError::Unauthenticated("invalid Authorization header format".to_string())
            })?;
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthenticated("invalid or expired token".to_string()))?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn missing_or_garbled_credentials_are_unauthenticated() {
        let store = Arc::new(Store::new());
        let gate = AuthorizationGate::new(store, SECRET);

        let err = gate
            .authorize(&HeaderMap::new(), Capability::Authenticated)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));

        let err = gate
            .authorize(&bearer("not-a-jwt"), Capability::Authenticated)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn role_is_read_live_not_from_the_token_snapshot() {
        let store = Arc::new(Store::new());
        let gate = AuthorizationGate::new(Arc::clone(&store), SECRET);
        let (account, _) = store.upsert_account("Pat", "pat@estatehive.test").await;

        // Token minted while the account was still a plain user.
        let token = create_token(&account, SECRET).unwrap();
        let err = gate
            .authorize(&bearer(&token), Capability::Agent)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        // Promotion takes effect for the same token immediately.
        store.set_account_role(account.id, Role::Agent).await.unwrap();
        let caller = gate.authorize(&bearer(&token), Capability::Agent).await.unwrap();
        assert_eq!(caller.role, Role::Agent);

        // A demotion strips the privilege even though a fresh token still
        // carries the agent snapshot.
        let token = create_token(
            &store.find_account(account.id).await.unwrap(),
            SECRET,
        )
        .unwrap();
        store.set_account_role(account.id, Role::User).await.unwrap();
        let err = gate
            .authorize(&bearer(&token), Capability::Agent)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn wrong_signing_key_is_rejected() {
        let store = Arc::new(Store::new());
        let gate = AuthorizationGate::new(Arc::clone(&store), SECRET);
        let (account, _) = store.upsert_account("Pat", "pat@estatehive.test").await;

        let token = create_token(&account, "other-secret").unwrap();
        let err = gate
            .authorize(&bearer(&token), Capability::Authenticated)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }
}
