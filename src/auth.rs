use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    models::{TokenPair, User},
    repository::RepositoryState,
};

/// Access-token lifetime. Access tokens are not revocation-checked, so
/// expiry is the only thing that ends their validity.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
/// Refresh-token lifetime.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// AccessClaims
///
/// Payload of the short-lived access token: the user id plus the role, so
/// role checks need no extra lookup on hot paths.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user's UUID.
    pub sub: Uuid,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

/// RefreshClaims
///
/// Payload of the long-lived refresh token: identity only.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// issue_token_pair
///
/// Signs a fresh access/refresh pair for `user` and persists the refresh
/// token onto the user record, replacing any prior value. One active refresh
/// token per account: logging in elsewhere implicitly invalidates the
/// previous session's refresh flow, while already-issued access tokens run
/// out on their own 15-minute clock.
pub async fn issue_token_pair(
    repo: &RepositoryState,
    config: &AppConfig,
    user: &User,
) -> Result<TokenPair, ApiError> {
    let now = Utc::now().timestamp();
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());

    let access_claims = AccessClaims {
        sub: user.id,
        role: user.role.clone(),
        iat: now as usize,
        exp: (now + ACCESS_TOKEN_TTL_SECS) as usize,
    };
    let refresh_claims = RefreshClaims {
        sub: user.id,
        iat: now as usize,
        exp: (now + REFRESH_TOKEN_TTL_SECS) as usize,
    };

    let access_token = encode(&Header::default(), &access_claims, &key)
        .map_err(|e| ApiError::Unexpected(format!("failed to sign access token: {e}")))?;
    let refresh_token = encode(&Header::default(), &refresh_claims, &key)
        .map_err(|e| ApiError::Unexpected(format!("failed to sign refresh token: {e}")))?;

    repo.set_refresh_token(user.id, &refresh_token).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the full secret-stripped
/// user record, with id and role lifted out for convenient destructuring in
/// handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
    pub user: User,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's `FromRequestParts`, making `AuthUser` usable as a
/// handler argument on every protected route. The flow:
/// 1. Dependency resolution: Repository and AppConfig from the app state.
/// 2. Local bypass: `x-user-id` header resolves a stored user in `Env::Local`.
/// 3. Bearer extraction and JWT decode (signature + expiry).
/// 4. Store lookup: the embedded id must still resolve to a user.
///
/// Rejections use the same envelope as every other failure: 401 when no
/// token is presented, 403 when the token is invalid or expired, 404 when
/// the token's subject no longer exists.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Development bypass: a known user id in the 'x-user-id' header
        // stands in for a token. Only honored in Env::Local, and the id must
        // still resolve to a stored user.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Some(user) = repo.get_user(user_id).await? {
                            return Ok(AuthUser {
                                id: user.id,
                                role: user.role.clone(),
                                user,
                            });
                        }
                    }
                }
            }
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized("Access denied: no token provided".to_string())
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Access denied: no token provided".to_string())
        })?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        // Expired signatures and malformed/tampered tokens are rejected the
        // same way; the distinction only matters in the log.
        let token_data =
            decode::<AccessClaims>(token, &decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                ApiError::Forbidden("Invalid token".to_string())
            })?;

        let user_id = token_data.claims.sub;

        // The token may outlive its subject; a valid signature for a vanished
        // user must not authenticate.
        let user = repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(AuthUser {
            id: user.id,
            role: user.role.clone(),
            user,
        })
    }
}
