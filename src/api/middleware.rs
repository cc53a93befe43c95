/// Authentication extractors
use crate::{
    auth::AccessClaims,
    context::AppContext,
    error::ApiError,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Authenticated caller, resolved from the access-token cookie or a bearer
/// header
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: AccessClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get("accessToken")
            .map(|cookie| cookie.value().to_string())
            .or_else(|| extract_bearer_token(&parts.headers))
            .ok_or_else(|| ApiError::Auth("Missing access token".to_string()))?;

        let claims = state.token_service.verify_access(&token)?;

        Ok(AuthContext { claims })
    }
}
