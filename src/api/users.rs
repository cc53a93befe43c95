/// User identity and social-graph endpoints
use crate::{
    account::{AccountView, NewAccount, TokenPair},
    api::middleware::AuthContext,
    context::AppContext,
    error::ApiResult,
    graph::{ChannelProfile, WatchedVideo},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/logout", post(logout))
        .route("/api/v1/users/refresh-token", post(refresh_token))
        .route("/api/v1/users/change-password", post(change_password))
        .route("/api/v1/users/c/:username", get(channel_profile))
        .route("/api/v1/users/history", get(watch_history))
}

/// Registration request
///
/// Avatar and cover are staged local paths produced by the upload
/// middleware, which is outside this service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub avatar_path: Option<PathBuf>,
    pub cover_image_path: Option<PathBuf>,
}

/// Login request (username or email plus password)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Token refresh request body (the cookie is the usual carrier)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Login response: sanitized account plus the token pair
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: AccountView,
    pub access_token: String,
    pub refresh_token: String,
}

/// Build the pair of session cookies (HTTP-only, secure)
fn session_cookies(jar: CookieJar, pair: &TokenPair) -> CookieJar {
    let access = Cookie::build(("accessToken", pair.access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .build();
    let refresh = Cookie::build(("refreshToken", pair.refresh_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .build();

    jar.add(access).add(refresh)
}

/// Clear both session cookies
fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(("accessToken", "")).path("/").build())
        .remove(Cookie::build(("refreshToken", "")).path("/").build())
}

/// Register endpoint
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AccountView>)> {
    let view = ctx
        .account_manager
        .register(NewAccount {
            username: req.username,
            email: req.email,
            full_name: req.full_name,
            password: req.password,
            avatar_path: req.avatar_path,
            cover_path: req.cover_image_path,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Login endpoint: issues tokens and sets both session cookies
async fn login(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let identifier = req.username.as_deref().or(req.email.as_deref());
    let (user, pair) = ctx.account_manager.login(identifier, &req.password).await?;

    let jar = session_cookies(jar, &pair);
    Ok((
        jar,
        Json(LoginResponse {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

/// Logout endpoint: clears the stored refresh token and both cookies
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<serde_json::Value>)> {
    ctx.account_manager.logout(&auth.claims.sub).await?;

    let jar = clear_session_cookies(jar);
    Ok((jar, Json(json!({ "message": "Logged out" }))))
}

/// Refresh endpoint: rotates the refresh token and re-sets both cookies
async fn refresh_token(
    State(ctx): State<AppContext>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<(CookieJar, Json<TokenPair>)> {
    let incoming = jar
        .get("refreshToken")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| body.and_then(|Json(req)| req.refresh_token));

    let pair = ctx.account_manager.refresh(incoming.as_deref()).await?;

    let jar = session_cookies(jar, &pair);
    Ok((jar, Json(pair)))
}

/// Password change endpoint
async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.account_manager
        .change_password(
            &auth.claims.sub,
            &req.old_password,
            &req.new_password,
            &req.confirm_password,
        )
        .await?;

    Ok(Json(json!({ "message": "Password changed" })))
}

/// Channel profile endpoint
async fn channel_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(username): Path<String>,
) -> ApiResult<Json<ChannelProfile>> {
    let profile = ctx.graph.channel_profile(&auth.claims.sub, &username).await?;
    Ok(Json(profile))
}

/// Watch history endpoint
async fn watch_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<WatchedVideo>>> {
    let history = ctx.graph.watch_history(&auth.claims.sub).await?;
    Ok(Json(history))
}
