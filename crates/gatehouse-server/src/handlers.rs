use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use gatehouse_auth::{AuthError, AuthorizationContext, NewUser};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::server::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
}

pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "message": "pong" })))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(new_user) = payload.map_err(|e| AuthError::invalid_request(e.body_text()))?;
    let id = state.login.register(new_user).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { id })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(request) = payload.map_err(|e| AuthError::invalid_request(e.body_text()))?;
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AuthError::invalid_request("email and password are required"));
    }

    let access_token = state.login.login(&request.email, &request.password).await?;
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer",
    }))
}

pub async fn me(ctx: AuthorizationContext) -> Json<AuthorizationContext> {
    Json(ctx)
}

pub async fn admin_ping(ctx: AuthorizationContext) -> impl IntoResponse {
    Json(json!({ "message": "pong", "role": ctx.role }))
}

pub async fn clear_lockout(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> Result<StatusCode, AuthError> {
    state.login.clear_lockout(&principal).await?;
    Ok(StatusCode::NO_CONTENT)
}
