//! Bearer-token gate in front of the `/api` surface. `/login` and the
//! push channel are mounted outside it.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppError;
use crate::schema::LoginSchema;
use crate::AppState;

pub const ADMIN_ROLE: &str = "admin";

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub account: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Reject unless the caller's token carries the admin role.
pub fn require_admin(claims: &Claims) -> Result<(), AppError> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn issue_token(secret: &str, account: &str, role: &str) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize;
    let claims = Claims {
        account: account.to_owned(),
        role: role.to_owned(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AppError::Internal(err.into()))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

/// Everything under `/api` passes through here. Decoded claims land in
/// request extensions for the handlers' role checks.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::NoToken)?;
    let claims = decode_token(&state.jwt_secret, bearer.token())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// `POST /login`: check the configured members and issue a token.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginSchema>,
) -> Result<Json<Value>, AppError> {
    let member = state
        .config
        .members
        .iter()
        .find(|m| m.account == body.account && m.password == body.password);

    match member {
        Some(member) => {
            info!("issued token for {}", member.account);
            let token = issue_token(&state.jwt_secret, &member.account, &member.role)?;
            Ok(Json(json!({ "success": true, "token": token })))
        }
        None => Err(AppError::BadCredentials),
    }
}
