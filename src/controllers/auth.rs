use std::sync::Arc;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Error;
use crate::store::NewUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    name: String,
    role: Option<String>,
}

// POST /api/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(Error::invalid("Username and password are required"));
    }

    if state
        .store
        .find_user_by_username(&req.username)
        .await?
        .is_some()
    {
        return Err(Error::UsernameTaken);
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|err| Error::Internal(err.into()))?;

    // The unique index still backstops a concurrent register with the same
    // username; the store maps that to the same 409.
    let user = state
        .store
        .create_user(NewUser {
            username: req.username,
            password_hash,
            name: req.name,
            role: req.role.unwrap_or_else(|| "user".to_string()),
        })
        .await?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

// POST /api/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, Error> {
    let user = state
        .store
        .find_user_by_username(&req.username)
        .await?
        .ok_or(Error::Unauthorized)?;

    if !user.verify_password(&req.password) {
        return Err(Error::Unauthorized);
    }

    Ok(Json(user))
}
