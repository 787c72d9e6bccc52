use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::Error;
use crate::models::Comment;
use crate::services::notify;
use crate::store::NewPost;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{event_id}", get(list_posts))
        .route("/posts/{post_id}/heart", post(toggle_heart))
        .route("/posts/{post_id}/comment", post(add_comment))
}

// GET /api/posts/{event_id}
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let posts = state.store.list_posts(event_id).await?;
    Ok(Json(posts))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostRequest {
    event_id: i64,
    user_id: i64,
    content: String,
}

// POST /api/posts
async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, Error> {
    let event = state
        .store
        .get_event(req.event_id)
        .await?
        .ok_or(Error::NotFound("Event"))?;

    let post = state
        .store
        .create_post(NewPost {
            event_id: req.event_id,
            user_id: req.user_id,
            content: req.content,
        })
        .await?;

    // The post exists either way; fan-out failure is logged, not surfaced.
    if let Err(err) = notify::fan_out_new_post(state.store.as_ref(), &event, &post).await {
        warn!("notification fan-out for post {} failed: {}", post.id, err);
    }

    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeartRequest {
    user_id: i64,
}

// POST /api/posts/{post_id}/heart
async fn toggle_heart(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    Json(req): Json<HeartRequest>,
) -> Result<impl IntoResponse, Error> {
    let mut post = state
        .store
        .get_post(post_id)
        .await?
        .ok_or(Error::NotFound("Post"))?;

    match post.hearts.iter().position(|&u| u == req.user_id) {
        Some(index) => {
            post.hearts.remove(index);
        }
        None => post.hearts.push(req.user_id),
    }

    state.store.save_post(&post).await?;
    Ok(Json(json!({ "hearts": post.hearts.len() })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRequest {
    user_id: i64,
    user_name: String,
    comment: String,
}

// POST /api/posts/{post_id}/comment
async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, Error> {
    let mut post = state
        .store
        .get_post(post_id)
        .await?
        .ok_or(Error::NotFound("Post"))?;

    post.comments.0.push(Comment {
        user_id: req.user_id,
        user_name: req.user_name,
        comment: req.comment,
        created_at: Utc::now(),
    });

    state.store.save_post(&post).await?;
    Ok(Json(json!({ "success": true })))
}
