//! REST handlers for posts and questions.

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::types::{BlogId, Post, PostPage, QuestionId, QuestionList, Sequence, Topic};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

fn parse_content(body: &[u8]) -> ApiResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("invalid post content: {}", e)))
}

pub(super) async fn list_posts(
    State(state): State<AppState>,
    Path(blog): Path<String>,
) -> ApiResult<Json<PostPage>> {
    let blog = BlogId::new(blog)?;
    Ok(Json(state.blog.list_posts(&blog, None)?))
}

pub(super) async fn list_posts_before(
    State(state): State<AppState>,
    Path((blog, before)): Path<(String, String)>,
) -> ApiResult<Json<PostPage>> {
    let blog = BlogId::new(blog)?;
    let before = Sequence::parse(&before)?;
    Ok(Json(state.blog.list_posts(&blog, Some(before))?))
}

pub(super) async fn create_post(
    State(state): State<AppState>,
    Path(blog): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let blog = BlogId::new(blog)?;
    let content = parse_content(&body)?;
    let post = state.blog.create_post(&blog, content).await?;
    Ok((StatusCode::CREATED, Json(json!({ "postId": post.sequence }))))
}

pub(super) async fn update_post(
    State(state): State<AppState>,
    Path((blog, sequence)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<Post>> {
    let blog = BlogId::new(blog)?;
    let sequence = Sequence::parse(&sequence)?;
    let content = parse_content(&body)?;
    Ok(Json(state.blog.update_post(&blog, sequence, content).await?))
}

pub(super) async fn list_questions(
    State(state): State<AppState>,
    Path(blog): Path<String>,
) -> ApiResult<Json<QuestionList>> {
    let blog = BlogId::new(blog)?;
    Ok(Json(state.blog.list_questions(&blog)?))
}

/// The body is the raw question text.
pub(super) async fn create_question(
    State(state): State<AppState>,
    Path(blog): Path<String>,
    body: String,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let blog = BlogId::new(blog)?;
    let question = state.blog.create_question(&blog, &body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "questionId": question.question_id })),
    ))
}

pub(super) async fn delete_question(
    State(state): State<AppState>,
    Path((blog, question)): Path<(String, String)>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let blog = BlogId::new(blog)?;
    let question = QuestionId::parse(&question)?;
    state.blog.delete_question(&blog, &question).await?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

pub(super) async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let registry = state.blog.broadcaster().registry();
    let mut subscribers = serde_json::Map::new();
    for topic in Topic::ALL {
        subscribers.insert(topic.as_str().to_string(), json!(registry.count(topic)?));
    }
    Ok(Json(json!({
        "status": "ok",
        "attached": state.channels.hub().len(),
        "subscribers": subscribers,
    })))
}
