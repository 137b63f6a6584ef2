use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;
use crate::use_cases::*;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/threads").route(web::post().to(post_thread)))
        .service(web::resource("/threads/{thread_id}").route(web::get().to(get_thread)))
        .service(web::resource("/threads/{thread_id}/comments").route(web::post().to(post_comment)))
        .service(
            web::resource("/threads/{thread_id}/comments/{comment_id}")
                .route(web::delete().to(delete_comment)),
        )
        .service(web::resource("/health").route(web::get().to(health)));
}

/// The wired dependency graph: one instance of each use case sharing a store.
#[derive(Clone)]
pub struct AppState {
    pub add_thread: AddThreadUseCase,
    pub add_comment: AddCommentUseCase,
    pub delete_comment: DeleteCommentUseCase,
    pub get_thread: GetThreadUseCase,
}

impl AppState {
    pub fn new<R: Repo + 'static>(repo: Arc<R>) -> Self {
        Self {
            add_thread: AddThreadUseCase::new(repo.clone()),
            add_comment: AddCommentUseCase::new(repo.clone(), repo.clone()),
            delete_comment: DeleteCommentUseCase::new(repo.clone(), repo.clone()),
            get_thread: GetThreadUseCase::new(repo.clone(), repo),
        }
    }
}

/// Request body for `POST /threads` (documentation only; bodies are
/// validated by the use case).
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct PostThreadBody {
    pub title: String,
    pub body: String,
}

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct PostCommentBody {
    pub content: String,
}

const INVALID_JSON_BODY: &str = "request body is not valid JSON";

/// Empty bodies become an empty payload so the entity reports the missing
/// properties. Anything else must be JSON.
fn body_payload(body: &web::Bytes) -> Result<Payload, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::new());
    }
    serde_json::from_slice::<Value>(body).map(Payload::from_json).map_err(|e| {
        tracing::debug!(error = %e, "rejected request body");
        ApiError::BadRequest(INVALID_JSON_BODY.into())
    })
}

fn success(data: Value) -> Value {
    json!({ "status": "success", "data": data })
}

#[utoipa::path(
    post,
    path = "/threads",
    request_body = PostThreadBody,
    responses(
        (status = 201, description = "Thread created; `data.addedThread`", body = AddedThread),
        (status = 400, description = "Missing property, wrong type or malformed JSON"),
        (status = 401, description = "Missing authentication")
    )
)]
pub async fn post_thread(
    auth: Auth,
    data: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let payload = body_payload(&body)?.with("user_id", auth.user_id());
    let added = data.add_thread.execute(&payload).await?;
    Ok(HttpResponse::Created().json(success(json!({ "addedThread": added }))))
}

#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread with comments; `data.thread`", body = ThreadDetail),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn get_thread(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let payload = Payload::new().with("id", path.into_inner());
    let thread = data.get_thread.execute(&payload).await?;
    Ok(HttpResponse::Ok().json(success(json!({ "thread": thread }))))
}

#[utoipa::path(
    post,
    path = "/threads/{thread_id}/comments",
    request_body = PostCommentBody,
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 201, description = "Comment created; `data.addedComment`", body = AddedComment),
        (status = 400, description = "Missing property, wrong type or malformed JSON"),
        (status = 401, description = "Missing authentication"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn post_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let payload = body_payload(&body)?
        .with("thread_id", path.into_inner())
        .with("user_id", auth.user_id());
    let added = data.add_comment.execute(&payload).await?;
    Ok(HttpResponse::Created().json(success(json!({ "addedComment": added }))))
}

#[utoipa::path(
    delete,
    path = "/threads/{thread_id}/comments/{comment_id}",
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment soft-deleted"),
        (status = 401, description = "Missing authentication"),
        (status = 403, description = "Caller is not the comment's author"),
        (status = 404, description = "Thread or comment not found")
    )
)]
pub async fn delete_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (thread_id, comment_id) = path.into_inner();
    let payload = Payload::new()
        .with("id", comment_id)
        .with("thread_id", thread_id)
        .with("user_id", auth.user_id());
    data.delete_comment.execute(&payload).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success" })))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
