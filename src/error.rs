use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

/// Payload or entity a validation failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    AddThread,
    AddedThread,
    AddComment,
    AddedComment,
    GetComment,
    GetThread,
    DeleteComment,
}

impl Entity {
    pub fn code(self) -> &'static str {
        match self {
            Entity::AddThread => "ADD_THREAD",
            Entity::AddedThread => "ADDED_THREAD",
            Entity::AddComment => "ADD_COMMENT",
            Entity::AddedComment => "ADDED_COMMENT",
            Entity::GetComment => "GET_COMMENT",
            Entity::GetThread => "GET_THREAD_USE_CASE",
            Entity::DeleteComment => "DELETE_COMMENT_USE_CASE",
        }
    }

    /// Client-facing action phrase. `None` for entities built from stored
    /// rows, where a validation failure is a server fault.
    fn action(self) -> Option<&'static str> {
        match self {
            Entity::AddThread => Some("cannot create a new thread"),
            Entity::AddComment => Some("cannot create a new comment"),
            Entity::DeleteComment => Some("cannot delete the comment"),
            Entity::GetThread => Some("cannot fetch the thread"),
            Entity::AddedThread | Entity::AddedComment | Entity::GetComment => None,
        }
    }
}

/// Every failure a use case can surface. Repository errors travel through
/// the use cases unchanged.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("{}.NOT_CONTAIN_NEEDED_PROPERTY", .0.code())]
    MissingField(Entity),
    #[error("{}.NOT_MEET_DATA_TYPE_SPECIFICATION", .0.code())]
    TypeMismatch(Entity),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    Invariant(String),
    #[error("storage failure: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub status: &'static str,
    pub message: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] Unauthorized(String),
    #[error("{0}")] Forbidden(String),
    #[error("{0}")] NotFound(String),
    #[error("internal server error")] Internal,
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::MissingField(entity) => match entity.action() {
                Some(action) => ApiError::BadRequest(format!("{action} because a required property is missing")),
                None => {
                    tracing::error!(code = %e, "stored record failed validation");
                    ApiError::Internal
                }
            },
            DomainError::TypeMismatch(entity) => match entity.action() {
                Some(action) => ApiError::BadRequest(format!("{action} because of a data type mismatch")),
                None => {
                    tracing::error!(code = %e, "stored record failed validation");
                    ApiError::Internal
                }
            },
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::Authorization(msg) => ApiError::Forbidden(msg),
            DomainError::Invariant(msg) => ApiError::BadRequest(msg),
            DomainError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = match self {
            ApiError::Internal => "error",
            _ => "fail",
        };
        HttpResponse::build(self.status_code()).json(ApiErrorBody { status, message: self.to_string() })
    }
}
