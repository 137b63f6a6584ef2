//! One struct per business operation. Each runs its storage calls strictly
//! in sequence; every step depends on the previous one succeeding.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{DomainError, Entity};
use crate::models::*;
use crate::repo::{CommentRepo, ThreadRepo, COMMENT_NOT_FOUND};

#[derive(Clone)]
pub struct AddThreadUseCase {
    threads: Arc<dyn ThreadRepo>,
}

impl AddThreadUseCase {
    pub fn new(threads: Arc<dyn ThreadRepo>) -> Self { Self { threads } }

    pub async fn execute(&self, payload: &Payload) -> Result<AddedThread, DomainError> {
        let new = NewThread::from_payload(payload)?;
        let added = self.threads.add_thread(new).await?;
        info!(thread_id = %added.id, owner = %added.owner, "thread created");
        Ok(added)
    }
}

#[derive(Clone)]
pub struct AddCommentUseCase {
    threads: Arc<dyn ThreadRepo>,
    comments: Arc<dyn CommentRepo>,
}

impl AddCommentUseCase {
    pub fn new(threads: Arc<dyn ThreadRepo>, comments: Arc<dyn CommentRepo>) -> Self {
        Self { threads, comments }
    }

    pub async fn execute(&self, payload: &Payload) -> Result<AddedComment, DomainError> {
        let new = NewComment::from_payload(payload)?;
        self.threads.verify_thread_exists(&new.thread_id).await?;
        let thread_id = new.thread_id.clone();
        let added = self.comments.add_comment(new).await?;
        info!(comment_id = %added.id, %thread_id, owner = %added.owner, "comment created");
        Ok(added)
    }
}

#[derive(Clone)]
pub struct DeleteCommentUseCase {
    threads: Arc<dyn ThreadRepo>,
    comments: Arc<dyn CommentRepo>,
}

impl DeleteCommentUseCase {
    pub fn new(threads: Arc<dyn ThreadRepo>, comments: Arc<dyn CommentRepo>) -> Self {
        Self { threads, comments }
    }

    /// Payload: `id`, `user_id`, and optionally the `thread_id` the comment
    /// is addressed under.
    pub async fn execute(&self, payload: &Payload) -> Result<bool, DomainError> {
        let [id, user_id] = payload.strings(Entity::DeleteComment, ["id", "user_id"])?;
        let thread_id = payload.optional_string(Entity::DeleteComment, "thread_id")?;

        if let Some(thread_id) = &thread_id {
            self.threads.verify_thread_exists(thread_id).await?;
        }
        let comment = self.comments.get_comment(&id).await?;
        if thread_id.is_some_and(|t| t != comment.thread_id) {
            return Err(DomainError::NotFound(COMMENT_NOT_FOUND.into()));
        }
        self.comments.verify_comment_owner(&id, &user_id).await?;
        let deleted = self.comments.soft_delete_comment(&id).await?;
        info!(comment_id = %id, %user_id, already_deleted = comment.is_deleted(), "comment soft-deleted");
        Ok(deleted)
    }
}

#[derive(Clone)]
pub struct GetThreadUseCase {
    threads: Arc<dyn ThreadRepo>,
    comments: Arc<dyn CommentRepo>,
}

impl GetThreadUseCase {
    pub fn new(threads: Arc<dyn ThreadRepo>, comments: Arc<dyn CommentRepo>) -> Self {
        Self { threads, comments }
    }

    /// `comments` is always present, empty when the thread has none.
    pub async fn execute(&self, payload: &Payload) -> Result<ThreadDetail, DomainError> {
        let [id] = payload.strings(Entity::GetThread, ["id"])?;
        let thread = self.threads.get_thread(&id).await?;
        let comments = self
            .comments
            .get_comments_by_thread(&id)
            .await?
            .into_iter()
            .map(CommentView::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(thread_id = %id, comments = comments.len(), "thread fetched");
        Ok(ThreadDetail::new(thread, comments))
    }
}
