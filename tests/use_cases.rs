use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use forum_api::error::{DomainError, Entity};
use forum_api::models::*;
use forum_api::repo::{CommentRepo, RepoResult, ThreadRepo};
use forum_api::use_cases::*;

/// Scripted store that records the order of every call.
#[derive(Default)]
struct MockRepo {
    calls: Mutex<Vec<String>>,
    threads: Vec<String>,
    comments: Mutex<Vec<CommentRecord>>,
}

impl MockRepo {
    fn with_thread(id: &str) -> Self {
        Self { threads: vec![id.to_string()], ..Default::default() }
    }

    fn with_comment(self, id: &str, thread_id: &str, user_id: &str, content: &str) -> Self {
        self.comments.lock().unwrap().push(CommentRecord {
            id: id.into(),
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            username: format!("name-of-{user_id}"),
            content: content.into(),
            is_delete: 0,
            date: Utc::now(),
        });
        self
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn has_thread(&self, id: &str) -> bool {
        self.threads.iter().any(|t| t == id)
    }

    fn is_deleted(&self, id: &str) -> bool {
        self.comments.lock().unwrap().iter().any(|c| c.id == id && c.is_delete == 1)
    }
}

#[async_trait]
impl ThreadRepo for MockRepo {
    async fn add_thread(&self, new: NewThread) -> RepoResult<AddedThread> {
        self.record("add_thread");
        AddedThread::from_stored("thread-123".into(), new.title, new.user_id)
    }
    async fn verify_thread_exists(&self, id: &str) -> RepoResult<()> {
        self.record(format!("verify_thread_exists:{id}"));
        if self.has_thread(id) { Ok(()) } else { Err(DomainError::NotFound("thread not found".into())) }
    }
    async fn get_thread(&self, id: &str) -> RepoResult<ThreadRecord> {
        self.record("get_thread");
        if !self.has_thread(id) {
            return Err(DomainError::NotFound("thread not found".into()));
        }
        Ok(ThreadRecord {
            id: id.into(),
            title: "sebuah thread".into(),
            body: "body".into(),
            user_id: "user-1".into(),
            username: "dicoding".into(),
            date: Utc::now(),
        })
    }
}

#[async_trait]
impl CommentRepo for MockRepo {
    async fn add_comment(&self, new: NewComment) -> RepoResult<AddedComment> {
        self.record("add_comment");
        AddedComment::from_stored("comment-123".into(), new.content, new.user_id)
    }
    async fn verify_comment_exists(&self, id: &str) -> RepoResult<()> {
        self.record("verify_comment_exists");
        let found = self.comments.lock().unwrap().iter().any(|c| c.id == id);
        if found { Ok(()) } else { Err(DomainError::NotFound("comment not found".into())) }
    }
    async fn get_comment(&self, id: &str) -> RepoResult<CommentRecord> {
        self.record("get_comment");
        let found = self.comments.lock().unwrap().iter().find(|c| c.id == id).cloned();
        found.ok_or_else(|| DomainError::NotFound("comment not found".into()))
    }
    async fn get_comments_by_thread(&self, thread_id: &str) -> RepoResult<Vec<CommentRecord>> {
        self.record("get_comments_by_thread");
        Ok(self.comments.lock().unwrap().iter().filter(|c| c.thread_id == thread_id).cloned().collect())
    }
    async fn verify_comment_owner(&self, comment_id: &str, user_id: &str) -> RepoResult<()> {
        self.record("verify_comment_owner");
        let owned = self.comments.lock().unwrap().iter().any(|c| c.id == comment_id && c.user_id == user_id);
        if owned { Ok(()) } else { Err(DomainError::Authorization("not yours".into())) }
    }
    async fn soft_delete_comment(&self, id: &str) -> RepoResult<bool> {
        self.record("soft_delete_comment");
        let mut comments = self.comments.lock().unwrap();
        let c = comments.iter_mut().find(|c| c.id == id).ok_or_else(|| DomainError::Invariant("nothing changed".into()))?;
        c.is_delete = 1;
        Ok(true)
    }
}

fn payload(v: serde_json::Value) -> Payload { Payload::from_json(v) }

#[tokio::test]
async fn add_thread_validates_then_creates() {
    let repo = Arc::new(MockRepo::default());
    let uc = AddThreadUseCase::new(repo.clone());

    let added = uc
        .execute(&payload(json!({"title": "sebuah thread", "body": "body", "user_id": "user-1"})))
        .await
        .unwrap();
    assert_eq!(added, AddedThread { id: "thread-123".into(), title: "sebuah thread".into(), owner: "user-1".into() });

    let err = uc.execute(&payload(json!({"title": "t", "user_id": "user-1"}))).await.unwrap_err();
    assert!(matches!(err, DomainError::MissingField(Entity::AddThread)));
    assert_eq!(repo.calls(), ["add_thread"]);
}

#[tokio::test]
async fn add_comment_checks_thread_before_writing() {
    let repo = Arc::new(MockRepo::with_thread("thread-1"));
    let uc = AddCommentUseCase::new(repo.clone(), repo.clone());

    let added = uc
        .execute(&payload(json!({"content": "hi", "thread_id": "thread-1", "user_id": "user-2"})))
        .await
        .unwrap();
    assert_eq!(added.owner, "user-2");
    assert_eq!(repo.calls(), ["verify_thread_exists:thread-1", "add_comment"]);
}

#[tokio::test]
async fn add_comment_on_missing_thread_never_writes() {
    let repo = Arc::new(MockRepo::with_thread("thread-1"));
    let uc = AddCommentUseCase::new(repo.clone(), repo.clone());

    let err = uc
        .execute(&payload(json!({"content": "hi", "thread_id": "thread-404", "user_id": "user-2"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert!(!repo.calls().iter().any(|c| c == "add_comment"));
}

#[tokio::test]
async fn add_comment_rejects_bad_payload_without_touching_storage() {
    let repo = Arc::new(MockRepo::with_thread("thread-1"));
    let uc = AddCommentUseCase::new(repo.clone(), repo.clone());

    let err = uc
        .execute(&payload(json!({"content": 42, "thread_id": "thread-1", "user_id": "user-2"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::TypeMismatch(Entity::AddComment)));
    assert!(repo.calls().is_empty());
}

#[tokio::test]
async fn delete_comment_runs_the_protocol_in_order() {
    let repo = Arc::new(MockRepo::with_thread("thread-1").with_comment("comment-1", "thread-1", "user-2", "hi"));
    let uc = DeleteCommentUseCase::new(repo.clone(), repo.clone());

    let ok = uc.execute(&payload(json!({"id": "comment-1", "user_id": "user-2"}))).await.unwrap();
    assert!(ok);
    assert!(repo.is_deleted("comment-1"));
    assert_eq!(repo.calls(), ["get_comment", "verify_comment_owner", "soft_delete_comment"]);
}

#[tokio::test]
async fn delete_comment_by_non_author_is_forbidden_and_changes_nothing() {
    let repo = Arc::new(MockRepo::with_thread("thread-1").with_comment("comment-1", "thread-1", "user-2", "hi"));
    let uc = DeleteCommentUseCase::new(repo.clone(), repo.clone());

    let err = uc.execute(&payload(json!({"id": "comment-1", "user_id": "user-1"}))).await.unwrap_err();
    assert!(matches!(err, DomainError::Authorization(_)));
    assert!(!repo.is_deleted("comment-1"));
    assert!(!repo.calls().iter().any(|c| c == "soft_delete_comment"));
}

#[tokio::test]
async fn delete_comment_missing_comment_is_not_found() {
    let repo = Arc::new(MockRepo::with_thread("thread-1"));
    let uc = DeleteCommentUseCase::new(repo.clone(), repo.clone());

    let err = uc.execute(&payload(json!({"id": "comment-404", "user_id": "user-1"}))).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert_eq!(repo.calls(), ["get_comment"]);
}

#[tokio::test]
async fn delete_comment_is_repeatable_for_the_author() {
    let repo = Arc::new(MockRepo::with_thread("thread-1").with_comment("comment-1", "thread-1", "user-2", "hi"));
    let uc = DeleteCommentUseCase::new(repo.clone(), repo.clone());
    let p = payload(json!({"id": "comment-1", "user_id": "user-2"}));

    assert!(uc.execute(&p).await.unwrap());
    assert!(uc.execute(&p).await.unwrap());
    assert!(repo.is_deleted("comment-1"));
}

#[tokio::test]
async fn delete_comment_validates_locally() {
    let repo = Arc::new(MockRepo::default());
    let uc = DeleteCommentUseCase::new(repo.clone(), repo.clone());

    let err = uc.execute(&payload(json!({"id": "comment-1"}))).await.unwrap_err();
    assert!(matches!(err, DomainError::MissingField(Entity::DeleteComment)));
    let err = uc.execute(&payload(json!({"id": 123, "user_id": ["user-1"]}))).await.unwrap_err();
    assert!(matches!(err, DomainError::TypeMismatch(Entity::DeleteComment)));
    assert!(repo.calls().is_empty());
}

#[tokio::test]
async fn delete_comment_under_a_thread_checks_the_thread_first() {
    let repo = Arc::new(
        MockRepo::with_thread("thread-1")
            .with_comment("comment-1", "thread-1", "user-2", "hi")
            .with_comment("comment-9", "thread-9", "user-2", "elsewhere"),
    );
    let uc = DeleteCommentUseCase::new(repo.clone(), repo.clone());

    let err = uc
        .execute(&payload(json!({"id": "comment-1", "thread_id": "thread-404", "user_id": "user-2"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert_eq!(repo.calls(), ["verify_thread_exists:thread-404"]);

    // comment exists but under a different thread
    let err = uc
        .execute(&payload(json!({"id": "comment-9", "thread_id": "thread-1", "user_id": "user-2"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert!(!repo.is_deleted("comment-9"));

    uc.execute(&payload(json!({"id": "comment-1", "thread_id": "thread-1", "user_id": "user-2"})))
        .await
        .unwrap();
    assert!(repo.is_deleted("comment-1"));
}

#[tokio::test]
async fn get_thread_attaches_comments_with_tombstones() {
    let repo = Arc::new(
        MockRepo::with_thread("thread-1")
            .with_comment("comment-1", "thread-1", "user-2", "kept")
            .with_comment("comment-2", "thread-1", "user-3", "removed"),
    );
    repo.soft_delete_comment("comment-2").await.unwrap();
    let uc = GetThreadUseCase::new(repo.clone(), repo.clone());

    let t = uc.execute(&payload(json!({"id": "thread-1"}))).await.unwrap();
    assert_eq!(t.id, "thread-1");
    assert_eq!(t.comments.len(), 2);
    assert_eq!(t.comments[0].content, "kept");
    assert_eq!(t.comments[0].username, "name-of-user-2");
    assert_eq!(t.comments[1].content, TOMBSTONE);
    assert_eq!(t.comments[1].is_delete, 1);
}

#[tokio::test]
async fn get_thread_without_comments_has_empty_list() {
    let repo = Arc::new(MockRepo::with_thread("thread-1"));
    let uc = GetThreadUseCase::new(repo.clone(), repo.clone());

    let t = uc.execute(&payload(json!({"id": "thread-1"}))).await.unwrap();
    assert!(t.comments.is_empty());
    assert_eq!(serde_json::to_value(&t).unwrap()["comments"], json!([]));
}

#[tokio::test]
async fn get_thread_errors() {
    let repo = Arc::new(MockRepo::default());
    let uc = GetThreadUseCase::new(repo.clone(), repo.clone());

    let err = uc.execute(&payload(json!({}))).await.unwrap_err();
    assert!(matches!(err, DomainError::MissingField(Entity::GetThread)));
    let err = uc.execute(&payload(json!({"id": 7}))).await.unwrap_err();
    assert!(matches!(err, DomainError::TypeMismatch(Entity::GetThread)));
    let err = uc.execute(&payload(json!({"id": "thread-404"}))).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
    assert_eq!(repo.calls(), ["get_thread"]);
}
