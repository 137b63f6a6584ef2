use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DomainError;
use crate::ids::IdGenerator;
use crate::models::*;

pub type RepoResult<T> = Result<T, DomainError>;

pub(crate) const THREAD_NOT_FOUND: &str = "thread not found";
pub(crate) const COMMENT_NOT_FOUND: &str = "comment not found";
pub(crate) const USER_NOT_FOUND: &str = "user not found";
pub(crate) const ACCESS_DENIED: &str = "you are not allowed to access this resource";
pub(crate) const CANNOT_DELETE_COMMENT: &str = "cannot delete this comment";

#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn add_thread(&self, new: NewThread) -> RepoResult<AddedThread>;
    async fn verify_thread_exists(&self, id: &str) -> RepoResult<()>;
    async fn get_thread(&self, id: &str) -> RepoResult<ThreadRecord>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn add_comment(&self, new: NewComment) -> RepoResult<AddedComment>;
    async fn verify_comment_exists(&self, id: &str) -> RepoResult<()>;
    /// Soft-deleted comments are still returned.
    async fn get_comment(&self, id: &str) -> RepoResult<CommentRecord>;
    /// Oldest first; empty when the thread has no comments.
    async fn get_comments_by_thread(&self, thread_id: &str) -> RepoResult<Vec<CommentRecord>>;
    /// `Authorization` unless a comment `comment_id` authored by `user_id` exists.
    async fn verify_comment_owner(&self, comment_id: &str, user_id: &str) -> RepoResult<()>;
    /// `Invariant` when no row matched.
    async fn soft_delete_comment(&self, id: &str) -> RepoResult<bool>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn add_user(&self, user: User) -> RepoResult<User>;
    async fn get_user(&self, id: &str) -> RepoResult<User>;
}

pub trait Repo: ThreadRepo + CommentRepo + UserRepo {}

impl<T> Repo for T where T: ThreadRepo + CommentRepo + UserRepo {}

fn prefixed(kind: &str, ids: &Arc<dyn IdGenerator>) -> String {
    format!("{kind}-{}", ids.generate())
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

    struct StoredThread {
        id: String,
        title: String,
        body: String,
        user_id: String,
        date: DateTime<Utc>,
    }

    struct StoredComment {
        id: String,
        thread_id: String,
        user_id: String,
        content: String,
        is_delete: i16,
        date: DateTime<Utc>,
    }

    #[derive(Default)]
    struct State {
        users: HashMap<String, User>,
        threads: HashMap<String, StoredThread>,
        comments: Vec<StoredComment>, // insertion order
    }

    impl State {
        fn username(&self, user_id: &str) -> RepoResult<String> {
            self.users
                .get(user_id)
                .map(|u| u.username.clone())
                .ok_or_else(|| DomainError::NotFound(USER_NOT_FOUND.into()))
        }

        fn comment_record(&self, c: &StoredComment) -> RepoResult<CommentRecord> {
            Ok(CommentRecord {
                id: c.id.clone(),
                thread_id: c.thread_id.clone(),
                user_id: c.user_id.clone(),
                username: self.username(&c.user_id)?,
                content: c.content.clone(),
                is_delete: c.is_delete,
                date: c.date,
            })
        }
    }

    /// Process-local store with the same constraint semantics as the
    /// Postgres schema: parent rows must exist and ids are unique.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        ids: Arc<dyn IdGenerator>,
    }

    impl InMemRepo {
        pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
            Self { state: Arc::new(RwLock::new(State::default())), ids }
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| DomainError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| DomainError::Internal("state lock poisoned".into()))
        }
    }

    #[async_trait]
    impl UserRepo for InMemRepo {
        async fn add_user(&self, user: User) -> RepoResult<User> {
            let mut s = self.write()?;
            if s.users.contains_key(&user.id) || s.users.values().any(|u| u.username == user.username) {
                return Err(DomainError::Invariant("user already exists".into()));
            }
            s.users.insert(user.id.clone(), user.clone());
            Ok(user)
        }

        async fn get_user(&self, id: &str) -> RepoResult<User> {
            let s = self.read()?;
            s.users.get(id).cloned().ok_or_else(|| DomainError::NotFound(USER_NOT_FOUND.into()))
        }
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn add_thread(&self, new: NewThread) -> RepoResult<AddedThread> {
            let id = prefixed("thread", &self.ids);
            let mut s = self.write()?;
            if !s.users.contains_key(&new.user_id) {
                return Err(DomainError::NotFound(USER_NOT_FOUND.into()));
            }
            if s.threads.contains_key(&id) {
                return Err(DomainError::Invariant(format!("{id} already exists")));
            }
            let thread = StoredThread {
                id: id.clone(),
                title: new.title,
                body: new.body,
                user_id: new.user_id,
                date: Utc::now(),
            };
            let added = AddedThread::from_stored(id.clone(), thread.title.clone(), thread.user_id.clone())?;
            s.threads.insert(id, thread);
            Ok(added)
        }

        async fn verify_thread_exists(&self, id: &str) -> RepoResult<()> {
            let s = self.read()?;
            if s.threads.contains_key(id) { Ok(()) } else { Err(DomainError::NotFound(THREAD_NOT_FOUND.into())) }
        }

        async fn get_thread(&self, id: &str) -> RepoResult<ThreadRecord> {
            let s = self.read()?;
            let t = s.threads.get(id).ok_or_else(|| DomainError::NotFound(THREAD_NOT_FOUND.into()))?;
            Ok(ThreadRecord {
                id: t.id.clone(),
                title: t.title.clone(),
                body: t.body.clone(),
                user_id: t.user_id.clone(),
                username: s.username(&t.user_id)?,
                date: t.date,
            })
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn add_comment(&self, new: NewComment) -> RepoResult<AddedComment> {
            let id = prefixed("comment", &self.ids);
            let mut s = self.write()?;
            // checked under the write lock, like a foreign key
            if !s.threads.contains_key(&new.thread_id) {
                return Err(DomainError::NotFound(THREAD_NOT_FOUND.into()));
            }
            if !s.users.contains_key(&new.user_id) {
                return Err(DomainError::NotFound(USER_NOT_FOUND.into()));
            }
            if s.comments.iter().any(|c| c.id == id) {
                return Err(DomainError::Invariant(format!("{id} already exists")));
            }
            let added = AddedComment::from_stored(id.clone(), new.content.clone(), new.user_id.clone())?;
            s.comments.push(StoredComment {
                id,
                thread_id: new.thread_id,
                user_id: new.user_id,
                content: new.content,
                is_delete: 0,
                date: Utc::now(),
            });
            Ok(added)
        }

        async fn verify_comment_exists(&self, id: &str) -> RepoResult<()> {
            let s = self.read()?;
            if s.comments.iter().any(|c| c.id == id) {
                Ok(())
            } else {
                Err(DomainError::NotFound(COMMENT_NOT_FOUND.into()))
            }
        }

        async fn get_comment(&self, id: &str) -> RepoResult<CommentRecord> {
            let s = self.read()?;
            let c = s
                .comments
                .iter()
                .find(|c| c.id == id)
                .ok_or_else(|| DomainError::NotFound(COMMENT_NOT_FOUND.into()))?;
            s.comment_record(c)
        }

        async fn get_comments_by_thread(&self, thread_id: &str) -> RepoResult<Vec<CommentRecord>> {
            let s = self.read()?;
            let mut v = s
                .comments
                .iter()
                .filter(|c| c.thread_id == thread_id)
                .map(|c| s.comment_record(c))
                .collect::<RepoResult<Vec<_>>>()?;
            v.sort_by(|a, b| a.date.cmp(&b.date)); // stable: equal dates keep insertion order
            Ok(v)
        }

        async fn verify_comment_owner(&self, comment_id: &str, user_id: &str) -> RepoResult<()> {
            let s = self.read()?;
            if s.comments.iter().any(|c| c.id == comment_id && c.user_id == user_id) {
                Ok(())
            } else {
                Err(DomainError::Authorization(ACCESS_DENIED.into()))
            }
        }

        async fn soft_delete_comment(&self, id: &str) -> RepoResult<bool> {
            let mut s = self.write()?;
            let c = s
                .comments
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| DomainError::Invariant(CANNOT_DELETE_COMMENT.into()))?;
            c.is_delete = 1;
            Ok(true)
        }
    }
}

#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    const FOREIGN_KEY_VIOLATION: &str = "23503";
    const UNIQUE_VIOLATION: &str = "23505";

    fn db_code(e: &sqlx::Error) -> Option<String> {
        match e {
            sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    fn internal(e: sqlx::Error) -> DomainError {
        DomainError::Internal(e.to_string())
    }

    /// Maps constraint violations on insert to the domain taxonomy.
    fn insert_error(e: sqlx::Error, missing_parent: &str) -> DomainError {
        match db_code(&e).as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => DomainError::NotFound(missing_parent.into()),
            Some(UNIQUE_VIOLATION) => DomainError::Invariant("row already exists".into()),
            _ => internal(e),
        }
    }

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
        ids: Arc<dyn IdGenerator>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>, ids: Arc<dyn IdGenerator>) -> Self { Self { pool, ids } }

        /// Applies the bundled `migrations/` directory.
        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }
    }

    #[async_trait]
    impl UserRepo for PgRepo {
        async fn add_user(&self, user: User) -> RepoResult<User> {
            sqlx::query_as::<_, (String, String)>("INSERT INTO users (id, username) VALUES ($1,$2) RETURNING id, username")
                .bind(&user.id)
                .bind(&user.username)
                .fetch_one(&self.pool)
                .await
                .map(|(id, username)| User { id, username })
                .map_err(|e| match db_code(&e).as_deref() {
                    Some(UNIQUE_VIOLATION) => DomainError::Invariant("user already exists".into()),
                    _ => internal(e),
                })
        }

        async fn get_user(&self, id: &str) -> RepoResult<User> {
            sqlx::query_as::<_, (String, String)>("SELECT id, username FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?
                .map(|(id, username)| User { id, username })
                .ok_or_else(|| DomainError::NotFound(USER_NOT_FOUND.into()))
        }
    }

    #[async_trait]
    impl ThreadRepo for PgRepo {
        async fn add_thread(&self, new: NewThread) -> RepoResult<AddedThread> {
            let id = prefixed("thread", &self.ids);
            let (id, title, user_id) = sqlx::query_as::<_, (String, String, String)>(
                "INSERT INTO threads (id, title, body, user_id) VALUES ($1,$2,$3,$4) RETURNING id, title, user_id",
            )
            .bind(&id)
            .bind(&new.title)
            .bind(&new.body)
            .bind(&new.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, USER_NOT_FOUND))?;
            AddedThread::from_stored(id, title, user_id)
        }

        async fn verify_thread_exists(&self, id: &str) -> RepoResult<()> {
            sqlx::query_scalar::<_, String>("SELECT id FROM threads WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?
                .map(|_| ())
                .ok_or_else(|| DomainError::NotFound(THREAD_NOT_FOUND.into()))
        }

        async fn get_thread(&self, id: &str) -> RepoResult<ThreadRecord> {
            sqlx::query_as::<_, ThreadRecord>(r#"
                SELECT t.id, t.title, t.body, t.user_id, u.username, t.date
                FROM threads t
                INNER JOIN users u ON u.id = t.user_id
                WHERE t.id = $1
            "#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?
            .ok_or_else(|| DomainError::NotFound(THREAD_NOT_FOUND.into()))
        }
    }

    const COMMENT_COLUMNS: &str =
        "SELECT c.id, c.thread_id, c.user_id, u.username, c.content, c.is_delete, c.date \
         FROM comments c INNER JOIN users u ON u.id = c.user_id";

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn add_comment(&self, new: NewComment) -> RepoResult<AddedComment> {
            let id = prefixed("comment", &self.ids);
            // The thread_id foreign key backs the use case's existence check.
            let (id, content, user_id) = sqlx::query_as::<_, (String, String, String)>(
                "INSERT INTO comments (id, content, thread_id, user_id) VALUES ($1,$2,$3,$4) RETURNING id, content, user_id",
            )
            .bind(&id)
            .bind(&new.content)
            .bind(&new.thread_id)
            .bind(&new.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, THREAD_NOT_FOUND))?;
            AddedComment::from_stored(id, content, user_id)
        }

        async fn verify_comment_exists(&self, id: &str) -> RepoResult<()> {
            sqlx::query_scalar::<_, String>("SELECT id FROM comments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?
                .map(|_| ())
                .ok_or_else(|| DomainError::NotFound(COMMENT_NOT_FOUND.into()))
        }

        async fn get_comment(&self, id: &str) -> RepoResult<CommentRecord> {
            sqlx::query_as::<_, CommentRecord>(&format!("{COMMENT_COLUMNS} WHERE c.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?
                .ok_or_else(|| DomainError::NotFound(COMMENT_NOT_FOUND.into()))
        }

        async fn get_comments_by_thread(&self, thread_id: &str) -> RepoResult<Vec<CommentRecord>> {
            sqlx::query_as::<_, CommentRecord>(&format!("{COMMENT_COLUMNS} WHERE c.thread_id = $1 ORDER BY c.date ASC"))
                .bind(thread_id)
                .fetch_all(&self.pool)
                .await
                .map_err(internal)
        }

        async fn verify_comment_owner(&self, comment_id: &str, user_id: &str) -> RepoResult<()> {
            sqlx::query_scalar::<_, String>("SELECT id FROM comments WHERE id = $1 AND user_id = $2")
                .bind(comment_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(internal)?
                .map(|_| ())
                .ok_or_else(|| DomainError::Authorization(ACCESS_DENIED.into()))
        }

        async fn soft_delete_comment(&self, id: &str) -> RepoResult<bool> {
            let res = sqlx::query("UPDATE comments SET is_delete = 1 WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(internal)?;
            if res.rows_affected() == 0 {
                return Err(DomainError::Invariant(CANNOT_DELETE_COMMENT.into()));
            }
            Ok(true)
        }
    }
}
