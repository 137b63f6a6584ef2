use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{DomainError, Entity};

/// Visible content of a soft-deleted comment.
pub const TOMBSTONE: &str = "**comment has been deleted**";

/// Loosely typed use-case input: a request body merged with path parameters
/// and the authenticated caller id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self { Self::default() }

    /// Non-object bodies yield an empty payload, which then fails presence checks.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Insert or overwrite a field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

    /// Presence check over every field first, then the string type check.
    pub(crate) fn strings<const N: usize>(&self, entity: Entity, fields: [&str; N]) -> Result<[String; N], DomainError> {
        if !fields.iter().all(|f| self.get(f).is_some_and(is_truthy)) {
            return Err(DomainError::MissingField(entity));
        }
        if !fields.iter().all(|f| self.get(f).is_some_and(Value::is_string)) {
            return Err(DomainError::TypeMismatch(entity));
        }
        Ok(fields.map(|f| self.get(f).and_then(Value::as_str).unwrap_or_default().to_string()))
    }

    /// Type check for a field that may be absent.
    pub(crate) fn optional_string(&self, entity: Entity, field: &str) -> Result<Option<String>, DomainError> {
        match self.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Err(DomainError::MissingField(entity)),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(DomainError::TypeMismatch(entity)),
        }
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn require_non_empty(entity: Entity, fields: &[&str]) -> Result<(), DomainError> {
    if fields.iter().any(|f| f.is_empty()) {
        return Err(DomainError::MissingField(entity));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewThread {
    pub title: String,
    pub body: String,
    pub user_id: String,
}

impl NewThread {
    pub fn from_payload(payload: &Payload) -> Result<Self, DomainError> {
        let [title, body, user_id] = payload.strings(Entity::AddThread, ["title", "body", "user_id"])?;
        Ok(Self { title, body, user_id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddedThread {
    pub id: String,
    pub title: String,
    pub owner: String,
}

impl AddedThread {
    /// Builds the public shape from a stored row, exposing `user_id` as `owner`.
    pub fn from_stored(id: String, title: String, user_id: String) -> Result<Self, DomainError> {
        require_non_empty(Entity::AddedThread, &[id.as_str(), title.as_str(), user_id.as_str()])?;
        Ok(Self { id, title, owner: user_id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub content: String,
    pub thread_id: String,
    pub user_id: String,
}

impl NewComment {
    pub fn from_payload(payload: &Payload) -> Result<Self, DomainError> {
        let [content, thread_id, user_id] =
            payload.strings(Entity::AddComment, ["content", "thread_id", "user_id"])?;
        Ok(Self { content, thread_id, user_id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddedComment {
    pub id: String,
    pub content: String,
    pub owner: String,
}

impl AddedComment {
    pub fn from_stored(id: String, content: String, user_id: String) -> Result<Self, DomainError> {
        require_non_empty(Entity::AddedComment, &[id.as_str(), content.as_str(), user_id.as_str()])?;
        Ok(Self { id, content, owner: user_id })
    }
}

/// Thread row joined with its owner's username.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ThreadRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub user_id: String,
    pub username: String,
    pub date: DateTime<Utc>,
}

/// Comment row joined with its author's username. `content` is the stored
/// text, never the tombstone.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CommentRecord {
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub username: String,
    pub content: String,
    pub is_delete: i16,
    pub date: DateTime<Utc>,
}

impl CommentRecord {
    pub fn is_deleted(&self) -> bool { self.is_delete == 1 }
}

/// Comment as shown to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommentView {
    pub id: String,
    pub username: String,
    pub date: DateTime<Utc>,
    pub content: String,
    pub is_delete: i16,
}

impl CommentView {
    pub fn from_record(record: CommentRecord) -> Result<Self, DomainError> {
        require_non_empty(Entity::GetComment, &[record.id.as_str(), record.content.as_str(), record.username.as_str()])?;
        let content = if record.is_deleted() { TOMBSTONE.to_string() } else { record.content };
        Ok(Self {
            id: record.id,
            username: record.username,
            date: record.date,
            content,
            is_delete: record.is_delete,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ThreadDetail {
    pub id: String,
    pub title: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub username: String,
    pub comments: Vec<CommentView>,
}

impl ThreadDetail {
    pub fn new(thread: ThreadRecord, comments: Vec<CommentView>) -> Self {
        Self {
            id: thread.id,
            title: thread.title,
            body: thread.body,
            date: thread.date,
            username: thread.username,
            comments,
        }
    }
}
