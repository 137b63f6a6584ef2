//! Opaque id suffixes for newly created rows (`thread-<suffix>`, ...).

use std::sync::atomic::{AtomicU64, Ordering};

pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 16 hex chars taken from a v4 uuid.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut s = uuid::Uuid::new_v4().simple().to_string();
        s.truncate(16);
        s
    }
}

/// Always yields the same suffix.
#[derive(Debug, Clone)]
pub struct FixedIdGenerator(pub String);

impl IdGenerator for FixedIdGenerator {
    fn generate(&self) -> String { self.0.clone() }
}

/// Yields 1, 2, 3, ...
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        (self.next.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}
