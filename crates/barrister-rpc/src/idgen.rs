//! Request id generation strategies.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Produces the id for each outgoing request.
///
/// Generators must yield unique ids under concurrent use: batches index
/// their responses by id.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random 128-bit ids rendered as 32 hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomId;

impl IdGenerator for RandomId {
    fn next_id(&self) -> String {
        format!("{:032x}", rand::random::<u128>())
    }
}

/// Monotonic sequence ids starting at 0.
#[derive(Debug, Default)]
pub struct SequenceId {
    next: AtomicU64,
}

impl SequenceId {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequenceId {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}
