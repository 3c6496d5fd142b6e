//! Per-thread state snapshots taken after every node.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::node::NodeName;
use crate::state::ConversationState;

/// Snapshots kept per thread by default.
pub const DEFAULT_MAX_HISTORY: usize = 64;

/// The state of a thread right after `node` finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: Uuid,
    pub thread_id: String,
    /// Position in the thread, counted across invocations.
    pub step: u64,
    pub node: NodeName,
    pub state: ConversationState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(
        thread_id: impl Into<String>,
        step: u64,
        node: NodeName,
        state: ConversationState,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id: thread_id.into(),
            step,
            node,
            state,
            created_at: Utc::now(),
        }
    }
}

/// Storage for thread checkpoints.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Append a checkpoint to its thread.
    async fn put(&self, checkpoint: Checkpoint) -> Result<()>;

    /// The most recent checkpoint of a thread.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Retained checkpoints of a thread, oldest first.
    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>>;

    /// Forget a thread.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}

/// Threads kept by default before the least recently written is evicted.
pub const DEFAULT_MAX_THREADS: usize = 1024;

#[derive(Debug, Default)]
struct ThreadLog {
    history: Vec<Checkpoint>,
    last_write: u64,
}

#[derive(Debug, Default)]
struct Threads {
    logs: HashMap<String, ThreadLog>,
    clock: u64,
}

/// Keeps the last `max_history` checkpoints of at most `max_threads` threads
/// in memory. Writing to a new thread when full evicts the thread written
/// least recently.
#[derive(Debug)]
pub struct InMemoryCheckpointer {
    threads: RwLock<Threads>,
    max_history: usize,
    max_threads: usize,
}

impl Default for InMemoryCheckpointer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl InMemoryCheckpointer {
    pub fn new(max_history: usize) -> Self {
        Self {
            threads: RwLock::new(Threads::default()),
            max_history: max_history.max(1),
            max_threads: DEFAULT_MAX_THREADS,
        }
    }

    /// Cap the number of retained threads.
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads.max(1);
        self
    }

    /// Number of threads with at least one checkpoint.
    pub async fn thread_count(&self) -> usize {
        self.threads.read().await.logs.len()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut guard = self.threads.write().await;
        let threads = &mut *guard;

        if !threads.logs.contains_key(&checkpoint.thread_id)
            && threads.logs.len() >= self.max_threads
        {
            let oldest = threads
                .logs
                .iter()
                .min_by_key(|(_, log)| log.last_write)
                .map(|(id, _)| id.clone());
            if let Some(evicted) = oldest {
                threads.logs.remove(&evicted);
                debug!(thread_id = %evicted, "evicted least recently used thread");
            }
        }

        threads.clock += 1;
        let clock = threads.clock;
        let log = threads.logs.entry(checkpoint.thread_id.clone()).or_default();

        if let Some(last) = log.history.last().filter(|last| checkpoint.step <= last.step) {
            return Err(GraphError::Checkpoint(format!(
                "step {} for thread '{}' does not follow step {}",
                checkpoint.step, checkpoint.thread_id, last.step
            )));
        }

        debug!(thread_id = %checkpoint.thread_id, step = checkpoint.step, node = %checkpoint.node, "checkpoint saved");
        log.last_write = clock;
        log.history.push(checkpoint);
        if log.history.len() > self.max_history {
            let excess = log.history.len() - self.max_history;
            log.history.drain(0..excess);
        }
        Ok(())
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.logs.get(thread_id).and_then(|log| log.history.last().cloned()))
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.logs.get(thread_id).map(|log| log.history.clone()).unwrap_or_default())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.logs.remove(thread_id);
        Ok(())
    }
}
