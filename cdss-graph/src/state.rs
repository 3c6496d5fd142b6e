//! Per-thread conversation state.

use std::path::PathBuf;
use std::sync::Arc;

use cdss_model::Message;
use cdss_rag::{Chunk, Document};
use serde::{Deserialize, Serialize};

use crate::intent::Intent;

/// The record threaded through every node and checkpointed after each one.
///
/// `query` and `messages` only grow across invocations on the same thread.
/// The stage outputs (`docs`, `chunks`, `index_fingerprint`,
/// `retrieved_docs`) are recomputed on every invocation; the large ones are
/// shared with the guideline context so cloning a state is cheap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub intent: Option<Intent>,
    pub query: Vec<Message>,
    pub guideline_path: PathBuf,
    #[serde(default)]
    pub docs: Arc<[Document]>,
    #[serde(default)]
    pub chunks: Arc<[Chunk]>,
    #[serde(default)]
    pub index_fingerprint: Option<String>,
    #[serde(default)]
    pub retrieved_docs: Vec<Chunk>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl ConversationState {
    /// A fresh state for `input`.
    pub fn new(input: GraphInput) -> Self {
        Self { query: input.query, guideline_path: input.guideline_path, ..Self::default() }
    }

    /// Continue a checkpointed state with a new request.
    ///
    /// The new query messages are appended, the guideline path is replaced
    /// and every stage output is cleared.
    pub fn resume(mut self, input: GraphInput) -> Self {
        self.query.extend(input.query);
        self.guideline_path = input.guideline_path;
        self.intent = None;
        self.docs = Arc::default();
        self.chunks = Arc::default();
        self.index_fingerprint = None;
        self.retrieved_docs.clear();
        self
    }

    /// All query message contents joined with single spaces.
    pub fn query_text(&self) -> String {
        self.query.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join(" ")
    }

    /// The most recent output message, i.e. the answer.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// What a caller supplies to [`GuidelineGraph::invoke`](crate::GuidelineGraph::invoke).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInput {
    pub query: Vec<Message>,
    pub guideline_path: PathBuf,
}

impl GraphInput {
    /// A single user question against the guideline at `guideline_path`.
    pub fn new(question: impl Into<String>, guideline_path: impl Into<PathBuf>) -> Self {
        Self { query: vec![Message::user(question)], guideline_path: guideline_path.into() }
    }
}
