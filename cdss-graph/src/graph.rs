//! The guideline graph: classification, an intent branch, and the RAG chain.
//!
//! ```text
//! intent_classifier ─┬─ general ──► general_query ─────────────────────────────────► done
//!                    └─ medical ──► doc_loader ► text_splitter ► vector_db
//!                                   ► retrieve_documents ► generation ─────────────► done
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use cdss_model::{ChatModel, Message};
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

use crate::checkpoint::{Checkpoint, Checkpointer, InMemoryCheckpointer};
use crate::context::GuidelineContext;
use crate::error::{GraphError, Result};
use crate::generation::AnswerGenerator;
use crate::intent::IntentClassifier;
use crate::node::{NodeName, Stage};
use crate::responder::general_response;
use crate::router::{Branch, route};
use crate::state::{ConversationState, GraphInput};

/// Default sampling temperature for classification, compression and generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Runs a query through the guideline graph, checkpointing after every node.
///
/// Invocations on the same thread are serialised; different threads run
/// concurrently and share the [`GuidelineContext`].
pub struct GuidelineGraph {
    classifier: IntentClassifier,
    generator: AnswerGenerator,
    context: Arc<GuidelineContext>,
    checkpointer: Arc<dyn Checkpointer>,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GuidelineGraph {
    /// A graph using `model` for classification and generation, with an
    /// in-memory checkpointer.
    pub fn new(model: Arc<dyn ChatModel>, context: Arc<GuidelineContext>) -> Self {
        Self::with_temperature(model, context, DEFAULT_TEMPERATURE)
    }

    pub fn with_temperature(
        model: Arc<dyn ChatModel>,
        context: Arc<GuidelineContext>,
        temperature: f32,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone(), temperature),
            generator: AnswerGenerator::new(model, temperature),
            context,
            checkpointer: Arc::new(InMemoryCheckpointer::default()),
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the checkpointer.
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = checkpointer;
        self
    }

    pub fn context(&self) -> &Arc<GuidelineContext> {
        &self.context
    }

    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Run `input` on `thread_id` and return the final state.
    ///
    /// If the thread has a checkpoint, its state is resumed: the new query is
    /// appended to the previous ones and `messages` keeps growing.
    ///
    /// # Errors
    ///
    /// The first failing node aborts the run. Checkpoints written before the
    /// failure are kept.
    #[instrument(skip(self, input))]
    pub async fn invoke(&self, thread_id: &str, input: GraphInput) -> Result<ConversationState> {
        let lock = self.thread_lock(thread_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run(thread_id, input).await
        };
        self.release_thread_lock(thread_id, lock).await;
        result
    }

    /// Like [`invoke`](Self::invoke), returning only the answer text.
    pub async fn ask(&self, thread_id: &str, input: GraphInput) -> Result<String> {
        let state = self.invoke(thread_id, input).await?;
        Ok(state.last_message().map(|m| m.content.clone()).unwrap_or_default())
    }

    /// Threads with an invocation running or waiting.
    pub async fn active_threads(&self) -> usize {
        self.thread_locks.lock().await.len()
    }

    async fn run(&self, thread_id: &str, input: GraphInput) -> Result<ConversationState> {
        let (mut state, mut step) = match self.checkpointer.latest(thread_id).await? {
            Some(checkpoint) => (checkpoint.state.resume(input), checkpoint.step),
            None => (ConversationState::new(input), 0),
        };

        let mut stage = Stage::Classifying;
        while let Some(node) = stage.node() {
            info!(%node, step = step + 1, "running node");
            stage = self.run_node(node, &mut state).await.map_err(|e| {
                error!(%node, error = %e, "node failed");
                e
            })?;
            step += 1;
            self.checkpointer.put(Checkpoint::new(thread_id, step, node, state.clone())).await?;
        }

        info!(
            intent = ?state.intent,
            retrieved = state.retrieved_docs.len(),
            messages = state.messages.len(),
            "graph finished"
        );
        Ok(state)
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.thread_locks.lock().await.entry(thread_id.to_string()).or_default().clone()
    }

    async fn release_thread_lock(&self, thread_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.thread_locks.lock().await;
        // Only the map and `lock` hold it: no invocation is waiting on this thread.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(thread_id);
        }
    }

    async fn run_node(&self, node: NodeName, state: &mut ConversationState) -> Result<Stage> {
        match node {
            NodeName::IntentClassifier => {
                let intent = self.classifier.classify(&state.query_text()).await?;
                state.intent = Some(intent);
                Ok(match route(intent) {
                    Branch::Medical => Stage::Loading,
                    Branch::General => Stage::RespondingGeneral,
                })
            }
            NodeName::GeneralQuery => {
                state.messages.push(general_response());
                Ok(Stage::Done)
            }
            NodeName::DocLoader => {
                state.docs = self.context.documents(&state.guideline_path).await?;
                Ok(Stage::Splitting)
            }
            NodeName::TextSplitter => {
                if state.docs.is_empty() {
                    return Err(GraphError::MissingState { node, field: "docs" });
                }
                state.chunks = self.context.chunks(&state.guideline_path, &state.docs).await?;
                Ok(Stage::Indexing)
            }
            NodeName::VectorDb => {
                if state.chunks.is_empty() {
                    return Err(GraphError::MissingState { node, field: "chunks" });
                }
                let index = self.context.index(&state.chunks).await?;
                state.index_fingerprint = Some(index.fingerprint().to_string());
                Ok(Stage::Retrieving)
            }
            NodeName::RetrieveDocuments => {
                let missing = GraphError::MissingState { node, field: "index_fingerprint" };
                let Some(fingerprint) = state.index_fingerprint.as_deref() else {
                    return Err(missing);
                };
                let Some(index) = self.context.index_by_fingerprint(fingerprint).await else {
                    return Err(missing);
                };
                let retriever = self.context.retriever(&index).await?;
                state.retrieved_docs = retriever.retrieve(&state.query_text()).await?;
                Ok(Stage::Generating)
            }
            NodeName::Generation => {
                let answer =
                    self.generator.generate(&state.query_text(), &state.retrieved_docs).await?;
                state.messages.push(Message::assistant(answer));
                Ok(Stage::Done)
            }
        }
    }
}
