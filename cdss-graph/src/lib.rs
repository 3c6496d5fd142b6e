//! Intent-routed retrieval-augmented generation over the heart failure
//! guideline, run as an explicit state machine with per-thread checkpoints.
//!
//! - [`intent`] / [`router`]: classify a query and pick a branch
//! - [`context`]: the shared [`GuidelineContext`] with keyed, single-flight caches
//! - [`generation`] / [`responder`]: grounded answers and the out-of-scope reply
//! - [`checkpoint`]: [`Checkpointer`] and the in-memory implementation
//! - [`graph`]: [`GuidelineGraph::invoke`], which drives the nodes
//!
//! # Example
//!
//! ```rust,ignore
//! use cdss_graph::{GraphInput, GuidelineContext, GuidelineGraph};
//!
//! let context = Arc::new(GuidelineContext::new(config, embedder, compressor));
//! let graph = GuidelineGraph::new(model, context);
//! let state = graph
//!     .invoke("thread-1", GraphInput::new("What are the stages of HF?", "data/HF_Guideline.pdf"))
//!     .await?;
//! println!("{}", state.last_message().unwrap().content);
//! ```

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod generation;
pub mod graph;
pub mod intent;
pub mod node;
pub mod responder;
pub mod router;
pub mod state;

pub use checkpoint::{
    Checkpoint, Checkpointer, DEFAULT_MAX_HISTORY, DEFAULT_MAX_THREADS, InMemoryCheckpointer,
};
pub use context::{CacheSizes, GuidelineContext};
pub use error::{GraphError, Result};
pub use generation::{AnswerGenerator, FALLBACK};
pub use graph::{DEFAULT_TEMPERATURE, GuidelineGraph};
pub use intent::{Intent, IntentClassifier};
pub use node::{NodeName, Stage};
pub use responder::GENERAL_RESPONSE;
pub use router::{Branch, route};
pub use state::{ConversationState, GraphInput};
