//! Node names and the stage machine that sequences them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A node of the guideline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    IntentClassifier,
    GeneralQuery,
    DocLoader,
    TextSplitter,
    VectorDb,
    RetrieveDocuments,
    Generation,
}

impl NodeName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IntentClassifier => "intent_classifier",
            Self::GeneralQuery => "general_query",
            Self::DocLoader => "doc_loader",
            Self::TextSplitter => "text_splitter",
            Self::VectorDb => "vector_db",
            Self::RetrieveDocuments => "retrieve_documents",
            Self::Generation => "generation",
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an invocation currently is.
///
/// `Classifying` is the entry point and the only stage with two successors;
/// every path ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classifying,
    RespondingGeneral,
    Loading,
    Splitting,
    Indexing,
    Retrieving,
    Generating,
    Done,
}

impl Stage {
    /// The node that runs in this stage, or `None` once finished.
    pub fn node(self) -> Option<NodeName> {
        match self {
            Self::Classifying => Some(NodeName::IntentClassifier),
            Self::RespondingGeneral => Some(NodeName::GeneralQuery),
            Self::Loading => Some(NodeName::DocLoader),
            Self::Splitting => Some(NodeName::TextSplitter),
            Self::Indexing => Some(NodeName::VectorDb),
            Self::Retrieving => Some(NodeName::RetrieveDocuments),
            Self::Generating => Some(NodeName::Generation),
            Self::Done => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_names_serialize_as_graph_labels() {
        for node in [NodeName::IntentClassifier, NodeName::RetrieveDocuments, NodeName::VectorDb] {
            let json = serde_json::to_value(node).unwrap();
            assert_eq!(json, node.as_str());
        }
        assert_eq!(Stage::Done.node(), None);
        assert_eq!(Stage::Indexing.node(), Some(NodeName::VectorDb));
    }
}
