//! The single conditional edge out of the classifier.

use std::fmt;

use crate::intent::Intent;
use crate::node::NodeName;

/// The branch taken after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Medical,
    General,
}

impl Branch {
    /// The first node on this branch.
    pub fn target(self) -> NodeName {
        match self {
            Self::Medical => NodeName::DocLoader,
            Self::General => NodeName::GeneralQuery,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Medical => "medical",
            Self::General => "general",
        })
    }
}

pub fn route(intent: Intent) -> Branch {
    match intent {
        Intent::Medical => Branch::Medical,
        Intent::General => Branch::General,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_each_intent_to_its_branch() {
        assert_eq!(route(Intent::Medical).target(), NodeName::DocLoader);
        assert_eq!(route(Intent::General).target(), NodeName::GeneralQuery);
        assert_eq!(route(Intent::General).to_string(), "general");
    }
}
