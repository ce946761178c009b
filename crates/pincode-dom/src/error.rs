use crate::NodeId;

/// Errors raised by [`Document`](crate::Document) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The selector text could not be parsed.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector {
        /// The selector as given by the caller.
        selector: String,
        /// What the parser choked on.
        reason: &'static str,
    },
    /// The node was removed, or never belonged to this document.
    #[error("node {0:?} does not exist in this document")]
    MissingNode(NodeId),
    /// A value or caret operation was attempted on a non-`<input>` element.
    #[error("node {0:?} is not an input control")]
    NotAControl(NodeId),
    /// Appending or inserting would make a node its own ancestor.
    #[error("node {0:?} cannot be moved beneath itself")]
    Cycle(NodeId),
}
