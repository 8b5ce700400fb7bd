//! Errors.

use crate::dom::NodeId;

/// Errors raised by the core.
///
/// Configuration errors (missing setup before a bind or attach) and lookup errors are returned
/// straight to the caller; they indicate integration mistakes rather than bad runtime data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A listener reference that no longer points at anything was registered.
    #[error("empty listener passed to add_listener")]
    EmptyListener,

    /// Tried to attach to an element that does not exist.
    #[error("cannot attach to an undefined element")]
    MissingElement,

    #[error("set_item_controller_prototype must be called before set_model")]
    MissingItemPrototype,

    #[error("set_list_container must be called before set_model")]
    MissingContainer,

    #[error("item controller has no item template")]
    MissingTemplate,

    /// No element with this id is attached to the document.
    #[error("no element with id `{0}`")]
    ElementNotFound(String),

    /// No element with this id inside a rendered subtree.
    #[error("could not find contained element `{0}`")]
    ContainedElementNotFound(String),

    /// Super dispatch found no ancestor implementation above the running one.
    #[error("no ancestor implementation of `{0}` above the calling one")]
    SuperNotFound(String),

    /// The object has no method with this name anywhere in its chain.
    #[error("no method `{0}`")]
    NoSuchMethod(String),

    #[error("could not find item in list")]
    ItemNotFound,

    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A plain key/value object was expected.
    #[error("expected a plain object, got {0}")]
    NotAnObject(String),

    /// The property does not hold a list model.
    #[error("property `{0}` does not hold a list model")]
    NotAListModel(String),

    #[error("no such node {0:?}")]
    NoSuchNode(NodeId),

    /// The operation would make a node its own descendant.
    #[error("node {0:?} would become its own descendant")]
    Cycle(NodeId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
