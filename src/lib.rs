use std::error::Error as StdError;
use std::fmt;

mod dom;
mod duplicator;
mod form_controls;
mod html;
mod page;
mod repeating_form;

use dom::Dom;

pub use duplicator::{
    DEFAULT_SEPARATOR, DocumentTree, Duplicate, DuplicatorOptions, ElementDuplicator,
    FocusController, InsertPosition, parse_counter, renumber_suffix,
};
pub use page::Page;
pub use repeating_form::RepeatingForm;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Markup the fixture tokenizer could not read. `offset` is a byte offset
    /// into the source.
    HtmlParse { offset: usize, reason: String },
    /// A required element id does not resolve to an element in the document.
    Lookup(String),
    /// The repeat counter holder does not contain a usable non-negative integer.
    CounterParse { id: String, value: String },
    InvalidTree(String),
    UnsupportedSelector(String),
    NotAnElement { target: String, found: &'static str },
    AssertionFailed {
        target: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse { offset, reason } => {
                write!(f, "cannot parse html at byte {offset}: {reason}")
            }
            Self::Lookup(id) => write!(f, "element not found: #{id}"),
            Self::CounterParse { id, value } => write!(
                f,
                "repeat counter #{id} does not hold a non-negative integer: {value:?}"
            ),
            Self::InvalidTree(msg) => write!(f, "invalid tree operation: {msg}"),
            Self::UnsupportedSelector(selector) => {
                write!(f, "only `#id` selectors are supported, got {selector:?}")
            }
            Self::NotAnElement { target, found } => {
                write!(f, "{target} must be an element, found a {found} node")
            }
            Self::AssertionFailed {
                target,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "{target}: expected {expected:?}, got {actual:?} in {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}

/// Handle to a node of a [`Page`]'s document. Only meaningful for the page
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// For [`DocumentTree`] implementations that keep nodes in an indexed store.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests;
