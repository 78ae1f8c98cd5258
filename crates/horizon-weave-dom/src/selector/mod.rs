//! Selector engine for querying the document tree.
//!
//! Selectors are parsed once into a [`SelectorList`] and matched right to left
//! against an element and its ancestor chain.

mod matcher;
mod parser;
mod types;

pub use matcher::{matches_any, matches_full, ElementContext, SelectorMatcher};
pub use parser::parse_selector;
pub use types::{AttributeSelector, Combinator, Selector, SelectorList, SelectorPart, TypeSelector};
