//! A semantic chart parser for hand-written natural-language grammars: an
//! element-combinator grammar builder, three interchangeable chart-parsing
//! strategies, and a robust driver that tolerates unrecognized tokens and
//! can be fed incrementally. See each module for its piece of the pipeline:
//! [`element`] builds grammars, [`grammar`] compiles them, [`chart`] and
//! [`rules`] run the parse, [`tree`] extracts derivations, [`result`] folds
//! a derivation into a record, and [`driver`] ties the above into a single
//! adaptive entry point.

#[macro_use]
extern crate lazy_static;

pub mod chart;
pub mod driver;
pub mod element;
pub mod error;
pub mod grammar;
pub mod result;
pub mod rules;
pub mod tree;
pub mod util;

pub use chart::{Agenda, Edge, IncrementalChart};
pub use driver::RobustParser;
pub use element::Element;
pub use error::{GrammarError, ParseError, ValueError};
pub use grammar::{Grammar, GrammarBuilder, Production};
pub use result::{ParseResult, ResultValue};
pub use rules::ParsingStrategy;
pub use tree::TreeNode;
