//! Predicate evaluator for docpipe
//!
//! Filters are trees of field comparisons joined by `$and`, `$or` and
//! `$nor`. Parsing validates operators up front; evaluation never fails.

mod ast;
mod evaluator;
mod parser;

pub use ast::{CompareOp, Comparison, Filter, Pattern};
pub use evaluator::{evaluate, PredicateFilter};
pub use parser::parse_filter;
