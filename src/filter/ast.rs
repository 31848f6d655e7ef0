//! Filter expression tree
//!
//! Leaves compare one field against a literal; internal nodes combine
//! children with `$and`, `$or` or `$nor`.

use std::fmt;

use regex::Regex;
use serde_json::Value;

/// A compiled `$regex` pattern.
///
/// Equality is by source and options, not by compiled automaton.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    options: String,
    regex: Regex,
}

impl Pattern {
    /// Wraps an already compiled regex
    pub fn new(source: impl Into<String>, options: impl Into<String>, regex: Regex) -> Self {
        Self {
            source: source.into(),
            options: options.into(),
            regex,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.options == other.options
    }
}

/// Comparison operators on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum CompareOp {
    /// `$eq`
    Eq(Value),
    /// `$ne`
    Ne(Value),
    /// `$gt`
    Gt(Value),
    /// `$gte`
    Gte(Value),
    /// `$lt`
    Lt(Value),
    /// `$lte`
    Lte(Value),
    /// `$in`
    In(Vec<Value>),
    /// `$nin`
    Nin(Vec<Value>),
    /// `$exists`
    Exists(bool),
    /// `$regex`, text values only
    Regex(Pattern),
    /// `$not`, negates one operator on the same field
    Not(Box<CompareOp>),
}

impl CompareOp {
    /// Returns the operator name for explain output
    pub fn op_name(&self) -> &'static str {
        match self {
            CompareOp::Eq(_) => "$eq",
            CompareOp::Ne(_) => "$ne",
            CompareOp::Gt(_) => "$gt",
            CompareOp::Gte(_) => "$gte",
            CompareOp::Lt(_) => "$lt",
            CompareOp::Lte(_) => "$lte",
            CompareOp::In(_) => "$in",
            CompareOp::Nin(_) => "$nin",
            CompareOp::Exists(_) => "$exists",
            CompareOp::Regex(_) => "$regex",
            CompareOp::Not(_) => "$not",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq(v)
            | CompareOp::Ne(v)
            | CompareOp::Gt(v)
            | CompareOp::Gte(v)
            | CompareOp::Lt(v)
            | CompareOp::Lte(v) => write!(f, "{} {}", self.op_name(), v),
            CompareOp::In(values) | CompareOp::Nin(values) => {
                write!(f, "{} {}", self.op_name(), Value::Array(values.clone()))
            }
            CompareOp::Exists(flag) => write!(f, "$exists {}", flag),
            CompareOp::Regex(pattern) if pattern.options().is_empty() => {
                write!(f, "$regex /{}/", pattern.source())
            }
            CompareOp::Regex(pattern) => {
                write!(f, "$regex /{}/{}", pattern.source(), pattern.options())
            }
            CompareOp::Not(inner) => write!(f, "$not ({})", inner),
        }
    }
}

/// A single field comparison: `<field> <op>`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Field path, possibly dotted
    pub field: String,
    /// Operator with its literal
    pub op: CompareOp,
}

impl Comparison {
    pub fn new(field: impl Into<String>, op: CompareOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, CompareOp::Eq(value))
    }

    pub fn ne(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, CompareOp::Ne(value))
    }

    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, CompareOp::Gt(value))
    }

    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, CompareOp::Gte(value))
    }

    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, CompareOp::Lt(value))
    }

    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, CompareOp::Lte(value))
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, CompareOp::In(values))
    }

    pub fn not_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, CompareOp::Nin(values))
    }

    pub fn exists(field: impl Into<String>, flag: bool) -> Self {
        Self::new(field, CompareOp::Exists(flag))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.op)
    }
}

/// Filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Leaf comparison
    Comparison(Comparison),
    /// All children hold (empty: true)
    And(Vec<Filter>),
    /// At least one child holds (empty: false)
    Or(Vec<Filter>),
    /// No child holds (empty: true)
    Nor(Vec<Filter>),
}

impl Filter {
    /// A filter that matches every record
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    pub fn and(children: Vec<Filter>) -> Self {
        Filter::And(children)
    }

    pub fn or(children: Vec<Filter>) -> Self {
        Filter::Or(children)
    }

    pub fn nor(children: Vec<Filter>) -> Self {
        Filter::Nor(children)
    }

    /// Visits every leaf comparison, depth first
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Filter::Comparison(c) => out.push(c),
            Filter::And(children) | Filter::Or(children) | Filter::Nor(children) => {
                for child in children {
                    child.collect_comparisons(out);
                }
            }
        }
    }
}

impl From<Comparison> for Filter {
    fn from(comparison: Comparison) -> Self {
        Filter::Comparison(comparison)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, children) = match self {
            Filter::Comparison(c) => return write!(f, "{}", c),
            Filter::And(children) => ("$and", children),
            Filter::Or(children) => ("$or", children),
            Filter::Nor(children) => ("$nor", children),
        };

        write!(f, "{}[", name)?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, "]")
    }
}
