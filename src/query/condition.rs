//! Select predicates and projections.

use std::cmp::Ordering;
use std::fmt;

use crate::common::{Error, Key, Result};

/// Attribute a condition tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Key,
    Value,
}

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompOp {
    /// Whether `ordering` (tuple compared to literal) satisfies the operator.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompOp::Eq => ordering == Ordering::Equal,
            CompOp::Ne => ordering != Ordering::Equal,
            CompOp::Lt => ordering == Ordering::Less,
            CompOp::Gt => ordering == Ordering::Greater,
            CompOp::Le => ordering != Ordering::Greater,
            CompOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompOp::Eq => "=",
            CompOp::Ne => "<>",
            CompOp::Lt => "<",
            CompOp::Gt => ">",
            CompOp::Le => "<=",
            CompOp::Ge => ">=",
        };
        f.write_str(op)
    }
}

/// What a select returns per matching tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Key,
    Value,
    /// Key and value.
    All,
    /// Only the number of matches.
    Count,
}

/// One `attr op literal` predicate of a select.
///
/// Key literals must parse as integers; value literals compare bytewise.
///
/// # Example
/// ```
/// use pageidx::query::{Attr, CompOp, Condition};
///
/// let cond = Condition::new(Attr::Key, CompOp::Ge, "1000");
/// assert!(cond.matches(1000, "Heat").unwrap());
/// assert!(!cond.matches(999, "Heat").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub attr: Attr,
    pub op: CompOp,
    pub literal: String,
}

impl Condition {
    pub fn new(attr: Attr, op: CompOp, literal: impl Into<String>) -> Self {
        Self {
            attr,
            op,
            literal: literal.into(),
        }
    }

    /// A condition on the key attribute.
    pub fn key(op: CompOp, key: Key) -> Self {
        Self::new(Attr::Key, op, key.to_string())
    }

    /// A condition on the value attribute.
    pub fn value(op: CompOp, value: impl Into<String>) -> Self {
        Self::new(Attr::Value, op, value)
    }

    /// The literal as a key.
    ///
    /// # Errors
    /// Returns `Error::InvalidCondition` if the literal is not an integer.
    pub fn key_literal(&self) -> Result<Key> {
        self.literal
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCondition(format!("key {} '{}'", self.op, self.literal)))
    }

    /// Whether the tuple `(key, value)` satisfies this condition.
    pub fn matches(&self, key: Key, value: &str) -> Result<bool> {
        let ordering = match self.attr {
            Attr::Key => key.cmp(&self.key_literal()?),
            Attr::Value => value.cmp(self.literal.as_str()),
        };
        Ok(self.op.holds(ordering))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attr = match self.attr {
            Attr::Key => "key",
            Attr::Value => "value",
        };
        write!(f, "{} {} '{}'", attr, self.op, self.literal)
    }
}
