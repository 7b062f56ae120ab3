//! Per-scan query context: requested columns, row limit, qualifiers and
//! cancellation.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use super::error::TableError;

/// Qualifier comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }
}

/// A single `column <op> value` constraint on a key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qual {
    pub column: String,
    pub op: Operator,
    pub value: String,
}

impl fmt::Display for Qual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column, self.op.as_str(), self.value)
    }
}

impl FromStr for Qual {
    type Err = TableError;

    /// Parse `column=value`, `column>=value`, `column<value` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Two-character operators first so `>=` is not read as `>`.
        const OPERATORS: [(&str, Operator); 5] = [
            (">=", Operator::Ge),
            ("<=", Operator::Le),
            ("=", Operator::Eq),
            (">", Operator::Gt),
            ("<", Operator::Lt),
        ];

        let (pos, token, op) = OPERATORS
            .iter()
            .filter_map(|(token, op)| s.find(token).map(|pos| (pos, *token, *op)))
            .min_by_key(|(pos, token, _)| (*pos, usize::MAX - token.len()))
            .ok_or_else(|| TableError::invalid_qualifier(s, "expected column<op>value"))?;

        let column = s[..pos].trim();
        if column.is_empty() {
            return Err(TableError::invalid_qualifier(s, "missing column name"));
        }

        Ok(Qual {
            column: column.to_string(),
            op,
            value: s[pos + token.len()..].trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Qualifiers(Vec<Qual>);

impl Qualifiers {
    pub fn push(&mut self, qual: Qual) {
        self.0.push(qual);
    }

    /// The value of the first equality qualifier on `column`.
    pub fn equals(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|q| q.column == column && q.op == Operator::Eq)
            .map(|q| q.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qual> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Qual> for Qualifiers {
    fn from_iter<T: IntoIterator<Item = Qual>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Cooperative cancellation signal shared between a scan and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What the caller wants from one scan or get.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    columns: BTreeSet<String>,
    limit: Option<u64>,
    quals: Qualifiers,
    cancel: CancelFlag,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the scan to these columns. An empty set means every column.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_qual(mut self, qual: Qual) -> Self {
        self.quals.push(qual);
        self
    }

    /// Shorthand for an equality qualifier.
    #[must_use]
    pub fn with_eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_qual(Qual {
            column: column.into(),
            op: Operator::Eq,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    /// Whether `column` should be computed for this query.
    pub fn is_requested(&self, column: &str) -> bool {
        self.columns.is_empty() || self.columns.contains(column)
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn quals(&self) -> &Qualifiers {
        &self.quals
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// The equality qualifier on a key column the table cannot scan without.
    pub fn require_eq(&self, table: &'static str, column: &'static str) -> Result<&str, TableError> {
        self.quals
            .equals(column)
            .ok_or(TableError::MissingQualifier { table, column })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualifiers() {
        let q: Qual = "repository_full_name=rust-lang/rust".parse().unwrap();
        assert_eq!(q.column, "repository_full_name");
        assert_eq!(q.op, Operator::Eq);
        assert_eq!(q.value, "rust-lang/rust");

        let q: Qual = "number>=10".parse().unwrap();
        assert_eq!(q.op, Operator::Ge);
        assert_eq!(q.value, "10");

        let q: Qual = "created_at < 2024-01-01".parse().unwrap();
        assert_eq!(q.column, "created_at");
        assert_eq!(q.op, Operator::Lt);
        assert_eq!(q.value, "2024-01-01");
    }

    #[test]
    fn test_value_may_contain_operator_characters() {
        let q: Qual = "query=stars:>100 language:rust".parse().unwrap();
        assert_eq!(q.column, "query");
        assert_eq!(q.op, Operator::Eq);
        assert_eq!(q.value, "stars:>100 language:rust");
    }

    #[test]
    fn test_parse_qualifier_errors() {
        assert!("no-operator".parse::<Qual>().is_err());
        assert!("=value".parse::<Qual>().is_err());
    }

    #[test]
    fn test_is_requested_treats_empty_as_all() {
        let ctx = QueryContext::new();
        assert!(ctx.is_requested("anything"));

        let ctx = QueryContext::new().with_columns(["name"]);
        assert!(ctx.is_requested("name"));
        assert!(!ctx.is_requested("your_permission"));
    }

    #[test]
    fn test_require_eq() {
        let ctx = QueryContext::new()
            .with_eq("organization", "turbot")
            .with_qual("number>3".parse().unwrap());

        assert_eq!(ctx.require_eq("t", "organization").unwrap(), "turbot");
        assert!(matches!(
            ctx.require_eq("t", "number"),
            Err(TableError::MissingQualifier { column: "number", .. })
        ));
        assert_eq!(ctx.quals().iter().filter(|q| q.column == "number").count(), 1);
    }

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let ctx = QueryContext::new().with_cancel(flag.clone());
        assert!(!ctx.cancel_flag().is_cancelled());
        flag.cancel();
        assert!(ctx.cancel_flag().is_cancelled());
    }
}
