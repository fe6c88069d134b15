//! Filter-string parsing and evaluation
//!
//! The filter string is parsed as a SQL expression with `sqlparser`'s
//! generic dialect, then flattened into a conjunction of clauses. Only the
//! subset below is accepted:
//!
//! - `AND` between clauses (parentheses allowed, `OR` rejected)
//! - metrics / time attributes: `= != < <= > >=` against numbers
//! - params / tags / text attributes: `= != LIKE ILIKE NOT LIKE NOT ILIKE`
//!   against quoted strings

use std::fmt;

use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use super::field::{FieldValue, RunField, RunRow};
use crate::{Error, Result};

/// Comparison operator of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `=`
    Eq,
    /// `!=` / `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `LIKE` (case-sensitive, `%` and `_` wildcards)
    Like,
    /// `ILIKE` (case-insensitive)
    ILike,
    /// `NOT LIKE`
    NotLike,
    /// `NOT ILIKE`
    NotILike,
}

impl Comparator {
    const fn from_binary(op: &BinaryOperator) -> Option<Self> {
        match op {
            BinaryOperator::Eq => Some(Self::Eq),
            BinaryOperator::NotEq => Some(Self::NotEq),
            BinaryOperator::Lt => Some(Self::Lt),
            BinaryOperator::LtEq => Some(Self::LtEq),
            BinaryOperator::Gt => Some(Self::Gt),
            BinaryOperator::GtEq => Some(Self::GtEq),
            _ => None,
        }
    }

    const fn is_pattern(self) -> bool {
        matches!(self, Self::Like | Self::ILike | Self::NotLike | Self::NotILike)
    }

    const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::NotLike => "NOT LIKE",
            Self::NotILike => "NOT ILIKE",
        }
    }
}

/// Right-hand side of a clause.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Numeric literal.
    Number(f64),
    /// Quoted string literal.
    Text(String),
}

/// One `entity.key op value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    field: RunField,
    comparator: Comparator,
    value: FilterValue,
}

impl Clause {
    /// Build a clause, checking that operator and value fit the field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` on a type or operator mismatch.
    pub fn new(field: RunField, comparator: Comparator, value: FilterValue) -> Result<Self> {
        let numeric = field.is_numeric();
        match (&value, numeric) {
            (FilterValue::Number(_), false) => {
                return Err(Error::InvalidFilter(format!(
                    "`{field}` compares against quoted strings, got a number"
                )));
            }
            (FilterValue::Text(_), true) => {
                return Err(Error::InvalidFilter(format!(
                    "`{field}` compares against numbers, got a string"
                )));
            }
            _ => {}
        }
        if numeric && comparator.is_pattern() {
            return Err(Error::InvalidFilter(format!(
                "`{}` is not supported for numeric field `{field}`",
                comparator.symbol()
            )));
        }
        if !numeric && comparator.is_ordering() {
            return Err(Error::InvalidFilter(format!(
                "`{}` is not supported for string field `{field}`",
                comparator.symbol()
            )));
        }
        Ok(Self {
            field,
            comparator,
            value,
        })
    }

    /// Field the clause reads.
    #[must_use]
    pub const fn field(&self) -> &RunField {
        &self.field
    }

    /// Comparison operator.
    #[must_use]
    pub const fn comparator(&self) -> Comparator {
        self.comparator
    }

    /// Literal compared against.
    #[must_use]
    pub const fn value(&self) -> &FilterValue {
        &self.value
    }

    /// Evaluate against a run. Runs lacking the field never match.
    #[must_use]
    pub fn matches(&self, row: &RunRow<'_>) -> bool {
        match (self.field.value(row), &self.value) {
            (Some(FieldValue::Number(lhs)), FilterValue::Number(rhs)) => {
                compare_numbers(lhs, self.comparator, *rhs)
            }
            (Some(FieldValue::Text(lhs)), FilterValue::Text(rhs)) => {
                compare_text(lhs, self.comparator, rhs)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            FilterValue::Number(n) => write!(f, "{} {} {n}", self.field, self.comparator.symbol()),
            FilterValue::Text(s) => write!(f, "{} {} '{s}'", self.field, self.comparator.symbol()),
        }
    }
}

#[allow(clippy::float_cmp)]
fn compare_numbers(lhs: f64, comparator: Comparator, rhs: f64) -> bool {
    match comparator {
        Comparator::Eq => lhs == rhs,
        Comparator::NotEq => lhs != rhs,
        Comparator::Lt => lhs < rhs,
        Comparator::LtEq => lhs <= rhs,
        Comparator::Gt => lhs > rhs,
        Comparator::GtEq => lhs >= rhs,
        _ => false,
    }
}

fn compare_text(lhs: &str, comparator: Comparator, rhs: &str) -> bool {
    match comparator {
        Comparator::Eq => lhs == rhs,
        Comparator::NotEq => lhs != rhs,
        Comparator::Like => like_match(lhs, rhs, false),
        Comparator::ILike => like_match(lhs, rhs, true),
        Comparator::NotLike => !like_match(lhs, rhs, false),
        Comparator::NotILike => !like_match(lhs, rhs, true),
        _ => false,
    }
}

/// SQL `LIKE` matching: `%` is any run of characters, `_` exactly one.
fn like_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let fold = |s: &str| -> Vec<char> {
        if case_insensitive {
            s.to_lowercase().chars().collect()
        } else {
            s.chars().collect()
        }
    };
    let text = fold(text);
    let pattern = fold(pattern);

    // Greedy matcher with single backtrack point on the last `%`
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

/// Parsed filter: a conjunction of clauses. Empty matches every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Filter that matches every run.
    #[must_use]
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Parse a filter string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` if the string is not valid SQL expression
    /// syntax or uses anything outside the supported subset.
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_track::search::Filter;
    ///
    /// let filter = Filter::parse("metrics.rmse < 0.2 and tags.stage = 'prod'").unwrap();
    /// assert_eq!(filter.clauses().len(), 2);
    /// assert!(Filter::parse("metrics.rmse < 0.2 OR metrics.mae < 0.1").is_err());
    /// ```
    pub fn parse(filter_string: &str) -> Result<Self> {
        if filter_string.trim().is_empty() {
            return Ok(Self::match_all());
        }

        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(filter_string)
            .map_err(|e| Error::InvalidFilter(format!("{e}")))?;
        let expr = parser
            .parse_expr()
            .map_err(|e| Error::InvalidFilter(format!("{e}")))?;
        let trailing = parser.peek_token();
        if trailing.token != Token::EOF {
            return Err(Error::InvalidFilter(format!(
                "unexpected `{}` after expression",
                trailing.token
            )));
        }

        let mut clauses = Vec::new();
        Self::collect(&expr, &mut clauses)?;
        Ok(Self { clauses })
    }

    fn collect(expr: &Expr, clauses: &mut Vec<Clause>) -> Result<()> {
        match expr {
            Expr::Nested(inner) => Self::collect(inner, clauses),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                Self::collect(left, clauses)?;
                Self::collect(right, clauses)
            }
            Expr::BinaryOp {
                op: BinaryOperator::Or,
                ..
            } => Err(Error::InvalidFilter(
                "OR is not supported; combine clauses with AND".to_string(),
            )),
            Expr::BinaryOp { left, op, right } => {
                let comparator = Comparator::from_binary(op).ok_or_else(|| {
                    Error::InvalidFilter(format!("unsupported operator `{op}`"))
                })?;
                let field = RunField::from_expr(left, false)?;
                clauses.push(Clause::new(field, comparator, literal(right)?)?);
                Ok(())
            }
            Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => {
                let comparator = if *negated {
                    Comparator::NotLike
                } else {
                    Comparator::Like
                };
                let field = RunField::from_expr(expr, false)?;
                clauses.push(Clause::new(field, comparator, literal(pattern)?)?);
                Ok(())
            }
            Expr::ILike {
                negated,
                expr,
                pattern,
                ..
            } => {
                let comparator = if *negated {
                    Comparator::NotILike
                } else {
                    Comparator::ILike
                };
                let field = RunField::from_expr(expr, false)?;
                clauses.push(Clause::new(field, comparator, literal(pattern)?)?);
                Ok(())
            }
            other => Err(Error::InvalidFilter(format!(
                "unsupported expression `{other}`"
            ))),
        }
    }

    /// Parsed clauses, in source order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether the filter matches every run.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate against a run.
    #[must_use]
    pub fn matches(&self, row: &RunRow<'_>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(row))
    }
}

fn literal(expr: &Expr) -> Result<FilterValue> {
    match expr {
        Expr::Value(Value::Number(n, _)) => n
            .parse::<f64>()
            .map(FilterValue::Number)
            .map_err(|e| Error::InvalidFilter(format!("bad number `{n}`: {e}"))),
        Expr::Value(Value::SingleQuotedString(s) | Value::DoubleQuotedString(s)) => {
            Ok(FilterValue::Text(s.clone()))
        }
        // The generic dialect reads "abc" as a quoted identifier
        Expr::Identifier(ident) if ident.quote_style == Some('"') => {
            Ok(FilterValue::Text(ident.value.clone()))
        }
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            FilterValue::Number(n) => Ok(FilterValue::Number(-n)),
            FilterValue::Text(_) => Err(Error::InvalidFilter(format!(
                "cannot negate string literal `{expr}`"
            ))),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr,
        } => match literal(expr)? {
            number @ FilterValue::Number(_) => Ok(number),
            FilterValue::Text(_) => Err(Error::InvalidFilter(format!(
                "unexpected `+` before string literal `{expr}`"
            ))),
        },
        other => Err(Error::InvalidFilter(format!(
            "expected a number or quoted string, got `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_match_wildcards() {
        assert!(like_match("lgbm_v2", "lgbm%", false));
        assert!(like_match("lgbm_v2", "%v_", false));
        assert!(like_match("abc", "%", false));
        assert!(like_match("", "%", false));
        assert!(!like_match("abc", "ab", false));
        assert!(like_match("aXbXc", "a%b%c", false));
        assert!(!like_match("LGBM", "lgbm", false));
        assert!(like_match("LGBM", "lgbm", true));
    }

    #[test]
    fn test_parse_empty_is_match_all() {
        assert!(Filter::parse("").unwrap().is_match_all());
        assert!(Filter::parse("   ").unwrap().is_match_all());
    }

    #[test]
    fn test_parse_nested_and() {
        let filter =
            Filter::parse("(metrics.a > 1 AND metrics.b < 2) AND params.c = 'x'").unwrap();
        assert_eq!(filter.clauses().len(), 3);
        assert_eq!(filter.clauses()[2].field(), &RunField::Param("c".into()));
    }

    #[test]
    fn test_parse_negative_number() {
        let filter = Filter::parse("metrics.ic >= -0.5").unwrap();
        assert_eq!(filter.clauses()[0].value(), &FilterValue::Number(-0.5));
    }

    #[test]
    fn test_rejects_trailing_tokens() {
        assert!(Filter::parse("metrics.a > 1 metrics.b").is_err());
    }

    #[test]
    fn test_clause_display() {
        let filter = Filter::parse("params.model LIKE 'lgbm%'").unwrap();
        assert_eq!(filter.clauses()[0].to_string(), "params.model LIKE 'lgbm%'");
    }
}
