//! Order-by parsing and run sorting

use std::cmp::Ordering;

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use super::field::{Attribute, FieldValue, RunField, RunRow};
use crate::{Error, Result};

/// One ordering clause: a field and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    field: RunField,
    descending: bool,
}

impl OrderKey {
    /// Ascending order on `field`.
    #[must_use]
    pub const fn asc(field: RunField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    /// Descending order on `field`.
    #[must_use]
    pub const fn desc(field: RunField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    /// Parse `entity.key [ASC|DESC]`. Bare attribute names are accepted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` on unparseable input or unknown fields.
    pub fn parse(clause: &str) -> Result<Self> {
        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(clause)
            .map_err(|e| Error::InvalidFilter(format!("order_by `{clause}`: {e}")))?;
        let order = parser
            .parse_order_by_expr()
            .map_err(|e| Error::InvalidFilter(format!("order_by `{clause}`: {e}")))?;
        if parser.peek_token().token != Token::EOF {
            return Err(Error::InvalidFilter(format!(
                "order_by `{clause}`: expected `entity.key [ASC|DESC]`"
            )));
        }

        let field = RunField::from_expr(&order.expr, true)?;
        Ok(Self {
            field,
            descending: !order.asc.unwrap_or(true),
        })
    }

    /// Parse a list of clauses, appending the default tie-breakers
    /// (`start_time DESC`, `run_id ASC`).
    ///
    /// # Errors
    ///
    /// Returns the first clause that fails to parse.
    pub fn parse_all<S: AsRef<str>>(clauses: &[S]) -> Result<Vec<Self>> {
        let mut keys = clauses
            .iter()
            .map(|clause| Self::parse(clause.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        keys.extend(Self::default_order());
        Ok(keys)
    }

    /// Ordering used when the caller leaves it unspecified.
    #[must_use]
    pub fn default_order() -> Vec<Self> {
        vec![
            Self::desc(RunField::Attribute(Attribute::StartTime)),
            Self::asc(RunField::Attribute(Attribute::RunId)),
        ]
    }

    /// Field sorted on.
    #[must_use]
    pub const fn field(&self) -> &RunField {
        &self.field
    }

    /// Whether larger values come first.
    #[must_use]
    pub const fn is_descending(&self) -> bool {
        self.descending
    }

    fn compare(&self, a: &RunRow<'_>, b: &RunRow<'_>) -> Ordering {
        match (self.field.value(a), self.field.value(b)) {
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y);
                if self.descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            // Missing values sort last in both directions
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

fn compare_values(a: FieldValue<'_>, b: FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => x.total_cmp(&y),
        (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
        (FieldValue::Number(_), FieldValue::Text(_)) => Ordering::Less,
        (FieldValue::Text(_), FieldValue::Number(_)) => Ordering::Greater,
    }
}

/// Stable sort of `rows` by `keys`, first key most significant.
pub fn sort_rows(rows: &mut [RunRow<'_>], keys: &[OrderKey]) {
    rows.sort_by(|a, b| {
        keys.iter()
            .map(|key| key.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_direction() {
        let key = OrderKey::parse("metrics.rmse DESC").unwrap();
        assert_eq!(key.field(), &RunField::Metric("rmse".into()));
        assert!(key.is_descending());

        let key = OrderKey::parse("params.model").unwrap();
        assert!(!key.is_descending());
    }

    #[test]
    fn test_parse_bare_attribute() {
        let key = OrderKey::parse("start_time ASC").unwrap();
        assert_eq!(key.field(), &RunField::Attribute(Attribute::StartTime));
    }

    #[test]
    fn test_parse_quoted_key() {
        let key = OrderKey::parse("metrics.`val loss` desc").unwrap();
        assert_eq!(key.field(), &RunField::Metric("val loss".into()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(OrderKey::parse("metrics.rmse DESC extra").is_err());
        assert!(OrderKey::parse("bogus").is_err());
        assert!(OrderKey::parse("").is_err());
    }

    #[test]
    fn test_parse_all_appends_tie_breakers() {
        let keys = OrderKey::parse_all(&["metrics.ic DESC"]).unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[1], OrderKey::desc(RunField::Attribute(Attribute::StartTime)));
    }
}
