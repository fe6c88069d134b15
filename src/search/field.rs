//! Addressable run fields shared by filtering, ordering and result columns

use std::collections::BTreeMap;
use std::fmt;

use sqlparser::ast::Expr;

use crate::experiment::{Metric, Recorder};
use crate::{Error, Result};

/// Borrowed view of one run as seen by the search pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RunRow<'a> {
    /// Run handle (id, status, times).
    pub recorder: &'a Recorder,
    /// Latest value per metric key.
    pub metrics: &'a BTreeMap<String, Metric>,
    /// Run parameters.
    pub params: &'a BTreeMap<String, String>,
    /// Run tags.
    pub tags: &'a BTreeMap<String, String>,
}

/// Built-in run attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// `run_id` (text)
    RunId,
    /// `status` (text)
    Status,
    /// `start_time` (epoch milliseconds)
    StartTime,
    /// `end_time` (epoch milliseconds)
    EndTime,
}

impl Attribute {
    fn from_key(key: &str) -> Result<Self> {
        match key {
            "run_id" | "run_uuid" => Ok(Self::RunId),
            "status" => Ok(Self::Status),
            "start_time" => Ok(Self::StartTime),
            "end_time" => Ok(Self::EndTime),
            other => Err(Error::InvalidFilter(format!(
                "unknown attribute `{other}` (expected run_id, status, start_time or end_time)"
            ))),
        }
    }

    /// Column name of the attribute.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RunId => "run_id",
            Self::Status => "status",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
        }
    }

    /// Whether values compare numerically.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::StartTime | Self::EndTime)
    }
}

/// A field of a run that filters and orderings can reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RunField {
    /// `metrics.<key>`
    Metric(String),
    /// `params.<key>`
    Param(String),
    /// `tags.<key>`
    Tag(String),
    /// `attributes.<name>`
    Attribute(Attribute),
}

/// Value of a [`RunField`] on a particular run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Metrics and time attributes.
    Number(f64),
    /// Params, tags and text attributes.
    Text(&'a str),
}

impl RunField {
    /// Resolve `entity.key` into a field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFilter` for unknown entities or attributes.
    pub fn new(entity: &str, key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::InvalidFilter(format!("missing key after `{entity}.`")));
        }
        match entity.to_ascii_lowercase().as_str() {
            "metrics" | "metric" => Ok(Self::Metric(key.to_string())),
            "params" | "param" | "parameter" | "parameters" => Ok(Self::Param(key.to_string())),
            "tags" | "tag" => Ok(Self::Tag(key.to_string())),
            "attributes" | "attribute" | "attr" | "run" => {
                Attribute::from_key(key).map(Self::Attribute)
            }
            other => Err(Error::InvalidFilter(format!(
                "unknown entity `{other}` (expected metrics, params, tags or attributes)"
            ))),
        }
    }

    /// Resolve a parsed identifier expression.
    ///
    /// With `bare_attributes`, an unqualified identifier such as `start_time`
    /// is read as an attribute.
    pub(crate) fn from_expr(expr: &Expr, bare_attributes: bool) -> Result<Self> {
        match expr {
            Expr::CompoundIdentifier(parts) => match parts.split_first() {
                Some((entity, rest)) if !rest.is_empty() => {
                    let key = rest
                        .iter()
                        .map(|ident| ident.value.as_str())
                        .collect::<Vec<_>>()
                        .join(".");
                    Self::new(&entity.value, &key)
                }
                _ => Err(Error::InvalidFilter(format!("expected entity.key, got `{expr}`"))),
            },
            Expr::Identifier(ident) if bare_attributes => {
                Attribute::from_key(&ident.value).map(Self::Attribute)
            }
            other => Err(Error::InvalidFilter(format!(
                "expected entity.key identifier, got `{other}`"
            ))),
        }
    }

    /// Whether values of this field compare numerically.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        match self {
            Self::Metric(_) => true,
            Self::Param(_) | Self::Tag(_) => false,
            Self::Attribute(attr) => attr.is_numeric(),
        }
    }

    /// Read the field from a run. `None` when the run lacks it.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value<'a>(&self, row: &RunRow<'a>) -> Option<FieldValue<'a>> {
        match self {
            Self::Metric(key) => row.metrics.get(key).map(|m| FieldValue::Number(m.value())),
            Self::Param(key) => row.params.get(key).map(|v| FieldValue::Text(v.as_str())),
            Self::Tag(key) => row.tags.get(key).map(|v| FieldValue::Text(v.as_str())),
            Self::Attribute(Attribute::RunId) => Some(FieldValue::Text(row.recorder.recorder_id())),
            Self::Attribute(Attribute::Status) => {
                Some(FieldValue::Text(row.recorder.status().as_str()))
            }
            Self::Attribute(Attribute::StartTime) => row
                .recorder
                .start_time()
                .map(|t| FieldValue::Number(t.timestamp_millis() as f64)),
            Self::Attribute(Attribute::EndTime) => row
                .recorder
                .end_time()
                .map(|t| FieldValue::Number(t.timestamp_millis() as f64)),
        }
    }
}

impl fmt::Display for RunField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric(key) => write!(f, "metrics.{key}"),
            Self::Param(key) => write!(f, "params.{key}"),
            Self::Tag(key) => write!(f, "tags.{key}"),
            Self::Attribute(attr) => write!(f, "attributes.{}", attr.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_aliases() {
        assert_eq!(RunField::new("metric", "ic").unwrap(), RunField::Metric("ic".into()));
        assert_eq!(RunField::new("PARAMS", "lr").unwrap(), RunField::Param("lr".into()));
        assert_eq!(
            RunField::new("attr", "status").unwrap(),
            RunField::Attribute(Attribute::Status)
        );
        assert!(RunField::new("artifacts", "x").is_err());
        assert!(RunField::new("metrics", "").is_err());
    }

    #[test]
    fn test_field_numeric_kinds() {
        assert!(RunField::Metric("a".into()).is_numeric());
        assert!(!RunField::Tag("a".into()).is_numeric());
        assert!(RunField::Attribute(Attribute::EndTime).is_numeric());
        assert!(!RunField::Attribute(Attribute::RunId).is_numeric());
    }

    #[test]
    fn test_field_display() {
        assert_eq!(RunField::Metric("val loss".into()).to_string(), "metrics.val loss");
        assert_eq!(
            RunField::Attribute(Attribute::StartTime).to_string(),
            "attributes.start_time"
        );
    }
}
