//! Construction keywords (`min`, `max`, `options`, `many`).
//!
//! Keywords are kept as raw JSON until a variant asks for them, so that a
//! present-but-malformed keyword is reported as
//! [`MevError::InvalidAttributeKeyword`] rather than being confused with a
//! missing one.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mev_types::{MevError, Result};

use crate::kind::AttributeType;
use crate::rules::Bounds;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub many: Option<Value>,
}

impl AttributeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
            ..Self::default()
        }
    }

    pub fn with_options<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: Some(Value::Array(
                options.into_iter().map(|s| Value::String(s.into())).collect(),
            )),
            ..Self::default()
        }
    }

    pub fn with_many(mut self, many: bool) -> Self {
        self.many = Some(Value::Bool(many));
        self
    }

    /// Names of the keywords that are set.
    pub fn present(&self) -> Vec<&'static str> {
        [
            ("min", self.min.is_some()),
            ("max", self.max.is_some()),
            ("options", self.options.is_some()),
            ("many", self.many.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }

    pub(crate) fn integer_bounds(&self, ty: AttributeType) -> Result<Bounds<i64>> {
        let min = integer_keyword(ty, "min", self.min.as_ref())?;
        let max = integer_keyword(ty, "max", self.max.as_ref())?;
        ordered(ty, min, max)
    }

    pub(crate) fn float_bounds(&self, ty: AttributeType) -> Result<Bounds<f64>> {
        let min = float_keyword(ty, "min", self.min.as_ref())?;
        let max = float_keyword(ty, "max", self.max.as_ref())?;
        ordered(ty, min, max)
    }

    pub(crate) fn option_list(&self, ty: AttributeType) -> Result<Vec<String>> {
        let raw = required(ty, "options", self.options.as_ref())?;
        let items = raw
            .as_array()
            .ok_or_else(|| invalid(ty, "options", "expected a list of strings"))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(String::from)
                    .ok_or_else(|| invalid(ty, "options", format!("{item} is not a string")))
            })
            .collect()
    }

    pub(crate) fn many_flag(&self, ty: AttributeType) -> Result<Option<bool>> {
        match &self.many {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(invalid(ty, "many", format!("{other} is not a boolean"))),
        }
    }
}

fn required<'a>(ty: AttributeType, keyword: &str, raw: Option<&'a Value>) -> Result<&'a Value> {
    match raw {
        None | Some(Value::Null) => Err(MevError::MissingAttributeKeyword {
            typename: ty.to_string(),
            keyword: keyword.to_string(),
        }),
        Some(v) => Ok(v),
    }
}

fn invalid(ty: AttributeType, keyword: &str, message: impl Into<String>) -> MevError {
    MevError::InvalidAttributeKeyword {
        typename: ty.to_string(),
        keyword: keyword.to_string(),
        message: message.into(),
    }
}

fn integer_keyword(ty: AttributeType, keyword: &str, raw: Option<&Value>) -> Result<i64> {
    let raw = required(ty, keyword, raw)?;
    raw.as_i64()
        .ok_or_else(|| invalid(ty, keyword, format!("{raw} is not an integer")))
}

fn float_keyword(ty: AttributeType, keyword: &str, raw: Option<&Value>) -> Result<f64> {
    let raw = required(ty, keyword, raw)?;
    raw.as_f64()
        .ok_or_else(|| invalid(ty, keyword, format!("{raw} is not a number")))
}

fn ordered<T: PartialOrd + std::fmt::Display>(
    ty: AttributeType,
    min: T,
    max: T,
) -> Result<Bounds<T>> {
    if min > max {
        return Err(invalid(
            ty,
            "min",
            format!("min ({min}) must not exceed max ({max})"),
        ));
    }
    Ok(Bounds { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_min_names_the_keyword() {
        let opts = AttributeOptions {
            max: Some(json!(3)),
            ..Default::default()
        };
        let err = opts.float_bounds(AttributeType::BoundedFloatList).unwrap_err();
        match err {
            MevError::MissingAttributeKeyword { keyword, typename } => {
                assert_eq!(keyword, "min");
                assert_eq!(typename, "BoundedFloatList");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_bound_is_invalid_keyword() {
        let opts = AttributeOptions::bounded("zero", 3);
        let err = opts.integer_bounds(AttributeType::BoundedInteger).unwrap_err();
        assert!(
            matches!(err, MevError::InvalidAttributeKeyword { ref keyword, .. } if keyword == "min")
        );
    }

    #[test]
    fn float_bound_is_not_an_integer_bound() {
        let opts = AttributeOptions::bounded(0.5, 3);
        assert!(opts.integer_bounds(AttributeType::BoundedInteger).is_err());
        assert!(opts.float_bounds(AttributeType::BoundedFloat).is_ok());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let opts = AttributeOptions::bounded(5, 1);
        assert!(matches!(
            opts.integer_bounds(AttributeType::BoundedInteger),
            Err(MevError::InvalidAttributeKeyword { .. })
        ));
    }

    #[test]
    fn option_list_requires_strings() {
        let opts = AttributeOptions {
            options: Some(json!(["a", 1])),
            ..Default::default()
        };
        assert!(matches!(
            opts.option_list(AttributeType::OptionString),
            Err(MevError::InvalidAttributeKeyword { .. })
        ));
        let opts = AttributeOptions::with_options(["a", "b"]);
        assert_eq!(
            opts.option_list(AttributeType::OptionString).unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn many_must_be_boolean() {
        let opts = AttributeOptions {
            many: Some(json!("yes")),
            ..Default::default()
        };
        assert!(opts.many_flag(AttributeType::DataResource).is_err());
        assert_eq!(
            AttributeOptions::new()
                .with_many(true)
                .many_flag(AttributeType::DataResource)
                .unwrap(),
            Some(true)
        );
    }

    #[test]
    fn deserializes_from_flat_keywords() {
        let opts: AttributeOptions = serde_json::from_value(json!({"min": 0, "max": 1.5})).unwrap();
        assert_eq!(opts.present(), vec!["min", "max"]);
        assert!(AttributeOptions::new().is_empty());
    }
}
