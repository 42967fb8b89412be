//! Validation rules for scalar values and lists of scalars.
//!
//! A rule turns a non-null raw JSON value into a typed Rust value or rejects
//! it. Null handling lives one level up, in the factory, because every
//! variant treats null the same way.

use std::fmt;

use serde_json::Value;

use mev_types::{normalize, MevError, Result};

pub trait Validatable {
    type Output;

    fn validate(&self, raw: &Value) -> Result<Self::Output>;
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericConstraint<T> {
    Unrestricted,
    Positive,
    Nonnegative,
    Bounded(Bounds<T>),
}

impl<T> NumericConstraint<T>
where
    T: PartialOrd + Copy + Default + fmt::Display,
{
    fn check(&self, value: T) -> Result<T> {
        let zero = T::default();
        match self {
            NumericConstraint::Unrestricted => Ok(value),
            NumericConstraint::Positive if value > zero => Ok(value),
            NumericConstraint::Positive => Err(MevError::value(format!(
                "The value {value} is not a positive number"
            ))),
            NumericConstraint::Nonnegative if value >= zero => Ok(value),
            NumericConstraint::Nonnegative => Err(MevError::value(format!(
                "The value {value} is not a non-negative number"
            ))),
            NumericConstraint::Bounded(bounds) if bounds.contains(value) => Ok(value),
            NumericConstraint::Bounded(bounds) => Err(MevError::value(format!(
                "The value {value} is not within the bounds of [{}, {}]",
                bounds.min, bounds.max
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegerRule(pub NumericConstraint<i64>);

impl Validatable for IntegerRule {
    type Output = i64;

    fn validate(&self, raw: &Value) -> Result<i64> {
        self.0.check(parse_integer(raw)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRule(pub NumericConstraint<f64>);

impl Validatable for FloatRule {
    type Output = f64;

    fn validate(&self, raw: &Value) -> Result<f64> {
        self.0.check(parse_float(raw)?)
    }
}

/// Restricted string: must survive identifier normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringRule;

impl Validatable for StringRule {
    type Output = String;

    fn validate(&self, raw: &Value) -> Result<String> {
        let s = expect_str(raw)?;
        normalize(s).map_err(|e| match e {
            MevError::StringIdentifier { raw, reason } => {
                MevError::value(format!("The string '{raw}' is not valid: {reason}"))
            }
            other => other,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnrestrictedStringRule;

impl Validatable for UnrestrictedStringRule {
    type Output = String;

    fn validate(&self, raw: &Value) -> Result<String> {
        expect_str(raw).map(String::from)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionStringRule {
    pub options: Vec<String>,
}

impl Validatable for OptionStringRule {
    type Output = String;

    fn validate(&self, raw: &Value) -> Result<String> {
        let s = expect_str(raw)?;
        if self.options.iter().any(|o| o == s) {
            Ok(s.to_string())
        } else {
            Err(MevError::value(format!(
                "The value '{s}' is not among the valid options: {}",
                self.options.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BooleanRule;

impl Validatable for BooleanRule {
    type Output = bool;

    fn validate(&self, raw: &Value) -> Result<bool> {
        let parsed = match raw {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| MevError::value(format!("{raw} is not a valid boolean")))
    }
}

// ---------------------------------------------------------------------------
// ListOf
// ---------------------------------------------------------------------------

/// Applies the inner rule to every element of a JSON list. The first
/// failing element aborts the whole list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOf<R>(pub R);

impl<R: Validatable> Validatable for ListOf<R> {
    type Output = Vec<R::Output>;

    fn validate(&self, raw: &Value) -> Result<Vec<R::Output>> {
        let items = raw.as_array().ok_or_else(|| {
            MevError::DataStructureValidation(format!("expected a list of values, got {raw}"))
        })?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                if item.is_null() {
                    return Err(MevError::value(format!(
                        "Problem with element {index} of the list: null is not permitted"
                    )));
                }
                self.0.validate(item).map_err(|e| at_position(e, index))
            })
            .collect()
    }
}

fn at_position(err: MevError, index: usize) -> MevError {
    match err {
        MevError::AttributeValue { message } => {
            MevError::value(format!("Problem with element {index} of the list: {message}"))
        }
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn expect_str(raw: &Value) -> Result<&str> {
    raw.as_str()
        .ok_or_else(|| MevError::value(format!("{raw} is not a string")))
}

pub(crate) fn parse_integer(raw: &Value) -> Result<i64> {
    let parsed = match raw {
        // Integers too large for i64 are rejected, never saturated.
        Value::Number(n) if n.is_u64() && !n.is_i64() => None,
        Value::Number(n) => n.as_i64().or_else(|| {
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| MevError::value(format!("{raw} could not be interpreted as an integer")))
}

pub(crate) fn parse_float(raw: &Value) -> Result<f64> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| MevError::value(format!("{raw} could not be interpreted as a finite float")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_accepts_integral_forms() {
        let rule = IntegerRule(NumericConstraint::Unrestricted);
        assert_eq!(rule.validate(&json!(-4)).unwrap(), -4);
        assert_eq!(rule.validate(&json!(7.0)).unwrap(), 7);
        assert_eq!(rule.validate(&json!(" 12 ")).unwrap(), 12);
    }

    #[test]
    fn integer_rejects_fractional_and_non_numeric() {
        let rule = IntegerRule(NumericConstraint::Unrestricted);
        assert!(rule.validate(&json!(2.5)).is_err());
        assert!(rule.validate(&json!("abc")).is_err());
        assert!(rule.validate(&json!(true)).is_err());
    }

    #[test]
    fn integer_out_of_i64_range_is_rejected() {
        let rule = IntegerRule(NumericConstraint::Unrestricted);
        assert!(rule.validate(&json!(9_223_372_036_854_775_808u64)).is_err());
        assert!(rule.validate(&json!(u64::MAX)).is_err());
        assert!(rule.validate(&json!(9.223372036854776e18)).is_err());
        assert!(rule.validate(&json!(-1.0e19)).is_err());
        assert!(rule.validate(&json!("9223372036854775808")).is_err());
        assert_eq!(rule.validate(&json!(i64::MAX)).unwrap(), i64::MAX);
        assert_eq!(rule.validate(&json!(i64::MIN)).unwrap(), i64::MIN);
    }

    #[test]
    fn positive_excludes_zero_nonnegative_includes_it() {
        let pos = IntegerRule(NumericConstraint::Positive);
        let nonneg = IntegerRule(NumericConstraint::Nonnegative);
        assert!(pos.validate(&json!(0)).is_err());
        assert_eq!(nonneg.validate(&json!(0)).unwrap(), 0);
        assert!(nonneg.validate(&json!(-1)).is_err());

        let pos = FloatRule(NumericConstraint::Positive);
        assert!(pos.validate(&json!(0.0)).is_err());
        assert_eq!(pos.validate(&json!(1e-9)).unwrap(), 1e-9);
    }

    #[test]
    fn bounded_is_inclusive() {
        let rule = FloatRule(NumericConstraint::Bounded(Bounds { min: 0.0, max: 1.0 }));
        assert_eq!(rule.validate(&json!(0)).unwrap(), 0.0);
        assert_eq!(rule.validate(&json!(1.0)).unwrap(), 1.0);
        let err = rule.validate(&json!(1.01)).unwrap_err();
        assert!(err.to_string().contains("not within the bounds"));
    }

    #[test]
    fn float_rejects_non_finite_strings() {
        let rule = FloatRule(NumericConstraint::Unrestricted);
        assert!(rule.validate(&json!("inf")).is_err());
        assert!(rule.validate(&json!("NaN")).is_err());
        assert_eq!(rule.validate(&json!("2.5")).unwrap(), 2.5);
    }

    #[test]
    fn string_rule_normalizes() {
        assert_eq!(StringRule.validate(&json!("my sample")).unwrap(), "my_sample");
        let err = StringRule.validate(&json!("a?bc")).unwrap_err();
        assert!(matches!(err, MevError::AttributeValue { .. }));
    }

    #[test]
    fn unrestricted_string_keeps_everything() {
        assert_eq!(
            UnrestrictedStringRule.validate(&json!("a?b c 漢")).unwrap(),
            "a?b c 漢"
        );
        assert!(UnrestrictedStringRule.validate(&json!(3)).is_err());
    }

    #[test]
    fn option_string_membership() {
        let rule = OptionStringRule {
            options: vec!["up".into(), "down".into()],
        };
        assert_eq!(rule.validate(&json!("up")).unwrap(), "up");
        assert!(matches!(
            rule.validate(&json!("sideways")),
            Err(MevError::AttributeValue { .. })
        ));
    }

    #[test]
    fn boolean_like_values() {
        assert!(BooleanRule.validate(&json!(true)).unwrap());
        assert!(BooleanRule.validate(&json!(1)).unwrap());
        assert!(!BooleanRule.validate(&json!(0)).unwrap());
        assert!(!BooleanRule.validate(&json!("False")).unwrap());
        assert!(BooleanRule.validate(&json!(2)).is_err());
        assert!(BooleanRule.validate(&json!("maybe")).is_err());
    }

    #[test]
    fn list_requires_array_shape() {
        let rule = ListOf(StringRule);
        let err = rule.validate(&json!("abc")).unwrap_err();
        assert!(matches!(err, MevError::DataStructureValidation(_)));
    }

    #[test]
    fn list_wraps_first_failing_element() {
        let rule = ListOf(IntegerRule(NumericConstraint::Bounded(Bounds { min: 0, max: 5 })));
        let err = rule.validate(&json!([1, 2, 9, 10])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("element 2"), "{msg}");
        assert!(msg.contains("not within the bounds"), "{msg}");
    }

    #[test]
    fn list_rejects_null_elements() {
        let rule = ListOf(UnrestrictedStringRule);
        assert!(rule.validate(&json!(["a", null])).is_err());
        assert_eq!(rule.validate(&json!([])).unwrap(), Vec::<String>::new());
    }
}
