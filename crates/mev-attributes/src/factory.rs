//! Resolution of `{type-tag, value, keywords}` into a concrete [`Attribute`].
//!
//! This is the only place that maps a type tag to a variant. Keywords are
//! checked before the value, so a missing `min` is reported even when the
//! value is an allowed null.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mev_types::{MevError, Result};

use crate::attribute::{Attribute, ResourceRef, ResourceValue};
use crate::element::{Feature, FeatureSet, Observation, ObservationSet};
use crate::kind::AttributeType;
use crate::options::AttributeOptions;
use crate::rules::{
    BooleanRule, FloatRule, IntegerRule, ListOf, NumericConstraint, OptionStringRule, StringRule,
    UnrestrictedStringRule, Validatable,
};

/// Inline attribute as it appears inside element `attributes` maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributePayload {
    pub attribute_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub allow_null: bool,
    #[serde(flatten)]
    pub options: AttributeOptions,
}

/// Resolves a typename string and builds the attribute.
pub fn resolve(
    typename: &str,
    raw: &Value,
    options: &AttributeOptions,
    allow_null: bool,
) -> Result<Attribute> {
    let ty: AttributeType = typename.parse()?;
    build(ty, raw, options, allow_null)
}

/// Builds an attribute from an inline payload object.
pub fn from_payload(raw: &Value) -> Result<Attribute> {
    if !raw.is_object() {
        return Err(MevError::DataStructureValidation(format!(
            "attribute must be an object with 'attribute_type' and 'value', got {raw}"
        )));
    }
    let payload: AttributePayload = serde_json::from_value(raw.clone())
        .map_err(|e| MevError::DataStructureValidation(format!("malformed attribute: {e}")))?;
    resolve(
        &payload.attribute_type,
        &payload.value,
        &payload.options,
        payload.allow_null,
    )
}

fn nullable<T>(
    ty: AttributeType,
    raw: &Value,
    allow_null: bool,
    validate: impl FnOnce(&Value) -> Result<T>,
) -> Result<Option<T>> {
    if raw.is_null() {
        if allow_null {
            Ok(None)
        } else {
            Err(MevError::NullAttribute {
                typename: ty.to_string(),
            })
        }
    } else {
        validate(raw).map(Some)
    }
}

fn checked<R: Validatable>(
    ty: AttributeType,
    rule: R,
    raw: &Value,
    allow_null: bool,
) -> Result<Option<R::Output>> {
    nullable(ty, raw, allow_null, |v| rule.validate(v))
}

fn resource(
    ty: AttributeType,
    raw: &Value,
    options: &AttributeOptions,
    allow_null: bool,
) -> Result<ResourceValue> {
    let many = options.many_flag(ty)?;
    let value = nullable(ty, raw, allow_null, |v| {
        let reference = match v {
            Value::String(s) => ResourceRef::Single(s.clone()),
            Value::Array(_) => ResourceRef::Many(ListOf(UnrestrictedStringRule).validate(v)?),
            other => {
                return Err(MevError::value(format!(
                    "{ty} expects a resource identifier or a list of them, got {other}"
                )))
            }
        };
        match (many, &reference) {
            (Some(false), ResourceRef::Many(_)) => Err(MevError::value(format!(
                "{ty} was declared with many=false but received a list"
            ))),
            (Some(true), ResourceRef::Single(_)) => Err(MevError::value(format!(
                "{ty} was declared with many=true but received a single identifier"
            ))),
            _ => Ok(reference),
        }
    })?;
    Ok(ResourceValue { many, value })
}

/// Builds the attribute for an already-resolved type.
pub fn build(
    ty: AttributeType,
    raw: &Value,
    options: &AttributeOptions,
    allow_null: bool,
) -> Result<Attribute> {
    use NumericConstraint::*;

    let attribute = match ty {
        AttributeType::Integer => {
            Attribute::Integer(checked(ty, IntegerRule(Unrestricted), raw, allow_null)?)
        }
        AttributeType::PositiveInteger => {
            Attribute::PositiveInteger(checked(ty, IntegerRule(Positive), raw, allow_null)?)
        }
        AttributeType::NonnegativeInteger => {
            Attribute::NonnegativeInteger(checked(ty, IntegerRule(Nonnegative), raw, allow_null)?)
        }
        AttributeType::BoundedInteger => {
            let bounds = options.integer_bounds(ty)?;
            Attribute::BoundedInteger {
                bounds,
                value: checked(ty, IntegerRule(Bounded(bounds)), raw, allow_null)?,
            }
        }
        AttributeType::Float => {
            Attribute::Float(checked(ty, FloatRule(Unrestricted), raw, allow_null)?)
        }
        AttributeType::PositiveFloat => {
            Attribute::PositiveFloat(checked(ty, FloatRule(Positive), raw, allow_null)?)
        }
        AttributeType::NonnegativeFloat => {
            Attribute::NonnegativeFloat(checked(ty, FloatRule(Nonnegative), raw, allow_null)?)
        }
        AttributeType::BoundedFloat => {
            let bounds = options.float_bounds(ty)?;
            Attribute::BoundedFloat {
                bounds,
                value: checked(ty, FloatRule(Bounded(bounds)), raw, allow_null)?,
            }
        }
        AttributeType::String => Attribute::String(checked(ty, StringRule, raw, allow_null)?),
        AttributeType::UnrestrictedString => Attribute::UnrestrictedString(checked(
            ty,
            UnrestrictedStringRule,
            raw,
            allow_null,
        )?),
        AttributeType::OptionString => {
            let options = options.option_list(ty)?;
            let rule = OptionStringRule {
                options: options.clone(),
            };
            Attribute::OptionString {
                options,
                value: checked(ty, rule, raw, allow_null)?,
            }
        }
        AttributeType::Boolean => Attribute::Boolean(checked(ty, BooleanRule, raw, allow_null)?),
        AttributeType::DataResource => {
            Attribute::DataResource(resource(ty, raw, options, allow_null)?)
        }
        AttributeType::OperationDataResource => {
            Attribute::OperationDataResource(resource(ty, raw, options, allow_null)?)
        }
        AttributeType::VariableDataResource => {
            Attribute::VariableDataResource(resource(ty, raw, options, allow_null)?)
        }
        AttributeType::IntegerList => Attribute::IntegerList(checked(
            ty,
            ListOf(IntegerRule(Unrestricted)),
            raw,
            allow_null,
        )?),
        AttributeType::FloatList => Attribute::FloatList(checked(
            ty,
            ListOf(FloatRule(Unrestricted)),
            raw,
            allow_null,
        )?),
        AttributeType::BooleanList => {
            Attribute::BooleanList(checked(ty, ListOf(BooleanRule), raw, allow_null)?)
        }
        AttributeType::StringList => {
            Attribute::StringList(checked(ty, ListOf(StringRule), raw, allow_null)?)
        }
        AttributeType::UnrestrictedStringList => Attribute::UnrestrictedStringList(checked(
            ty,
            ListOf(UnrestrictedStringRule),
            raw,
            allow_null,
        )?),
        AttributeType::BoundedIntegerList => {
            let bounds = options.integer_bounds(ty)?;
            Attribute::BoundedIntegerList {
                bounds,
                value: checked(ty, ListOf(IntegerRule(Bounded(bounds))), raw, allow_null)?,
            }
        }
        AttributeType::BoundedFloatList => {
            let bounds = options.float_bounds(ty)?;
            Attribute::BoundedFloatList {
                bounds,
                value: checked(ty, ListOf(FloatRule(Bounded(bounds))), raw, allow_null)?,
            }
        }
        AttributeType::Observation => {
            Attribute::Observation(nullable(ty, raw, allow_null, Observation::from_json)?)
        }
        AttributeType::Feature => {
            Attribute::Feature(nullable(ty, raw, allow_null, Feature::from_json)?)
        }
        AttributeType::ObservationSet => {
            Attribute::ObservationSet(nullable(ty, raw, allow_null, ObservationSet::from_json)?)
        }
        AttributeType::FeatureSet => {
            Attribute::FeatureSet(nullable(ty, raw, allow_null, FeatureSet::from_json)?)
        }
    };

    tracing::debug!(attribute_type = %ty, null = attribute.is_null(), "Resolved attribute");
    Ok(attribute)
}
