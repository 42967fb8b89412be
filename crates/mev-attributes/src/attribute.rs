//! The validated attribute tree.
//!
//! An [`Attribute`] is only ever produced by the factory (or by a caller that
//! already holds validated parts), so holding one means the value passed its
//! variant's rule. `None` payloads are explicit nulls that were allowed at
//! construction.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use mev_types::Result;

use crate::element::{Feature, FeatureSet, Observation, ObservationSet};
use crate::factory;
use crate::kind::AttributeType;
use crate::options::AttributeOptions;
use crate::rules::Bounds;

/// Reference to one or more external files/resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRef {
    Single(String),
    Many(Vec<String>),
}

impl ResourceRef {
    pub fn ids(&self) -> Vec<&str> {
        match self {
            ResourceRef::Single(id) => vec![id.as_str()],
            ResourceRef::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// Payload of the three data-resource variants.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceValue {
    pub many: Option<bool>,
    pub value: Option<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Integer(Option<i64>),
    PositiveInteger(Option<i64>),
    NonnegativeInteger(Option<i64>),
    BoundedInteger {
        bounds: Bounds<i64>,
        value: Option<i64>,
    },
    Float(Option<f64>),
    PositiveFloat(Option<f64>),
    NonnegativeFloat(Option<f64>),
    BoundedFloat {
        bounds: Bounds<f64>,
        value: Option<f64>,
    },
    String(Option<String>),
    UnrestrictedString(Option<String>),
    OptionString {
        options: Vec<String>,
        value: Option<String>,
    },
    Boolean(Option<bool>),
    DataResource(ResourceValue),
    OperationDataResource(ResourceValue),
    VariableDataResource(ResourceValue),
    IntegerList(Option<Vec<i64>>),
    FloatList(Option<Vec<f64>>),
    BooleanList(Option<Vec<bool>>),
    StringList(Option<Vec<String>>),
    UnrestrictedStringList(Option<Vec<String>>),
    BoundedIntegerList {
        bounds: Bounds<i64>,
        value: Option<Vec<i64>>,
    },
    BoundedFloatList {
        bounds: Bounds<f64>,
        value: Option<Vec<f64>>,
    },
    Observation(Option<Observation>),
    Feature(Option<Feature>),
    ObservationSet(Option<ObservationSet>),
    FeatureSet(Option<FeatureSet>),
}

impl From<ResourceRef> for Value {
    fn from(reference: ResourceRef) -> Self {
        match reference {
            ResourceRef::Single(id) => Value::String(id),
            ResourceRef::Many(ids) => Value::from(ids),
        }
    }
}

fn opt_json<T: Clone + Into<Value>>(value: &Option<T>) -> Value {
    value.clone().map_or(Value::Null, Into::into)
}

impl Attribute {
    pub fn typename(&self) -> AttributeType {
        match self {
            Attribute::Integer(_) => AttributeType::Integer,
            Attribute::PositiveInteger(_) => AttributeType::PositiveInteger,
            Attribute::NonnegativeInteger(_) => AttributeType::NonnegativeInteger,
            Attribute::BoundedInteger { .. } => AttributeType::BoundedInteger,
            Attribute::Float(_) => AttributeType::Float,
            Attribute::PositiveFloat(_) => AttributeType::PositiveFloat,
            Attribute::NonnegativeFloat(_) => AttributeType::NonnegativeFloat,
            Attribute::BoundedFloat { .. } => AttributeType::BoundedFloat,
            Attribute::String(_) => AttributeType::String,
            Attribute::UnrestrictedString(_) => AttributeType::UnrestrictedString,
            Attribute::OptionString { .. } => AttributeType::OptionString,
            Attribute::Boolean(_) => AttributeType::Boolean,
            Attribute::DataResource(_) => AttributeType::DataResource,
            Attribute::OperationDataResource(_) => AttributeType::OperationDataResource,
            Attribute::VariableDataResource(_) => AttributeType::VariableDataResource,
            Attribute::IntegerList(_) => AttributeType::IntegerList,
            Attribute::FloatList(_) => AttributeType::FloatList,
            Attribute::BooleanList(_) => AttributeType::BooleanList,
            Attribute::StringList(_) => AttributeType::StringList,
            Attribute::UnrestrictedStringList(_) => AttributeType::UnrestrictedStringList,
            Attribute::BoundedIntegerList { .. } => AttributeType::BoundedIntegerList,
            Attribute::BoundedFloatList { .. } => AttributeType::BoundedFloatList,
            Attribute::Observation(_) => AttributeType::Observation,
            Attribute::Feature(_) => AttributeType::Feature,
            Attribute::ObservationSet(_) => AttributeType::ObservationSet,
            Attribute::FeatureSet(_) => AttributeType::FeatureSet,
        }
    }

    /// The payload in its wire form; `null` for an allowed null.
    pub fn value_json(&self) -> Value {
        match self {
            Attribute::Integer(v)
            | Attribute::PositiveInteger(v)
            | Attribute::NonnegativeInteger(v)
            | Attribute::BoundedInteger { value: v, .. } => opt_json(v),
            Attribute::Float(v)
            | Attribute::PositiveFloat(v)
            | Attribute::NonnegativeFloat(v)
            | Attribute::BoundedFloat { value: v, .. } => opt_json(v),
            Attribute::String(v)
            | Attribute::UnrestrictedString(v)
            | Attribute::OptionString { value: v, .. } => opt_json(v),
            Attribute::Boolean(v) => opt_json(v),
            Attribute::DataResource(r)
            | Attribute::OperationDataResource(r)
            | Attribute::VariableDataResource(r) => opt_json(&r.value),
            Attribute::IntegerList(v) | Attribute::BoundedIntegerList { value: v, .. } => {
                opt_json(v)
            }
            Attribute::FloatList(v) | Attribute::BoundedFloatList { value: v, .. } => opt_json(v),
            Attribute::BooleanList(v) => opt_json(v),
            Attribute::StringList(v) | Attribute::UnrestrictedStringList(v) => opt_json(v),
            Attribute::Observation(v) => v.as_ref().map_or(Value::Null, Observation::to_json),
            Attribute::Feature(v) => v.as_ref().map_or(Value::Null, Feature::to_json),
            Attribute::ObservationSet(v) => v.as_ref().map_or(Value::Null, ObservationSet::to_json),
            Attribute::FeatureSet(v) => v.as_ref().map_or(Value::Null, FeatureSet::to_json),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value_json().is_null()
    }

    /// `{"attribute_type": <typename>, "value": <value or null>}`
    pub fn to_json(&self) -> Value {
        json!({
            "attribute_type": self.typename().as_str(),
            "value": self.value_json(),
        })
    }

    /// Inline form used inside element `attributes` maps: the wire form plus
    /// the keywords (and `allow_null` for a null), so the factory can
    /// rebuild it.
    pub fn to_payload(&self) -> Value {
        let mut out = Map::new();
        out.insert(
            "attribute_type".into(),
            Value::String(self.typename().as_str().into()),
        );
        out.insert("value".into(), self.value_json());
        let keywords = self.keywords();
        let present = [
            ("min", keywords.min),
            ("max", keywords.max),
            ("options", keywords.options),
            ("many", keywords.many),
        ];
        out.extend(
            present
                .into_iter()
                .filter_map(|(name, v)| v.map(|v| (name.to_string(), v))),
        );
        if self.is_null() {
            out.insert("allow_null".into(), Value::Bool(true));
        }
        Value::Object(out)
    }

    /// The construction keywords this attribute was built with.
    pub fn keywords(&self) -> AttributeOptions {
        match self {
            Attribute::BoundedInteger { bounds, .. }
            | Attribute::BoundedIntegerList { bounds, .. } => {
                AttributeOptions::bounded(bounds.min, bounds.max)
            }
            Attribute::BoundedFloat { bounds, .. } | Attribute::BoundedFloatList { bounds, .. } => {
                AttributeOptions::bounded(bounds.min, bounds.max)
            }
            Attribute::OptionString { options, .. } => {
                AttributeOptions::with_options(options.iter().cloned())
            }
            Attribute::DataResource(r)
            | Attribute::OperationDataResource(r)
            | Attribute::VariableDataResource(r) => match r.many {
                Some(many) => AttributeOptions::new().with_many(many),
                None => AttributeOptions::new(),
            },
            _ => AttributeOptions::new(),
        }
    }

    /// Re-validates `raw` under this attribute's type and keywords, returning
    /// the replacement. `self` is never modified.
    pub fn reassign(&self, raw: &Value, allow_null: bool) -> Result<Attribute> {
        factory::build(self.typename(), raw, &self.keywords(), allow_null)
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("attribute_type", self.typename().as_str())?;
        map.serialize_entry("value", &self.value_json())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mev_types::MevError;

    #[test]
    fn serializes_as_type_and_value() {
        let attr = Attribute::PositiveInteger(Some(4));
        assert_eq!(
            attr.to_json(),
            json!({"attribute_type": "PositiveInteger", "value": 4})
        );
        assert_eq!(serde_json::to_value(&attr).unwrap(), attr.to_json());
    }

    #[test]
    fn null_serializes_as_null() {
        let attr = Attribute::Float(None);
        assert!(attr.is_null());
        assert_eq!(attr.to_json(), json!({"attribute_type": "Float", "value": null}));
    }

    #[test]
    fn bounded_attribute_reports_its_keywords() {
        let attr = Attribute::BoundedFloat {
            bounds: Bounds { min: 0.0, max: 1.0 },
            value: Some(0.5),
        };
        assert_eq!(attr.keywords(), AttributeOptions::bounded(0.0, 1.0));
    }

    #[test]
    fn reassign_revalidates_under_same_bounds() {
        let attr = Attribute::BoundedInteger {
            bounds: Bounds { min: 0, max: 10 },
            value: Some(2),
        };
        let next = attr.reassign(&json!(9), false).unwrap();
        assert_eq!(
            next,
            Attribute::BoundedInteger {
                bounds: Bounds { min: 0, max: 10 },
                value: Some(9)
            }
        );
        let err = attr.reassign(&json!(11), false).unwrap_err();
        assert!(err.to_string().contains("not within the bounds"));
        assert!(matches!(
            attr.reassign(&Value::Null, false),
            Err(MevError::NullAttribute { .. })
        ));
    }

    #[test]
    fn resource_ref_is_untagged() {
        let single = ResourceRef::Single("abc".into());
        let many = ResourceRef::Many(vec!["a".into(), "b".into()]);
        assert_eq!(serde_json::to_value(&single).unwrap(), json!("abc"));
        assert_eq!(serde_json::to_value(&many).unwrap(), json!(["a", "b"]));
        assert_eq!(many.ids(), vec!["a", "b"]);
    }
}
