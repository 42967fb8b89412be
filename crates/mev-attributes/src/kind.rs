use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use mev_types::MevError;

/// Discriminator for every attribute variant. The variant name is the wire
/// `attribute_type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeType {
    Integer,
    PositiveInteger,
    NonnegativeInteger,
    BoundedInteger,
    Float,
    PositiveFloat,
    NonnegativeFloat,
    BoundedFloat,
    String,
    UnrestrictedString,
    OptionString,
    Boolean,
    DataResource,
    OperationDataResource,
    VariableDataResource,
    IntegerList,
    FloatList,
    BooleanList,
    StringList,
    UnrestrictedStringList,
    BoundedIntegerList,
    BoundedFloatList,
    Observation,
    Feature,
    ObservationSet,
    FeatureSet,
}

impl AttributeType {
    pub const ALL: &'static [AttributeType] = &[
        AttributeType::Integer,
        AttributeType::PositiveInteger,
        AttributeType::NonnegativeInteger,
        AttributeType::BoundedInteger,
        AttributeType::Float,
        AttributeType::PositiveFloat,
        AttributeType::NonnegativeFloat,
        AttributeType::BoundedFloat,
        AttributeType::String,
        AttributeType::UnrestrictedString,
        AttributeType::OptionString,
        AttributeType::Boolean,
        AttributeType::DataResource,
        AttributeType::OperationDataResource,
        AttributeType::VariableDataResource,
        AttributeType::IntegerList,
        AttributeType::FloatList,
        AttributeType::BooleanList,
        AttributeType::StringList,
        AttributeType::UnrestrictedStringList,
        AttributeType::BoundedIntegerList,
        AttributeType::BoundedFloatList,
        AttributeType::Observation,
        AttributeType::Feature,
        AttributeType::ObservationSet,
        AttributeType::FeatureSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Integer => "Integer",
            AttributeType::PositiveInteger => "PositiveInteger",
            AttributeType::NonnegativeInteger => "NonnegativeInteger",
            AttributeType::BoundedInteger => "BoundedInteger",
            AttributeType::Float => "Float",
            AttributeType::PositiveFloat => "PositiveFloat",
            AttributeType::NonnegativeFloat => "NonnegativeFloat",
            AttributeType::BoundedFloat => "BoundedFloat",
            AttributeType::String => "String",
            AttributeType::UnrestrictedString => "UnrestrictedString",
            AttributeType::OptionString => "OptionString",
            AttributeType::Boolean => "Boolean",
            AttributeType::DataResource => "DataResource",
            AttributeType::OperationDataResource => "OperationDataResource",
            AttributeType::VariableDataResource => "VariableDataResource",
            AttributeType::IntegerList => "IntegerList",
            AttributeType::FloatList => "FloatList",
            AttributeType::BooleanList => "BooleanList",
            AttributeType::StringList => "StringList",
            AttributeType::UnrestrictedStringList => "UnrestrictedStringList",
            AttributeType::BoundedIntegerList => "BoundedIntegerList",
            AttributeType::BoundedFloatList => "BoundedFloatList",
            AttributeType::Observation => "Observation",
            AttributeType::Feature => "Feature",
            AttributeType::ObservationSet => "ObservationSet",
            AttributeType::FeatureSet => "FeatureSet",
        }
    }

    /// Keywords this type understands at construction. Anything else is
    /// rejected by operation specs.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            AttributeType::BoundedInteger
            | AttributeType::BoundedFloat
            | AttributeType::BoundedIntegerList
            | AttributeType::BoundedFloatList => &["min", "max"],
            AttributeType::OptionString => &["options"],
            AttributeType::DataResource
            | AttributeType::OperationDataResource
            | AttributeType::VariableDataResource => &["many"],
            _ => &[],
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            AttributeType::IntegerList
                | AttributeType::FloatList
                | AttributeType::BooleanList
                | AttributeType::StringList
                | AttributeType::UnrestrictedStringList
                | AttributeType::BoundedIntegerList
                | AttributeType::BoundedFloatList
        )
    }

    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            AttributeType::Observation
                | AttributeType::Feature
                | AttributeType::ObservationSet
                | AttributeType::FeatureSet
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = MevError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| MevError::AttributeType {
                typename: s.to_string(),
            })
    }
}
