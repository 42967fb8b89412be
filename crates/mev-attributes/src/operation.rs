//! Declared inputs and outputs of an analysis operation.
//!
//! An [`InputSpec`]/[`OutputSpec`] is a type descriptor drawn from the
//! attribute hierarchy (type tag plus keywords). Inputs and outputs wrap a
//! spec together with display text and an opaque `converter` name that the
//! operation runner interprets; nothing here reads `converter`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use mev_types::{MevError, Result};

use crate::attribute::Attribute;
use crate::factory;
use crate::kind::AttributeType;
use crate::options::AttributeOptions;

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

/// Type tag plus the keywords that type requires, checked at construction.
#[derive(Debug, Clone, PartialEq)]
struct TypeSpec {
    attribute_type: AttributeType,
    options: AttributeOptions,
}

impl TypeSpec {
    fn new(attribute_type: AttributeType, options: AttributeOptions) -> Result<Self> {
        let accepted = attribute_type.keywords();
        if let Some(extra) = options.present().into_iter().find(|k| !accepted.contains(k)) {
            return Err(MevError::InvalidAttributeKeyword {
                typename: attribute_type.to_string(),
                keyword: extra.to_string(),
                message: "keyword is not applicable to this attribute type".into(),
            });
        }
        // A null build exercises every keyword check without needing a value.
        factory::build(attribute_type, &Value::Null, &options, true)?;
        Ok(Self {
            attribute_type,
            options,
        })
    }

    fn validate(&self, raw: &Value) -> Result<Attribute> {
        factory::build(self.attribute_type, raw, &self.options, false)
    }

    /// Splits `{"attribute_type": .., <keywords>.., <extra>..}` into the spec and
    /// the leftover fields.
    fn from_json(raw: &Value, what: &str) -> Result<(Self, Map<String, Value>)> {
        let mut obj = raw
            .as_object()
            .cloned()
            .ok_or_else(|| MevError::DataStructureValidation(format!("{what} must be an object")))?;
        let typename = match obj.remove("attribute_type") {
            Some(Value::String(s)) => s,
            _ => {
                return Err(MevError::DataStructureValidation(format!(
                    "{what} requires a string 'attribute_type'"
                )))
            }
        };
        let attribute_type: AttributeType = typename.parse()?;
        let options = AttributeOptions {
            min: obj.remove("min"),
            max: obj.remove("max"),
            options: obj.remove("options"),
            many: obj.remove("many"),
        };
        Ok((Self::new(attribute_type, options)?, obj))
    }

    fn to_json(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            "attribute_type".into(),
            Value::String(self.attribute_type.as_str().into()),
        );
        if let Ok(Value::Object(keywords)) = serde_json::to_value(&self.options) {
            out.extend(keywords);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct InputSpec {
    spec: TypeSpec,
    default: Option<Attribute>,
}

impl InputSpec {
    /// A `default`, when given, must itself pass the spec.
    pub fn new(
        attribute_type: AttributeType,
        options: AttributeOptions,
        default: Option<Value>,
    ) -> Result<Self> {
        let spec = TypeSpec::new(attribute_type, options)?;
        let default = match default {
            None | Some(Value::Null) => None,
            Some(raw) => Some(spec.validate(&raw)?),
        };
        Ok(Self { spec, default })
    }

    pub fn from_json(raw: &Value) -> Result<Self> {
        let (spec, mut rest) = TypeSpec::from_json(raw, "input spec")?;
        let default = match rest.remove("default") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(spec.validate(&raw)?),
        };
        if let Some(unknown) = rest.keys().next() {
            return Err(MevError::DataStructureValidation(format!(
                "unexpected field '{unknown}' in input spec"
            )));
        }
        Ok(Self { spec, default })
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.spec.attribute_type
    }

    pub fn options(&self) -> &AttributeOptions {
        &self.spec.options
    }

    pub fn default_value(&self) -> Option<&Attribute> {
        self.default.as_ref()
    }

    /// Validates a submitted value against this spec.
    pub fn validate_value(&self, raw: &Value) -> Result<Attribute> {
        self.spec.validate(raw)
    }

    pub fn to_json(&self) -> Value {
        let mut out = self.spec.to_json();
        if let Some(default) = &self.default {
            out.insert("default".into(), default.value_json());
        }
        Value::Object(out)
    }
}

impl TryFrom<Value> for InputSpec {
    type Error = MevError;

    fn try_from(raw: Value) -> Result<Self> {
        Self::from_json(&raw)
    }
}

impl From<InputSpec> for Value {
    fn from(spec: InputSpec) -> Self {
        spec.to_json()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct OutputSpec {
    spec: TypeSpec,
}

impl OutputSpec {
    pub fn new(attribute_type: AttributeType, options: AttributeOptions) -> Result<Self> {
        Ok(Self {
            spec: TypeSpec::new(attribute_type, options)?,
        })
    }

    pub fn from_json(raw: &Value) -> Result<Self> {
        let (spec, rest) = TypeSpec::from_json(raw, "output spec")?;
        if let Some(unknown) = rest.keys().next() {
            return Err(MevError::DataStructureValidation(format!(
                "unexpected field '{unknown}' in output spec"
            )));
        }
        Ok(Self { spec })
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.spec.attribute_type
    }

    pub fn options(&self) -> &AttributeOptions {
        &self.spec.options
    }

    pub fn validate_value(&self, raw: &Value) -> Result<Attribute> {
        self.spec.validate(raw)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.spec.to_json())
    }
}

impl TryFrom<Value> for OutputSpec {
    type Error = MevError;

    fn try_from(raw: Value) -> Result<Self> {
        Self::from_json(&raw)
    }
}

impl From<OutputSpec> for Value {
    fn from(spec: OutputSpec) -> Self {
        spec.to_json()
    }
}

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationInput {
    pub description: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
    pub converter: String,
    pub spec: InputSpec,
}

impl OperationInput {
    pub fn from_json(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "operation input")?;
        Ok(Self {
            description: string_field(obj, "description", "operation input")?,
            name: string_field(obj, "name", "operation input")?,
            required: match obj.get("required") {
                None | Some(Value::Null) => false,
                Some(Value::Bool(b)) => *b,
                Some(other) => {
                    return Err(MevError::DataStructureValidation(format!(
                        "'required' must be a boolean, got {other}"
                    )))
                }
            },
            converter: string_field(obj, "converter", "operation input")?,
            spec: InputSpec::from_json(field(obj, "spec", "operation input")?)?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "description": self.description,
            "name": self.name,
            "required": self.required,
            "converter": self.converter,
            "spec": self.spec.to_json(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutput {
    pub description: String,
    pub name: String,
    pub converter: String,
    pub spec: OutputSpec,
}

impl OperationOutput {
    pub fn from_json(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "operation output")?;
        Ok(Self {
            description: string_field(obj, "description", "operation output")?,
            name: string_field(obj, "name", "operation output")?,
            converter: string_field(obj, "converter", "operation output")?,
            spec: OutputSpec::from_json(field(obj, "spec", "operation output")?)?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "description": self.description,
            "name": self.name,
            "converter": self.converter,
            "spec": self.spec.to_json(),
        })
    }
}

/// Anything that can sit in an [`OperationInputOutputDict`].
pub trait IoEntry: Sized {
    fn from_json(raw: &Value) -> Result<Self>;
    fn to_json(&self) -> Value;
}

impl IoEntry for OperationInput {
    fn from_json(raw: &Value) -> Result<Self> {
        OperationInput::from_json(raw)
    }
    fn to_json(&self) -> Value {
        OperationInput::to_json(self)
    }
}

impl IoEntry for OperationOutput {
    fn from_json(raw: &Value) -> Result<Self> {
        OperationOutput::from_json(raw)
    }
    fn to_json(&self) -> Value {
        OperationOutput::to_json(self)
    }
}

/// Field key to input/output. Equal when the key sets match and every pair
/// of values is equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationInputOutputDict<T> {
    entries: BTreeMap<String, T>,
}

pub type OperationInputDict = OperationInputOutputDict<OperationInput>;
pub type OperationOutputDict = OperationInputOutputDict<OperationOutput>;

impl<T: IoEntry> OperationInputOutputDict<T> {
    pub fn new(entries: BTreeMap<String, T>) -> Self {
        Self { entries }
    }

    pub fn from_json(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "operation input/output mapping")?;
        let entries = obj
            .iter()
            .map(|(key, value)| {
                T::from_json(value)
                    .map(|entry| (key.clone(), entry))
                    .map_err(|e| match e {
                        MevError::DataStructureValidation(msg) => {
                            MevError::DataStructureValidation(format!("field '{key}': {msg}"))
                        }
                        other => other,
                    })
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self { entries })
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub name: String,
    pub description: String,
    pub inputs: OperationInputDict,
    pub outputs: OperationOutputDict,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<String>,
}

impl Operation {
    pub fn from_json(raw: &Value) -> Result<Self> {
        let obj = expect_object(raw, "operation")?;
        let optional = |key: &str| -> Result<Option<String>> {
            match obj.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(MevError::DataStructureValidation(format!(
                    "operation field '{key}' must be a string, got {other}"
                ))),
            }
        };
        let operation = Self {
            id: string_field(obj, "id", "operation")?,
            name: string_field(obj, "name", "operation")?,
            description: string_field(obj, "description", "operation")?,
            inputs: OperationInputDict::from_json(field(obj, "inputs", "operation")?)?,
            outputs: OperationOutputDict::from_json(field(obj, "outputs", "operation")?)?,
            mode: string_field(obj, "mode", "operation")?,
            repository_url: optional("repository_url")?,
            git_hash: optional("git_hash")?,
        };
        tracing::debug!(
            operation = %operation.id,
            inputs = operation.inputs.len(),
            outputs = operation.outputs.len(),
            "Loaded operation"
        );
        Ok(operation)
    }

    pub fn to_json(&self) -> Value {
        let mut out = serde_json::json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "inputs": self.inputs.to_json(),
            "outputs": self.outputs.to_json(),
            "mode": self.mode,
        });
        if let Some(obj) = out.as_object_mut() {
            if let Some(url) = &self.repository_url {
                obj.insert("repository_url".into(), Value::String(url.clone()));
            }
            if let Some(hash) = &self.git_hash {
                obj.insert("git_hash".into(), Value::String(hash.clone()));
            }
        }
        out
    }

    /// Checks submitted values against the declared inputs.
    ///
    /// Unknown keys and missing required inputs are structural errors. Absent
    /// optional inputs take their default, if any. Fails on the first bad
    /// value.
    pub fn validate_inputs(
        &self,
        submitted: &Map<String, Value>,
    ) -> Result<BTreeMap<String, Attribute>> {
        if let Some(unknown) = submitted.keys().find(|k| self.inputs.get(k).is_none()) {
            return Err(MevError::DataStructureValidation(format!(
                "'{unknown}' is not an input of operation '{}'",
                self.name
            )));
        }

        let mut validated = BTreeMap::new();
        for (key, input) in self.inputs.iter() {
            match submitted.get(key).filter(|v| !v.is_null()) {
                Some(raw) => {
                    let attribute = input.spec.validate_value(raw).map_err(|e| {
                        tracing::warn!(
                            operation = %self.id,
                            input = key,
                            error = %e,
                            "Rejected input"
                        );
                        e
                    })?;
                    validated.insert(key.to_string(), attribute);
                }
                None if input.required => {
                    return Err(MevError::DataStructureValidation(format!(
                        "required input '{key}' was not provided"
                    )));
                }
                None => {
                    if let Some(default) = input.spec.default_value() {
                        validated.insert(key.to_string(), default.clone());
                    }
                }
            }
        }
        Ok(validated)
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn expect_object<'a>(raw: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| MevError::DataStructureValidation(format!("{what} must be an object")))
}

fn field<'a>(obj: &'a Map<String, Value>, key: &str, what: &str) -> Result<&'a Value> {
    obj.get(key).ok_or_else(|| {
        MevError::DataStructureValidation(format!("{what} is missing the '{key}' field"))
    })
}

fn string_field(obj: &Map<String, Value>, key: &str, what: &str) -> Result<String> {
    field(obj, key, what)?
        .as_str()
        .map(String::from)
        .ok_or_else(|| {
            MevError::DataStructureValidation(format!("'{key}' of {what} must be a string"))
        })
}
