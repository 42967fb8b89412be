//! Identified records (`Observation`, `Feature`) and their sets.
//!
//! Elements compare and hash by `id` alone. A set is a map keyed by that id,
//! and building one from input that repeats an id is an error, not a silent
//! dedupe.
//!
//! The element kind is a type parameter, so combining an `ObservationSet`
//! with a `FeatureSet` does not compile.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use mev_types::{normalize_value, MevError, Result};

use crate::attribute::Attribute;
use crate::factory;

/// Marker for the two element flavours.
pub trait ElementKind: fmt::Debug + Clone + Copy + PartialEq + Send + Sync + 'static {
    const ELEMENT_TYPENAME: &'static str;
    const SET_TYPENAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationKind;

impl ElementKind for ObservationKind {
    const ELEMENT_TYPENAME: &'static str = "Observation";
    const SET_TYPENAME: &'static str = "ObservationSet";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureKind;

impl ElementKind for FeatureKind {
    const ELEMENT_TYPENAME: &'static str = "Feature";
    const SET_TYPENAME: &'static str = "FeatureSet";
}

pub type Observation = Element<ObservationKind>;
pub type Feature = Element<FeatureKind>;
pub type ObservationSet = ElementSet<ObservationKind>;
pub type FeatureSet = ElementSet<FeatureKind>;

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Element<K: ElementKind> {
    id: String,
    attributes: BTreeMap<String, Attribute>,
    _kind: PhantomData<K>,
}

impl<K: ElementKind> Element<K> {
    /// Builds an element from already-validated attributes. The id is
    /// normalized.
    pub fn new(id: &str, attributes: BTreeMap<String, Attribute>) -> Result<Self> {
        let id = mev_types::normalize(id)?;
        Ok(Self {
            id,
            attributes,
            _kind: PhantomData,
        })
    }

    /// Validates `{"id": str, "attributes"?: {name: {"attribute_type": .., "value": ..}}}`.
    pub fn from_json(raw: &Value) -> Result<Self> {
        let obj = raw.as_object().ok_or_else(|| {
            MevError::DataStructureValidation(format!(
                "{} must be an object, got {raw}",
                K::ELEMENT_TYPENAME
            ))
        })?;
        let id = obj.get("id").ok_or_else(|| {
            MevError::DataStructureValidation(format!(
                "{} is missing the required 'id' field",
                K::ELEMENT_TYPENAME
            ))
        })?;
        let id = normalize_value(id)?;

        let attributes = match obj.get("attributes") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(name, payload)| Ok((name.clone(), factory::from_payload(payload)?)))
                .collect::<Result<BTreeMap<_, _>>>()?,
            Some(other) => {
                return Err(MevError::DataStructureValidation(format!(
                    "'attributes' of {} '{id}' must be an object, got {other}",
                    K::ELEMENT_TYPENAME
                )))
            }
        };

        Ok(Self {
            id,
            attributes,
            _kind: PhantomData,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attributes(&self) -> &BTreeMap<String, Attribute> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Attributes are written in their inline payload form (keywords
    /// included), so the output reads back through [`Element::from_json`].
    pub fn to_json(&self) -> Value {
        serde_json::json!({ "id": self.id, "attributes": self.attribute_payloads() })
    }

    fn attribute_payloads(&self) -> Map<String, Value> {
        self.attributes
            .iter()
            .map(|(name, attr)| (name.clone(), attr.to_payload()))
            .collect()
    }
}

impl<K: ElementKind> PartialEq for Element<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K: ElementKind> Eq for Element<K> {}

impl<K: ElementKind> Hash for Element<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<K: ElementKind> Serialize for Element<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("attributes", &self.attribute_payloads())?;
        map.end()
    }
}

impl<'de, K: ElementKind> Deserialize<'de> for Element<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_json(&raw).map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ElementSet
// ---------------------------------------------------------------------------

/// Elements keyed by id. Immutable once built; the set operations return new
/// sets.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSet<K: ElementKind> {
    elements: BTreeMap<String, Element<K>>,
}

impl<K: ElementKind> ElementSet<K> {
    /// Builds a set, failing with every colliding id if any id repeats.
    pub fn new(elements: impl IntoIterator<Item = Element<K>>) -> Result<Self> {
        let mut map = BTreeMap::new();
        let mut duplicates: Vec<String> = Vec::new();
        for element in elements {
            if map.contains_key(&element.id) {
                if !duplicates.contains(&element.id) {
                    duplicates.push(element.id.clone());
                }
                continue;
            }
            map.insert(element.id.clone(), element);
        }

        if !duplicates.is_empty() {
            tracing::warn!(
                set = K::SET_TYPENAME,
                ids = ?duplicates,
                "Rejected duplicate element ids"
            );
            return Err(MevError::DataStructureValidation(format!(
                "{} contains duplicate element ids: {}",
                K::SET_TYPENAME,
                duplicates.join(", ")
            )));
        }

        tracing::debug!(set = K::SET_TYPENAME, size = map.len(), "Built element set");
        Ok(Self { elements: map })
    }

    /// Validates `{"elements": [ {id, attributes?}, ... ]}`.
    pub fn from_json(raw: &Value) -> Result<Self> {
        let items = raw
            .as_object()
            .and_then(|obj| obj.get("elements"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                MevError::DataStructureValidation(format!(
                    "{} requires an 'elements' list",
                    K::SET_TYPENAME
                ))
            })?;
        let elements = items
            .iter()
            .map(Element::from_json)
            .collect::<Result<Vec<_>>>()?;
        Self::new(elements)
    }

    pub fn empty() -> Self {
        Self {
            elements: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Element<K>> {
        self.elements.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element<K>> {
        self.elements.values()
    }

    /// Every id from either side. On a shared id the element from `self`
    /// (with its attributes) is kept.
    pub fn union(&self, other: &Self) -> Self {
        let mut elements = self.elements.clone();
        for (id, element) in &other.elements {
            elements
                .entry(id.clone())
                .or_insert_with(|| element.clone());
        }
        Self { elements }
    }

    /// Ids present on both sides, taking elements from `self`.
    pub fn intersection(&self, other: &Self) -> Self {
        let elements = self
            .elements
            .iter()
            .filter(|(id, _)| other.contains(id))
            .map(|(id, e)| (id.clone(), e.clone()))
            .collect();
        Self { elements }
    }

    /// Ids in `self` that are absent from `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let elements = self
            .elements
            .iter()
            .filter(|(id, _)| !other.contains(id))
            .map(|(id, e)| (id.clone(), e.clone()))
            .collect();
        Self { elements }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "elements": self.elements.values().map(Element::to_json).collect::<Vec<_>>()
        })
    }
}

impl<K: ElementKind> Serialize for ElementSet<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("elements", &self.elements.values().collect::<Vec<_>>())?;
        map.end()
    }
}

impl<'de, K: ElementKind> Deserialize<'de> for ElementSet<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_json(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(ids: &[&str]) -> ObservationSet {
        ObservationSet::new(ids.iter().map(|id| Observation::new(id, BTreeMap::new()).unwrap()))
            .unwrap()
    }

    fn ids<K: ElementKind>(s: &ElementSet<K>) -> Vec<&str> {
        s.ids().collect()
    }

    #[test]
    fn element_equality_ignores_attributes() {
        let a = Observation::from_json(&json!({"id": "s1"})).unwrap();
        let b = Observation::from_json(&json!({
            "id": "s1",
            "attributes": {"age": {"attribute_type": "Integer", "value": 4}}
        }))
        .unwrap();
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        let hash = |e: &Observation| {
            let mut h = DefaultHasher::new();
            e.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn element_id_is_normalized() {
        let e = Feature::from_json(&json!({"id": " gene A "})).unwrap();
        assert_eq!(e.id(), "gene_A");
    }

    #[test]
    fn element_rejects_bad_id() {
        let err = Feature::from_json(&json!({"id": "a?b"})).unwrap_err();
        assert!(matches!(err, MevError::StringIdentifier { .. }));
        let err = Feature::from_json(&json!({"attributes": {}})).unwrap_err();
        assert!(matches!(err, MevError::DataStructureValidation(_)));
    }

    #[test]
    fn element_attributes_go_through_factory() {
        let err = Observation::from_json(&json!({
            "id": "s1",
            "attributes": {"age": {"attribute_type": "PositiveInteger", "value": -3}}
        }))
        .unwrap_err();
        assert!(matches!(err, MevError::AttributeValue { .. }));

        let e = Observation::from_json(&json!({
            "id": "s1",
            "attributes": {
                "genotype": {
                    "attribute_type": "OptionString", "value": "wt", "options": ["wt", "ko"]
                }
            }
        }))
        .unwrap();
        assert_eq!(
            e.attribute("genotype"),
            Some(&Attribute::OptionString {
                options: vec!["wt".into(), "ko".into()],
                value: Some("wt".into())
            })
        );
    }

    #[test]
    fn duplicate_ids_fail_construction() {
        let err = ObservationSet::from_json(&json!({
            "elements": [{"id": "a"}, {"id": "b"}, {"id": "a"}]
        }))
        .unwrap_err();
        match err {
            MevError::DataStructureValidation(msg) => assert!(msg.contains('a'), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ids_colliding_after_normalization_are_duplicates() {
        let err = ObservationSet::from_json(&json!({
            "elements": [{"id": "a b"}, {"id": "a_b"}]
        }))
        .unwrap_err();
        assert!(matches!(err, MevError::DataStructureValidation(_)));
    }

    #[test]
    fn set_requires_elements_list() {
        assert!(FeatureSet::from_json(&json!({"items": []})).is_err());
        assert!(FeatureSet::from_json(&json!({"elements": {}})).is_err());
        assert!(FeatureSet::from_json(&json!({"elements": []})).unwrap().is_empty());
    }

    #[test]
    fn set_algebra_by_id() {
        let a = set(&["id1", "id2"]);
        let b = set(&["id2", "id3"]);
        assert_eq!(ids(&a.union(&b)), vec!["id1", "id2", "id3"]);
        assert_eq!(ids(&a.intersection(&b)), vec!["id2"]);
        assert_eq!(ids(&a.difference(&b)), vec!["id1"]);
        // operands are untouched
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn union_keeps_left_metadata() {
        let left = ObservationSet::from_json(&json!({"elements": [
            {"id": "s1", "attributes": {"batch": {"attribute_type": "Integer", "value": 1}}}
        ]}))
        .unwrap();
        let right = ObservationSet::from_json(&json!({"elements": [
            {"id": "s1", "attributes": {"batch": {"attribute_type": "Integer", "value": 2}}}
        ]}))
        .unwrap();
        let merged = left.union(&right);
        assert_eq!(
            merged.get("s1").unwrap().attribute("batch"),
            Some(&Attribute::Integer(Some(1)))
        );
        let swapped = right.union(&left);
        assert_eq!(
            swapped.get("s1").unwrap().attribute("batch"),
            Some(&Attribute::Integer(Some(2)))
        );
    }

    #[test]
    fn serializes_to_elements_list() {
        let s = ObservationSet::from_json(&json!({"elements": [
            {"id": "s1", "attributes": {"flag": {"attribute_type": "Boolean", "value": 1}}},
            {"id": "s0"}
        ]}))
        .unwrap();
        let expected = json!({"elements": [
            {"id": "s0", "attributes": {}},
            {"id": "s1", "attributes": {"flag": {"attribute_type": "Boolean", "value": true}}}
        ]});
        assert_eq!(s.to_json(), expected);
        assert_eq!(serde_json::to_value(&s).unwrap(), expected);
    }

    #[test]
    fn deserialize_goes_through_validation() {
        let parsed: ObservationSet =
            serde_json::from_value(json!({"elements": [{"id": "x"}]})).unwrap();
        assert!(parsed.contains("x"));
        assert!(serde_json::from_value::<ObservationSet>(
            json!({"elements": [{"id": "x"}, {"id": "x"}]})
        )
        .is_err());
    }

    #[test]
    fn serialized_set_reads_back_with_keywords() {
        let original = ObservationSet::from_json(&json!({"elements": [
            {"id": "s1", "attributes": {
                "score": {"attribute_type": "BoundedFloat", "value": 0.5, "min": 0, "max": 1},
                "genotype": {
                    "attribute_type": "OptionString", "value": "ko", "options": ["wt", "ko"]
                },
                "batch": {"attribute_type": "Integer", "value": null, "allow_null": true}
            }},
            {"id": "s2"}
        ]}))
        .unwrap();

        let wire = original.to_json();
        assert_eq!(
            wire["elements"][0]["attributes"]["score"],
            json!({"attribute_type": "BoundedFloat", "value": 0.5, "min": 0.0, "max": 1.0})
        );
        assert_eq!(serde_json::to_value(&original).unwrap(), wire);

        let restored = ObservationSet::from_json(&wire).unwrap();
        let s1 = restored.get("s1").unwrap();
        assert_eq!(s1.attributes(), original.get("s1").unwrap().attributes());
        assert_eq!(
            s1.attribute("genotype"),
            Some(&Attribute::OptionString {
                options: vec!["wt".into(), "ko".into()],
                value: Some("ko".into())
            })
        );
        assert_eq!(s1.attribute("batch"), Some(&Attribute::Integer(None)));
    }
}
