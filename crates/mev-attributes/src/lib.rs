//! Typed attribute validation, element sets, and operation input/output specs.
//!
//! Raw JSON values enter through the [`factory`] and come out as validated
//! [`Attribute`] values. [`element`] builds identified records and
//! identity-keyed sets of them on top, and [`operation`] describes the typed
//! inputs and outputs an analysis operation declares.
//!
//! # Example
//! ```
//! use mev_attributes::{resolve, AttributeOptions};
//! use serde_json::json;
//!
//! let opts = AttributeOptions::bounded(0, 1);
//! let attr = resolve("BoundedFloat", &json!(0.3), &opts, false).unwrap();
//! assert_eq!(attr.to_json(), json!({"attribute_type": "BoundedFloat", "value": 0.3}));
//! ```

pub mod attribute;
pub mod element;
pub mod factory;
pub mod kind;
pub mod operation;
pub mod options;
pub mod rules;

pub use attribute::{Attribute, ResourceRef, ResourceValue};
pub use element::{
    Element, ElementKind, ElementSet, Feature, FeatureKind, FeatureSet, Observation,
    ObservationKind, ObservationSet,
};
pub use factory::{build, from_payload, resolve, AttributePayload};
pub use kind::AttributeType;
pub use operation::{
    InputSpec, IoEntry, Operation, OperationInput, OperationInputDict, OperationInputOutputDict,
    OperationOutput, OperationOutputDict, OutputSpec,
};
pub use options::AttributeOptions;
pub use rules::{Bounds, ListOf, NumericConstraint, Validatable};
