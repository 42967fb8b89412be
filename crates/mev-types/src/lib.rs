//! Shared error taxonomy and identifier normalization for the MEV metadata core.
//!
//! This crate provides the foundational pieces used by every other MEV crate:
//! - `MevError` — unified error taxonomy for rejected input
//! - `Result` — convenience alias over `MevError`
//! - [`identifier`] — normalization of free-text names into safe identifiers

pub mod identifier;

pub use identifier::{normalize, normalize_value};

/// Unified error type for all MEV subsystems.
///
/// Every variant describes rejected input. Nothing in the core recovers from
/// these locally; they propagate to the caller at construction time.
#[derive(Debug, thiserror::Error)]
pub enum MevError {
    // === Attribute Errors ===
    #[error("Unknown attribute type '{typename}'")]
    AttributeType { typename: String },

    #[error("{message}")]
    AttributeValue { message: String },

    #[error("Attribute of type '{typename}' received null but does not allow null values")]
    NullAttribute { typename: String },

    #[error("Attribute type '{typename}' requires the '{keyword}' keyword")]
    MissingAttributeKeyword { typename: String, keyword: String },

    #[error("Invalid '{keyword}' keyword for attribute type '{typename}': {message}")]
    InvalidAttributeKeyword {
        typename: String,
        keyword: String,
        message: String,
    },

    // === Structure Errors ===
    #[error("Data structure validation failed: {0}")]
    DataStructureValidation(String),

    #[error("Invalid identifier '{raw}': {reason}")]
    StringIdentifier { raw: String, reason: String },

    // === DAG Errors ===
    #[error("Node '{node_id}' is not part of the graph")]
    UnknownNode { node_id: String },

    #[error("Adding '{parent}' as a parent of '{child}' would create a cycle")]
    CycleDetected { child: String, parent: String },

    // === Generic ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl MevError {
    /// Shorthand for an [`MevError::AttributeValue`] with the given message.
    pub fn value(message: impl Into<String>) -> Self {
        MevError::AttributeValue {
            message: message.into(),
        }
    }

    /// Stable error-kind name, independent of the message text.
    pub fn kind(&self) -> &'static str {
        match self {
            MevError::AttributeType { .. } => "AttributeTypeError",
            MevError::AttributeValue { .. } => "AttributeValueError",
            MevError::NullAttribute { .. } => "NullAttributeError",
            MevError::MissingAttributeKeyword { .. } => "MissingAttributeKeywordError",
            MevError::InvalidAttributeKeyword { .. } => "InvalidAttributeKeywordError",
            MevError::DataStructureValidation(_) => "DataStructureValidationException",
            MevError::StringIdentifier { .. } => "StringIdentifierException",
            MevError::UnknownNode { .. } => "UnknownNodeError",
            MevError::CycleDetected { .. } => "CycleDetectedError",
            MevError::Json(_) => "JsonError",
            MevError::Other(_) => "Error",
        }
    }

    /// Returns `true` if the error describes caller input that was rejected.
    pub fn is_rejected_input(&self) -> bool {
        !matches!(self, MevError::Other(_))
    }

    /// Maps the error to the HTTP status code an API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            MevError::UnknownNode { .. } => 404,
            MevError::CycleDetected { .. } => 409,
            MevError::Other(_) => 500,
            _ => 400,
        }
    }
}

/// A convenience alias for `Result<T, MevError>`.
pub type Result<T> = std::result::Result<T, MevError>;
