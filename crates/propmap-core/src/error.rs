//! Error types for the Propmap core library
//!
//! One exception family (`MappingError`) covers the whole pipeline, using
//! thiserror for ergonomic definitions and anyhow for underlying causes.
//! Every variant carries a stable [`ErrorKind`] tag so callers can branch on
//! the failure class without matching on payload fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Propmap operations
#[derive(Error, Debug)]
pub enum MappingError {
    /// A declaration, at any site, names no property of the target type
    #[error("mapping declared for '{field}' names no property of {target}")]
    FieldNotAProperty { field: String, target: String },

    /// The same property is configured by more than one declaration
    #[error("property '{property}' of {target} is declared more than once")]
    DuplicateDeclaration { property: String, target: String },

    /// The declared source property does not exist on the source type
    #[error("source property '{property}' not found on {source_type}")]
    SourcePropertyNotFound {
        property: String,
        source_type: String,
    },

    /// A mapping item was built without a source accessor
    #[error("source property accessor is missing")]
    SourceIsNull,

    /// A mapping item was built without a target accessor
    #[error("target property accessor is missing")]
    TargetIsNull,

    /// The property has no read half
    #[error("property '{property}' has no getter")]
    GetMethodIsNull { property: String },

    /// The property has no write half
    #[error("property '{property}' has no setter")]
    SetMethodIsNull { property: String },

    /// No chain is declared and the endpoint types differ
    #[error("property types differ and no converter chain is declared; source is {source_type}, target is {target_type}")]
    PropertyTypeIsDifferent {
        source_type: String,
        target_type: String,
    },

    /// The converter type exposes no conversion method
    #[error("converter {converter} has no conversion method")]
    NoConvertMethod { converter: String },

    /// The converter type exposes more than one conversion method candidate
    #[error("converter {converter} has more than one conversion method")]
    DuplicateConvertMethod { converter: String },

    /// The converter type has no parameterless constructor
    #[error("converter {converter} does not have a default constructor")]
    ConverterNotConstructible { converter: String },

    /// Constructing the converter failed
    #[error("converter {converter} can not be constructed")]
    ConverterConstructionFailed {
        converter: String,
        #[source]
        cause: anyhow::Error,
    },

    /// An identity-shaped converter is bounded by something narrower than the
    /// universal type, so eliding it from the type flow would be unsound
    #[error("identity converter {converter} is bounded by {bound}, not the universal type")]
    GenericBoundNotUniversal { converter: String, bound: String },

    /// The first converter of a chain cannot accept the source property type
    #[error("chain input mismatch: converter {converter} expects {expected} but the property provides {provided}")]
    ChainInputMismatch {
        converter: String,
        provided: String,
        expected: String,
    },

    /// A mid-chain converter cannot accept its predecessor's output
    #[error("converter {converter} expects {expected} but the previous converter returns {provided}")]
    ChainNotMatchPrevious {
        converter: String,
        provided: String,
        expected: String,
    },

    /// The chain's final output cannot be assigned to the target property
    #[error("chain return mismatch: chain returns {provided} but the property expects {expected}")]
    ChainReturnMismatch { provided: String, expected: String },

    /// A converter threw while actually converting a value
    #[error("conversion failed in {converter}; value is {value}")]
    ConversionFailed {
        converter: String,
        value: String,
        #[source]
        cause: anyhow::Error,
    },

    /// An internal invariant was violated while building a transformer
    #[error("specialization failed: {message}")]
    Specialization { message: String },
}

/// Convenience type alias for Results using our MappingError type
pub type Result<T> = std::result::Result<T, MappingError>;

/// Stable tags identifying the failure class of a [`MappingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    FieldNotAProperty,
    DuplicateDeclaration,
    SourcePropertyNotFound,
    SourceIsNull,
    TargetIsNull,
    GetMethodIsNull,
    SetMethodIsNull,
    PropertyTypeIsDifferent,
    NoConvertMethod,
    DuplicateConvertMethod,
    ConverterNotConstructible,
    ConverterConstructionFailed,
    GenericBoundNotUniversal,
    ChainInputMismatch,
    ChainNotMatchPrevious,
    ChainReturnMismatch,
    ConversionFailed,
    Specialization,
}

impl MappingError {
    /// The failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MappingError::FieldNotAProperty { .. } => ErrorKind::FieldNotAProperty,
            MappingError::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclaration,
            MappingError::SourcePropertyNotFound { .. } => ErrorKind::SourcePropertyNotFound,
            MappingError::SourceIsNull => ErrorKind::SourceIsNull,
            MappingError::TargetIsNull => ErrorKind::TargetIsNull,
            MappingError::GetMethodIsNull { .. } => ErrorKind::GetMethodIsNull,
            MappingError::SetMethodIsNull { .. } => ErrorKind::SetMethodIsNull,
            MappingError::PropertyTypeIsDifferent { .. } => ErrorKind::PropertyTypeIsDifferent,
            MappingError::NoConvertMethod { .. } => ErrorKind::NoConvertMethod,
            MappingError::DuplicateConvertMethod { .. } => ErrorKind::DuplicateConvertMethod,
            MappingError::ConverterNotConstructible { .. } => ErrorKind::ConverterNotConstructible,
            MappingError::ConverterConstructionFailed { .. } => {
                ErrorKind::ConverterConstructionFailed
            }
            MappingError::GenericBoundNotUniversal { .. } => ErrorKind::GenericBoundNotUniversal,
            MappingError::ChainInputMismatch { .. } => ErrorKind::ChainInputMismatch,
            MappingError::ChainNotMatchPrevious { .. } => ErrorKind::ChainNotMatchPrevious,
            MappingError::ChainReturnMismatch { .. } => ErrorKind::ChainReturnMismatch,
            MappingError::ConversionFailed { .. } => ErrorKind::ConversionFailed,
            MappingError::Specialization { .. } => ErrorKind::Specialization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MappingError::FieldNotAProperty {
            field: "name".to_string(),
            target: "Person".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "mapping declared for 'name' names no property of Person"
        );
    }

    #[test]
    fn test_kind_tags() {
        let err = MappingError::SourceIsNull;
        assert_eq!(err.kind(), ErrorKind::SourceIsNull);

        let err = MappingError::ConversionFailed {
            converter: "StringToDateConverter".to_string(),
            value: "\"oops\"".to_string(),
            cause: anyhow::anyhow!("bad input"),
        };
        assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    }

    #[test]
    fn test_conversion_failed_carries_cause() {
        let err = MappingError::ConversionFailed {
            converter: "StringToDateConverter".to_string(),
            value: "\"oops\"".to_string(),
            cause: anyhow::anyhow!("bad input"),
        };
        let source = std::error::Error::source(&err).expect("cause is attached");
        assert!(source.to_string().contains("bad input"));
    }
}
