//! Error types for validation, configuration and generation.
//!
//! Validation and configuration failures are values collected per
//! declaration; they never abort a run. Generation errors are scoped to the
//! one output file they occurred on.

use std::io;
use thiserror::Error;

/// A structural defect in a candidate declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The encoding interface is referenced without type arguments.
    #[error("{interface} is implemented as a raw type")]
    InterfaceDeclarationIsRawType { interface: String },

    /// The declaration binds no type parameter.
    #[error("a type constructor needs at least one type parameter")]
    NeedsAtLeastOneTypeParameter,

    /// More type parameters than the widest wrapper supports.
    #[error("{count} type parameters exceed the supported maximum of {max}")]
    ArityOutOfRange { count: usize, max: usize },

    /// The wrapper's own parameter count is not `type parameters + 1`.
    #[error("{interface} takes {found} type parameters, expected {expected}")]
    WrongArityInterface {
        interface: String,
        found: usize,
        expected: usize,
    },

    /// Type parameters at `positions` do not line up with the interface arguments.
    #[error("type parameters at positions {positions:?} are missing or out of order")]
    TypeParameterOrderMismatch { positions: Vec<usize> },

    /// The first interface argument is not an acceptable witness.
    #[error("{witness} is not a valid type constructor witness")]
    WitnessNotValid { witness: String },

    /// A nested witness is itself generic.
    #[error("nested witness {witness} must not take type parameters")]
    NestedWitnessHasTypeParameters { witness: String },

    /// A nested witness is instance-bound, or less visible than its owner.
    #[error("nested witness {witness} must be {}static", public_prefix(.requires_public))]
    NestedWitnessVisibilityMismatch {
        witness: String,
        requires_public: bool,
    },

    /// More than one encoding interface qualifies.
    #[error("more than one encoding interface implemented: {}", .candidates.join(", "))]
    AmbiguousEncodingInterface { candidates: Vec<String> },

    /// A scope on the declaration's chain carries an unusable configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
}

fn public_prefix(requires_public: &bool) -> &'static str {
    if *requires_public {
        "public "
    } else {
        ""
    }
}

impl ValidationError {
    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InterfaceDeclarationIsRawType { .. } => "HKT001",
            ValidationError::NeedsAtLeastOneTypeParameter => "HKT002",
            ValidationError::WrongArityInterface { .. } => "HKT003",
            ValidationError::TypeParameterOrderMismatch { .. } => "HKT004",
            ValidationError::WitnessNotValid { .. } => "HKT005",
            ValidationError::NestedWitnessHasTypeParameters { .. } => "HKT006",
            ValidationError::NestedWitnessVisibilityMismatch { .. } => "HKT007",
            ValidationError::ArityOutOfRange { .. } => "HKT008",
            ValidationError::AmbiguousEncodingInterface { .. } => "HKT009",
            ValidationError::InvalidConfiguration(_) => "HKT010",
        }
    }

    /// Variant name, as shown to diagnostic consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::InterfaceDeclarationIsRawType { .. } => {
                "InterfaceDeclarationIsRawType"
            }
            ValidationError::NeedsAtLeastOneTypeParameter => "NeedsAtLeastOneTypeParameter",
            ValidationError::WrongArityInterface { .. } => "WrongArityInterface",
            ValidationError::TypeParameterOrderMismatch { .. } => "TypeParameterOrderMismatch",
            ValidationError::WitnessNotValid { .. } => "WitnessNotValid",
            ValidationError::NestedWitnessHasTypeParameters { .. } => {
                "NestedWitnessHasTypeParameters"
            }
            ValidationError::NestedWitnessVisibilityMismatch { .. } => {
                "NestedWitnessVisibilityMismatch"
            }
            ValidationError::ArityOutOfRange { .. } => "ArityOutOfRange",
            ValidationError::AmbiguousEncodingInterface { .. } => "AmbiguousEncodingInterface",
            ValidationError::InvalidConfiguration(_) => "InvalidConfiguration",
        }
    }
}

/// A configuration fragment that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{key}` must be a string, got {value}")]
    NotAString { key: String, value: String },

    #[error("unknown visibility `{0}` (expected Same, Package or Disabled)")]
    UnknownVisibility(String),

    #[error("`{0}` is not a valid class name")]
    InvalidClassName(String),

    #[error("`coerceMethodName` must not be empty")]
    EmptyCoerceTemplate,

    #[error("`delegateTo` must be an array of annotation names, got {0}")]
    InvalidDelegateList(String),

    #[error("in scope `{scope}`: {source}")]
    InScope {
        scope: String,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Failure to read or write one output file.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to read existing {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {file}: {source}")]
    Write {
        file: String,
        #[source]
        source: io::Error,
    },
}
