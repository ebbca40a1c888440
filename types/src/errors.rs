use crate::{convert::ConverterKind, type_tag::TypeTag};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("No metadata registered for '{0}'")]
    NotFound(String),
    #[error("Invalid member key '{key}': {reason}")]
    InvalidMemberKey { key: String, reason: String },
    #[error("Invalid type tag '{0}'")]
    InvalidTypeTag(String),
    #[error("Contract identifier must not be empty")]
    EmptyIdentifier,
    #[error("Member '{member}' is not declared by interface '{interface}'")]
    ForeignMember { member: String, interface: String },
    #[error("Method '{method}' declares {expected} parameters but {actual} parameter descriptors were given")]
    ParameterCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("Parameter descriptor at position {position} of '{method}' refers to '{found}'")]
    ParameterPositionMismatch {
        method: String,
        position: usize,
        found: String,
    },
    #[error("Parameter '{0}' declares both a converter and a coercion type")]
    ConflictingCoercion(String),
    #[error("Method key '{key}' does not match method '{method}'")]
    MethodKeyMismatch { key: String, method: String },
    #[error("Event key '{key}' does not match event '{name}'")]
    EventKeyMismatch { key: String, name: String },
    #[error("Event '{0}' is declared more than once")]
    DuplicateEvent(String),
    #[error("Event '{event}' must return an event stream but returns '{return_type}'")]
    InvalidEventReturnType { event: String, return_type: TypeTag },
    #[error("Field '{field}' of event '{event}' is not declared on payload type '{payload}'")]
    ForeignEventField {
        event: String,
        field: String,
        payload: TypeTag,
    },
    #[error("Failed to parse contract ABI: {0}")]
    InvalidAbi(String),
}

#[derive(thiserror::Error, Debug)]
pub enum TypeConvertError {
    #[error("Failed to find matching converter from type '{from}' to '{to}'")]
    NoConverter { from: TypeTag, to: TypeTag },
    #[error("Failed to convert value to '{target}': {reason}")]
    ConversionFailed { target: TypeTag, reason: String },
    #[error("Registered type converter '{kind}' is not suitable for converting a value of type '{value_type}'")]
    UnsuitableConverter {
        kind: ConverterKind,
        value_type: TypeTag,
    },
    #[error(
        "No instance of type converter '{0}' has been registered and no default constructor is known for it"
    )]
    UnknownConverterKind(ConverterKind),
}

impl TypeConvertError {
    pub fn failed(target: &TypeTag, reason: impl std::fmt::Display) -> Self {
        Self::ConversionFailed {
            target: target.clone(),
            reason: reason.to_string(),
        }
    }
}
