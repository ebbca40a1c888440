use std::path::PathBuf;

use contract_native_types::{
    MethodSignature, TypeTag,
    errors::{MetadataError, TypeConvertError},
};

use crate::backend::BackendError;

/// Setup errors: wrong metadata, wrong wiring or calls that can never succeed. Never retried.
#[derive(thiserror::Error, Debug)]
pub enum IllegalStateError {
    #[error("Method '{0}' is neither a registered method nor an event of the contract")]
    UnregisteredMember(MethodSignature),
    #[error("Special operation '{operation}' of method '{method}' is not supported by backend '{backend}'")]
    UnknownSpecialOperation {
        operation: String,
        method: MethodSignature,
        backend: String,
    },
    #[error("Return type '{0}' is not compatible with the contract descriptor")]
    InvalidDescriptorReturnType(TypeTag),
    #[error("Method '{method}' is declared to return '{declared}' but was called expecting '{requested}'")]
    ReturnTypeMismatch {
        method: MethodSignature,
        declared: TypeTag,
        requested: TypeTag,
    },
    #[error("Method '{method}' expects {expected} arguments but {actual} were given")]
    ArgumentCountMismatch {
        method: MethodSignature,
        expected: usize,
        actual: usize,
    },
    #[error("Expected {expected} outcome but got {got}")]
    UnexpectedOutcome {
        expected: &'static str,
        got: &'static str,
    },
    #[error("Contract '{0}' has already been registered")]
    AlreadyRegistered(String),
    #[error("No contract registered with identifier '{0}'")]
    NotRegistered(String),
    #[error("Contract '{identifier}' is declared by both '{first}' and '{second}'")]
    DuplicateSource {
        identifier: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Backend '{backend}' does not support {kind} contract descriptors")]
    UnsupportedDescriptor { backend: String, kind: String },
}

/// Failure of the backend while executing an awaited call.
#[derive(thiserror::Error, Debug)]
#[error("Failed to call contract method '{method}': {source}")]
pub struct ContractCallError {
    pub method: MethodSignature,
    #[source]
    pub source: BackendError,
}

#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to (de)serialize '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid contract metadata: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Contract identifier '{0}' cannot be used as a file name")]
    InvalidFileName(String),
}

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
    #[error("Type conversion error: {0}")]
    TypeConvert(#[from] TypeConvertError),
    #[error(transparent)]
    ContractCall(#[from] ContractCallError),
    #[error("Event source failed: {0}")]
    EventSource(BackendError),
    #[error("Failed to deserialize result: {0}")]
    Deserialize(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
