//! Metadata model and type conversion registry shared by `contract-native` and backend connectors.
//!
//! The crate contains:
//! - [type tags](TypeTag) and [typed values](TypedValue) that carry declared types across the interface boundary
//! - [canonical member keys](signature) such as `org.example.Hello.set(i32, Vec<String>)[0]`
//! - the [metadata model](metadata) describing a contract's methods, parameters and events
//! - the [type conversion registry](convert::TypeConverters) with its default converters
//! - the [`Data`] and [`Event`] provenance envelopes
use serde::{Deserialize, Serialize};

pub mod convert;
pub mod errors;
pub mod metadata;
pub mod signature;
pub mod type_tag;
mod utils;

pub use convert::{ConverterKind, TypeConverter, TypeConverters};
pub use metadata::{
    BackendInfo, BackendKind, ContractDescriptor, EventDescriptor, EventFieldDescriptor,
    EventParameterDescriptor, MethodDescriptor, ParameterDescriptor,
};
pub use signature::{FieldRef, MethodSignature, ParameterRef};
pub use type_tag::{TypeTag, TypedValue};

/// Dynamic value crossing the boundary between declared interface types and backend-native types.
///
/// `Value::Null` doubles as the "no value" sentinel and the void marker.
pub type Value = serde_json::Value;

/// Result of a contract call together with the provenance reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data<T> {
    /// The data returned by the call
    pub data: T,
    /// Hash of the block the call was included in, if the backend reports it
    #[serde(default)]
    pub block_hash: Option<String>,
    /// Hash of the transaction that produced the data, if the backend reports it
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl<T> Data<T> {
    pub const fn new(data: T) -> Self {
        Self {
            data,
            block_hash: None,
            transaction_hash: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Data<U> {
        Data {
            data: f(self.data),
            block_hash: self.block_hash,
            transaction_hash: self.transaction_hash,
        }
    }
}

/// Decoded contract event together with the provenance reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event<T> {
    /// The decoded event payload
    pub data: T,
    /// Hash of the block the event was emitted in
    #[serde(default)]
    pub block_hash: Option<String>,
    /// Hash of the transaction that emitted the event
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl<T> Event<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Event<U> {
        Event {
            data: f(self.data),
            block_hash: self.block_hash,
            transaction_hash: self.transaction_hash,
        }
    }
}
