//! Call smart contracts through declarative metadata and pluggable backends
//!
//! A [contract descriptor](types::ContractDescriptor) describes how the methods and events of an
//! interface map onto a deployed contract. This crate provides:
//! - [Dispatch of interface calls](ContractWrapper) onto a [backend connector](ContractBackend),
//!   with argument and result conversion through the [type conversion registry](types::TypeConverters)
//! - Synchronous results, [pending results](PendingResult) and [event streams](EventStream)
//! - [Wrapper generation](WrapperGenerator) for a backend
//! - [Contract registries](ContractRegistry), in memory or [on the file system](FileSystemContractRegistry)
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use contract_native::{
//!     ContractBackend, ContractRegistry, FileSystemContractRegistry, RegistryConfig,
//!     WrapperGenerator,
//!     types::{MethodSignature, TypeConverters, convert::defaults::default_string_converters},
//! };
//!
//! # async fn example(backend: Arc<dyn ContractBackend>) -> Result<(), Box<dyn std::error::Error>> {
//! // Register the descriptors stored in `./contracts`
//! let registry = FileSystemContractRegistry::new(RegistryConfig::new("contracts"))?;
//! registry.load()?;
//!
//! // Bind the `hello` contract to the backend
//! let converters = Arc::new(TypeConverters::with_converters(default_string_converters()));
//! let generator = WrapperGenerator::new(backend, converters);
//! let hello = generator.generate(registry.get("hello")?)?;
//!
//! let _greeting: String = hello
//!     .call(MethodSignature::new("org.example.Hello", "get", []), [])
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatch;
mod generator;
mod registry;

pub use contract_native_types as types;
pub mod backend;
pub mod errors;

pub use crate::{
    backend::{
        BackendError, BackendResult, ContractBackend, RawEvent, RawEventRecord, RawEventStream,
        SpecialOperation, SpecialOperations,
    },
    config::RegistryConfig,
    dispatch::{Call, ContractWrapper, EventStream, Outcome, PendingResult},
    generator::{WrapperGenerator, wrapper_name},
    registry::{ContractRegistry, FileSystemContractRegistry, InMemoryContractRegistry},
    types::{Data, Event, Value},
};
