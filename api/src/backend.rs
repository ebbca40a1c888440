//! The seam between the dispatch engine and a concrete backend connector.
//!
//! A connector executes state-changing and read-only calls, provides handlers for special
//! operations such as deployment, and exposes a source of raw events. Wire protocols, signing and
//! connection management are entirely the connector's business.
use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use futures::stream::BoxStream;

use contract_native_types::{
    ContractDescriptor, EventDescriptor, EventFieldDescriptor, MethodDescriptor, Value,
};

/// Error reported by a backend connector.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Stream of raw events produced by a backend subscription.
pub type RawEventStream = BoxStream<'static, Result<Box<dyn RawEvent>, BackendError>>;

/// Result of a backend operation together with the provenance the backend reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendResult {
    pub value: Value,
    pub block_hash: Option<String>,
    pub transaction_hash: Option<String>,
}

impl BackendResult {
    pub const fn new(value: Value) -> Self {
        Self {
            value,
            block_hash: None,
            transaction_hash: None,
        }
    }

    pub fn with_block_hash(mut self, block_hash: impl Into<String>) -> Self {
        self.block_hash = Some(block_hash.into());
        self
    }

    pub fn with_transaction_hash(mut self, transaction_hash: impl Into<String>) -> Self {
        self.transaction_hash = Some(transaction_hash.into());
        self
    }
}

impl From<Value> for BackendResult {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// A backend connector.
///
/// Every executor receives the bound contract descriptor, the method descriptor and the full
/// argument list, special arguments included. Ordinary arguments have already been converted as
/// requested by the parameter descriptors.
#[async_trait]
pub trait ContractBackend: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether this backend can execute calls described by `descriptor`.
    fn supports(&self, descriptor: &ContractDescriptor) -> bool {
        let _ = descriptor;
        true
    }

    /// Executes a state-changing call.
    async fn invoke(
        &self,
        contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError>;

    /// Executes a call that does not change contract state.
    async fn invoke_read_only(
        &self,
        contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError>;

    /// Handlers of special operations, keyed by backend operation name.
    fn special_operations(&self) -> &SpecialOperations;

    /// Subscribes to the raw events described by `event`.
    async fn events(
        &self,
        contract: &ContractDescriptor,
        event: &EventDescriptor,
        args: Vec<Value>,
    ) -> Result<RawEventStream, BackendError>;
}

/// Handler of a special operation, e.g. contract deployment.
#[async_trait]
pub trait SpecialOperation: Send + Sync {
    async fn execute(
        &self,
        contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError>;
}

#[async_trait]
impl<F, Fut> SpecialOperation for F
where
    F: Fn(ContractDescriptor, MethodDescriptor, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BackendResult, BackendError>> + Send + 'static,
{
    async fn execute(
        &self,
        contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError> {
        self(contract.clone(), method.clone(), args).await
    }
}

/// Special operation handlers keyed by backend operation name.
#[derive(Clone, Default)]
pub struct SpecialOperations {
    handlers: HashMap<String, Arc<dyn SpecialOperation>>,
}

impl SpecialOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, handler: impl SpecialOperation + 'static) -> Self {
        self.register(name, handler);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, handler: impl SpecialOperation + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SpecialOperation>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl fmt::Debug for SpecialOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("SpecialOperations")
            .field("handlers", &names)
            .finish()
    }
}

/// An event as delivered by the backend, before it is decoded into the declared payload type.
pub trait RawEvent: Send + Sync + fmt::Debug {
    fn field_by_name(&self, name: &str) -> Option<Value>;

    fn field_by_index(&self, index: usize) -> Option<Value>;

    fn block_hash(&self) -> Option<String> {
        None
    }

    fn transaction_hash(&self) -> Option<String> {
        None
    }

    /// Raw value of the payload field described by `descriptor`. The source index is preferred
    /// over the source name.
    fn field(&self, descriptor: &EventFieldDescriptor) -> Option<Value> {
        match descriptor.source_index {
            Some(index) => self.field_by_index(index),
            None => self.field_by_name(&descriptor.source_name),
        }
    }
}

/// A [`RawEvent`] holding its fields in memory, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEventRecord {
    fields: Vec<(String, Value)>,
    block_hash: Option<String>,
    transaction_hash: Option<String>,
}

impl RawEventRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn with_block_hash(mut self, block_hash: impl Into<String>) -> Self {
        self.block_hash = Some(block_hash.into());
        self
    }

    pub fn with_transaction_hash(mut self, transaction_hash: impl Into<String>) -> Self {
        self.transaction_hash = Some(transaction_hash.into());
        self
    }
}

impl RawEvent for RawEventRecord {
    fn field_by_name(&self, name: &str) -> Option<Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.clone())
    }

    fn field_by_index(&self, index: usize) -> Option<Value> {
        self.fields.get(index).map(|(_, value)| value.clone())
    }

    fn block_hash(&self) -> Option<String> {
        self.block_hash.clone()
    }

    fn transaction_hash(&self) -> Option<String> {
        self.transaction_hash.clone()
    }
}
