#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use contract_native::{
    BackendError, BackendResult, ContractBackend, RawEvent, RawEventRecord, RawEventStream,
    SpecialOperations, WrapperGenerator,
    types::{
        BackendInfo, ContractDescriptor, EventDescriptor, EventFieldDescriptor, FieldRef,
        MethodDescriptor, MethodSignature, TypeConverters, TypeTag, Value,
        convert::defaults::default_string_converters, metadata::{EthereumInfo, QuorumInfo},
    },
};
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use serde_json::json;

pub const HELLO_IDENTIFIER: &str = "2417b8dc-5e3f-4b5a-9a41-0d8e6c3b7f21";
pub const HELLO_INTERFACE: &str = "org.example.HelloContract";
pub const GREETING: &str = "org.example.Greeting";

const HELLO_ABI: &str = r#"[
    {"type": "function", "name": "get", "inputs": [], "outputs": [{"name": "", "type": "string"}], "constant": true},
    {"type": "function", "name": "set", "inputs": [{"name": "value", "type": "int32"}], "outputs": []},
    {"type": "event", "name": "Greeting", "inputs": [{"name": "message", "type": "string"}, {"name": "count", "type": "uint64"}]}
]"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn signature(name: &str, parameters: impl IntoIterator<Item = TypeTag>) -> MethodSignature {
    MethodSignature::new(HELLO_INTERFACE, name, parameters)
}

pub fn get_signature() -> MethodSignature {
    signature("get", [])
}

pub fn set_signature() -> MethodSignature {
    signature("set", [TypeTag::I32, TypeTag::list(TypeTag::String)])
}

pub fn deploy_signature() -> MethodSignature {
    signature("deploy", [])
}

pub fn greetings_signature() -> MethodSignature {
    signature("greetings", [])
}

/// Quorum contract with a read-only getter, a private setter and a deployment method.
pub fn hello_descriptor() -> ContractDescriptor {
    let get = MethodDescriptor::new(get_signature(), TypeTag::String).as_read_only();
    let set = MethodDescriptor::new(set_signature(), TypeTag::pending(TypeTag::data(TypeTag::Unit)))
        .configure_parameter(1, |p| p.special("privateFor"));
    let deploy = MethodDescriptor::new(deploy_signature(), TypeTag::String).as_special_operation();

    let backend = QuorumInfo::new(EthereumInfo::new(HELLO_ABI).expect("valid ABI"))
        .with_private_for(["ROAZBWtSacxXQrOe3FGAqJDyJjFePR5ce4TSIzmJ0Bc="]);

    ContractDescriptor::new(
        HELLO_IDENTIFIER,
        HELLO_INTERFACE,
        [get, set, deploy],
        [],
        BackendInfo::Quorum(backend),
    )
    .expect("valid descriptor")
}

/// The hello contract extended with an event method emitting greetings.
pub fn hello_descriptor_with_events(return_type: TypeTag) -> ContractDescriptor {
    let hello = hello_descriptor();
    let greetings = EventDescriptor::new("Greeting", greetings_signature(), return_type)
        .with_field(EventFieldDescriptor::new(
            FieldRef::new(GREETING, "message"),
            TypeTag::String,
        ))
        .with_field(
            EventFieldDescriptor::new(FieldRef::new(GREETING, "count"), TypeTag::I64)
                .with_source_index(1),
        );

    ContractDescriptor::new(
        hello.identifier(),
        hello.interface_type(),
        hello.methods().values().cloned(),
        [greetings],
        hello.backend().clone(),
    )
    .expect("valid descriptor")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Executor {
    Transaction,
    ReadOnly,
    Special(String),
    Events(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub executor: Executor,
    pub method: MethodSignature,
    pub args: Vec<Value>,
}

/// Backend returning scripted results and recording every call it receives.
pub struct MockBackend {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    results: Mutex<HashMap<String, Result<BackendResult, String>>>,
    events: Mutex<Vec<RawEventRecord>>,
    special_operations: SpecialOperations,
}

impl MockBackend {
    pub fn new() -> Self {
        let calls: Arc<Mutex<Vec<RecordedCall>>> = Arc::default();
        let recorded = calls.clone();
        let special_operations = SpecialOperations::new().with(
            "deploy",
            move |_: ContractDescriptor, method: MethodDescriptor, args: Vec<Value>| {
                recorded.lock().push(RecordedCall {
                    executor: Executor::Special("deploy".to_string()),
                    method: method.signature().clone(),
                    args,
                });
                async { Ok::<_, BackendError>(BackendResult::new(json!("0xc0ffee"))) }
            },
        );

        Self {
            calls,
            results: Mutex::default(),
            events: Mutex::default(),
            special_operations,
        }
    }

    /// Result returned for calls of the backend operation `operation`.
    pub fn with_result(self, operation: &str, result: BackendResult) -> Self {
        self.results.lock().insert(operation.to_string(), Ok(result));
        self
    }

    pub fn with_failure(self, operation: &str, message: &str) -> Self {
        self.results
            .lock()
            .insert(operation.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_events(self, events: impl IntoIterator<Item = RawEventRecord>) -> Self {
        self.events.lock().extend(events);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    fn record(&self, executor: Executor, method: &MethodSignature, args: Vec<Value>) {
        self.calls.lock().push(RecordedCall {
            executor,
            method: method.clone(),
            args,
        });
    }

    fn result(&self, operation: &str) -> Result<BackendResult, BackendError> {
        match self.results.lock().get(operation) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(message.clone().into()),
            None => Ok(BackendResult::default()),
        }
    }
}

#[async_trait]
impl ContractBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(
        &self,
        _contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError> {
        self.record(Executor::Transaction, method.signature(), args);
        self.result(&method.backend_operation_name)
    }

    async fn invoke_read_only(
        &self,
        _contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError> {
        self.record(Executor::ReadOnly, method.signature(), args);
        self.result(&method.backend_operation_name)
    }

    fn special_operations(&self) -> &SpecialOperations {
        &self.special_operations
    }

    async fn events(
        &self,
        _contract: &ContractDescriptor,
        event: &EventDescriptor,
        args: Vec<Value>,
    ) -> Result<RawEventStream, BackendError> {
        self.record(Executor::Events(event.name().to_string()), event.signature(), args);
        let events = self.events.lock().clone();
        Ok(stream::iter(events)
            .map(|event| Ok(Box::new(event) as Box<dyn RawEvent>))
            .boxed())
    }
}

/// Backend that only supports generic descriptors.
pub struct GenericOnlyBackend(pub MockBackend);

#[async_trait]
impl ContractBackend for GenericOnlyBackend {
    fn name(&self) -> &str {
        "generic-only"
    }

    fn supports(&self, descriptor: &ContractDescriptor) -> bool {
        matches!(descriptor.backend(), BackendInfo::Generic)
    }

    async fn invoke(
        &self,
        contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError> {
        self.0.invoke(contract, method, args).await
    }

    async fn invoke_read_only(
        &self,
        contract: &ContractDescriptor,
        method: &MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<BackendResult, BackendError> {
        self.0.invoke_read_only(contract, method, args).await
    }

    fn special_operations(&self) -> &SpecialOperations {
        self.0.special_operations()
    }

    async fn events(
        &self,
        contract: &ContractDescriptor,
        event: &EventDescriptor,
        args: Vec<Value>,
    ) -> Result<RawEventStream, BackendError> {
        self.0.events(contract, event, args).await
    }
}

pub fn generator(backend: Arc<dyn ContractBackend>) -> WrapperGenerator {
    let converters = TypeConverters::with_converters(default_string_converters());
    WrapperGenerator::new(backend, Arc::new(converters))
}
