//! Metadata describing how the methods and events of an interface map onto a contract.
//!
//! A [`ContractDescriptor`] is immutable once built, apart from the backend status fields
//! reachable through [`ContractDescriptor::backend_mut`] (deployment address, installed peers).
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{errors::MetadataError, signature::MethodSignature};

mod backend;
mod event;
mod method;

pub use backend::{
    BackendInfo, BackendKind, ChaincodeId, ChaincodeLanguage, EthereumInfo, FabricInfo, QuorumInfo,
};
pub use event::{EventDescriptor, EventFieldDescriptor, EventParameterDescriptor};
pub use method::{MethodDescriptor, ParameterDescriptor};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ContractDescriptorRepr")]
pub struct ContractDescriptor {
    backend: BackendInfo,
    #[serde(rename = "eventInfos")]
    events: BTreeMap<String, EventDescriptor>,
    identifier: String,
    #[serde(rename = "interfaceType")]
    interface_type: String,
    #[serde(rename = "methodInfos")]
    methods: BTreeMap<MethodSignature, MethodDescriptor>,
    #[serde(skip)]
    events_by_signature: HashMap<MethodSignature, String>,
}

impl ContractDescriptor {
    /// Builds a descriptor and checks that all members belong to `interface_type` and are
    /// consistent with their signatures.
    pub fn new(
        identifier: impl Into<String>,
        interface_type: impl Into<String>,
        methods: impl IntoIterator<Item = MethodDescriptor>,
        events: impl IntoIterator<Item = EventDescriptor>,
        backend: BackendInfo,
    ) -> Result<Self, MetadataError> {
        let identifier = identifier.into();
        let interface_type = interface_type.into();
        if identifier.trim().is_empty() {
            return Err(MetadataError::EmptyIdentifier);
        }
        backend.validate()?;

        let check_member = |signature: &MethodSignature| {
            if signature.declaring_type() == interface_type {
                Ok(())
            } else {
                Err(MetadataError::ForeignMember {
                    member: signature.to_string(),
                    interface: interface_type.clone(),
                })
            }
        };

        let mut method_map = BTreeMap::new();
        for method in methods {
            check_member(method.signature())?;
            method.validate()?;
            method_map.insert(method.signature().clone(), method);
        }

        let mut event_map = BTreeMap::new();
        let mut events_by_signature = HashMap::new();
        for event in events {
            check_member(event.signature())?;
            event.validate()?;
            if event_map.contains_key(event.name())
                || events_by_signature.contains_key(event.signature())
            {
                return Err(MetadataError::DuplicateEvent(event.name().to_string()));
            }
            events_by_signature.insert(event.signature().clone(), event.name().to_string());
            event_map.insert(event.name().to_string(), event);
        }

        Ok(Self {
            backend,
            events: event_map,
            identifier,
            interface_type,
            methods: method_map,
            events_by_signature,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Fully qualified name of the interface the descriptor implements.
    pub fn interface_type(&self) -> &str {
        &self.interface_type
    }

    pub const fn backend(&self) -> &BackendInfo {
        &self.backend
    }

    /// Mutable access to the backend status fields.
    pub const fn backend_mut(&mut self) -> &mut BackendInfo {
        &mut self.backend
    }

    pub const fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub const fn methods(&self) -> &BTreeMap<MethodSignature, MethodDescriptor> {
        &self.methods
    }

    pub const fn events(&self) -> &BTreeMap<String, EventDescriptor> {
        &self.events
    }

    pub fn method(&self, signature: &MethodSignature) -> Option<&MethodDescriptor> {
        self.methods.get(signature)
    }

    /// Like [`method`](Self::method) but treats a missing descriptor as an error.
    pub fn require_method(
        &self,
        signature: &MethodSignature,
    ) -> Result<&MethodDescriptor, MetadataError> {
        self.method(signature)
            .ok_or_else(|| MetadataError::NotFound(signature.to_string()))
    }

    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        self.events.get(name)
    }

    /// Event declared by the event method `signature`.
    pub fn event_for(&self, signature: &MethodSignature) -> Option<&EventDescriptor> {
        self.events_by_signature
            .get(signature)
            .and_then(|name| self.events.get(name))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractDescriptorRepr {
    #[serde(default)]
    backend: BackendInfo,
    #[serde(default)]
    event_infos: BTreeMap<String, EventDescriptor>,
    identifier: String,
    interface_type: String,
    #[serde(default)]
    method_infos: BTreeMap<MethodSignature, MethodDescriptor>,
}

impl TryFrom<ContractDescriptorRepr> for ContractDescriptor {
    type Error = MetadataError;

    fn try_from(repr: ContractDescriptorRepr) -> Result<Self, Self::Error> {
        for (key, method) in &repr.method_infos {
            if key != method.signature() {
                return Err(MetadataError::MethodKeyMismatch {
                    key: key.to_string(),
                    method: method.signature().to_string(),
                });
            }
        }
        for (key, event) in &repr.event_infos {
            if key != event.name() {
                return Err(MetadataError::EventKeyMismatch {
                    key: key.clone(),
                    name: event.name().to_string(),
                });
            }
        }
        Self::new(
            repr.identifier,
            repr.interface_type,
            repr.method_infos.into_values(),
            repr.event_infos.into_values(),
            repr.backend,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        TypeTag,
        signature::{FieldRef, GET_CONTRACT_DESCRIPTOR},
    };

    const HELLO: &str = "org.example.HelloContract";

    fn signature(name: &str, parameters: impl IntoIterator<Item = TypeTag>) -> MethodSignature {
        MethodSignature::new(HELLO, name, parameters)
    }

    fn hello() -> ContractDescriptor {
        let get = MethodDescriptor::new(signature("get", []), TypeTag::String).as_read_only();
        let set = MethodDescriptor::new(
            signature("set", [TypeTag::String, TypeTag::list(TypeTag::String)]),
            TypeTag::pending(TypeTag::Unit),
        )
        .configure_parameter(1, |p| p.special("privateFor"));
        let greeting = EventDescriptor::new(
            "Greeting",
            signature("greetings", []),
            TypeTag::event_stream(TypeTag::event(TypeTag::named("org.example.Greeting"))),
        )
        .with_field(EventFieldDescriptor::new(
            FieldRef::new("org.example.Greeting", "message"),
            TypeTag::String,
        ));

        ContractDescriptor::new(
            "hello",
            HELLO,
            [get, set],
            [greeting],
            BackendInfo::Ethereum(EthereumInfo::new("[]").unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn lookups() {
        let descriptor = hello();

        assert!(descriptor.method(&signature("get", [])).is_some());
        assert!(matches!(
            descriptor.require_method(&signature(GET_CONTRACT_DESCRIPTOR, [])),
            Err(MetadataError::NotFound(_))
        ));
        assert_eq!(
            descriptor.event_for(&signature("greetings", [])).map(EventDescriptor::name),
            Some("Greeting")
        );
        assert!(descriptor.event("Greeting").is_some());
        assert_eq!(descriptor.kind(), BackendKind::Ethereum);
    }

    #[test]
    fn rejects_invalid_descriptors() {
        assert!(matches!(
            ContractDescriptor::new(" ", HELLO, [], [], BackendInfo::Generic),
            Err(MetadataError::EmptyIdentifier)
        ));

        let foreign = MethodDescriptor::new(
            MethodSignature::new("org.example.Other", "get", []),
            TypeTag::Unit,
        );
        assert!(matches!(
            ContractDescriptor::new("id", HELLO, [foreign], [], BackendInfo::Generic),
            Err(MetadataError::ForeignMember { .. })
        ));

        let event = |method: &str| {
            EventDescriptor::new(
                "Twice",
                signature(method, []),
                TypeTag::event_stream(TypeTag::Any),
            )
        };
        assert!(matches!(
            ContractDescriptor::new("id", HELLO, [], [event("a"), event("b")], BackendInfo::Generic),
            Err(MetadataError::DuplicateEvent(_))
        ));
    }

    #[test]
    fn backend_status_is_mutable() {
        let mut descriptor = hello();
        descriptor
            .backend_mut()
            .ethereum_mut()
            .unwrap()
            .set_contract_address("0xabc");
        assert!(descriptor.backend().ethereum().unwrap().is_deployed());
    }

    #[test]
    fn serde_round_trip_uses_canonical_keys() {
        let descriptor = hello();
        let json = serde_json::to_value(&descriptor).unwrap();

        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            ["backend", "eventInfos", "identifier", "interfaceType", "methodInfos"]
        );
        let method_keys: Vec<_> = json["methodInfos"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            method_keys,
            [
                "org.example.HelloContract.get()",
                "org.example.HelloContract.set(String, Vec<String>)",
            ]
        );
        assert_eq!(json["backend"]["kind"], json!("ethereum"));

        let reloaded: ContractDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(reloaded, descriptor);
        assert!(reloaded.event_for(&signature("greetings", [])).is_some());
    }

    #[test]
    fn deserialization_checks_keys() {
        let mut json = serde_json::to_value(hello()).unwrap();
        let methods = json["methodInfos"].as_object_mut().unwrap();
        let get = methods.remove("org.example.HelloContract.get()").unwrap();
        methods.insert("org.example.HelloContract.other()".to_string(), get);

        let error = serde_json::from_value::<ContractDescriptor>(json).unwrap_err();
        assert!(error.to_string().contains("does not match"), "{error}");
    }
}
