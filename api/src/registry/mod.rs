//! Registries of contract descriptors keyed by identifier.
use std::{collections::HashMap, sync::Arc};

use contract_native_types::ContractDescriptor;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::errors::{IllegalStateError, RegistryError};

mod file_system;

pub use file_system::FileSystemContractRegistry;

pub(crate) const REGISTRY_TARGET: &str = "contract_native::registry";

/// Registry of contract descriptors.
pub trait ContractRegistry: Send + Sync {
    /// Returns the descriptor registered under `identifier`.
    fn get(&self, identifier: &str) -> Result<Arc<ContractDescriptor>, IllegalStateError>;

    /// Registers a descriptor whose identifier is not registered yet.
    fn add(
        &self,
        descriptor: ContractDescriptor,
    ) -> Result<Arc<ContractDescriptor>, IllegalStateError>;

    /// Registers a descriptor, replacing any descriptor with the same identifier.
    fn add_or_update(&self, descriptor: ContractDescriptor) -> Arc<ContractDescriptor>;

    /// Registers a descriptor unless its identifier is already registered. Returns whether it was
    /// inserted.
    fn add_if_absent(&self, descriptor: ContractDescriptor) -> bool;

    fn is_registered(&self, identifier: &str) -> bool;

    fn contains(&self, descriptor: &ContractDescriptor) -> bool {
        self.is_registered(descriptor.identifier())
    }

    /// Snapshot of all registered descriptors, ordered by identifier.
    fn list(&self) -> Vec<Arc<ContractDescriptor>>;

    /// Writes all registered descriptors to durable storage.
    fn persist(&self) -> Result<(), RegistryError>;

    /// Registers the descriptors found in durable storage.
    fn load(&self) -> Result<(), RegistryError>;
}

/// What [`ContractStore::merge`] did with a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Merge {
    Inserted,
    Identical,
    Conflicting,
}

/// Descriptor map shared by the registry implementations.
#[derive(Debug, Default)]
pub(crate) struct ContractStore {
    contracts: RwLock<HashMap<String, Arc<ContractDescriptor>>>,
}

impl ContractStore {
    pub(crate) fn get(
        &self,
        identifier: &str,
    ) -> Result<Arc<ContractDescriptor>, IllegalStateError> {
        self.contracts
            .read()
            .get(identifier)
            .cloned()
            .ok_or_else(|| IllegalStateError::NotRegistered(identifier.to_string()))
    }

    pub(crate) fn add(
        &self,
        descriptor: ContractDescriptor,
    ) -> Result<Arc<ContractDescriptor>, IllegalStateError> {
        let mut contracts = self.contracts.write();
        if contracts.contains_key(descriptor.identifier()) {
            return Err(IllegalStateError::AlreadyRegistered(
                descriptor.identifier().to_string(),
            ));
        }
        debug!(target: REGISTRY_TARGET, identifier = descriptor.identifier(), "Registered contract");
        let descriptor = Arc::new(descriptor);
        contracts.insert(descriptor.identifier().to_string(), descriptor.clone());
        Ok(descriptor)
    }

    pub(crate) fn add_or_update(&self, descriptor: ContractDescriptor) -> Arc<ContractDescriptor> {
        let descriptor = Arc::new(descriptor);
        let replaced = self
            .contracts
            .write()
            .insert(descriptor.identifier().to_string(), descriptor.clone());
        debug!(
            target: REGISTRY_TARGET,
            identifier = descriptor.identifier(),
            replaced = replaced.is_some(),
            "Registered contract"
        );
        descriptor
    }

    pub(crate) fn add_if_absent(&self, descriptor: ContractDescriptor) -> bool {
        let mut contracts = self.contracts.write();
        if contracts.contains_key(descriptor.identifier()) {
            return false;
        }
        contracts.insert(descriptor.identifier().to_string(), Arc::new(descriptor));
        true
    }

    /// Inserts a loaded descriptor. An identifier that is already registered keeps its first
    /// registrant.
    pub(crate) fn merge(&self, descriptor: ContractDescriptor) -> Merge {
        let mut contracts = self.contracts.write();
        match contracts.get(descriptor.identifier()) {
            Some(existing) if **existing == descriptor => Merge::Identical,
            Some(_) => {
                warn!(
                    target: REGISTRY_TARGET,
                    identifier = descriptor.identifier(),
                    "Keeping already registered contract, ignoring a different descriptor"
                );
                Merge::Conflicting
            }
            None => {
                contracts.insert(descriptor.identifier().to_string(), Arc::new(descriptor));
                Merge::Inserted
            }
        }
    }

    pub(crate) fn is_registered(&self, identifier: &str) -> bool {
        self.contracts.read().contains_key(identifier)
    }

    pub(crate) fn list(&self) -> Vec<Arc<ContractDescriptor>> {
        let mut contracts: Vec<_> = self.contracts.read().values().cloned().collect();
        contracts.sort_by(|a, b| a.identifier().cmp(b.identifier()));
        contracts
    }
}

/// Registry that only lives in memory. [`persist`](ContractRegistry::persist) and
/// [`load`](ContractRegistry::load) do nothing.
#[derive(Debug, Default)]
pub struct InMemoryContractRegistry {
    store: ContractStore,
}

impl InMemoryContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContractRegistry for InMemoryContractRegistry {
    fn get(&self, identifier: &str) -> Result<Arc<ContractDescriptor>, IllegalStateError> {
        self.store.get(identifier)
    }

    fn add(
        &self,
        descriptor: ContractDescriptor,
    ) -> Result<Arc<ContractDescriptor>, IllegalStateError> {
        self.store.add(descriptor)
    }

    fn add_or_update(&self, descriptor: ContractDescriptor) -> Arc<ContractDescriptor> {
        self.store.add_or_update(descriptor)
    }

    fn add_if_absent(&self, descriptor: ContractDescriptor) -> bool {
        self.store.add_if_absent(descriptor)
    }

    fn is_registered(&self, identifier: &str) -> bool {
        self.store.is_registered(identifier)
    }

    fn list(&self) -> Vec<Arc<ContractDescriptor>> {
        self.store.list()
    }

    fn persist(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    fn load(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use contract_native_types::BackendInfo;

    use super::*;

    fn descriptor(identifier: &str, interface: &str) -> ContractDescriptor {
        ContractDescriptor::new(identifier, interface, [], [], BackendInfo::Generic).unwrap()
    }

    #[test]
    fn merge_keeps_first_registrant() {
        let store = ContractStore::default();

        assert_eq!(store.merge(descriptor("a", "org.example.A")), Merge::Inserted);
        assert_eq!(store.merge(descriptor("a", "org.example.A")), Merge::Identical);
        assert_eq!(store.merge(descriptor("a", "org.example.B")), Merge::Conflicting);
        assert_eq!(store.get("a").unwrap().interface_type(), "org.example.A");
    }

    #[test]
    fn list_is_ordered_snapshot() {
        let registry = InMemoryContractRegistry::new();
        registry.add(descriptor("b", "org.example.B")).unwrap();
        registry.add(descriptor("a", "org.example.A")).unwrap();

        let listed = registry.list();
        registry.add_or_update(descriptor("c", "org.example.C"));

        let identifiers: Vec<_> = listed.iter().map(|d| d.identifier()).collect();
        assert_eq!(identifiers, ["a", "b"]);
        assert!(registry.contains(&descriptor("c", "org.example.C")));
    }
}
