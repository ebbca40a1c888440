use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use contract_native_types::ContractDescriptor;
use tracing::{debug, error, info};

use super::{ContractRegistry, ContractStore, REGISTRY_TARGET};
use crate::{
    config::RegistryConfig,
    errors::{IllegalStateError, RegistryError, SerializationError},
};

/// Registry persisting each descriptor as a pretty printed JSON document named
/// `<identifier>.<extension>` in the configured directory.
#[derive(Debug)]
pub struct FileSystemContractRegistry {
    config: RegistryConfig,
    store: ContractStore,
}

impl FileSystemContractRegistry {
    /// Creates an empty registry, making sure the base directory exists.
    ///
    /// Descriptors already stored in the directory are only registered by
    /// [`load`](ContractRegistry::load).
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        ensure_directory(&config)?;
        Ok(Self {
            config,
            store: ContractStore::default(),
        })
    }

    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn descriptor_path(&self, identifier: &str) -> Result<PathBuf, SerializationError> {
        let unusable = identifier.trim().is_empty()
            || identifier.contains(['/', '\\'])
            || identifier.contains("..");
        if unusable {
            return Err(SerializationError::InvalidFileName(identifier.to_string()));
        }
        Ok(self.config.file_path(identifier))
    }

    fn write(&self, descriptor: &ContractDescriptor) -> Result<(), SerializationError> {
        let path = self.descriptor_path(descriptor.identifier())?;
        // Going through `Value` sorts the keys of every object.
        let json = serde_json::to_value(descriptor)
            .and_then(|value| serde_json::to_string_pretty(&value))
            .map_err(|source| SerializationError::Json {
                path: path.clone(),
                source,
            })?;
        fs::write(&path, json).map_err(|source| SerializationError::Io { path, source })
    }

    /// Descriptor files in the base directory, ordered by file name.
    fn descriptor_files(&self) -> Result<Vec<PathBuf>, SerializationError> {
        let base_path = self.config.base_path();
        let io_error = |source| SerializationError::Io {
            path: base_path.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(base_path).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            let matches_extension = path
                .extension()
                .is_some_and(|extension| extension == self.config.file_extension.as_str());
            if matches_extension && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl ContractRegistry for FileSystemContractRegistry {
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

    /// Writes every descriptor in identifier order and stops at the first failure.
    fn persist(&self) -> Result<(), RegistryError> {
        let contracts = self.store.list();
        for descriptor in &contracts {
            if let Err(e) = self.write(descriptor) {
                error!(
                    target: REGISTRY_TARGET,
                    identifier = descriptor.identifier(),
                    error = %e,
                    "Failed to persist contract"
                );
                return Err(e.into());
            }
        }
        info!(
            target: REGISTRY_TARGET,
            count = contracts.len(),
            path = %self.config.base_path().display(),
            "Persisted contracts"
        );
        Ok(())
    }

    /// Registers the descriptors stored in the base directory.
    ///
    /// Descriptors loaded before a failing file stay registered. Two files declaring the same
    /// identifier are an error.
    fn load(&self) -> Result<(), RegistryError> {
        let files = self.descriptor_files().inspect_err(|e| {
            error!(target: REGISTRY_TARGET, error = %e, "Failed to list contract files");
        })?;

        let mut sources: HashMap<String, PathBuf> = HashMap::new();
        for path in files {
            let descriptor = read_descriptor(&path).inspect_err(|e| {
                error!(target: REGISTRY_TARGET, error = %e, "Failed to load contract");
            })?;

            if let Some(first) = sources.get(descriptor.identifier()) {
                return Err(IllegalStateError::DuplicateSource {
                    identifier: descriptor.identifier().to_string(),
                    first: first.clone(),
                    second: path,
                }
                .into());
            }
            sources.insert(descriptor.identifier().to_string(), path.clone());

            let identifier = descriptor.identifier().to_string();
            let merge = self.store.merge(descriptor);
            debug!(
                target: REGISTRY_TARGET,
                %identifier,
                path = %path.display(),
                ?merge,
                "Loaded contract"
            );
        }
        info!(target: REGISTRY_TARGET, count = sources.len(), "Loaded contracts");
        Ok(())
    }
}

fn read_descriptor(path: &Path) -> Result<ContractDescriptor, SerializationError> {
    let content = fs::read_to_string(path).map_err(|source| SerializationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SerializationError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_directory(config: &RegistryConfig) -> Result<(), SerializationError> {
    let path = config.base_path();
    let io_error = |source| SerializationError::Io {
        path: path.to_path_buf(),
        source,
    };
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(io_error(io::Error::from(io::ErrorKind::NotADirectory))),
        Err(e) if e.kind() == io::ErrorKind::NotFound && config.create_missing_directory => {
            info!(target: REGISTRY_TARGET, path = %path.display(), "Creating contract directory");
            fs::create_dir_all(path).map_err(io_error)
        }
        Err(e) => Err(io_error(e)),
    }
}
