use std::sync::Arc;

use contract_native_types::{ContractDescriptor, TypeConverters};
use tracing::info;

use crate::{backend::ContractBackend, dispatch::ContractWrapper, errors::IllegalStateError};

const GENERATOR_TARGET: &str = "contract_native::generator";

/// Creates [`ContractWrapper`]s for descriptors supported by one backend.
#[derive(Clone)]
pub struct WrapperGenerator {
    backend: Arc<dyn ContractBackend>,
    converters: Arc<TypeConverters>,
}

impl WrapperGenerator {
    pub fn new(backend: Arc<dyn ContractBackend>, converters: Arc<TypeConverters>) -> Self {
        Self {
            backend,
            converters,
        }
    }

    pub fn converters(&self) -> &Arc<TypeConverters> {
        &self.converters
    }

    /// Binds `descriptor` to the backend.
    pub fn generate(
        &self,
        descriptor: Arc<ContractDescriptor>,
    ) -> Result<ContractWrapper, IllegalStateError> {
        if !self.backend.supports(&descriptor) {
            return Err(IllegalStateError::UnsupportedDescriptor {
                backend: self.backend.name().to_string(),
                kind: descriptor.kind().to_string(),
            });
        }
        info!(
            target: GENERATOR_TARGET,
            wrapper = %wrapper_name(&descriptor),
            backend = self.backend.name(),
            "Generated contract wrapper"
        );
        Ok(ContractWrapper::new(
            descriptor,
            self.backend.clone(),
            self.converters.clone(),
        ))
    }
}

impl std::fmt::Debug for WrapperGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperGenerator")
            .field("backend", &self.backend.name())
            .field("converters", &self.converters)
            .finish()
    }
}

/// Stable name of the wrapper generated for `descriptor`, used in logs.
///
/// Characters outside `[a-zA-Z0-9_-]` are dropped from the identifier.
pub fn wrapper_name(descriptor: &ContractDescriptor) -> String {
    let identifier: String = descriptor
        .identifier()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!(
        "contract_native::wrapper::{}Wrapper_{identifier}",
        descriptor.kind().descriptor_type_name()
    )
}

#[cfg(test)]
mod tests {
    use contract_native_types::BackendInfo;

    use super::*;

    #[test]
    fn wrapper_name_drops_unsafe_characters() {
        let descriptor = ContractDescriptor::new(
            "hello/world v1.0",
            "org.example.Hello",
            [],
            [],
            BackendInfo::Generic,
        )
        .unwrap();
        assert_eq!(
            wrapper_name(&descriptor),
            "contract_native::wrapper::ContractDescriptorWrapper_helloworldv10"
        );
    }
}
