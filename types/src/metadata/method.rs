use serde::{Deserialize, Serialize};

use crate::{
    ConverterKind, TypeTag, Value,
    errors::MetadataError,
    signature::{MethodSignature, ParameterRef},
};

/// How one declared parameter of a method is passed to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    parameter: ParameterRef,
    /// Name under which a special argument is handed to the backend instead of the contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_argument_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<ConverterKind>,
    /// Type the argument is converted to through the converter registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coerce_to_type: Option<TypeTag>,
    /// Backend schema type, e.g. the Solidity type of the parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_type: Option<String>,
}

impl ParameterDescriptor {
    pub const fn new(parameter: ParameterRef) -> Self {
        Self {
            parameter,
            special_argument_name: None,
            converter: None,
            coerce_to_type: None,
            backend_type: None,
        }
    }

    pub const fn parameter(&self) -> &ParameterRef {
        &self.parameter
    }

    pub const fn position(&self) -> usize {
        self.parameter.index()
    }

    pub fn parameter_type(&self) -> &TypeTag {
        self.parameter.parameter_type()
    }

    pub fn is_special_argument(&self) -> bool {
        self.special_argument_name
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }

    pub fn special(mut self, name: impl Into<String>) -> Self {
        self.special_argument_name = Some(name.into());
        self
    }

    pub fn with_converter(mut self, converter: impl Into<ConverterKind>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    pub fn coerce_to(mut self, type_tag: TypeTag) -> Self {
        self.coerce_to_type = Some(type_tag);
        self
    }

    pub fn with_backend_type(mut self, backend_type: impl Into<String>) -> Self {
        self.backend_type = Some(backend_type.into());
        self
    }

    /// Converter explicitly requested for this parameter, ignoring the no-op placeholder.
    pub fn explicit_converter(&self) -> Option<&ConverterKind> {
        self.converter.as_ref().filter(|kind| !kind.is_no_op())
    }
}

/// Describes how a call of an interface method maps onto a backend operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    #[serde(rename = "method")]
    signature: MethodSignature,
    pub backend_operation_name: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub special_operation: bool,
    /// Declared return type, `Pending<..>` for methods that do not wait for the result
    pub return_type: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_converter: Option<ConverterKind>,
    parameters: Vec<ParameterDescriptor>,
}

impl MethodDescriptor {
    /// Creates a descriptor passing every parameter as an ordinary argument to the backend
    /// operation of the same name.
    pub fn new(signature: MethodSignature, return_type: TypeTag) -> Self {
        let parameters = (0..signature.arity())
            .filter_map(|index| signature.parameter(index))
            .map(ParameterDescriptor::new)
            .collect();
        Self {
            backend_operation_name: signature.name().to_string(),
            signature,
            read_only: false,
            special_operation: false,
            return_type,
            result_converter: None,
            parameters,
        }
    }

    pub fn with_backend_operation_name(mut self, name: impl Into<String>) -> Self {
        self.backend_operation_name = name.into();
        self
    }

    pub fn as_read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn as_special_operation(mut self) -> Self {
        self.special_operation = true;
        self
    }

    pub fn with_result_converter(mut self, converter: impl Into<ConverterKind>) -> Self {
        self.result_converter = Some(converter.into());
        self
    }

    /// Replaces the descriptor of the parameter at the descriptor's position.
    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        let position = parameter.position();
        match self.parameters.get_mut(position) {
            Some(slot) => *slot = parameter,
            None => self.parameters.push(parameter),
        }
        self
    }

    /// Updates the descriptor of the parameter at `position`, if there is one.
    pub fn configure_parameter(
        mut self,
        position: usize,
        configure: impl FnOnce(ParameterDescriptor) -> ParameterDescriptor,
    ) -> Self {
        if position < self.parameters.len() {
            let parameter = self.parameters.remove(position);
            self.parameters.insert(position, configure(parameter));
        }
        self
    }

    pub const fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn parameter(&self, position: usize) -> Option<&ParameterDescriptor> {
        self.parameters.get(position)
    }

    pub const fn is_async(&self) -> bool {
        matches!(self.return_type, TypeTag::Pending(_))
    }

    pub fn is_void(&self) -> bool {
        self.actual_return_type().is_unit()
    }

    pub fn uses_result_envelope(&self) -> bool {
        matches!(self.return_type.without_pending(), TypeTag::Data(_))
    }

    /// Return type without `Pending<..>` and `Data<..>` wrappers.
    pub fn actual_return_type(&self) -> &TypeTag {
        self.return_type.actual_type()
    }

    pub fn explicit_result_converter(&self) -> Option<&ConverterKind> {
        self.result_converter.as_ref().filter(|kind| !kind.is_no_op())
    }

    /// Returns the argument passed for the special argument `name` (matched case-insensitively).
    pub fn special_argument<'a>(&self, name: &str, args: &'a [Value]) -> Option<&'a Value> {
        self.parameters
            .iter()
            .find(|p| {
                p.special_argument_name
                    .as_deref()
                    .is_some_and(|special| special.eq_ignore_ascii_case(name))
            })
            .and_then(|p| args.get(p.position()))
    }

    /// Arguments passed to the contract itself, without special arguments, in declaration order.
    pub fn contract_arguments(&self, args: &[Value]) -> Vec<Value> {
        self.contract_parameters()
            .filter_map(|p| args.get(p.position()).cloned())
            .collect()
    }

    pub fn contract_parameters(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| !p.is_special_argument())
    }

    pub(crate) fn validate(&self) -> Result<(), MetadataError> {
        let method = self.signature.to_string();
        if self.parameters.len() != self.signature.arity() {
            return Err(MetadataError::ParameterCountMismatch {
                method,
                expected: self.signature.arity(),
                actual: self.parameters.len(),
            });
        }
        for (position, parameter) in self.parameters.iter().enumerate() {
            if parameter.position() != position || parameter.parameter().method() != &self.signature
            {
                return Err(MetadataError::ParameterPositionMismatch {
                    method,
                    position,
                    found: parameter.parameter().to_string(),
                });
            }
            if parameter.explicit_converter().is_some() && parameter.coerce_to_type.is_some() {
                return Err(MetadataError::ConflictingCoercion(
                    parameter.parameter().to_string(),
                ));
            }
        }
        Ok(())
    }
}
