use serde::{Deserialize, Serialize};

use crate::{
    ConverterKind, TypeTag, Value,
    errors::MetadataError,
    signature::{FieldRef, MethodSignature, ParameterRef},
};

/// Parameter of an event method. Event parameters never reach the contract, they configure the
/// subscription (e.g. a block range) and are therefore always special.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParameterDescriptor {
    parameter: ParameterRef,
    pub special_argument_name: String,
}

impl EventParameterDescriptor {
    pub fn new(parameter: ParameterRef, special_argument_name: impl Into<String>) -> Self {
        Self {
            parameter,
            special_argument_name: special_argument_name.into(),
        }
    }

    pub const fn parameter(&self) -> &ParameterRef {
        &self.parameter
    }

    pub const fn position(&self) -> usize {
        self.parameter.index()
    }
}

/// Maps one field of the event payload type onto a field of the raw backend event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFieldDescriptor {
    field: FieldRef,
    /// Declared type of the payload field
    pub field_type: TypeTag,
    /// Name of the raw event field, defaults to the payload field name
    pub source_name: String,
    /// Position of the raw event field, preferred over the name when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<ConverterKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_type: Option<String>,
}

impl EventFieldDescriptor {
    pub fn new(field: FieldRef, field_type: TypeTag) -> Self {
        Self {
            source_name: field.name().to_string(),
            field,
            field_type,
            source_index: None,
            converter: None,
            backend_type: None,
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_source_index(mut self, index: usize) -> Self {
        self.source_index = Some(index);
        self
    }

    pub fn with_converter(mut self, converter: impl Into<ConverterKind>) -> Self {
        self.converter = Some(converter.into());
        self
    }

    pub fn with_backend_type(mut self, backend_type: impl Into<String>) -> Self {
        self.backend_type = Some(backend_type.into());
        self
    }

    pub const fn field(&self) -> &FieldRef {
        &self.field
    }

    /// Name of the payload field.
    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn explicit_converter(&self) -> Option<&ConverterKind> {
        self.converter.as_ref().filter(|kind| !kind.is_no_op())
    }
}

/// Describes an event subscription method of the interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    name: String,
    #[serde(rename = "method")]
    signature: MethodSignature,
    /// `EventStream<P>` or `EventStream<Event<P>>`
    pub return_type: TypeTag,
    #[serde(default)]
    parameters: Vec<EventParameterDescriptor>,
    #[serde(default)]
    fields: Vec<EventFieldDescriptor>,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, signature: MethodSignature, return_type: TypeTag) -> Self {
        Self {
            name: name.into(),
            signature,
            return_type,
            parameters: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: EventParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_field(mut self, field: EventFieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn parameters(&self) -> &[EventParameterDescriptor] {
        &self.parameters
    }

    pub fn fields(&self) -> &[EventFieldDescriptor] {
        &self.fields
    }

    /// Type each raw event is decoded into.
    pub fn payload_type(&self) -> &TypeTag {
        match &self.return_type {
            TypeTag::EventStream(item) => match item.as_ref() {
                TypeTag::Event(payload) => payload.as_ref(),
                payload => payload,
            },
            other => other,
        }
    }

    /// Whether decoded payloads are wrapped into an [`Event`](crate::Event) envelope.
    pub fn uses_event_envelope(&self) -> bool {
        matches!(&self.return_type, TypeTag::EventStream(item) if matches!(item.as_ref(), TypeTag::Event(_)))
    }

    /// Returns the argument passed for the event parameter `name` (matched case-insensitively).
    pub fn special_argument<'a>(&self, name: &str, args: &'a [Value]) -> Option<&'a Value> {
        self.parameters
            .iter()
            .find(|p| p.special_argument_name.eq_ignore_ascii_case(name))
            .and_then(|p| args.get(p.position()))
    }

    pub(crate) fn validate(&self) -> Result<(), MetadataError> {
        if !matches!(self.return_type, TypeTag::EventStream(_)) {
            return Err(MetadataError::InvalidEventReturnType {
                event: self.name.clone(),
                return_type: self.return_type.clone(),
            });
        }
        for (position, parameter) in self.parameters.iter().enumerate() {
            if parameter.parameter().method() != &self.signature {
                return Err(MetadataError::ParameterPositionMismatch {
                    method: self.signature.to_string(),
                    position,
                    found: parameter.parameter().to_string(),
                });
            }
        }

        let payload = self.payload_type();
        for field in &self.fields {
            let declared_on_payload =
                matches!(payload, TypeTag::Named(path) if path == field.field().declaring_type());
            if !declared_on_payload {
                return Err(MetadataError::ForeignEventField {
                    event: self.name.clone(),
                    field: field.field().to_string(),
                    payload: payload.clone(),
                });
            }
        }
        Ok(())
    }
}
