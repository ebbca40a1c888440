use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use contract_native_types::{
    ContractDescriptor, Event, EventDescriptor, EventFieldDescriptor, TypeConverters, TypeTag,
    TypedValue, Value, errors::TypeConvertError,
};
use futures::{
    Stream, StreamExt,
    future,
    stream::{self, BoxStream},
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    backend::{ContractBackend, RawEvent},
    errors::DispatchError,
};

const EVENTS_TARGET: &str = "contract_native::events";

/// Stream of decoded contract events.
///
/// The backend subscription is only opened when the stream is first polled and is closed when the
/// stream is dropped. Raw events that cannot be decoded are logged and skipped; failures of the
/// event source itself are yielded as [`DispatchError::EventSource`].
pub struct EventStream {
    inner: BoxStream<'static, Result<Value, DispatchError>>,
}

impl EventStream {
    pub(crate) fn new(
        contract: Arc<ContractDescriptor>,
        event: EventDescriptor,
        backend: Arc<dyn ContractBackend>,
        converters: Arc<TypeConverters>,
        args: Vec<Value>,
    ) -> Self {
        let event = Arc::new(event);
        let decoder = EventDecoder {
            event: event.clone(),
            converters,
        };

        let subscription = stream::once(async move {
            debug!(
                target: EVENTS_TARGET,
                event = event.name(),
                backend = backend.name(),
                "Subscribing to events"
            );
            backend.events(&contract, &event, args).await
        });

        let inner = subscription
            .flat_map(|subscription| match subscription {
                Ok(raw_events) => raw_events,
                Err(e) => stream::iter([Err(e)]).boxed(),
            })
            .filter_map(move |item| {
                let decoded = match item {
                    Ok(raw) => decoder.decode(raw.as_ref()).map(Ok),
                    Err(e) => Some(Err(DispatchError::EventSource(e))),
                };
                future::ready(decoded)
            })
            .boxed();

        Self { inner }
    }

    /// Deserializes each decoded event into `T`. Events that do not fit `T` are logged and skipped.
    pub fn typed<T>(self) -> BoxStream<'static, Result<T, DispatchError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.filter_map(|item| {
            let typed = match item {
                Ok(value) => match serde_json::from_value(value) {
                    Ok(typed) => Some(Ok(typed)),
                    Err(e) => {
                        warn!(target: EVENTS_TARGET, error = %e, "Skipping event of unexpected shape");
                        None
                    }
                },
                Err(e) => Some(Err(e)),
            };
            future::ready(typed)
        })
        .boxed()
    }
}

impl Stream for EventStream {
    type Item = Result<Value, DispatchError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

#[derive(thiserror::Error, Debug)]
enum DecodeError {
    #[error("Raw event has no field '{0}'")]
    MissingField(String),
    #[error("Field '{field}': {source}")]
    Convert {
        field: String,
        #[source]
        source: TypeConvertError,
    },
    #[error(transparent)]
    Envelope(#[from] serde_json::Error),
}

struct EventDecoder {
    event: Arc<EventDescriptor>,
    converters: Arc<TypeConverters>,
}

impl EventDecoder {
    fn decode(&self, raw: &dyn RawEvent) -> Option<Value> {
        match self.try_decode(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    target: EVENTS_TARGET,
                    event = self.event.name(),
                    error = %e,
                    ?raw,
                    "Skipping malformed event"
                );
                None
            }
        }
    }

    fn try_decode(&self, raw: &dyn RawEvent) -> Result<Value, DecodeError> {
        let mut fields = serde_json::Map::new();
        for field in self.event.fields() {
            fields.insert(field.name().to_string(), self.decode_field(raw, field)?);
        }
        let payload = Value::Object(fields);

        if !self.event.uses_event_envelope() {
            return Ok(payload);
        }
        Ok(serde_json::to_value(Event {
            data: payload,
            block_hash: raw.block_hash(),
            transaction_hash: raw.transaction_hash(),
        })?)
    }

    /// The field converter is used first. Values already shaped like a built-in field type are
    /// assigned as is. Anything else, including every value of a named type, goes through the
    /// registry, and a named type falls back to direct assignment when no converter matches.
    fn decode_field(
        &self,
        raw: &dyn RawEvent,
        field: &EventFieldDescriptor,
    ) -> Result<Value, DecodeError> {
        let value = match raw.field(field) {
            Some(value) => value,
            None if matches!(field.field_type, TypeTag::Optional(_)) => Value::Null,
            None => return Err(DecodeError::MissingField(field.source_name.clone())),
        };
        let convert_error = |source| DecodeError::Convert {
            field: field.name().to_string(),
            source,
        };

        if let Some(kind) = field.explicit_converter() {
            return self
                .converters
                .convert_using(kind, TypedValue::untyped(value), Some(&field.field_type))
                .map_err(convert_error);
        }
        let named = matches!(field.field_type, TypeTag::Named(_));
        let assignable = field.field_type.accepts(&value);
        if assignable && !named {
            return Ok(value);
        }

        let from = TypeTag::of_value(&value);
        if assignable {
            let typed = TypedValue::new(from, value.clone());
            return match self.converters.convert(typed, &field.field_type, false) {
                Ok(converted) => Ok(converted.unwrap_or(value)),
                Err(source) => Err(convert_error(source)),
            };
        }
        self.converters
            .convert(TypedValue::new(from, value), &field.field_type, true)
            .map(Option::unwrap_or_default)
            .map_err(convert_error)
    }
}
