//! Dispatch of interface calls onto a contract backend.
//!
//! A [`ContractWrapper`] binds one [`ContractDescriptor`] to a backend and a conversion registry.
//! Every call is resolved against the descriptor, its arguments are converted, it is routed to the
//! matching backend executor and its result is adapted to the declared return type.
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use contract_native_types::{
    BackendKind, ContractDescriptor, MethodDescriptor, MethodSignature, TypeConverters, TypeTag,
    Value,
};
use futures::{FutureExt, future::BoxFuture, stream::BoxStream};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::{
    backend::{ContractBackend, SpecialOperation},
    errors::{ContractCallError, DispatchError, IllegalStateError},
};

mod arguments;
mod events;

pub use events::EventStream;

pub(crate) const DISPATCH_TARGET: &str = "contract_native::dispatch";

/// A call of an interface method.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub signature: MethodSignature,
    /// All arguments in declaration order, special arguments included
    pub args: Vec<Value>,
    /// Return type the caller expects, checked against the descriptor when set
    pub return_type: Option<TypeTag>,
}

impl Call {
    pub fn new(signature: MethodSignature, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            signature,
            args: args.into_iter().collect(),
            return_type: None,
        }
    }

    pub fn expecting(mut self, return_type: TypeTag) -> Self {
        self.return_type = Some(return_type);
        self
    }
}

/// What a dispatched call produced.
#[derive(Debug)]
pub enum Outcome {
    /// The descriptor the wrapper is bound to
    Descriptor(Arc<ContractDescriptor>),
    /// The converted result of a synchronous call
    Value(Value),
    /// A synchronous call of a void method completed
    Void,
    /// Handle of a call whose result has not been awaited
    Pending(PendingResult),
    /// Subscription to contract events
    Events(EventStream),
}

impl Outcome {
    const fn name(&self) -> &'static str {
        match self {
            Self::Descriptor(_) => "descriptor",
            Self::Value(_) => "value",
            Self::Void => "void",
            Self::Pending(_) => "pending",
            Self::Events(_) => "events",
        }
    }
}

/// Handle of a contract call that has been dispatched but not awaited.
///
/// The backend is only invoked once the handle is polled. Backend failures and conversion errors
/// surface when the handle resolves.
#[must_use = "the call is not executed until the pending result is awaited"]
pub struct PendingResult {
    future: BoxFuture<'static, Result<Value, DispatchError>>,
}

impl PendingResult {
    /// Resolves the handle and deserializes the result into `T`.
    pub async fn typed<T: DeserializeOwned>(self) -> Result<T, DispatchError> {
        Ok(serde_json::from_value(self.await?)?)
    }
}

impl Future for PendingResult {
    type Output = Result<Value, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

impl std::fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResult").finish_non_exhaustive()
    }
}

enum Route {
    Special(Arc<dyn SpecialOperation>),
    ReadOnly,
    Transaction,
}

/// A contract descriptor bound to a backend.
#[derive(Clone)]
pub struct ContractWrapper {
    descriptor: Arc<ContractDescriptor>,
    backend: Arc<dyn ContractBackend>,
    converters: Arc<TypeConverters>,
}

impl ContractWrapper {
    pub fn new(
        descriptor: Arc<ContractDescriptor>,
        backend: Arc<dyn ContractBackend>,
        converters: Arc<TypeConverters>,
    ) -> Self {
        Self {
            descriptor,
            backend,
            converters,
        }
    }

    pub fn descriptor(&self) -> &Arc<ContractDescriptor> {
        &self.descriptor
    }

    pub fn backend(&self) -> &Arc<dyn ContractBackend> {
        &self.backend
    }

    /// Dispatches `call`.
    ///
    /// Setup errors and argument conversion errors are returned before the backend is contacted.
    /// For synchronous methods the backend call is awaited and its failure is returned as
    /// [`ContractCallError`]; pending methods and event subscriptions return immediately.
    ///
    /// An [`Outcome::Pending`] handle must be awaited for the backend to be called at all. Dropping
    /// it without polling means the state-changing call is never sent.
    pub async fn invoke(&self, call: Call) -> Result<Outcome, DispatchError> {
        let Call {
            signature,
            args,
            return_type,
        } = call;

        if signature.is_descriptor_accessor() {
            self.check_descriptor_return_type(return_type.as_ref())?;
            return Ok(Outcome::Descriptor(self.descriptor.clone()));
        }

        if let Some(method) = self.descriptor.method(&signature) {
            check_return_type(&signature, &method.return_type, return_type.as_ref())?;
            check_argument_count(&signature, method.parameters().len(), args.len())?;
            let pending = self.dispatch_method(method.clone(), args)?;
            if method.is_async() {
                return Ok(Outcome::Pending(pending));
            }
            let value = pending.await?;
            if method.is_void() && !method.uses_result_envelope() {
                return Ok(Outcome::Void);
            }
            return Ok(Outcome::Value(value));
        }

        if let Some(event) = self.descriptor.event_for(&signature) {
            check_return_type(&signature, &event.return_type, return_type.as_ref())?;
            check_argument_count(&signature, signature.arity(), args.len())?;
            return Ok(Outcome::Events(EventStream::new(
                self.descriptor.clone(),
                event.clone(),
                self.backend.clone(),
                self.converters.clone(),
                args,
            )));
        }

        Err(IllegalStateError::UnregisteredMember(signature).into())
    }

    /// Dispatches `call` and blocks the current thread until the outcome is available.
    ///
    /// Must not be used from within an async runtime.
    pub fn invoke_blocking(&self, call: Call) -> Result<Outcome, DispatchError> {
        futures::executor::block_on(self.invoke(call))
    }

    /// Calls a synchronous method, or resolves a pending one, and deserializes its result into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        signature: MethodSignature,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<T, DispatchError> {
        let value = match self.invoke(Call::new(signature, args)).await? {
            Outcome::Value(value) => value,
            Outcome::Void => Value::Null,
            Outcome::Pending(pending) => pending.await?,
            Outcome::Descriptor(descriptor) => serde_json::to_value(descriptor.as_ref())?,
            other @ Outcome::Events(_) => {
                return Err(IllegalStateError::UnexpectedOutcome {
                    expected: "value",
                    got: other.name(),
                }
                .into());
            }
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Calls a pending method and returns the unresolved handle.
    pub async fn call_pending(
        &self,
        signature: MethodSignature,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<PendingResult, DispatchError> {
        match self.invoke(Call::new(signature, args)).await? {
            Outcome::Pending(pending) => Ok(pending),
            other => Err(IllegalStateError::UnexpectedOutcome {
                expected: "pending",
                got: other.name(),
            }
            .into()),
        }
    }

    /// Subscribes to the events of an event method, deserializing each event into `T`.
    pub async fn subscribe<T>(
        &self,
        signature: MethodSignature,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<BoxStream<'static, Result<T, DispatchError>>, DispatchError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.invoke(Call::new(signature, args)).await? {
            Outcome::Events(events) => Ok(events.typed()),
            other => Err(IllegalStateError::UnexpectedOutcome {
                expected: "events",
                got: other.name(),
            }
            .into()),
        }
    }

    fn check_descriptor_return_type(
        &self,
        requested: Option<&TypeTag>,
    ) -> Result<(), IllegalStateError> {
        let compatible = match requested {
            None | Some(TypeTag::Any) => true,
            Some(TypeTag::Named(path)) => {
                let name = path.rsplit([':', '.']).next().unwrap_or_default();
                name == BackendKind::Generic.descriptor_type_name()
                    || name == self.descriptor.kind().descriptor_type_name()
            }
            Some(_) => false,
        };
        if compatible {
            Ok(())
        } else {
            Err(IllegalStateError::InvalidDescriptorReturnType(
                requested.cloned().unwrap_or(TypeTag::Any),
            ))
        }
    }

    /// Converts the arguments and builds the not yet started backend call.
    fn dispatch_method(
        &self,
        method: MethodDescriptor,
        args: Vec<Value>,
    ) -> Result<PendingResult, DispatchError> {
        let route = if method.special_operation {
            let handler = self
                .backend
                .special_operations()
                .get(&method.backend_operation_name)
                .ok_or_else(|| IllegalStateError::UnknownSpecialOperation {
                    operation: method.backend_operation_name.clone(),
                    method: method.signature().clone(),
                    backend: self.backend.name().to_string(),
                })?;
            Route::Special(handler)
        } else if method.read_only {
            Route::ReadOnly
        } else {
            Route::Transaction
        };
        let args = arguments::coerce_arguments(&self.converters, &method, args)?;

        debug!(
            target: DISPATCH_TARGET,
            method = %method.signature(),
            operation = %method.backend_operation_name,
            backend = self.backend.name(),
            special = method.special_operation,
            read_only = method.read_only,
            "Dispatching call"
        );

        let descriptor = self.descriptor.clone();
        let backend = self.backend.clone();
        let converters = self.converters.clone();
        let future = async move {
            let result = match route {
                Route::Special(handler) => handler.execute(&descriptor, &method, args).await,
                Route::ReadOnly => backend.invoke_read_only(&descriptor, &method, args).await,
                Route::Transaction => backend.invoke(&descriptor, &method, args).await,
            };
            match result {
                Ok(result) => {
                    trace!(
                        target: DISPATCH_TARGET,
                        method = %method.signature(),
                        ?result,
                        "Backend call completed"
                    );
                    arguments::adapt_result(&converters, &method, result)
                }
                Err(source) => Err(ContractCallError {
                    method: method.signature().clone(),
                    source,
                }
                .into()),
            }
        };

        Ok(PendingResult {
            future: future.boxed(),
        })
    }
}

impl std::fmt::Debug for ContractWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractWrapper")
            .field("identifier", &self.descriptor.identifier())
            .field("backend", &self.backend.name())
            .finish()
    }
}

fn check_return_type(
    method: &MethodSignature,
    declared: &TypeTag,
    requested: Option<&TypeTag>,
) -> Result<(), IllegalStateError> {
    match requested {
        Some(requested) if !declared.is_assignable_to(requested) => {
            Err(IllegalStateError::ReturnTypeMismatch {
                method: method.clone(),
                declared: declared.clone(),
                requested: requested.clone(),
            })
        }
        _ => Ok(()),
    }
}

fn check_argument_count(
    method: &MethodSignature,
    expected: usize,
    actual: usize,
) -> Result<(), IllegalStateError> {
    if expected == actual {
        Ok(())
    } else {
        Err(IllegalStateError::ArgumentCountMismatch {
            method: method.clone(),
            expected,
            actual,
        })
    }
}
