use std::sync::Arc;

use contract_native::{
    BackendResult, Call, ContractBackend, ContractWrapper, Data, Outcome,
    errors::{DispatchError, IllegalStateError},
    types::{
        BackendInfo, ContractDescriptor, MethodDescriptor, MethodSignature, TypeTag,
        convert::defaults::INTEGER_STRING, signature::GET_CONTRACT_DESCRIPTOR,
    },
};
use serde_json::json;
use testresult::TestResult;

mod common;

use common::*;

fn hello_wrapper(backend: &Arc<MockBackend>) -> ContractWrapper {
    generator(backend.clone())
        .generate(Arc::new(hello_descriptor()))
        .expect("quorum descriptors are supported")
}

#[tokio::test]
async fn routes_calls_to_matching_executors() -> TestResult {
    init_tracing();
    let backend = Arc::new(
        MockBackend::new().with_result("get", BackendResult::new(json!("Hello World"))),
    );
    let hello = hello_wrapper(&backend);

    let greeting: String = hello.call(get_signature(), []).await?;
    assert_eq!(greeting, "Hello World");

    let address: String = hello.call(deploy_signature(), []).await?;
    assert_eq!(address, "0xc0ffee");

    let set = hello
        .call_pending(set_signature(), [json!(7), json!(["key"])])
        .await?;
    set.await?;

    let executors: Vec<_> = backend.calls().into_iter().map(|c| c.executor).collect();
    assert_eq!(
        executors,
        [
            Executor::ReadOnly,
            Executor::Special("deploy".to_string()),
            Executor::Transaction,
        ]
    );
    assert_eq!(backend.calls()[2].args, [json!(7), json!(["key"])]);
    Ok(())
}

#[tokio::test]
async fn synchronous_and_pending_results() -> TestResult {
    let backend = Arc::new(
        MockBackend::new()
            .with_result("get", BackendResult::new(json!("Hello World")))
            .with_result(
                "set",
                BackendResult::new(json!("ignored")).with_transaction_hash("0x5e7"),
            ),
    );
    let hello = hello_wrapper(&backend);

    let outcome = hello.invoke(Call::new(get_signature(), [])).await?;
    assert!(matches!(outcome, Outcome::Value(value) if value == json!("Hello World")));
    assert_eq!(backend.calls().len(), 1);

    let outcome = hello
        .invoke(Call::new(set_signature(), [json!(1), json!([])]))
        .await?;
    let pending = match outcome {
        Outcome::Pending(pending) => pending,
        other => panic!("expected a pending result, got {other:?}"),
    };
    assert_eq!(backend.calls().len(), 1, "pending calls start when awaited");

    let result: Data<()> = pending.typed().await?;
    assert_eq!(result.transaction_hash.as_deref(), Some("0x5e7"));
    assert_eq!(backend.calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn backend_failures() -> TestResult {
    let backend = Arc::new(
        MockBackend::new()
            .with_failure("get", "node unreachable")
            .with_failure("set", "out of gas"),
    );
    let hello = hello_wrapper(&backend);

    let error = match hello.invoke(Call::new(get_signature(), [])).await {
        Err(DispatchError::ContractCall(error)) => error,
        other => panic!("expected a contract call error, got {other:?}"),
    };
    assert_eq!(error.method, get_signature());
    assert_eq!(error.source.to_string(), "node unreachable");

    let pending = hello
        .call_pending(set_signature(), [json!(1), json!([])])
        .await?;
    assert!(matches!(
        pending.await,
        Err(DispatchError::ContractCall(error)) if error.source.to_string() == "out of gas"
    ));
    Ok(())
}

#[tokio::test]
async fn setup_errors_are_raised_before_the_backend_is_called() -> TestResult {
    let backend = Arc::new(MockBackend::new());
    let hello = hello_wrapper(&backend);

    let unknown = signature("unknown", []);
    assert!(matches!(
        hello.invoke(Call::new(unknown, [])).await,
        Err(DispatchError::IllegalState(
            IllegalStateError::UnregisteredMember(_)
        ))
    ));

    assert!(matches!(
        hello.invoke(Call::new(set_signature(), [json!(1)])).await,
        Err(DispatchError::IllegalState(
            IllegalStateError::ArgumentCountMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ))
    ));

    let expecting_number = Call::new(get_signature(), []).expecting(TypeTag::I32);
    assert!(matches!(
        hello.invoke(expecting_number).await,
        Err(DispatchError::IllegalState(
            IllegalStateError::ReturnTypeMismatch { .. }
        ))
    ));

    assert!(backend.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_special_operation() -> TestResult {
    let destroy = MethodSignature::new(HELLO_INTERFACE, "destroy", []);
    let descriptor = ContractDescriptor::new(
        "destroyable",
        HELLO_INTERFACE,
        [MethodDescriptor::new(destroy.clone(), TypeTag::Unit).as_special_operation()],
        [],
        BackendInfo::Generic,
    )?;
    let backend = Arc::new(MockBackend::new());
    let wrapper = generator(backend.clone()).generate(Arc::new(descriptor))?;

    let error = wrapper.invoke(Call::new(destroy, [])).await.unwrap_err();
    assert!(matches!(
        error,
        DispatchError::IllegalState(IllegalStateError::UnknownSpecialOperation { ref operation, .. })
            if operation == "destroy"
    ));
    assert!(backend.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn self_description() -> TestResult {
    let backend = Arc::new(MockBackend::new());
    let hello = hello_wrapper(&backend);
    let accessor = signature(GET_CONTRACT_DESCRIPTOR, []);

    let call = Call::new(accessor.clone(), []).expecting(TypeTag::named("QuorumContractDescriptor"));
    let outcome = hello.invoke(call).await?;
    assert!(matches!(outcome, Outcome::Descriptor(d) if d.identifier() == HELLO_IDENTIFIER));

    let descriptor: ContractDescriptor = hello.call(accessor.clone(), []).await?;
    assert_eq!(&descriptor, hello.descriptor().as_ref());

    assert!(matches!(
        hello
            .invoke(Call::new(accessor, []).expecting(TypeTag::String))
            .await,
        Err(DispatchError::IllegalState(
            IllegalStateError::InvalidDescriptorReturnType(_)
        ))
    ));
    assert!(backend.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn arguments_and_results_are_converted() -> TestResult {
    let interface = "org.example.Counter";
    let add = MethodSignature::new(interface, "add", [TypeTag::I32, TypeTag::U64]);
    let method = MethodDescriptor::new(add.clone(), TypeTag::I32)
        .with_result_converter(INTEGER_STRING)
        .configure_parameter(0, |p| p.coerce_to(TypeTag::String))
        .configure_parameter(1, |p| p.special("gasLimit"));
    let descriptor =
        ContractDescriptor::new("counter", interface, [method], [], BackendInfo::Generic)?;

    let backend = Arc::new(MockBackend::new().with_result("add", BackendResult::new(json!("43"))));
    let counter = generator(backend.clone()).generate(Arc::new(descriptor))?;

    let total: i32 = counter.call(add, [json!(42), json!(21000)]).await?;
    assert_eq!(total, 43);
    assert_eq!(backend.calls()[0].args, [json!("42"), json!(21000)]);
    Ok(())
}

#[test]
fn blocking_invocation() -> TestResult {
    let backend = Arc::new(
        MockBackend::new().with_result("get", BackendResult::new(json!("Hello World"))),
    );
    let hello = hello_wrapper(&backend);

    let outcome = hello.invoke_blocking(Call::new(get_signature(), []))?;
    assert!(matches!(outcome, Outcome::Value(value) if value == json!("Hello World")));
    Ok(())
}

#[test]
fn generator_rejects_unsupported_descriptors() {
    let backend: Arc<dyn ContractBackend> = Arc::new(GenericOnlyBackend(MockBackend::new()));

    let error = generator(backend)
        .generate(Arc::new(hello_descriptor()))
        .unwrap_err();
    assert!(matches!(
        error,
        IllegalStateError::UnsupportedDescriptor { ref kind, .. } if kind == "quorum"
    ));
}

#[tokio::test]
async fn dropped_pending_result_never_reaches_the_backend() -> TestResult {
    let backend = Arc::new(MockBackend::new());
    let hello = hello_wrapper(&backend);

    let pending = hello
        .call_pending(set_signature(), [json!(1), json!([])])
        .await?;
    drop(pending);

    assert!(backend.calls().is_empty());
    Ok(())
}
