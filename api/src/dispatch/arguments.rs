use contract_native_types::{
    Data, MethodDescriptor, TypeConverters, TypedValue, Value, errors::TypeConvertError,
};
use tracing::trace;

use crate::{backend::BackendResult, dispatch::DISPATCH_TARGET, errors::DispatchError};

/// Converts the ordinary arguments of a call as requested by the parameter descriptors.
///
/// Special arguments and `null` are passed through untouched. An explicit converter takes
/// precedence over a coercion target type; without either the argument is passed as is.
pub(crate) fn coerce_arguments(
    converters: &TypeConverters,
    method: &MethodDescriptor,
    args: Vec<Value>,
) -> Result<Vec<Value>, TypeConvertError> {
    args.into_iter()
        .zip(method.parameters())
        .map(|(arg, parameter)| {
            if parameter.is_special_argument() || arg.is_null() {
                return Ok(arg);
            }
            let typed = TypedValue::new(parameter.parameter_type().clone(), arg);
            if let Some(kind) = parameter.explicit_converter() {
                trace!(
                    target: DISPATCH_TARGET,
                    parameter = %parameter.parameter(),
                    %kind,
                    "Converting argument"
                );
                return converters.convert_using(kind, typed, parameter.coerce_to_type.as_ref());
            }
            match &parameter.coerce_to_type {
                Some(target) => converters
                    .convert(typed, target, true)?
                    .ok_or_else(|| TypeConvertError::NoConverter {
                        from: parameter.parameter_type().clone(),
                        to: target.clone(),
                    }),
                None => Ok(typed.value),
            }
        })
        .collect()
}

/// Turns the raw backend result into the value the method declares.
///
/// Void methods yield `null` and a `null` result is never converted. A converted result must have
/// the shape of the declared return type. When the method declares the [`Data`] envelope the converted value
/// is wrapped together with the provenance reported by the backend.
pub(crate) fn adapt_result(
    converters: &TypeConverters,
    method: &MethodDescriptor,
    result: BackendResult,
) -> Result<Value, DispatchError> {
    let BackendResult {
        value,
        block_hash,
        transaction_hash,
    } = result;

    let value = if method.is_void() {
        Value::Null
    } else {
        match method.explicit_result_converter() {
            Some(kind) if !value.is_null() => {
                let target = method.actual_return_type();
                let converted =
                    converters.convert_using(kind, TypedValue::untyped(value), Some(target))?;
                if !target.accepts(&converted) {
                    return Err(TypeConvertError::failed(
                        target,
                        format!("converted value {converted} does not match the result type"),
                    )
                    .into());
                }
                converted
            }
            _ => value,
        }
    };

    if !method.uses_result_envelope() {
        return Ok(value);
    }
    Ok(serde_json::to_value(Data {
        data: value,
        block_hash,
        transaction_hash,
    })?)
}
