//! Converters between primitive values and their string form.
//!
//! Backends that only accept string arguments (chaincode invocations, for instance) register
//! [`default_string_converters`] so that `bool` and numeric parameters and results are mapped
//! automatically.
use std::{fmt::Display, str::FromStr, sync::Arc};

use super::{ConverterKind, FnConverter, TypeConverter};
use crate::{TypeTag, Value, errors::TypeConvertError};

pub const BOOLEAN_STRING: ConverterKind = ConverterKind::from_static("BooleanStringConverter");
pub const BYTE_STRING: ConverterKind = ConverterKind::from_static("ByteStringConverter");
pub const SHORT_STRING: ConverterKind = ConverterKind::from_static("ShortStringConverter");
pub const INTEGER_STRING: ConverterKind = ConverterKind::from_static("IntegerStringConverter");
pub const LONG_STRING: ConverterKind = ConverterKind::from_static("LongStringConverter");
pub const FLOAT_STRING: ConverterKind = ConverterKind::from_static("FloatStringConverter");
pub const DOUBLE_STRING: ConverterKind = ConverterKind::from_static("DoubleStringConverter");

/// Converters between `bool`, `i8`, `i16`, `i32`, `i64`, `f32`, `f64` and `String`.
pub fn default_string_converters() -> Vec<Arc<dyn TypeConverter>> {
    vec![
        Arc::new(boolean_string()),
        Arc::new(byte_string()),
        Arc::new(short_string()),
        Arc::new(integer_string()),
        Arc::new(long_string()),
        Arc::new(float_string()),
        Arc::new(double_string()),
    ]
}

fn input_str(value: &Value, target: &TypeTag) -> Result<String, TypeConvertError> {
    value
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| TypeConvertError::failed(target, format!("expected a string, got {value}")))
}

pub fn boolean_string() -> FnConverter {
    FnConverter::new(
        BOOLEAN_STRING,
        TypeTag::Bool,
        TypeTag::String,
        |value| {
            value
                .as_bool()
                .map(|b| Value::String(b.to_string()))
                .ok_or_else(|| {
                    TypeConvertError::failed(&TypeTag::String, format!("expected a bool, got {value}"))
                })
        },
        |value| {
            let s = input_str(&value, &TypeTag::Bool)?;
            // anything but "true" is false
            Ok(Value::Bool(s.eq_ignore_ascii_case("true")))
        },
    )
}

fn integer_converter<T>(kind: ConverterKind, tag: TypeTag) -> FnConverter
where
    T: TryFrom<i64> + Into<i64> + FromStr + Display,
    <T as TryFrom<i64>>::Error: Display,
    <T as FromStr>::Err: Display,
{
    let to_tag = tag.clone();
    let from_tag = tag.clone();
    FnConverter::new(
        kind,
        tag,
        TypeTag::String,
        move |value| {
            let n = value.as_i64().ok_or_else(|| {
                TypeConvertError::failed(&TypeTag::String, format!("expected {to_tag}, got {value}"))
            })?;
            let n = T::try_from(n).map_err(|e| TypeConvertError::failed(&TypeTag::String, e))?;
            Ok(Value::String(n.to_string()))
        },
        move |value| {
            let s = input_str(&value, &from_tag)?;
            let n: T = s
                .parse()
                .map_err(|e| TypeConvertError::failed(&from_tag, format!("'{s}': {e}")))?;
            Ok(Value::from(Into::<i64>::into(n)))
        },
    )
}

pub fn byte_string() -> FnConverter {
    integer_converter::<i8>(BYTE_STRING, TypeTag::I8)
}

pub fn short_string() -> FnConverter {
    integer_converter::<i16>(SHORT_STRING, TypeTag::I16)
}

pub fn integer_string() -> FnConverter {
    integer_converter::<i32>(INTEGER_STRING, TypeTag::I32)
}

pub fn long_string() -> FnConverter {
    integer_converter::<i64>(LONG_STRING, TypeTag::I64)
}

fn float_to_value(n: f64, target: &TypeTag) -> Result<Value, TypeConvertError> {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| TypeConvertError::failed(target, format!("{n} is not a finite number")))
}

pub fn float_string() -> FnConverter {
    FnConverter::new(
        FLOAT_STRING,
        TypeTag::F32,
        TypeTag::String,
        |value| {
            let n = value.as_f64().ok_or_else(|| {
                TypeConvertError::failed(&TypeTag::String, format!("expected f32, got {value}"))
            })?;
            Ok(Value::String((n as f32).to_string()))
        },
        |value| {
            let s = input_str(&value, &TypeTag::F32)?;
            let n: f32 = s
                .parse()
                .map_err(|e| TypeConvertError::failed(&TypeTag::F32, format!("'{s}': {e}")))?;
            float_to_value(f64::from(n), &TypeTag::F32)
        },
    )
}

pub fn double_string() -> FnConverter {
    FnConverter::new(
        DOUBLE_STRING,
        TypeTag::F64,
        TypeTag::String,
        |value| {
            let n = value.as_f64().ok_or_else(|| {
                TypeConvertError::failed(&TypeTag::String, format!("expected f64, got {value}"))
            })?;
            Ok(Value::String(n.to_string()))
        },
        |value| {
            let s = input_str(&value, &TypeTag::F64)?;
            let n: f64 = s
                .parse()
                .map_err(|e| TypeConvertError::failed(&TypeTag::F64, format!("'{s}': {e}")))?;
            float_to_value(n, &TypeTag::F64)
        },
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn booleans() {
        let converter = boolean_string();
        assert_eq!(converter.to(json!(true)).unwrap(), json!("true"));
        assert_eq!(converter.from(json!("TRUE")).unwrap(), json!(true));
        assert_eq!(converter.from(json!("nope")).unwrap(), json!(false));
        assert!(converter.to(json!("true")).is_err());
    }

    #[test]
    fn integers_respect_their_range() {
        let byte = byte_string();
        assert_eq!(byte.to(json!(-12)).unwrap(), json!("-12"));
        assert_eq!(byte.from(json!("2")).unwrap(), json!(2));
        assert!(byte.to(json!(300)).is_err());
        assert!(byte.from(json!("300")).is_err());

        let long = long_string();
        assert_eq!(long.to(json!(i64::MAX)).unwrap(), json!(i64::MAX.to_string()));
        assert_eq!(long.from(json!(" 17 ")).unwrap(), json!(17));
    }

    #[test]
    fn floats() {
        let double = double_string();
        assert_eq!(double.to(json!(1.5)).unwrap(), json!("1.5"));
        assert_eq!(double.from(json!("2.25")).unwrap(), json!(2.25));
        assert!(double.from(json!("NaN")).is_err());

        let float = float_string();
        assert_eq!(float.to(json!(0.5)).unwrap(), json!("0.5"));
        assert_eq!(float.from(json!("0.5")).unwrap(), json!(0.5));
    }

    #[test]
    fn default_set_contains_every_primitive() {
        let kinds: Vec<_> = default_string_converters().iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                BOOLEAN_STRING,
                BYTE_STRING,
                SHORT_STRING,
                INTEGER_STRING,
                LONG_STRING,
                FLOAT_STRING,
                DOUBLE_STRING,
            ]
        );
    }
}
