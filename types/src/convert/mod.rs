//! Bidirectional type converters and the registry that looks them up.
//!
//! A converter is declared between a `from` and a `to` [`TypeTag`]. The registry resolves a
//! converter for a requested pair of types either directly (using [`TypeConverter::to`]) or through
//! its mirror (using [`TypeConverter::from`]).
use std::{borrow::Cow, collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{TypeTag, TypedValue, Value, errors::TypeConvertError};

pub mod defaults;

pub use defaults::default_string_converters;

const CONVERT_TARGET: &str = "contract_native_types::convert";

/// Identifier of a converter implementation, used to reference converters from metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConverterKind(Cow<'static, str>);

impl ConverterKind {
    /// Placeholder meaning "no explicit converter requested".
    pub const NO_OP: Self = Self::from_static("NoOp");

    pub const fn from_static(kind: &'static str) -> Self {
        Self(Cow::Borrowed(kind))
    }

    pub fn new(kind: impl Into<String>) -> Self {
        Self(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_no_op(&self) -> bool {
        *self == Self::NO_OP
    }
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ConverterKind {
    fn from(kind: &'static str) -> Self {
        Self::from_static(kind)
    }
}

impl From<String> for ConverterKind {
    fn from(kind: String) -> Self {
        Self::new(kind)
    }
}

/// Converts values between two declared types in both directions.
pub trait TypeConverter: Send + Sync {
    fn kind(&self) -> ConverterKind;

    fn from_type(&self) -> &TypeTag;

    fn to_type(&self) -> &TypeTag;

    /// Converts a value of [`from_type`](Self::from_type) to [`to_type`](Self::to_type).
    fn to(&self, value: Value) -> Result<Value, TypeConvertError>;

    /// Converts a value of [`to_type`](Self::to_type) back to [`from_type`](Self::from_type).
    fn from(&self, value: Value) -> Result<Value, TypeConvertError>;
}

type ConvertFn = Box<dyn Fn(Value) -> Result<Value, TypeConvertError> + Send + Sync>;

/// A [`TypeConverter`] built from a pair of closures.
pub struct FnConverter {
    kind: ConverterKind,
    from_type: TypeTag,
    to_type: TypeTag,
    to: ConvertFn,
    from: ConvertFn,
}

impl FnConverter {
    pub fn new<To, From>(
        kind: impl Into<ConverterKind>,
        from_type: TypeTag,
        to_type: TypeTag,
        to: To,
        from: From,
    ) -> Self
    where
        To: Fn(Value) -> Result<Value, TypeConvertError> + Send + Sync + 'static,
        From: Fn(Value) -> Result<Value, TypeConvertError> + Send + Sync + 'static,
    {
        Self {
            kind: kind.into(),
            from_type,
            to_type,
            to: Box::new(to),
            from: Box::new(from),
        }
    }
}

impl fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter")
            .field("kind", &self.kind)
            .field("from_type", &self.from_type)
            .field("to_type", &self.to_type)
            .finish_non_exhaustive()
    }
}

impl TypeConverter for FnConverter {
    fn kind(&self) -> ConverterKind {
        self.kind.clone()
    }

    fn from_type(&self) -> &TypeTag {
        &self.from_type
    }

    fn to_type(&self) -> &TypeTag {
        &self.to_type
    }

    fn to(&self, value: Value) -> Result<Value, TypeConvertError> {
        (self.to)(value)
    }

    fn from(&self, value: Value) -> Result<Value, TypeConvertError> {
        (self.from)(value)
    }
}

static ANY: TypeTag = TypeTag::Any;

/// Identity converter behind [`ConverterKind::NO_OP`].
///
/// The registry never instantiates it: requesting the no-op kind falls through to native handling.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpConverter;

impl TypeConverter for NoOpConverter {
    fn kind(&self) -> ConverterKind {
        ConverterKind::NO_OP
    }

    fn from_type(&self) -> &TypeTag {
        &ANY
    }

    fn to_type(&self) -> &TypeTag {
        &ANY
    }

    fn to(&self, value: Value) -> Result<Value, TypeConvertError> {
        Ok(value)
    }

    fn from(&self, value: Value) -> Result<Value, TypeConvertError> {
        Ok(value)
    }
}

/// Which side of a converter a resolved conversion uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// [`TypeConverter::to`]
    Forward,
    /// [`TypeConverter::from`] of the mirror converter
    Reverse,
}

/// A converter together with the direction to apply it in.
#[derive(Clone)]
pub struct ResolvedConversion {
    pub converter: Arc<dyn TypeConverter>,
    pub direction: Direction,
}

impl ResolvedConversion {
    pub fn apply(&self, value: Value) -> Result<Value, TypeConvertError> {
        match self.direction {
            Direction::Forward => self.converter.to(value),
            Direction::Reverse => self.converter.from(value),
        }
    }
}

impl fmt::Debug for ResolvedConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConversion")
            .field("kind", &self.converter.kind())
            .field("direction", &self.direction)
            .finish()
    }
}

pub type ConverterFactory = Arc<dyn Fn() -> Arc<dyn TypeConverter> + Send + Sync>;

/// Set of converters with lookup by type pair and by kind.
///
/// Converters are kept in registration order and the first match wins, which makes resolution
/// deterministic. Registering a second converter of an already registered kind is a no-op.
#[derive(Clone, Default)]
pub struct TypeConverters {
    converters: Vec<Arc<dyn TypeConverter>>,
    factories: HashMap<ConverterKind, ConverterFactory>,
}

impl fmt::Debug for TypeConverters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeConverters")
            .field(
                "converters",
                &self.converters.iter().map(|c| c.kind()).collect::<Vec<_>>(),
            )
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeConverters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given converter set, e.g. [`default_string_converters`].
    pub fn with_converters(converters: impl IntoIterator<Item = Arc<dyn TypeConverter>>) -> Self {
        let mut registry = Self::new();
        for converter in converters {
            registry.register(converter);
        }
        registry
    }

    /// Registers a converter. Returns `false` if a converter of the same kind is already present.
    pub fn register(&mut self, converter: Arc<dyn TypeConverter>) -> bool {
        let kind = converter.kind();
        if self.converters.iter().any(|c| c.kind() == kind) {
            trace!(target: CONVERT_TARGET, %kind, "Converter already registered");
            return false;
        }
        debug!(
            target: CONVERT_TARGET,
            %kind,
            from = %converter.from_type(),
            to = %converter.to_type(),
            "Registering converter"
        );
        self.converters.push(converter);
        true
    }

    /// Registers a constructor used by [`lookup_converter_by_kind`](Self::lookup_converter_by_kind)
    /// when no instance of `kind` is registered.
    pub fn register_factory<F>(&mut self, kind: impl Into<ConverterKind>, factory: F)
    where
        F: Fn() -> Arc<dyn TypeConverter> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Registers [`Default::default`] as the constructor of `C`.
    pub fn register_default<C>(&mut self)
    where
        C: TypeConverter + Default + 'static,
    {
        let kind = C::default().kind();
        self.register_factory(kind, || Arc::new(C::default()));
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TypeConverter>> {
        self.converters.iter()
    }

    fn find(&self, from: &TypeTag, to: &TypeTag) -> Option<&Arc<dyn TypeConverter>> {
        self.converters
            .iter()
            .find(|c| from.is_assignable_to(c.from_type()) && to.is_assignable_to(c.to_type()))
    }

    /// Finds a conversion from `from` to `to`.
    ///
    /// The first converter declared between matching types is used forward; otherwise the first
    /// converter declared between `to` and `from` is used in reverse.
    pub fn resolve(&self, from: &TypeTag, to: &TypeTag) -> Option<ResolvedConversion> {
        if let Some(converter) = self.find(from, to) {
            return Some(ResolvedConversion {
                converter: converter.clone(),
                direction: Direction::Forward,
            });
        }
        self.find(to, from).map(|converter| ResolvedConversion {
            converter: converter.clone(),
            direction: Direction::Reverse,
        })
    }

    /// Converts `typed` to `target` using any matching converter.
    ///
    /// Returns `Ok(None)` if no converter matches and `strict` is `false`. Failures of a matched
    /// converter are always errors.
    pub fn convert(
        &self,
        typed: TypedValue,
        target: &TypeTag,
        strict: bool,
    ) -> Result<Option<Value>, TypeConvertError> {
        let Some(conversion) = self.resolve(&typed.type_tag, target) else {
            if strict {
                return Err(TypeConvertError::NoConverter {
                    from: typed.type_tag,
                    to: target.clone(),
                });
            }
            trace!(target: CONVERT_TARGET, from = %typed.type_tag, to = %target, "No matching converter");
            return Ok(None);
        };

        trace!(
            target: CONVERT_TARGET,
            from = %typed.type_tag,
            to = %target,
            ?conversion,
            "Converting value"
        );
        conversion
            .apply(typed.value)
            .map(Some)
            .map_err(|e| match e {
                TypeConvertError::ConversionFailed { .. } => e,
                other => TypeConvertError::failed(target, other),
            })
    }

    /// Returns the registered converter of `kind`, or a fresh instance from its factory.
    ///
    /// Returns `Ok(None)` for [`ConverterKind::NO_OP`].
    pub fn lookup_converter_by_kind(
        &self,
        kind: &ConverterKind,
    ) -> Result<Option<Arc<dyn TypeConverter>>, TypeConvertError> {
        if kind.is_no_op() {
            return Ok(None);
        }
        if let Some(converter) = self.converters.iter().find(|c| c.kind() == *kind) {
            return Ok(Some(converter.clone()));
        }
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| TypeConvertError::UnknownConverterKind(kind.clone()))?;
        debug!(target: CONVERT_TARGET, %kind, "Creating converter from factory");
        Ok(Some(factory()))
    }

    /// Converts `typed` with the converter of `kind`.
    ///
    /// A value declared as the converter's `from` type goes through [`TypeConverter::to`] and a
    /// value declared as its `to` type through [`TypeConverter::from`]. Values of unknown type
    /// ([`TypeTag::Any`]) are routed by `target` instead. The no-op kind returns the value as is.
    pub fn convert_using(
        &self,
        kind: &ConverterKind,
        typed: TypedValue,
        target: Option<&TypeTag>,
    ) -> Result<Value, TypeConvertError> {
        let Some(converter) = self.lookup_converter_by_kind(kind)? else {
            return Ok(typed.value);
        };

        let direction = if typed.type_tag == TypeTag::Any {
            target.and_then(|target| {
                if related(target, converter.to_type()) {
                    Some(Direction::Forward)
                } else if related(target, converter.from_type()) {
                    Some(Direction::Reverse)
                } else {
                    None
                }
            })
        } else if typed.type_tag.is_assignable_to(converter.from_type()) {
            Some(Direction::Forward)
        } else if typed.type_tag.is_assignable_to(converter.to_type()) {
            Some(Direction::Reverse)
        } else {
            None
        };

        let direction = direction.ok_or_else(|| TypeConvertError::UnsuitableConverter {
            kind: kind.clone(),
            value_type: target
                .filter(|_| typed.type_tag == TypeTag::Any)
                .unwrap_or(&typed.type_tag)
                .clone(),
        })?;

        trace!(target: CONVERT_TARGET, %kind, ?direction, "Converting value with explicit converter");
        let failure_target = match direction {
            Direction::Forward => converter.to_type().clone(),
            Direction::Reverse => converter.from_type().clone(),
        };
        ResolvedConversion {
            converter,
            direction,
        }
        .apply(typed.value)
        .map_err(|e| match e {
            TypeConvertError::ConversionFailed { .. } => e,
            other => TypeConvertError::failed(&failure_target, other),
        })
    }
}

fn related(a: &TypeTag, b: &TypeTag) -> bool {
    a.is_assignable_to(b) || b.is_assignable_to(a)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn registry() -> TypeConverters {
        TypeConverters::with_converters(default_string_converters())
    }

    #[test]
    fn resolves_in_both_directions() {
        let converters = registry();

        let forward = converters.resolve(&TypeTag::Bool, &TypeTag::String).unwrap();
        assert_eq!(forward.direction, Direction::Forward);
        assert_eq!(forward.converter.kind(), defaults::BOOLEAN_STRING);

        let reverse = converters.resolve(&TypeTag::String, &TypeTag::Bool).unwrap();
        assert_eq!(reverse.direction, Direction::Reverse);
        assert_eq!(reverse.converter.kind(), defaults::BOOLEAN_STRING);

        assert_eq!(forward.apply(json!(true)).unwrap(), json!("true"));
        assert_eq!(reverse.apply(json!("false")).unwrap(), json!(false));
    }

    #[test]
    fn missing_converter_depends_on_strictness() {
        let converters = registry();
        let typed = TypedValue::new(TypeTag::named("org.example.Uuid"), json!("abc"));

        assert!(
            converters
                .convert(typed.clone(), &TypeTag::I32, false)
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            converters.convert(typed, &TypeTag::I32, true),
            Err(TypeConvertError::NoConverter { .. })
        ));
    }

    #[test]
    fn converter_failures_are_reported() {
        let converters = registry();
        let typed = TypedValue::new(TypeTag::String, json!("not a number"));

        assert!(matches!(
            converters.convert(typed, &TypeTag::I32, false),
            Err(TypeConvertError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn registration_is_idempotent_per_kind() {
        let mut converters = registry();
        let before = converters.len();

        assert!(!converters.register(Arc::new(defaults::integer_string())));
        assert_eq!(converters.len(), before);
    }

    #[test]
    fn first_registered_converter_wins() {
        let mut converters = TypeConverters::new();
        converters.register(Arc::new(FnConverter::new(
            "First",
            TypeTag::I32,
            TypeTag::String,
            |_| Ok(json!("first")),
            Ok,
        )));
        converters.register(Arc::new(FnConverter::new(
            "Second",
            TypeTag::I32,
            TypeTag::String,
            |_| Ok(json!("second")),
            Ok,
        )));

        let converted = converters
            .convert(TypedValue::new(TypeTag::I32, json!(1)), &TypeTag::String, true)
            .unwrap();
        assert_eq!(converted, Some(json!("first")));
    }

    #[test]
    fn no_op_kind_is_transparent() {
        let converters = TypeConverters::new();

        assert!(
            converters
                .lookup_converter_by_kind(&ConverterKind::NO_OP)
                .unwrap()
                .is_none()
        );
        let value = converters
            .convert_using(
                &ConverterKind::NO_OP,
                TypedValue::new(TypeTag::I32, json!(7)),
                Some(&TypeTag::String),
            )
            .unwrap();
        assert_eq!(value, json!(7));
    }

    #[test]
    fn lookup_by_kind_falls_back_to_factory() {
        let mut converters = TypeConverters::new();
        assert!(matches!(
            converters.lookup_converter_by_kind(&defaults::INTEGER_STRING),
            Err(TypeConvertError::UnknownConverterKind(_))
        ));

        converters.register_factory(defaults::INTEGER_STRING, || {
            Arc::new(defaults::integer_string())
        });
        let converter = converters
            .lookup_converter_by_kind(&defaults::INTEGER_STRING)
            .unwrap()
            .unwrap();
        assert_eq!(converter.kind(), defaults::INTEGER_STRING);
        assert!(converters.is_empty());
    }

    #[test]
    fn register_default_uses_default_constructor() {
        let mut converters = TypeConverters::new();
        converters.register_default::<Hex>();

        let converter = converters
            .lookup_converter_by_kind(&ConverterKind::from_static("Hex"))
            .unwrap()
            .unwrap();
        assert_eq!(converter.to(json!(255)).unwrap(), json!("ff"));
    }

    #[test]
    fn convert_using_picks_direction() {
        let converters = registry();

        let forward = converters
            .convert_using(
                &defaults::INTEGER_STRING,
                TypedValue::new(TypeTag::I32, json!(42)),
                None,
            )
            .unwrap();
        assert_eq!(forward, json!("42"));

        let reverse = converters
            .convert_using(
                &defaults::INTEGER_STRING,
                TypedValue::untyped(json!("42")),
                Some(&TypeTag::I32),
            )
            .unwrap();
        assert_eq!(reverse, json!(42));

        assert!(matches!(
            converters.convert_using(
                &defaults::INTEGER_STRING,
                TypedValue::new(TypeTag::Bool, json!(true)),
                None,
            ),
            Err(TypeConvertError::UnsuitableConverter { .. })
        ));
    }

    struct Hex {
        from: TypeTag,
        to: TypeTag,
    }

    impl Default for Hex {
        fn default() -> Self {
            Self {
                from: TypeTag::U64,
                to: TypeTag::String,
            }
        }
    }

    impl TypeConverter for Hex {
        fn kind(&self) -> ConverterKind {
            ConverterKind::from_static("Hex")
        }

        fn from_type(&self) -> &TypeTag {
            &self.from
        }

        fn to_type(&self) -> &TypeTag {
            &self.to
        }

        fn to(&self, value: Value) -> Result<Value, TypeConvertError> {
            let n = value
                .as_u64()
                .ok_or_else(|| TypeConvertError::failed(&TypeTag::String, "not a number"))?;
            Ok(json!(format!("{n:x}")))
        }

        fn from(&self, value: Value) -> Result<Value, TypeConvertError> {
            let s = value.as_str().unwrap_or_default();
            u64::from_str_radix(s, 16)
                .map(Value::from)
                .map_err(|e| TypeConvertError::failed(&TypeTag::U64, e))
        }
    }
}
