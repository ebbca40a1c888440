//! Reified type descriptors.
//!
//! Values cross the interface boundary as [`Value`](crate::Value), which does not remember whether it
//! started out as an `i8` or an `i64`, or what the element type of an empty list was. Every
//! conversion therefore carries a [`TypeTag`] next to the value ([`TypedValue`]).
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Value, errors::MetadataError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeTag {
    Unit,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U64,
    F32,
    F64,
    String,
    Bytes,
    /// Abstract supertype of every numeric tag.
    Number,
    /// Top type, accepts every value.
    Any,
    List(Box<TypeTag>),
    Optional(Box<TypeTag>),
    /// Pending-result handle resolving to the inner type.
    Pending(Box<TypeTag>),
    /// Result envelope carrying provenance, see [`Data`](crate::Data).
    Data(Box<TypeTag>),
    /// Event subscription producing the inner type.
    EventStream(Box<TypeTag>),
    /// Event envelope carrying provenance, see [`Event`](crate::Event).
    Event(Box<TypeTag>),
    /// User defined type, identified by its fully qualified path (`org.example.Payload`).
    Named(String),
}

impl TypeTag {
    pub fn named(path: impl Into<String>) -> Self {
        Self::Named(path.into())
    }

    pub fn list(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn pending(inner: Self) -> Self {
        Self::Pending(Box::new(inner))
    }

    pub fn data(inner: Self) -> Self {
        Self::Data(Box::new(inner))
    }

    pub fn event_stream(inner: Self) -> Self {
        Self::EventStream(Box::new(inner))
    }

    pub fn event(inner: Self) -> Self {
        Self::Event(Box::new(inner))
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U64 | Self::F32 | Self::F64
        )
    }

    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Returns whether a value declared as `self` may be used where `target` is expected.
    pub fn is_assignable_to(&self, target: &Self) -> bool {
        match (self, target) {
            (_, Self::Any) => true,
            (from, to) if from == to => true,
            (from, Self::Number) => from.is_numeric(),
            (Self::List(from), Self::List(to))
            | (Self::Optional(from), Self::Optional(to))
            | (Self::Pending(from), Self::Pending(to))
            | (Self::Data(from), Self::Data(to))
            | (Self::EventStream(from), Self::EventStream(to))
            | (Self::Event(from), Self::Event(to)) => from.is_assignable_to(to),
            (from, Self::Optional(to)) => from.is_assignable_to(to),
            _ => false,
        }
    }

    /// Strips a `Pending<..>` wrapper if present.
    pub fn without_pending(&self) -> &Self {
        match self {
            Self::Pending(inner) => inner,
            other => other,
        }
    }

    /// Strips `Pending<..>` and then `Data<..>` wrappers if present.
    pub fn actual_type(&self) -> &Self {
        match self.without_pending() {
            Self::Data(inner) => inner,
            other => other,
        }
    }

    /// Returns whether `value` already has the shape of this type and can be assigned as is.
    ///
    /// Named types are opaque and accept any value except `null`.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Unit => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::I8 => value.as_i64().is_some_and(|n| i8::try_from(n).is_ok()),
            Self::I16 => value.as_i64().is_some_and(|n| i16::try_from(n).is_ok()),
            Self::I32 => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
            Self::I64 => value.is_i64(),
            Self::U64 => value.is_u64(),
            Self::F32 | Self::F64 | Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Bytes => value.is_string() || value.is_array(),
            Self::List(element) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| element.accepts(item))),
            Self::Optional(inner) => value.is_null() || inner.accepts(value),
            Self::Named(_) => !value.is_null(),
            Self::Pending(_)
            | Self::Data(_)
            | Self::EventStream(_)
            | Self::Event(_) => false,
        }
    }

    /// The most specific tag describing the shape of `value`, used for values of unknown type.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Unit,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_i64() => Self::I64,
            Value::Number(n) if n.is_u64() => Self::U64,
            Value::Number(_) => Self::F64,
            Value::String(_) => Self::String,
            Value::Array(_) | Value::Object(_) => Self::Any,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool => f.write_str("bool"),
            Self::I8 => f.write_str("i8"),
            Self::I16 => f.write_str("i16"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::U64 => f.write_str("u64"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::String => f.write_str("String"),
            Self::Bytes => f.write_str("Bytes"),
            Self::Number => f.write_str("Number"),
            Self::Any => f.write_str("Any"),
            Self::List(inner) => write!(f, "Vec<{inner}>"),
            Self::Optional(inner) => write!(f, "Option<{inner}>"),
            Self::Pending(inner) => write!(f, "Pending<{inner}>"),
            Self::Data(inner) => write!(f, "Data<{inner}>"),
            Self::EventStream(inner) => write!(f, "EventStream<{inner}>"),
            Self::Event(inner) => write!(f, "Event<{inner}>"),
            Self::Named(path) => f.write_str(path),
        }
    }
}

impl FromStr for TypeTag {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TagParser {
            input: s,
            pos: 0,
            depth: 0,
        };
        let tag = parser
            .parse()
            .ok_or_else(|| MetadataError::InvalidTypeTag(s.to_string()))?;
        parser.skip_whitespace();
        if parser.pos != s.len() {
            return Err(MetadataError::InvalidTypeTag(s.to_string()));
        }
        Ok(tag)
    }
}

impl TryFrom<String> for TypeTag {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeTag> for String {
    fn from(value: TypeTag) -> Self {
        value.to_string()
    }
}

pub(crate) const fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '$')
}

/// Deepest generic nesting accepted when parsing a type tag.
pub const MAX_TYPE_TAG_DEPTH: usize = 64;

struct TagParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> TagParser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn parse(&mut self) -> Option<TypeTag> {
        self.skip_whitespace();
        if self.rest().starts_with("()") {
            self.pos += 2;
            return Some(TypeTag::Unit);
        }

        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !is_path_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return None;
        }
        let ident = &rest[..len];
        self.pos += len;

        self.skip_whitespace();
        if self.eat('<') {
            if self.depth == MAX_TYPE_TAG_DEPTH {
                return None;
            }
            self.depth += 1;
            let inner = Box::new(self.parse()?);
            self.depth -= 1;
            self.skip_whitespace();
            if !self.eat('>') {
                return None;
            }
            return match ident {
                "Vec" => Some(TypeTag::List(inner)),
                "Option" => Some(TypeTag::Optional(inner)),
                "Pending" => Some(TypeTag::Pending(inner)),
                "Data" => Some(TypeTag::Data(inner)),
                "EventStream" => Some(TypeTag::EventStream(inner)),
                "Event" => Some(TypeTag::Event(inner)),
                _ => None,
            };
        }

        Some(match ident {
            "bool" => TypeTag::Bool,
            "i8" => TypeTag::I8,
            "i16" => TypeTag::I16,
            "i32" => TypeTag::I32,
            "i64" => TypeTag::I64,
            "u64" => TypeTag::U64,
            "f32" => TypeTag::F32,
            "f64" => TypeTag::F64,
            "String" => TypeTag::String,
            "Bytes" => TypeTag::Bytes,
            "Number" => TypeTag::Number,
            "Any" => TypeTag::Any,
            path => TypeTag::Named(path.to_string()),
        })
    }
}

/// A value together with the type it was declared as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedValue {
    pub type_tag: TypeTag,
    pub value: Value,
}

impl TypedValue {
    pub const fn new(type_tag: TypeTag, value: Value) -> Self {
        Self { type_tag, value }
    }

    /// A value whose declared type is unknown, e.g. a raw backend result.
    pub const fn untyped(value: Value) -> Self {
        Self::new(TypeTag::Any, value)
    }
}
