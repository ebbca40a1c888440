//! Canonical, human-diffable keys identifying interface members.
//!
//! | member    | canonical form                                   |
//! |-----------|--------------------------------------------------|
//! | method    | `org.example.Hello.set(i32, Vec<String>)`        |
//! | parameter | `org.example.Hello.set(i32, Vec<String>)[1]`     |
//! | field     | `org.example.Greeting.message`                   |
//!
//! Every key parses back into the same value, which is how persisted metadata refers to the
//! members it describes.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{errors::MetadataError, type_tag::TypeTag};

/// Name of the reserved operation returning the contract descriptor bound to a wrapper.
pub const GET_CONTRACT_DESCRIPTOR: &str = "get_contract_descriptor";

fn invalid_key(key: &str, reason: impl Into<String>) -> MetadataError {
    MetadataError::InvalidMemberKey {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_type_path(s: &str) -> bool {
    !s.is_empty() && s.chars().all(crate::type_tag::is_path_char)
}

/// Identity of an interface method: declaring type, name and ordered parameter types.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodSignature {
    declaring_type: String,
    name: String,
    parameter_types: Vec<TypeTag>,
}

impl MethodSignature {
    pub fn new(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        parameter_types: impl IntoIterator<Item = TypeTag>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameter_types: parameter_types.into_iter().collect(),
        }
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_types(&self) -> &[TypeTag] {
        &self.parameter_types
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Reference to the parameter at `index`, or `None` if the method has fewer parameters.
    pub fn parameter(&self, index: usize) -> Option<ParameterRef> {
        (index < self.arity()).then(|| ParameterRef {
            method: self.clone(),
            index,
        })
    }

    /// Whether this is the reserved self-description operation.
    pub fn is_descriptor_accessor(&self) -> bool {
        self.name == GET_CONTRACT_DESCRIPTOR && self.parameter_types.is_empty()
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.declaring_type, self.name)?;
        for (i, parameter_type) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{parameter_type}")?;
        }
        f.write_str(")")
    }
}

impl FromStr for MethodSignature {
    type Err = MetadataError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let trimmed = key.trim();
        let open = trimmed
            .find('(')
            .ok_or_else(|| invalid_key(key, "missing parameter list"))?;
        let parameters = trimmed[open + 1..]
            .strip_suffix(')')
            .ok_or_else(|| invalid_key(key, "parameter list is not closed"))?;
        let (declaring_type, name) = trimmed[..open]
            .rsplit_once('.')
            .ok_or_else(|| invalid_key(key, "missing declaring type"))?;

        if !is_type_path(declaring_type) {
            return Err(invalid_key(key, "invalid declaring type"));
        }
        if !is_identifier(name) {
            return Err(invalid_key(key, "invalid method name"));
        }

        let parameter_types = split_top_level(parameters)
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<TypeTag>, _>>()
            .map_err(|e| invalid_key(key, e.to_string()))?;

        Ok(Self::new(declaring_type, name, parameter_types))
    }
}

/// Splits a comma separated type list, ignoring commas nested inside `<..>`.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = list[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts
}

impl TryFrom<String> for MethodSignature {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MethodSignature> for String {
    fn from(value: MethodSignature) -> Self {
        value.to_string()
    }
}

/// Reference to one parameter of a method, `<method>[index]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParameterRef {
    method: MethodSignature,
    index: usize,
}

impl ParameterRef {
    pub const fn method(&self) -> &MethodSignature {
        &self.method
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub fn parameter_type(&self) -> &TypeTag {
        // index < arity is checked on construction and on parsing
        &self.method.parameter_types[self.index]
    }
}

impl fmt::Display for ParameterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.method, self.index)
    }
}

impl FromStr for ParameterRef {
    type Err = MetadataError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let trimmed = key.trim();
        let (method, index) = trimmed
            .strip_suffix(']')
            .and_then(|s| s.rsplit_once('['))
            .ok_or_else(|| invalid_key(key, "missing parameter index"))?;
        let method: MethodSignature = method.parse()?;
        let index: usize = index
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| invalid_key(key, e.to_string()))?;

        method.parameter(index).ok_or_else(|| {
            invalid_key(
                key,
                format!("method has {} parameters, index {index} is out of range", method.arity()),
            )
        })
    }
}

impl TryFrom<String> for ParameterRef {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ParameterRef> for String {
    fn from(value: ParameterRef) -> Self {
        value.to_string()
    }
}

/// Reference to a field of an event payload type, `declaring.Type.field`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldRef {
    declaring_type: String,
    name: String,
}

impl FieldRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

impl FromStr for FieldRef {
    type Err = MetadataError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let (declaring_type, name) = key
            .trim()
            .rsplit_once('.')
            .ok_or_else(|| invalid_key(key, "missing declaring type"))?;
        if !is_type_path(declaring_type) || !is_identifier(name) {
            return Err(invalid_key(key, "invalid field description"));
        }
        Ok(Self::new(declaring_type, name))
    }
}

impl TryFrom<String> for FieldRef {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldRef> for String {
    fn from(value: FieldRef) -> Self {
        value.to_string()
    }
}
