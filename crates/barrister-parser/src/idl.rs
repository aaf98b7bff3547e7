//! Parsed representation of a Barrister IDL document — the "contract JSON"
//! exchanged with code generators and served to clients over the
//! `barrister-idl` meta-method.
//!
//! An IDL file parses into an ordered [`Document`] of tagged [`Entity`]
//! values. The JSON form is an array of objects whose `type` key
//! discriminates the variant. Serializing a deserialized document
//! reproduces the input byte-for-byte (modulo insignificant whitespace).

use serde::Deserialize;
use serde::Serialize;

/// The built-in wire types.
pub const NATIVE_TYPES: [&str; 4] = ["int", "float", "string", "bool"];

/// Whether `name` is one of the built-in wire types.
pub fn is_native(name: &str) -> bool {
    NATIVE_TYPES.contains(&name)
}

/// An ordered sequence of parsed entities, in source order.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub entities: Vec<Entity>,
}

impl Document {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// The `meta` entry stamped at the end of a parsed contract, if any.
    pub fn meta(&self) -> Option<&Meta> {
        self.entities.iter().find_map(|e| match e {
            Entity::Meta(m) => Some(m),
            _ => None,
        })
    }

    /// Iterate over the struct definitions in source order.
    pub fn structs(&self) -> impl Iterator<Item = &StructDef> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Struct(s) => Some(s),
            _ => None,
        })
    }

    /// Iterate over the interface definitions in source order.
    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceDef> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Interface(i) => Some(i),
            _ => None,
        })
    }
}

/// A top-level entry in the contract, discriminated by the `type` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Comment(Comment),
    Struct(StructDef),
    Enum(EnumDef),
    Interface(InterfaceDef),
    Meta(Meta),
}

impl Entity {
    /// The defined type name, for entities that introduce one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Entity::Struct(s) => Some(&s.name),
            Entity::Enum(e) => Some(&e.name),
            Entity::Interface(i) => Some(&i.name),
            Entity::Comment(_) | Entity::Meta(_) => None,
        }
    }
}

/// A standalone comment block (one that a blank line detached from the
/// definition below it).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    /// Name of the parent struct, or empty if the struct extends nothing.
    pub extends: String,
    pub comment: String,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub is_array: bool,
    pub optional: bool,
    pub comment: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub comment: String,
    pub values: Vec<EnumValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub value: String,
    pub comment: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    pub comment: String,
    pub functions: Vec<Function>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub comment: String,
    pub params: Vec<Param>,
    /// Absent for notifications: functions that declare no return type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnDef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub is_array: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDef {
    #[serde(rename = "type")]
    pub ty: String,
    pub is_array: bool,
    pub optional: bool,
}

/// Terminal contract entry identifying the toolchain run that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub barrister_version: String,
    /// Milliseconds since the Unix epoch.
    pub date_generated: u64,
    /// Hex MD5 over the canonical form of the contract; insensitive to
    /// comments and declaration order.
    pub checksum: String,
}
