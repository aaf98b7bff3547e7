//! Indexed, read-only view over a parsed contract, plus the recursive
//! value validator the server and client share.
//!
//! The contract is pure data: it holds no references to handlers, so the
//! same `Arc<Contract>` can back any number of servers and clients.

use crate::error::RpcError;
use crate::error::ERR_INVALID_PARAMS;
use crate::error::ERR_INVALID_RESP;
use crate::error::ERR_METHOD_NOT_FOUND;
use crate::error::ERR_PARSE;
use barrister_parser::idl::EnumDef;
use barrister_parser::idl::Field;
use barrister_parser::idl::Function;
use barrister_parser::idl::InterfaceDef;
use barrister_parser::idl::StructDef;
use barrister_parser::Document;
use barrister_parser::Entity;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

pub struct Contract {
    document: Document,
    structs: IndexMap<String, StructEntry>,
    enums: IndexMap<String, EnumDef>,
    interfaces: IndexMap<String, InterfaceDef>,
}

struct StructEntry {
    def: StructDef,
    /// Fields flattened across `extends`, child first, resolved on first
    /// lookup.
    resolved: OnceLock<IndexMap<String, Field>>,
}

impl Contract {
    pub fn from_document(document: Document) -> Self {
        let mut structs = IndexMap::new();
        let mut enums = IndexMap::new();
        let mut interfaces = IndexMap::new();
        for entity in &document.entities {
            match entity {
                Entity::Struct(s) => {
                    structs.insert(
                        s.name.clone(),
                        StructEntry {
                            def: s.clone(),
                            resolved: OnceLock::new(),
                        },
                    );
                }
                Entity::Enum(e) => {
                    enums.insert(e.name.clone(), e.clone());
                }
                Entity::Interface(i) => {
                    interfaces.insert(i.name.clone(), i.clone());
                }
                Entity::Comment(_) | Entity::Meta(_) => {}
            }
        }
        Self {
            document,
            structs,
            enums,
            interfaces,
        }
    }

    /// Load a contract from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, RpcError> {
        let document: Document = serde_json::from_str(json).map_err(|e| {
            RpcError::new(ERR_PARSE, format!("malformed contract JSON: {e}"))
        })?;
        Ok(Self::from_document(document))
    }

    /// Load a contract from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RpcError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RpcError::new(
                ERR_PARSE,
                format!("cannot read contract file {}: {e}", path.display()),
            )
        })?;
        Self::from_json(&json)
    }

    /// The parsed entities backing this contract, as served to clients via
    /// the `barrister-idl` meta-method.
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Interface names in contract order.
    pub fn interface_names(&self) -> impl Iterator<Item = &str> {
        self.interfaces.keys().map(String::as_str)
    }

    pub fn interface(&self, name: &str) -> Result<&InterfaceDef, RpcError> {
        self.interfaces.get(name).ok_or_else(|| {
            RpcError::new(ERR_INVALID_PARAMS, format!("Unknown interface: '{name}'"))
        })
    }

    pub fn function(&self, iface_name: &str, func_name: &str) -> Result<&Function, RpcError> {
        let iface = self.interface(iface_name)?;
        iface
            .functions
            .iter()
            .find(|f| f.name == func_name)
            .ok_or_else(|| {
                RpcError::new(
                    ERR_METHOD_NOT_FOUND,
                    format!("{iface_name}: Unknown function: '{func_name}'"),
                )
            })
    }

    /// Validate positional params against a function's declaration.
    ///
    /// Requests allow optional struct fields to be missing or null
    /// (`allow_missing` semantics), matching what partial payloads send.
    pub fn validate_request(
        &self,
        iface_name: &str,
        func_name: &str,
        params: &[Value],
    ) -> Result<(), RpcError> {
        let function = self.function(iface_name, func_name)?;

        if function.params.len() != params.len() {
            return Err(RpcError::new(
                ERR_INVALID_PARAMS,
                format!(
                    "Function '{iface_name}.{func_name}' expects {} param(s). {} given.",
                    function.params.len(),
                    params.len()
                ),
            ));
        }

        for (param, value) in function.params.iter().zip(params) {
            self.validate(&param.ty, param.is_array, true, value)
                .map_err(|msg| {
                    RpcError::new(
                        ERR_INVALID_PARAMS,
                        format!(
                            "Function '{iface_name}.{func_name}' invalid param '{}'. {msg}",
                            param.name
                        ),
                    )
                })?;
        }
        Ok(())
    }

    /// Validate a return value against a function's declaration. Responses
    /// must fully satisfy the contract: no missing non-optional fields.
    pub fn validate_response(
        &self,
        iface_name: &str,
        func_name: &str,
        result: &Value,
    ) -> Result<(), RpcError> {
        let function = self.function(iface_name, func_name)?;
        let invalid = |msg: String| {
            RpcError::new(
                ERR_INVALID_RESP,
                format!(
                    "Function '{iface_name}.{func_name}' invalid response: '{result}'. {msg}"
                ),
            )
        };

        match &function.returns {
            None => {
                if result.is_null() {
                    Ok(())
                } else {
                    Err(invalid("no declared return type".to_string()))
                }
            }
            Some(returns) => {
                if result.is_null() && returns.optional {
                    return Ok(());
                }
                self.validate(&returns.ty, returns.is_array, false, result)
                    .map_err(invalid)
            }
        }
    }

    /// Recursive descent over a value. Returns the path-qualified failure
    /// message; callers wrap it with the function and parameter name.
    pub fn validate(
        &self,
        expected: &str,
        is_array: bool,
        allow_missing: bool,
        value: &Value,
    ) -> Result<(), String> {
        if is_array {
            let Value::Array(items) = value else {
                return Err(type_error(value, "array"));
            };
            for item in items {
                self.validate(expected, false, allow_missing, item)?;
            }
            return Ok(());
        }

        match expected {
            // whole floats are still floats: no silent float→int coercion
            "int" => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
                _ => Err(type_error(value, "int")),
            },
            "float" => match value {
                Value::Number(_) => Ok(()),
                _ => Err(type_error(value, "float")),
            },
            "bool" => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(type_error(value, "bool")),
            },
            "string" => match value {
                Value::String(_) => Ok(()),
                _ => Err(type_error(value, "string")),
            },
            _ => {
                if self.structs.contains_key(expected) {
                    self.validate_struct(expected, allow_missing, value)
                } else if let Some(e) = self.enums.get(expected) {
                    validate_enum(e, value)
                } else {
                    Err(format!("unknown type: {expected}"))
                }
            }
        }
    }

    fn validate_struct(
        &self,
        name: &str,
        allow_missing: bool,
        value: &Value,
    ) -> Result<(), String> {
        let Value::Object(map) = value else {
            return Err(format!("{value} is not an object"));
        };

        for (key, item) in map {
            let Some(field) = self.field(name, key) else {
                return Err(format!("field '{key}' not found in struct {name}"));
            };
            if item.is_null() && (field.optional || allow_missing) {
                continue;
            }
            self.validate(&field.ty, field.is_array, allow_missing, item)
                .map_err(|msg| format!("field '{}': {msg}", field.name))?;
        }

        if !allow_missing {
            for (field_name, field) in self.resolved_fields(name) {
                if !field.optional && !map.contains_key(field_name) {
                    return Err(format!("field '{field_name}' missing from: {value}"));
                }
            }
        }
        Ok(())
    }

    /// Look up a field by name, local fields first, then up the `extends`
    /// chain.
    pub fn field(&self, struct_name: &str, field_name: &str) -> Option<&Field> {
        self.structs.get(struct_name)?;
        self.resolved_fields(struct_name).get(field_name)
    }

    /// Field table flattened across `extends`, computed on first use.
    /// A visited guard keeps the walk terminating even for contracts that
    /// never went through semantic validation.
    fn resolved_fields(&self, name: &str) -> &IndexMap<String, Field> {
        static EMPTY: OnceLock<IndexMap<String, Field>> = OnceLock::new();
        let Some(entry) = self.structs.get(name) else {
            return EMPTY.get_or_init(IndexMap::new);
        };

        entry.resolved.get_or_init(|| {
            let mut fields = IndexMap::new();
            let mut seen: Vec<&str> = Vec::new();
            let mut current = Some(entry);
            while let Some(e) = current {
                if seen.contains(&e.def.name.as_str()) {
                    break;
                }
                seen.push(&e.def.name);
                for field in &e.def.fields {
                    fields
                        .entry(field.name.clone())
                        .or_insert_with(|| field.clone());
                }
                current = if e.def.extends.is_empty() {
                    None
                } else {
                    self.structs.get(&e.def.extends)
                };
            }
            fields
        })
    }
}

fn validate_enum(e: &EnumDef, value: &Value) -> Result<(), String> {
    let values: Vec<&str> = e.values.iter().map(|v| v.value.as_str()).collect();
    match value {
        Value::String(s) if values.contains(&s.as_str()) => Ok(()),
        _ => Err(format!("'{value}' is not in enum: {values:?}")),
    }
}

fn type_error(value: &Value, expected: &str) -> String {
    format!(
        "'{value}' is of type {}, expected {expected}",
        json_type(value)
    )
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
