//! Post-parse semantic checks over a parsed document.
//!
//! Runs once the state machine has produced its entities. Every failure is
//! structural rather than positional, so the errors carry line 0.

use crate::idl::is_native;
use crate::idl::Entity;
use crate::idl::StructDef;
use crate::ParseError;
use indexmap::IndexMap;

pub(crate) fn validate(entities: &[Entity]) -> Vec<ParseError> {
    let mut types: IndexMap<&str, &Entity> = IndexMap::new();
    for entity in entities {
        if let Some(name) = entity.name() {
            types.insert(name, entity);
        }
    }

    let mut errors = Vec::new();
    for entity in entities {
        let Some(name) = entity.name() else { continue };
        if !contains_cycle(&types, &mut errors, name, &mut Vec::new()) {
            check_type(&types, &mut errors, name, &mut Vec::new(), 0);
            if let Entity::Struct(s) = entity {
                check_extends(&types, &mut errors, s);
            }
        }
    }
    errors
}

/// Depth-first search for required-field cycles, using path-local marks.
///
/// Only `extends` edges and fields that are neither arrays nor optional
/// extend the path; array and optional references may legally recurse
/// (linked lists, trees).
fn contains_cycle<'a>(
    types: &IndexMap<&'a str, &'a Entity>,
    errors: &mut Vec<ParseError>,
    name: &str,
    path: &mut Vec<String>,
) -> bool {
    let Some(Entity::Struct(s)) = types.get(name) else {
        return false;
    };

    if path.iter().any(|n| n == name) {
        errors.push(ParseError::structural(format!(
            "cycle detected in struct: {name}"
        )));
        return true;
    }
    path.push(name.to_string());

    if !s.extends.is_empty() && contains_cycle(types, errors, &s.extends, path) {
        return true;
    }
    for field in &s.fields {
        if field.is_array || field.optional {
            continue;
        }
        if contains_cycle(types, errors, &field.ty, &mut path.clone()) {
            return true;
        }
    }
    false
}

/// Walk every type reachable from `name`, reporting unresolved references
/// and interfaces used as value types. `visited` prevents revisiting
/// within one traversal; interface functions each get a fresh scope so a
/// result struct shared by two functions is not reported twice.
fn check_type<'a>(
    types: &IndexMap<&'a str, &'a Entity>,
    errors: &mut Vec<ParseError>,
    name: &str,
    visited: &mut Vec<String>,
    depth: usize,
) {
    if is_native(name) || visited.iter().any(|n| n == name) {
        return;
    }

    match types.get(name) {
        None => errors.push(ParseError::structural(format!("undefined type: {name}"))),
        Some(Entity::Struct(s)) => {
            visited.push(name.to_string());
            if !s.extends.is_empty() {
                check_type(types, errors, &s.extends, visited, depth + 1);
            }
            for field in &s.fields {
                check_type(types, errors, &field.ty, visited, depth + 1);
            }
        }
        Some(Entity::Enum(_)) => visited.push(name.to_string()),
        Some(Entity::Interface(i)) => {
            if depth > 0 {
                errors.push(ParseError::structural(format!(
                    "interface {name} cannot be a field type"
                )));
            } else {
                for function in &i.functions {
                    let mut scope = Vec::new();
                    for param in &function.params {
                        check_type(types, errors, &param.ty, &mut scope, 1);
                    }
                    if let Some(returns) = &function.returns {
                        check_type(types, errors, &returns.ty, &mut scope, 1);
                    }
                }
            }
        }
        Some(Entity::Comment(_)) | Some(Entity::Meta(_)) => {}
    }
}

/// `extends` must point at another struct, and a child may not redefine a
/// field it inherits anywhere up the chain.
fn check_extends<'a>(
    types: &IndexMap<&'a str, &'a Entity>,
    errors: &mut Vec<ParseError>,
    s: &StructDef,
) {
    let mut inherited = Vec::new();
    let mut chain = Vec::new();
    parent_fields(types, errors, s, &mut inherited, &mut chain);

    for field in &s.fields {
        if inherited.iter().any(|n| n == &field.name) {
            errors.push(ParseError::structural(format!(
                "{} cannot redefine parent field {}",
                s.name, field.name
            )));
        }
    }
}

fn parent_fields<'a>(
    types: &IndexMap<&'a str, &'a Entity>,
    errors: &mut Vec<ParseError>,
    s: &StructDef,
    inherited: &mut Vec<String>,
    chain: &mut Vec<String>,
) {
    if s.extends.is_empty() {
        return;
    }
    if is_native(&s.extends) {
        errors.push(ParseError::structural(format!(
            "{} cannot extend {}",
            s.name, s.extends
        )));
        return;
    }

    match types.get(s.extends.as_str()) {
        // an unresolved parent is reported by the reference walk
        None => {}
        Some(Entity::Struct(parent)) => {
            if chain.iter().any(|n| n == &s.name) {
                return;
            }
            chain.push(s.name.clone());
            for field in &parent.fields {
                if !inherited.iter().any(|n| n == &field.name) {
                    inherited.push(field.name.clone());
                }
            }
            parent_fields(types, errors, parent, inherited, chain);
        }
        Some(Entity::Enum(parent)) => errors.push(ParseError::structural(format!(
            "{} cannot extend enum {}",
            s.name, parent.name
        ))),
        Some(Entity::Interface(parent)) => errors.push(ParseError::structural(format!(
            "{} cannot extend interface {}",
            s.name, parent.name
        ))),
        Some(Entity::Comment(_)) | Some(Entity::Meta(_)) => {}
    }
}
