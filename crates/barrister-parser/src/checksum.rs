//! Canonical checksum and `meta` stamping for a parsed contract.
//!
//! The checksum ignores comments, whitespace, and declaration order, but
//! changes whenever a name, type reference, array/optional flag, enum
//! value, or parameter order changes. Each top-level type serializes to
//! one canonical line; the sorted line array is JSON-encoded and MD5-hexed.
//! MD5 is used for cross-language determinism, not strength.

use crate::idl::Document;
use crate::idl::Entity;
use crate::idl::Meta;
use md5::Digest;
use md5::Md5;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Append a `meta` entity carrying the toolkit version, the generation
/// timestamp, and the contract checksum.
pub fn add_meta(doc: &mut Document) {
    let date_generated = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let meta = Meta {
        barrister_version: env!("CARGO_PKG_VERSION").to_string(),
        date_generated,
        checksum: checksum(doc),
    };
    doc.entities.push(Entity::Meta(meta));
}

/// Hex MD5 over the canonical form of the document.
pub fn checksum(doc: &Document) -> String {
    let mut lines = Vec::new();
    for entity in &doc.entities {
        match entity {
            Entity::Struct(s) => {
                let mut fields: Vec<_> = s.fields.iter().collect();
                fields.sort_by(|a, b| a.name.cmp(&b.name));
                let mut buf = String::new();
                for f in fields {
                    buf.push_str(&format!(
                        "\t{}\t{}\t{}\t{}",
                        f.name, f.ty, f.is_array, f.optional
                    ));
                }
                lines.push(format!("struct\t{}\t{}\t{}\n", s.name, s.extends, buf));
            }
            Entity::Enum(e) => {
                let mut values: Vec<_> = e.values.iter().collect();
                values.sort_by(|a, b| a.value.cmp(&b.value));
                let mut buf = format!("enum\t{}", e.name);
                for v in values {
                    buf.push_str(&format!("\t{}", v.value));
                }
                buf.push('\n');
                lines.push(buf);
            }
            Entity::Interface(i) => {
                let mut functions: Vec<_> = i.functions.iter().collect();
                functions.sort_by(|a, b| a.name.cmp(&b.name));
                let mut buf = format!("interface\t{}", i.name);
                for f in functions {
                    buf.push_str(&format!("[{}", f.name));
                    // parameter order is significant
                    for p in &f.params {
                        buf.push_str(&format!("\t{}\t{}", p.ty, p.is_array));
                    }
                    match &f.returns {
                        Some(r) => buf.push_str(&format!(
                            "({}\t{}\t{})]",
                            r.ty, r.is_array, r.optional
                        )),
                        None => buf.push_str("()]"),
                    }
                }
                buf.push('\n');
                lines.push(buf);
            }
            Entity::Comment(_) | Entity::Meta(_) => {}
        }
    }
    lines.sort();

    let encoded =
        serde_json::to_string(&lines).expect("a string array always serializes to JSON");
    let digest = Md5::digest(encoded.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
