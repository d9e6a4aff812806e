//! Declared type to DDL type name mapping.
//!
//! Templates may contain `{N}` (size), `{P}` (precision) and `{S}` (scale)
//! inside a parenthesized group, e.g. `VARCHAR({N})` or `NUMERIC({P},{S})`.
//! A group whose specifiers are not all known is dropped, so a column
//! without a size renders as plain `VARCHAR`, unless the map carries a
//! default size for the type code.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::types::TypeDesc;

/// User-supplied type name override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub type_code: i32,

    /// Source type name to match; matches every name for the code when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    /// Target DDL template.
    pub template: String,
}

/// Mapping from (type code, type name) to a DDL template.
///
/// Lookup tries the exact pair first, then the code alone.
#[derive(Debug, Clone, Default)]
pub struct TypeNameMap {
    by_desc: HashMap<(i32, String), String>,
    by_code: HashMap<i32, String>,
    default_sizes: HashMap<i32, u32>,
}

impl TypeNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template for every type with this code.
    pub fn add_code(&mut self, code: i32, template: impl Into<String>) -> &mut Self {
        self.by_code.insert(code, template.into());
        self
    }

    /// Register a template for one (code, name) pair.
    pub fn add(&mut self, code: i32, name: &str, template: impl Into<String>) -> &mut Self {
        self.by_desc
            .insert((code, name.to_lowercase()), template.into());
        self
    }

    /// Size used for `{N}` when a column of this code declares none.
    pub fn default_size(&mut self, code: i32, size: u32) -> &mut Self {
        self.default_sizes.insert(code, size);
        self
    }

    pub fn add_spec(&mut self, spec: &TypeSpec) -> &mut Self {
        match &spec.type_name {
            Some(name) => self.add(spec.type_code, name, spec.template.clone()),
            None => self.add_code(spec.type_code, spec.template.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_desc.is_empty() && self.by_code.is_empty()
    }

    /// Find the template for a declared type.
    pub fn template(&self, desc: &TypeDesc) -> Option<&str> {
        desc.name
            .as_ref()
            .and_then(|name| self.by_desc.get(&(desc.code, name.to_lowercase())))
            .or_else(|| self.by_code.get(&desc.code))
            .map(String::as_str)
    }

    /// Render the DDL type name for a declared type and its specifiers.
    pub fn type_name(
        &self,
        desc: &TypeDesc,
        size: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Option<String> {
        let scale = scale.or(precision.map(|_| 0));
        let size = size.or_else(|| self.default_sizes.get(&desc.code).copied());
        self.template(desc)
            .map(|t| expand_template(t, size, precision, scale))
    }
}

/// Expand `{N}`, `{P}` and `{S}` in a template.
pub fn expand_template(
    template: &str,
    size: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('(') {
        let Some(close) = rest[open..].find(')').map(|c| open + c) else {
            break;
        };
        out.push_str(&rest[..open]);
        if let Some(group) = substitute(&rest[open..=close], size, precision, scale) {
            out.push_str(&group);
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out.trim_end().to_string()
}

fn substitute(
    group: &str,
    size: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
) -> Option<String> {
    let mut text = group.to_string();
    for (token, value) in [("{N}", size), ("{P}", precision), ("{S}", scale)] {
        if text.contains(token) {
            text = text.replace(token, &value?.to_string());
        }
    }
    Some(text)
}
