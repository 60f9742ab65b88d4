//! `${scope:name}` variable substitution, phase one of manifest evaluation
//! (performed before type-coercion of the resulting string value).

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VariableError {
    #[error("unresolved required variable `${{{0}}}`")]
    Unresolved(String),
    #[error("malformed variable reference `${{{0}}}`: missing closing brace")]
    Unterminated(String),
}

/// Everything `${...}` references may resolve against. Populated once per
/// build from the workspace, the active configuration, and user-declared
/// `var:` entries.
#[derive(Debug, Clone, Default)]
pub struct VariableSpace {
    bare: BTreeMap<String, String>,
    meta: BTreeMap<String, String>,
    vars: BTreeMap<String, String>,
    external: BTreeMap<String, String>,
    external_build: BTreeMap<String, String>,
    links: BTreeMap<String, String>,
}

impl VariableSpace {
    pub fn new() -> Self {
        VariableSpace::default()
    }

    pub fn set_bare(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.bare.insert(name.into(), value.into());
        self
    }

    pub fn set_meta(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.meta.insert(name.into(), value.into());
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn set_external(&mut self, name: impl Into<String>, path: impl Into<String>) -> &mut Self {
        self.external.insert(name.into(), path.into());
        self
    }

    pub fn set_external_build(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> &mut Self {
        self.external_build.insert(name.into(), path.into());
        self
    }

    /// Register a library link-name resolution for the `so:`/`ar:`/`exe:`
    /// scopes, keyed `"{scope}:{link}"`.
    pub fn set_link(&mut self, scoped_key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.links.insert(scoped_key.into(), value.into());
        self
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        if let Some(name) = reference.strip_prefix("env:") {
            return std::env::var(name).ok();
        }
        if let Some(name) = reference.strip_prefix("defined:") {
            return std::env::var(name).ok();
        }
        if let Some(name) = reference.strip_prefix("var:") {
            return self.vars.get(name).cloned();
        }
        if let Some(name) = reference.strip_prefix("external:") {
            return self.external.get(name).cloned();
        }
        if let Some(name) = reference.strip_prefix("externalBuild:") {
            return self.external_build.get(name).cloned();
        }
        if let Some(rest) = reference.strip_prefix("so:") {
            return self.links.get(&format!("so:{rest}")).cloned();
        }
        if let Some(rest) = reference.strip_prefix("ar:") {
            return self.links.get(&format!("ar:{rest}")).cloned();
        }
        if let Some(rest) = reference.strip_prefix("exe:") {
            return self.links.get(&format!("exe:{rest}")).cloned();
        }
        if reference == "meta" {
            return self.meta.get("meta").cloned();
        }
        if let Some(field) = reference.strip_prefix("meta:workspace") {
            return self.meta.get(&format!("workspace{field}")).cloned();
        }
        if let Some(rest) = reference.strip_prefix("meta:") {
            return self.meta.get(rest).cloned();
        }
        self.bare.get(reference).cloned()
    }

    /// Replace every `${...}` reference in `input`. A reference whose scope
    /// is one of the "required" bare scopes (everything except `var:`,
    /// `external:`, `externalBuild:`, `defined:`, `so:`/`ar:`/`exe:`, which
    /// are user-declared and thus optional) aborts the parse when missing;
    /// optional scopes substitute empty string.
    pub fn substitute(&self, input: &str) -> Result<String, VariableError> {
        let mut out = String::with_capacity(input.len());
        let bytes = input.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
                let rest = &input[i + 2..];
                let end = rest.find('}').ok_or_else(|| {
                    VariableError::Unterminated(input.to_string())
                })?;
                let reference = &rest[..end];
                match self.resolve(reference) {
                    Some(value) => out.push_str(&value),
                    None => {
                        if is_optional_scope(reference) {
                            // optional: empty string
                        } else {
                            return Err(VariableError::Unresolved(reference.to_string()));
                        }
                    }
                }
                i += 2 + end + 1;
            } else {
                out.push(bytes[i] as char);
                i += 1;
            }
        }
        Ok(out)
    }
}

fn is_optional_scope(reference: &str) -> bool {
    reference.starts_with("var:")
        || reference.starts_with("external:")
        || reference.starts_with("externalBuild:")
        || reference.starts_with("defined:")
        || reference.starts_with("so:")
        || reference.starts_with("ar:")
        || reference.starts_with("exe:")
}
