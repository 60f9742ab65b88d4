//! Evaluator for the bracketed boolean `condition` grammar attached to
//! manifest nodes: `[ term ( op term )* ]` where `op` is `+` (AND) or `|`
//! (OR, mixing the two within one bracket is rejected) and each term is
//! `key[:value]`, `key:{v1,v2,...}`, optionally prefixed with `!` for
//! negation.

use std::collections::BTreeMap;
use thiserror::Error;

/// The variable space a condition is evaluated against.
///
/// Keys map to lowercase string values (`platform`, `architecture`,
/// `toolchain`, `configuration`, `options`, `debug`, `ci`) plus any number
/// of `env:NAME` keys resolved from the process environment.
#[derive(Debug, Clone, Default)]
pub struct ConditionContext {
    values: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
}

impl ConditionContext {
    pub fn new() -> Self {
        ConditionContext::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Populate `env:*` lookups directly from the process environment.
    pub fn with_process_env(mut self) -> Self {
        for (k, v) in std::env::vars() {
            self.env.insert(k, v);
        }
        self
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        if let Some(name) = key.strip_prefix("env:") {
            self.env.get(name).map(String::as_str)
        } else {
            self.values.get(key).map(String::as_str)
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("condition must be wrapped in '[' and ']': `{0}`")]
    NotBracketed(String),
    #[error("condition mixes '+' (AND) and '|' (OR) operators: `{0}`")]
    MixedOperators(String),
    #[error("empty condition term in: `{0}`")]
    EmptyTerm(String),
}

/// A single parsed `key[:value]` or `key:{v1,v2}` term, with negation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    negate: bool,
    key: String,
    values: Option<Vec<String>>,
}

impl Term {
    fn parse(raw: &str) -> Result<Term, ConditionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConditionError::EmptyTerm(raw.to_string()));
        }
        let (negate, raw) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, raw),
        };

        match raw.split_once(':') {
            None => Ok(Term {
                negate,
                key: raw.to_string(),
                values: None,
            }),
            Some((key, value)) => {
                let value = value.trim();
                let values = if let Some(inner) = value.strip_prefix('{').and_then(|v| v.strip_suffix('}')) {
                    inner.split(',').map(|v| v.trim().to_string()).collect()
                } else {
                    vec![value.to_string()]
                };
                Ok(Term {
                    negate,
                    key: key.trim().to_string(),
                    values: Some(values),
                })
            }
        }
    }

    fn eval(&self, ctx: &ConditionContext) -> bool {
        let result = match &self.values {
            None => ctx.lookup(&self.key).is_some(),
            Some(values) => match ctx.lookup(&self.key) {
                Some(actual) => values.iter().any(|v| v.eq_ignore_ascii_case(actual)),
                None => false,
            },
        };
        if self.negate {
            !result
        } else {
            result
        }
    }
}

/// Parse and evaluate a `condition` string against a context. Two
/// independent evaluations of the same string against the same context
/// always return the same result (condition purity, spec §8).
pub fn evaluate(condition: &str, ctx: &ConditionContext) -> Result<bool, ConditionError> {
    let trimmed = condition.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| ConditionError::NotBracketed(trimmed.to_string()))?;

    let has_and = inner.contains('+');
    let has_or = inner.contains('|');
    if has_and && has_or {
        return Err(ConditionError::MixedOperators(trimmed.to_string()));
    }

    let sep = if has_or { '|' } else { '+' };
    let mut terms = Vec::new();
    for raw in inner.split(sep) {
        terms.push(Term::parse(raw)?);
    }

    if terms.is_empty() {
        return Err(ConditionError::EmptyTerm(trimmed.to_string()));
    }

    let result = if has_or {
        terms.iter().any(|t| t.eval(ctx))
    } else {
        terms.iter().all(|t| t.eval(ctx))
    };
    Ok(result)
}
