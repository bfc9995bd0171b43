//! `${env:NAME}` substitution over a whole document.
//!
//! Every variable is required: an unset one fails the substitution instead
//! of being left in place or defaulted. `${ref:...}` tokens pass through
//! untouched for the reference resolver.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    hash::BuildHasher,
};

use crate::{
    document::{self, Document, Mapping},
    error::{Error, Result},
    placeholder::{self, PlaceholderKind, Segment},
};

/// Source of environment values.
///
/// The pipeline never touches the process environment directly; it asks an
/// `EnvSource`, so tests can pass a map instead of mutating global state.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<S: BuildHasher> EnvSource for HashMap<String, String, S> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Adapts a lookup closure.
pub struct FnEnv<F>(pub F);

impl<F> EnvSource for FnEnv<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, name: &str) -> Option<String> {
        (self.0)(name)
    }
}

/// Look up one required variable.
pub(crate) fn require_var(env: &dyn EnvSource, name: &str) -> Result<String> {
    env.var(name)
        .ok_or_else(|| Error::MissingEnvironmentVariable {
            name: name.to_string(),
        })
}

/// Replace every `${env:NAME}` in `value`, recursing through mappings and
/// sequences. Non-string scalars are returned unchanged.
pub fn substitute_env(value: &Document, env: &dyn EnvSource) -> Result<Document> {
    match value {
        Document::String(s) => substitute_env_str(s, env).map(Document::String),
        Document::Object(map) => map
            .iter()
            .map(|(key, child)| Ok((key.clone(), substitute_env(child, env)?)))
            .collect::<Result<Mapping>>()
            .map(Document::Object),
        Document::Array(items) => items
            .iter()
            .map(|item| substitute_env(item, env))
            .collect::<Result<Vec<_>>>()
            .map(Document::Array),
        _ => Ok(value.clone()),
    }
}

/// Replace every `${env:NAME}` in a single string.
///
/// The result is always a string, whether the placeholder was the whole
/// value or embedded in surrounding text.
pub fn substitute_env_str(input: &str, env: &dyn EnvSource) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    for segment in placeholder::scan(input) {
        match segment {
            Segment::Text(text) => result.push_str(text),
            Segment::Placeholder(p) if p.kind == PlaceholderKind::Env => {
                result.push_str(&require_var(env, p.payload)?);
            },
            Segment::Placeholder(p) => result.push_str(&p.to_string()),
        }
    }
    Ok(result)
}

/// Names of every `${env:NAME}` in `value` whose variable is not set,
/// sorted and deduplicated. Never fails.
#[must_use]
pub fn missing_environment_variables(value: &Document, env: &dyn EnvSource) -> Vec<String> {
    let mut missing = BTreeSet::new();
    document::walk_strings(value, "", &mut |_, s| {
        for segment in placeholder::scan(s) {
            if let Segment::Placeholder(p) = segment
                && p.kind == PlaceholderKind::Env
                && env.var(p.payload).is_none()
            {
                missing.insert(p.payload.to_string());
            }
        }
    });
    missing.into_iter().collect()
}
