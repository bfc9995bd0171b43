//! `${ref:dotted.path}` resolution.
//!
//! References are looked up in the root document after environment
//! substitution. A whole-string reference replaces the node with whatever it
//! points at (mapping, sequence or scalar); an embedded reference must land
//! on a string, number or boolean. Targets are resolved on demand and
//! depth-first, so a reference may point at a value that holds further
//! references, and a path may walk through a node that is itself a
//! reference. Paths currently being resolved are kept on a stack to detect
//! cycles.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    document::{self, Document, Mapping, Node},
    env_subst::{self, EnvSource},
    error::{Error, Result},
    placeholder::{self, Placeholder, PlaceholderKind, Segment},
};

/// Run both substitution passes (environment, then references) and check
/// that no placeholder survived.
pub fn resolve_document(root: &Document, env: &dyn EnvSource) -> Result<Document> {
    let substituted = env_subst::substitute_env(root, env)?;
    let resolved = resolve_references(&substituted, env)?;
    ensure_fully_resolved(&resolved)?;
    Ok(resolved)
}

/// Replace every `${ref:...}` in `root`, looking paths up in `root` itself.
pub fn resolve_references(root: &Document, env: &dyn EnvSource) -> Result<Document> {
    ReferenceResolver::new(root, env).resolve()
}

/// Fail if any string still carries a `${env:` or `${ref:` opener.
pub fn ensure_fully_resolved(value: &Document) -> Result<()> {
    let mut leftover = None;
    document::walk_strings(value, "", &mut |path, s| {
        if leftover.is_none() && placeholder::has_marker(s) {
            leftover = Some((path.to_string(), s.to_string()));
        }
    });
    match leftover {
        Some((path, value)) => Err(Error::UnresolvedPlaceholder { path, value }),
        None => Ok(()),
    }
}

/// Resolver state for one document.
pub struct ReferenceResolver<'a> {
    root: &'a Document,
    env: &'a dyn EnvSource,
    /// Fully resolved targets, by path.
    resolved: HashMap<String, Document>,
    /// Paths whose resolution is in progress, outermost first.
    in_progress: Vec<String>,
    /// Reference nodes walked through by an in-progress lookup, with the
    /// path each was redirected to.
    redirects: Vec<(String, String)>,
}

impl<'a> ReferenceResolver<'a> {
    #[must_use]
    pub fn new(root: &'a Document, env: &'a dyn EnvSource) -> Self {
        Self {
            root,
            env,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
            redirects: Vec::new(),
        }
    }

    /// Resolve the whole root document.
    pub fn resolve(mut self) -> Result<Document> {
        let root = self.root;
        self.resolve_node(root)
    }

    /// Resolve the value at `path`, with everything it contains.
    pub fn resolve_path(&mut self, path: &str) -> Result<Document> {
        if let Some(start) = self.in_progress.iter().position(|p| p == path) {
            let mut chain = self.in_progress[start..].to_vec();
            chain.push(path.to_string());
            return Err(Error::CircularReference { chain });
        }
        if let Some(value) = self.resolved.get(path) {
            return Ok(value.clone());
        }

        self.in_progress.push(path.to_string());
        let result = self.lookup(path).and_then(|target| match target {
            Target::Raw(node) => self.resolve_node(node),
            Target::Resolved(value) => Ok(value),
        });
        self.in_progress.pop();

        let value = result?;
        debug!(path, kind = document::type_name(&value), "resolved reference");
        self.resolved.insert(path.to_string(), value.clone());
        Ok(value)
    }

    fn resolve_node(&mut self, value: &Document) -> Result<Document> {
        match Node::classify(value) {
            Node::Mapping(map) => map
                .iter()
                .map(|(key, child)| Ok((key.clone(), self.resolve_node(child)?)))
                .collect::<Result<Mapping>>()
                .map(Document::Object),
            Node::Sequence(items) => items
                .iter()
                .map(|item| self.resolve_node(item))
                .collect::<Result<Vec<_>>>()
                .map(Document::Array),
            Node::Placeholder(p) => self.resolve_placeholder(p),
            Node::Interpolated(segments) => self.interpolate(&segments).map(Document::String),
            Node::Literal(v) => Ok(v.clone()),
        }
    }

    fn resolve_placeholder(&mut self, p: Placeholder<'_>) -> Result<Document> {
        match p.kind {
            PlaceholderKind::Ref => self.resolve_path(p.payload),
            PlaceholderKind::Env => env_subst::require_var(self.env, p.payload).map(Document::String),
        }
    }

    fn interpolate(&mut self, segments: &[Segment<'_>]) -> Result<String> {
        let mut out = String::new();
        for segment in segments {
            match *segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(p) => {
                    let value = self.resolve_placeholder(p)?;
                    let text =
                        document::render_scalar(&value).ok_or_else(|| Error::EmbeddedNonScalar {
                            reference: p.to_string(),
                            found: document::type_name(&value),
                        })?;
                    out.push_str(&text);
                },
            }
        }
        Ok(out)
    }

    /// Walk `path` segment by segment. A node on the way that is a whole
    /// `${ref:X}` string redirects the walk to `X` plus the segments not yet
    /// taken, so only the narrower path is resolved.
    fn lookup(&mut self, path: &str) -> Result<Target<'a>> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut current = self.root;
        let mut site = String::new();

        for (i, segment) in segments.iter().enumerate() {
            if let Some(p) = current
                .as_str()
                .and_then(placeholder::whole)
                .filter(|p| p.kind == PlaceholderKind::Ref)
            {
                let redirected = format!("{}.{}", p.payload, segments[i..].join("."));
                return self.redirect(site, redirected).map(Target::Resolved);
            }
            current = document::child(current, segment).ok_or_else(|| {
                Error::ReferenceNotFound {
                    path: path.to_string(),
                }
            })?;
            site = document::join_path(&site, segment);
        }
        Ok(Target::Raw(current))
    }

    /// Resolve `path` on behalf of the reference node at `site`. Passing the
    /// same site again with a path extending an earlier one would grow the
    /// path forever, so it is reported as a cycle.
    fn redirect(&mut self, site: String, path: String) -> Result<Document> {
        let repeats = self.redirects.iter().any(|(s, p)| {
            *s == site && (path == *p || path.starts_with(&format!("{p}.")))
        });
        if repeats {
            let mut chain = self.in_progress.clone();
            chain.push(path);
            return Err(Error::CircularReference { chain });
        }

        self.redirects.push((site, path.clone()));
        let result = self.resolve_path(&path);
        self.redirects.pop();
        result
    }
}

/// Where a path lookup ended up.
enum Target<'a> {
    /// A node of the root document, still to be resolved.
    Raw(&'a Document),
    /// The walk went through a reference node and was resolved on the way.
    Resolved(Document),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, serde_json::json};

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    fn resolve(doc: &Document) -> Result<Document> {
        resolve_document(doc, &no_env())
    }

    #[test]
    fn whole_reference_replaces_node_with_target_type() {
        let doc = json!({
            "models": {"gpt-4": {"provider": "azure_openai", "id": "gpt-4"}},
            "agents": {"a1": {"model": "${ref:models.gpt-4}"}}
        });
        let out = resolve(&doc).unwrap();
        assert_eq!(
            out["agents"]["a1"]["model"],
            json!({"provider": "azure_openai", "id": "gpt-4"})
        );
    }

    #[test]
    fn embedded_reference_substitutes_text() {
        let doc = json!({
            "base": {"host": "example.com", "port": 8443, "tls": true},
            "url": "https://${ref:base.host}:${ref:base.port}/?tls=${ref:base.tls}"
        });
        let out = resolve(&doc).unwrap();
        assert_eq!(out["url"], json!("https://example.com:8443/?tls=true"));
    }

    #[test]
    fn embedded_reference_to_mapping_is_rejected() {
        let doc = json!({"base": {"host": "h"}, "url": "x-${ref:base}"});
        match resolve(&doc).unwrap_err() {
            Error::EmbeddedNonScalar { reference, found } => {
                assert_eq!(reference, "${ref:base}");
                assert_eq!(found, "mapping");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn chained_references_resolve_transitively() {
        let doc = json!({
            "a": "${ref:b}",
            "b": "${ref:c}",
            "c": "v"
        });
        let out = resolve(&doc).unwrap();
        assert_eq!(out, json!({"a": "v", "b": "v", "c": "v"}));
    }

    #[test]
    fn path_through_a_reference_node() {
        let doc = json!({
            "models": {
                "base": {"provider": "azure_openai"},
                "m": "${ref:models.base}"
            },
            "platform": "${ref:models.m.provider}"
        });
        let out = resolve(&doc).unwrap();
        assert_eq!(out["platform"], json!("azure_openai"));
        assert_eq!(out["models"]["m"], json!({"provider": "azure_openai"}));
    }

    #[test]
    fn target_containing_references_is_resolved_before_substitution() {
        let doc = json!({
            "tools": {
                "ai_foundry": {
                    "default_project_endpoint": "https://proj.example",
                    "tools": {
                        "bing": {"config": {"project_endpoint": "${ref:tools.ai_foundry.default_project_endpoint}"}}
                    }
                }
            },
            "agents": {"a": {"tools": ["${ref:tools.ai_foundry.tools.bing}"]}}
        });
        let out = resolve(&doc).unwrap();
        assert_eq!(
            out["agents"]["a"]["tools"][0],
            json!({"config": {"project_endpoint": "https://proj.example"}})
        );
    }

    #[test]
    fn sequence_index_segments() {
        let doc = json!({"list": ["zero", {"name": "one"}], "pick": "${ref:list.1.name}"});
        assert_eq!(resolve(&doc).unwrap()["pick"], json!("one"));
    }

    #[test]
    fn two_node_cycle_is_rejected_from_either_side() {
        let doc = json!({"a": "${ref:b}", "b": "${ref:a}"});
        match resolve(&doc).unwrap_err() {
            Error::CircularReference { chain } => {
                assert_eq!(chain.first(), chain.last());
                assert!(chain.contains(&"a".to_string()));
                assert!(chain.contains(&"b".to_string()));
            },
            other => panic!("unexpected error: {other}"),
        }

        let env = no_env();
        for start in ["a", "b"] {
            let mut resolver = ReferenceResolver::new(&doc, &env);
            assert!(matches!(
                resolver.resolve_path(start),
                Err(Error::CircularReference { .. })
            ));
        }
    }

    #[test]
    fn path_through_a_reference_node_only_resolves_the_narrower_path() {
        let doc = json!({"a": "${ref:b}", "b": {"c": "${ref:a.d}", "d": 1}});
        let out = resolve(&doc).unwrap();
        assert_eq!(out, json!({"a": {"c": 1, "d": 1}, "b": {"c": 1, "d": 1}}));
    }

    #[test]
    fn reference_node_pointing_below_itself_is_a_cycle() {
        let doc = json!({"a": "${ref:a.x}"});
        assert!(matches!(resolve(&doc), Err(Error::CircularReference { .. })));
    }

    #[test]
    fn missing_path_behind_a_reference_node() {
        let doc = json!({"a": "${ref:b}", "b": {"d": 1}, "c": "${ref:a.nope}"});
        assert!(matches!(
            resolve(&doc),
            Err(Error::ReferenceNotFound { path }) if path == "b.nope"
        ));
    }

    #[test]
    fn self_containing_reference_is_a_cycle() {
        let doc = json!({"a": {"inner": "${ref:a}"}});
        assert!(matches!(
            resolve(&doc),
            Err(Error::CircularReference { chain }) if chain == vec!["a".to_string(), "a".to_string()]
        ));
    }

    #[test]
    fn missing_path_names_the_reference() {
        let doc = json!({
            "models": {"valid": {}},
            "agents": {"a": {"model": "${ref:models.does-not-exist}"}}
        });
        let err = resolve(&doc).unwrap_err();
        assert!(err.to_string().contains("models.does-not-exist"));
        assert!(matches!(err, Error::ReferenceNotFound { path } if path == "models.does-not-exist"));
    }

    #[test]
    fn descending_into_a_scalar_is_not_found() {
        let doc = json!({"a": "text", "b": "${ref:a.b}"});
        assert!(matches!(resolve(&doc), Err(Error::ReferenceNotFound { .. })));
    }

    #[test]
    fn env_then_reference() {
        let env = HashMap::from([("TEST_KEY".to_string(), "abc123".to_string())]);
        let doc = json!({
            "models": {"m": {"config": {"api_key": "${env:TEST_KEY}"}}},
            "copy": "${ref:models.m.config.api_key}"
        });
        let out = resolve_document(&doc, &env).unwrap();
        assert_eq!(out["copy"], json!("abc123"));
    }

    #[test]
    fn resolving_a_resolved_document_is_a_no_op() {
        let doc = json!({
            "a": {"b": "${ref:c}"},
            "c": [1, "two", {"three": 3}],
            "d": "${ref:a.b.2.three}"
        });
        let once = resolve(&doc).unwrap();
        let twice = resolve(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn malformed_placeholder_fails_fixed_point_check() {
        let doc = json!({"a": {"b": ["ok", "${env:}"]}});
        match resolve(&doc).unwrap_err() {
            Error::UnresolvedPlaceholder { path, value } => {
                assert_eq!(path, "a.b[1]");
                assert_eq!(value, "${env:}");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
