//! The untyped document tree and up-front classification of its nodes.
//!
//! Documents are plain [`serde_json::Value`] trees regardless of the text
//! format they were parsed from.

use crate::placeholder::{self, Placeholder, Segment};

pub use serde_json::Value as Document;

/// A mapping node.
pub type Mapping = serde_json::Map<String, Document>;

/// What a raw document node is, decided once before any consumer looks at it.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<'a> {
    /// A string that is exactly one placeholder.
    Placeholder(Placeholder<'a>),
    /// A string mixing literal text and at least one placeholder.
    Interpolated(Vec<Segment<'a>>),
    Mapping(&'a Mapping),
    Sequence(&'a [Document]),
    /// Any other scalar, including strings without placeholders.
    Literal(&'a Document),
}

impl<'a> Node<'a> {
    #[must_use]
    pub fn classify(value: &'a Document) -> Self {
        match value {
            Document::Object(map) => Self::Mapping(map),
            Document::Array(items) => Self::Sequence(items),
            Document::String(s) => {
                let segments = placeholder::scan(s);
                if let [Segment::Placeholder(p)] = segments.as_slice() {
                    return Self::Placeholder(*p);
                }
                if segments
                    .iter()
                    .any(|s| matches!(s, Segment::Placeholder(_)))
                {
                    Self::Interpolated(segments)
                } else {
                    Self::Literal(value)
                }
            },
            _ => Self::Literal(value),
        }
    }
}

/// Step one path segment down from `node`: a mapping key, or a sequence
/// index when `node` is a sequence and `segment` parses as one.
#[must_use]
pub fn child<'a>(node: &'a Document, segment: &str) -> Option<&'a Document> {
    match node {
        Document::Object(map) => map.get(segment),
        Document::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    }
}

/// `prefix.key`, or just `key` at the root.
#[must_use]
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// `prefix[index]`.
#[must_use]
pub fn index_path(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// Human-readable name of a node's type, for diagnostics.
#[must_use]
pub fn type_name(value: &Document) -> &'static str {
    match value {
        Document::Null => "null",
        Document::Bool(_) => "boolean",
        Document::Number(_) => "number",
        Document::String(_) => "string",
        Document::Array(_) => "sequence",
        Document::Object(_) => "mapping",
    }
}

/// Text form of a scalar for embedding into a larger string. Mappings,
/// sequences and null have no clean text form.
#[must_use]
pub fn render_scalar(value: &Document) -> Option<String> {
    match value {
        Document::String(s) => Some(s.clone()),
        Document::Number(n) => Some(n.to_string()),
        Document::Bool(b) => Some(b.to_string()),
        Document::Null | Document::Array(_) | Document::Object(_) => None,
    }
}

/// Visit every string scalar in the tree together with its dotted path.
pub fn walk_strings<'a>(value: &'a Document, prefix: &str, visit: &mut impl FnMut(&str, &'a str)) {
    match value {
        Document::String(s) => visit(prefix, s),
        Document::Object(map) => {
            for (key, child) in map {
                walk_strings(child, &join_path(prefix, key), visit);
            }
        },
        Document::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk_strings(item, &index_path(prefix, i), visit);
            }
        },
        _ => {},
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, crate::placeholder::PlaceholderKind, serde_json::json};

    #[test]
    fn classify_nodes() {
        let whole = json!("${ref:models.a}");
        assert!(matches!(
            Node::classify(&whole),
            Node::Placeholder(Placeholder {
                kind: PlaceholderKind::Ref,
                payload: "models.a"
            })
        ));

        let mixed = json!("Bearer ${env:TOKEN}");
        assert!(matches!(Node::classify(&mixed), Node::Interpolated(s) if s.len() == 2));

        let plain = json!("just text");
        assert_eq!(Node::classify(&plain), Node::Literal(&plain));

        let number = json!(3);
        assert_eq!(Node::classify(&number), Node::Literal(&number));

        assert!(matches!(Node::classify(&json!({"a": 1})), Node::Mapping(_)));
        assert!(matches!(Node::classify(&json!([1, 2])), Node::Sequence(s) if s.len() == 2));
    }

    fn get_path<'a>(root: &'a Document, path: &str) -> Option<&'a Document> {
        path.split('.').try_fold(root, |node, segment| child(node, segment))
    }

    #[test]
    fn path_traversal_through_maps_and_indices() {
        let doc = json!({
            "agents": {"a": {"tools": ["x", {"name": "y"}]}},
            "map": {"0": "zero"}
        });
        assert_eq!(get_path(&doc, "agents.a.tools.0"), Some(&json!("x")));
        assert_eq!(get_path(&doc, "agents.a.tools.1.name"), Some(&json!("y")));
        assert_eq!(get_path(&doc, "map.0"), Some(&json!("zero")));
        assert_eq!(get_path(&doc, "agents.a.tools.7"), None);
        assert_eq!(get_path(&doc, "agents.a.tools.x"), None);
        assert_eq!(get_path(&doc, "agents.b"), None);
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(render_scalar(&json!("s")).as_deref(), Some("s"));
        assert_eq!(render_scalar(&json!(8080)).as_deref(), Some("8080"));
        assert_eq!(render_scalar(&json!(true)).as_deref(), Some("true"));
        assert_eq!(render_scalar(&json!(null)), None);
        assert_eq!(render_scalar(&json!({"a": 1})), None);
    }

    #[test]
    fn walk_reports_paths() {
        let doc = json!({"a": {"b": ["x", {"c": "y"}]}, "n": 1});
        let mut seen = Vec::new();
        walk_strings(&doc, "", &mut |path, s| seen.push(format!("{path}={s}")));
        assert_eq!(seen, vec!["a.b[0]=x", "a.b[1].c=y"]);
    }
}
