//! Typed construction and validation of a resolved document.
//!
//! Construction is layered: models first, then the tools container, then
//! agents, which point at the models and tools already built. Each field rule
//! is a small function returning [`Check`]; failures are collected and
//! construction carries on, so a single pass reports every violation.

use std::{fmt, sync::Arc};

use {indexmap::IndexMap, tracing::warn};

use crate::{
    document::{self, Document, Mapping, index_path, join_path, type_name},
    placeholder::{self, PlaceholderKind},
    schema::{
        Agent, Configuration, Model, ModelParams, NATIVE_CATEGORY, NATIVE_TOOLS_KEY, NativeTool,
        NativeToolsSection, OPENAPI_CATEGORY, OpenApiTool, PROMPT_EXTENSIONS, Provider,
        SystemPrompt, Tool, ToolsConfig,
    },
    settings::Settings,
};

/// What kind of rule a violation broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViolationKind {
    /// A single field is missing, has the wrong type, or is out of range.
    Field,
    /// A node has a shape no entity can be built from.
    Shape,
    /// An entity points at something that is not there.
    CrossReference,
    /// A reference string survived where a resolved entity was expected.
    Unresolved,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field => write!(f, "field"),
            Self::Shape => write!(f, "shape"),
            Self::CrossReference => write!(f, "cross-reference"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Dotted path, e.g. "agents.writer.system_prompt.path"
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, path: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn field(path: &str, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Field, path, message)
    }

    #[must_use]
    pub fn shape(path: &str, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Shape, path, message)
    }

    #[must_use]
    pub fn cross_reference(path: &str, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::CrossReference, path, message)
    }

    #[must_use]
    pub fn unresolved(path: &str, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Unresolved, path, message)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.kind, self.path, self.message)
        }
    }
}

/// Every violation found while building one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Violations reported at exactly `path`.
    pub fn at<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.path == path)
    }

    #[must_use]
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }
}

impl From<Vec<Violation>> for ValidationErrors {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type IntoIter = std::slice::Iter<'a, Violation>;
    type Item = &'a Violation;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {v}")?;
        }
        Ok(())
    }
}

/// Outcome of one field rule.
pub type Check<T> = Result<T, Violation>;

// ── Field rules ─────────────────────────────────────────────────────────────

/// `key` must be present and not null.
pub fn required<'v>(map: &'v Mapping, key: &str, path: &str) -> Check<&'v Document> {
    map.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Violation::field(&join_path(path, key), "field required"))
}

pub fn string<'v>(value: &'v Document, path: &str) -> Check<&'v str> {
    value.as_str().ok_or_else(|| {
        Violation::field(path, format!("expected a string, found {}", type_name(value)))
    })
}

pub fn non_empty<'v>(value: &'v str, path: &str) -> Check<&'v str> {
    if value.trim().is_empty() {
        Err(Violation::field(path, "must not be empty"))
    } else {
        Ok(value)
    }
}

pub fn mapping<'v>(value: &'v Document, path: &str) -> Check<&'v Mapping> {
    value.as_object().ok_or_else(|| {
        Violation::field(path, format!("expected a mapping, found {}", type_name(value)))
    })
}

pub fn sequence<'v>(value: &'v Document, path: &str) -> Check<&'v [Document]> {
    value.as_array().map(Vec::as_slice).ok_or_else(|| {
        Violation::field(path, format!("expected a sequence, found {}", type_name(value)))
    })
}

pub fn number(value: &Document, path: &str) -> Check<f64> {
    value.as_f64().ok_or_else(|| {
        Violation::field(path, format!("expected a number, found {}", type_name(value)))
    })
}

pub fn number_in_range(value: &Document, min: f64, max: f64, path: &str) -> Check<f64> {
    let n = number(value, path)?;
    if (min..=max).contains(&n) {
        Ok(n)
    } else {
        Err(Violation::field(
            path,
            format!("{n} is out of range; expected a value between {min} and {max}"),
        ))
    }
}

pub fn positive_integer(value: &Document, path: &str) -> Check<u64> {
    value.as_u64().filter(|n| *n > 0).ok_or_else(|| {
        Violation::field(path, format!("expected a positive integer, found {value}"))
    })
}

pub fn provider(value: &str, path: &str) -> Check<Provider> {
    Provider::parse(value).ok_or_else(|| {
        let allowed: Vec<&str> = Provider::ALL.iter().map(|p| p.as_str()).collect();
        Violation::field(
            path,
            format!(
                "unsupported provider \"{value}\"; expected one of: {}",
                allowed.join(", ")
            ),
        )
    })
}

pub fn has_extension<'v>(value: &'v str, extensions: &[&str], path: &str) -> Check<&'v str> {
    if extensions.iter().any(|ext| value.ends_with(ext)) {
        Ok(value)
    } else {
        Err(Violation::field(
            path,
            format!("\"{value}\" must end with one of: {}", extensions.join(", ")),
        ))
    }
}

fn required_str<'v>(map: &'v Mapping, key: &str, path: &str) -> Check<&'v str> {
    required(map, key, path).and_then(|v| string(v, &join_path(path, key)))
}

fn required_non_empty<'v>(map: &'v Mapping, key: &str, path: &str) -> Check<&'v str> {
    required_str(map, key, path).and_then(|s| non_empty(s, &join_path(path, key)))
}

fn optional_str<'v>(map: &'v Mapping, key: &str, path: &str) -> Check<Option<&'v str>> {
    match map.get(key) {
        None | Some(Document::Null) => Ok(None),
        Some(v) => string(v, &join_path(path, key)).map(Some),
    }
}

fn optional_mapping<'v>(map: &'v Mapping, key: &str, path: &str) -> Check<Option<&'v Mapping>> {
    match map.get(key) {
        None | Some(Document::Null) => Ok(None),
        Some(v) => mapping(v, &join_path(path, key)).map(Some),
    }
}

// ── Collection ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct Collector {
    errors: ValidationErrors,
}

impl Collector {
    fn check<T>(&mut self, result: Check<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(violation) => {
                self.errors.push(violation);
                None
            },
        }
    }

    fn report(&mut self, violation: Violation) {
        self.errors.push(violation);
    }
}

/// A table entry: its resolved document, and the entity when it validated.
/// Agents find their model entry by `name`, or by `document` when the model
/// was written inline.
struct Entry<'d, T> {
    name: String,
    document: &'d Document,
    entity: Option<Arc<T>>,
}

// ── Entities ────────────────────────────────────────────────────────────────

/// Build the typed configuration from a fully resolved document.
///
/// Agents share the model entry equal to their resolved model. Prefer
/// [`build_configuration_with_source`] when the unresolved document is at
/// hand, since two identical model entries cannot be told apart here.
pub fn build_configuration(doc: &Document) -> Result<Configuration, ValidationErrors> {
    build_configuration_with_source(doc, doc)
}

/// Build the typed configuration from `resolved`, reading `source` (the same
/// document before placeholder resolution) to find which `models` key each
/// agent's `${ref:...}` names.
pub fn build_configuration_with_source(
    resolved: &Document,
    source: &Document,
) -> Result<Configuration, ValidationErrors> {
    let root = mapping(resolved, "").map_err(|v| ValidationErrors::from(vec![v]))?;
    let mut c = Collector::default();

    let version = c.check(required_non_empty(root, "version", ""));
    let models = build_models(&mut c, root.get("models"));
    let (tools, tool_entries) = build_tools(&mut c, root.get("tools"));
    let agents = build_agents(&mut c, root.get("agents"), source, &models, &tool_entries);

    match version {
        Some(version) if c.errors.is_empty() => Ok(Configuration {
            version: version.to_string(),
            models: models
                .into_iter()
                .filter_map(|e| e.entity.map(|m| (e.name, m)))
                .collect(),
            tools,
            agents,
        }),
        _ => Err(c.errors),
    }
}

fn present(value: Option<&Document>) -> Option<&Document> {
    value.filter(|v| !v.is_null())
}

fn build_models<'d>(c: &mut Collector, value: Option<&'d Document>) -> Vec<Entry<'d, Model>> {
    let Some(table) = present(value).and_then(|v| c.check(mapping(v, "models"))) else {
        return Vec::new();
    };
    table
        .iter()
        .map(|(name, doc)| Entry {
            name: name.clone(),
            document: doc,
            entity: build_model(c, &join_path("models", name), doc).map(Arc::new),
        })
        .collect()
}

fn build_model(c: &mut Collector, path: &str, value: &Document) -> Option<Model> {
    let map = c.check(mapping(value, path))?;

    let provider = c.check(
        required_str(map, "provider", path)
            .and_then(|s| provider(s, &join_path(path, "provider"))),
    );
    let id = c.check(required_non_empty(map, "id", path));
    let version = c.check(required_non_empty(map, "version", path));
    let config = c.check(
        required(map, "config", path).and_then(|v| mapping(v, &join_path(path, "config"))),
    );
    let params = match present(map.get("params")) {
        None => Some(ModelParams::default()),
        Some(v) => build_params(c, &join_path(path, "params"), v),
    };

    Some(Model {
        provider: provider?,
        id: id?.to_string(),
        version: version?.to_string(),
        config: Settings::from(config?),
        params: params?,
    })
}

fn build_params(c: &mut Collector, path: &str, value: &Document) -> Option<ModelParams> {
    let map = c.check(mapping(value, path))?;
    let mut params = ModelParams::default();
    let mut valid = true;

    for (key, v) in map {
        let p = join_path(path, key);
        let result = match key.as_str() {
            "temperature" => number_in_range(v, 0.0, 2.0, &p).map(|n| params.temperature = Some(n)),
            "top_p" => number_in_range(v, 0.0, 1.0, &p).map(|n| params.top_p = Some(n)),
            "max_tokens" => positive_integer(v, &p).map(|n| params.max_tokens = Some(n)),
            "frequency_penalty" => {
                number_in_range(v, -2.0, 2.0, &p).map(|n| params.frequency_penalty = Some(n))
            },
            "presence_penalty" => {
                number_in_range(v, -2.0, 2.0, &p).map(|n| params.presence_penalty = Some(n))
            },
            _ => number(v, &p).map(|n| {
                params.extra.insert(key.clone(), n);
            }),
        };
        valid &= c.check(result).is_some();
    }

    valid.then_some(params)
}

fn build_tools<'d>(
    c: &mut Collector,
    value: Option<&'d Document>,
) -> (ToolsConfig, Vec<Entry<'d, Tool>>) {
    let mut tools = ToolsConfig::default();
    let mut entries = Vec::new();

    let Some(container) = present(value).and_then(|v| c.check(mapping(v, "tools"))) else {
        return (tools, entries);
    };

    for (category, section) in container {
        let section_path = join_path("tools", category);
        let Some(section) = present(Some(section)) else {
            continue;
        };
        match category.as_str() {
            OPENAPI_CATEGORY => {
                let Some(table) = c.check(mapping(section, &section_path)) else {
                    continue;
                };
                for (name, doc) in table {
                    let entity =
                        build_openapi_tool(c, &join_path(&section_path, name), doc, Some(name))
                            .map(|t| Arc::new(Tool::OpenApi(t)));
                    if let Some(tool) = &entity {
                        tools.openapi.insert(name.clone(), Arc::clone(tool));
                    }
                    entries.push(Entry {
                        name: join_path(OPENAPI_CATEGORY, name),
                        document: doc,
                        entity,
                    });
                }
            },
            NATIVE_CATEGORY => {
                let Some(section_map) = c.check(mapping(section, &section_path)) else {
                    continue;
                };
                let mut native = NativeToolsSection::default();
                for (key, v) in section_map {
                    if key != NATIVE_TOOLS_KEY {
                        native.defaults.insert(key.clone(), v.clone());
                        continue;
                    }
                    let table_path = join_path(&section_path, key);
                    let Some(table) = present(Some(v)).and_then(|v| c.check(mapping(v, &table_path)))
                    else {
                        continue;
                    };
                    for (name, doc) in table {
                        let entity = build_native_tool(c, &join_path(&table_path, name), doc)
                            .map(|t| Arc::new(Tool::Native(t)));
                        if let Some(tool) = &entity {
                            native.tools.insert(name.clone(), Arc::clone(tool));
                        }
                        entries.push(Entry {
                            name: format!("{NATIVE_CATEGORY}.{NATIVE_TOOLS_KEY}.{name}"),
                            document: doc,
                            entity,
                        });
                    }
                }
                tools.ai_foundry = native;
            },
            other => warn!(category = other, "ignoring unknown tool category"),
        }
    }

    (tools, entries)
}

fn build_openapi_tool(
    c: &mut Collector,
    path: &str,
    value: &Document,
    default_name: Option<&str>,
) -> Option<OpenApiTool> {
    let map = c.check(mapping(value, path))?;

    let schema_path = c.check(required_non_empty(map, "schema_path", path));
    let name = c.check(optional_str(map, "name", path));
    let description = c.check(optional_str(map, "description", path));
    let version = c.check(optional_str(map, "version", path));
    let headers = c
        .check(optional_mapping(map, "headers", path))
        .and_then(|headers| build_headers(c, &join_path(path, "headers"), headers));

    Some(OpenApiTool {
        name: name?.or(default_name).map(str::to_string),
        description: description?.map(str::to_string),
        version: version?.map(str::to_string),
        schema_path: schema_path?.to_string(),
        headers: headers?,
    })
}

fn build_headers(
    c: &mut Collector,
    path: &str,
    headers: Option<&Mapping>,
) -> Option<Settings> {
    let mut out = Settings::new();
    let mut valid = true;
    for (key, v) in headers.into_iter().flatten() {
        match c.check(string(v, &join_path(path, key))) {
            Some(s) => out.insert(key.clone(), Document::String(s.to_string())),
            None => valid = false,
        }
    }
    valid.then_some(out)
}

fn build_native_tool(c: &mut Collector, path: &str, value: &Document) -> Option<NativeTool> {
    let map = c.check(mapping(value, path))?;

    let name = c.check(required_non_empty(map, "name", path));
    let description = c.check(required_str(map, "description", path));
    let tool_type = c.check(required_non_empty(map, "type", path));
    let config = c.check(optional_mapping(map, "config", path));

    let ids_path = join_path(path, "connection_ids");
    let connection_ids = match present(map.get("connection_ids")) {
        None => Some(Vec::new()),
        Some(v) => c.check(sequence(v, &ids_path)).and_then(|items| {
            let mut ids = Vec::with_capacity(items.len());
            let mut valid = true;
            for (i, item) in items.iter().enumerate() {
                let p = index_path(&ids_path, i);
                match c.check(string(item, &p).and_then(|s| non_empty(s, &p))) {
                    Some(id) => ids.push(id.to_string()),
                    None => valid = false,
                }
            }
            valid.then_some(ids)
        }),
    };

    Some(NativeTool {
        name: name?.to_string(),
        description: description?.to_string(),
        tool_type: tool_type?.to_string(),
        connection_ids: connection_ids?,
        config: config?.map(Settings::from).unwrap_or_default(),
    })
}

/// Build a tool from an agent's tool list entry, choosing the variant from
/// the entry's keys: `schema_path` without `type` is OpenAPI, anything else
/// is native.
fn build_tool_entry(c: &mut Collector, path: &str, value: &Document) -> Option<Tool> {
    match value {
        Document::Object(map) => {
            if map.contains_key("schema_path") && !map.contains_key("type") {
                build_openapi_tool(c, path, value, None).map(Tool::OpenApi)
            } else {
                build_native_tool(c, path, value).map(Tool::Native)
            }
        },
        Document::String(s) if !s.contains('.') => {
            c.report(Violation::field(
                path,
                format!("tool reference \"{s}\" must be in format 'category.subcategory.name'"),
            ));
            None
        },
        Document::String(s) => {
            c.report(Violation::unresolved(
                path,
                format!(
                    "tool reference \"{s}\" was not resolved to a tool definition \
                     (write it as \"${{ref:tools.{s}}}\")"
                ),
            ));
            None
        },
        other => {
            c.report(Violation::shape(
                path,
                format!("expected a tool definition, found {}", type_name(other)),
            ));
            None
        },
    }
}

fn build_agents(
    c: &mut Collector,
    value: Option<&Document>,
    source: &Document,
    models: &[Entry<'_, Model>],
    tools: &[Entry<'_, Tool>],
) -> IndexMap<String, Agent> {
    let Some(table) = present(value).and_then(|v| c.check(mapping(v, "agents"))) else {
        return IndexMap::new();
    };
    table
        .iter()
        .filter_map(|(key, doc)| {
            let named = referenced_model(source, key);
            build_agent(c, &join_path("agents", key), doc, named.as_deref(), models, tools)
                .map(|agent| (key.clone(), agent))
        })
        .collect()
}

fn build_agent(
    c: &mut Collector,
    path: &str,
    value: &Document,
    named: Option<&str>,
    models: &[Entry<'_, Model>],
    tools: &[Entry<'_, Tool>],
) -> Option<Agent> {
    let map = c.check(mapping(value, path))?;

    let version = c.check(required_non_empty(map, "version", path));
    let name = c.check(required_non_empty(map, "name", path));
    let description = c.check(required_str(map, "description", path));
    let platform = c.check(required_non_empty(map, "platform", path));
    let model = c
        .check(required(map, "model", path))
        .and_then(|v| agent_model(c, &join_path(path, "model"), v, named, models));
    let tool_list = match present(map.get("tools")) {
        None => Some(Vec::new()),
        Some(v) => agent_tools(c, &join_path(path, "tools"), v, tools),
    };
    let system_prompt = c
        .check(required(map, "system_prompt", path))
        .and_then(|v| build_system_prompt(c, &join_path(path, "system_prompt"), v));

    let (model_name, model) = model?;
    Some(Agent {
        version: version?.to_string(),
        name: name?.to_string(),
        description: description?.to_string(),
        model_name,
        model,
        tools: tool_list?,
        platform: platform?.to_string(),
        system_prompt: system_prompt?,
    })
}

/// The `models` key that `agents.<agent>.model` names in the unresolved
/// document, following chains of whole `${ref:...}` values. `None` when the
/// model is written inline or the chain does not end at a `models` entry.
fn referenced_model(source: &Document, agent: &str) -> Option<String> {
    let node = source.get("agents")?.get(agent)?.get("model")?;
    let mut reference = ref_payload(node)?.to_string();
    let mut seen = Vec::new();
    loop {
        if let Some(name) = reference.strip_prefix("models.").filter(|n| !n.contains('.')) {
            return Some(name.to_string());
        }
        if seen.contains(&reference) {
            return None;
        }
        let next = next_reference(source, &reference)?;
        seen.push(std::mem::replace(&mut reference, next));
    }
}

/// Where the reference `path` leads next: the target of a whole `${ref:X}`
/// found at or on the way to `path`, with the untaken segments appended.
fn next_reference(source: &Document, path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = source;
    for (i, segment) in segments.iter().enumerate() {
        if let Some(payload) = ref_payload(current) {
            return Some(format!("{payload}.{}", segments[i..].join(".")));
        }
        current = document::child(current, segment)?;
    }
    ref_payload(current).map(str::to_string)
}

fn ref_payload(node: &Document) -> Option<&str> {
    node.as_str()
        .and_then(placeholder::whole)
        .filter(|p| p.kind == PlaceholderKind::Ref)
        .map(|p| p.payload)
}

/// Find the `models` entry an agent uses and share its model: by key when
/// the agent named one through a reference, otherwise by equality with the
/// resolved model document.
fn agent_model(
    c: &mut Collector,
    path: &str,
    value: &Document,
    named: Option<&str>,
    models: &[Entry<'_, Model>],
) -> Option<(String, Arc<Model>)> {
    let entry = match named {
        Some(name) => models.iter().find(|e| e.name == name),
        None => models.iter().find(|e| e.document == value),
    };
    match value {
        Document::Object(_) => match entry {
            // An invalid model entry has already been reported.
            Some(entry) => entry
                .entity
                .as_ref()
                .map(|model| (entry.name.clone(), Arc::clone(model))),
            None => {
                let available: Vec<&str> = models.iter().map(|e| e.name.as_str()).collect();
                let available = if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                };
                c.report(Violation::cross_reference(
                    path,
                    format!(
                        "model does not match any entry under 'models' (available: {available})"
                    ),
                ));
                None
            },
        },
        Document::String(s) => {
            c.report(Violation::unresolved(
                path,
                format!("model reference \"{s}\" was not resolved to a model definition"),
            ));
            None
        },
        other => {
            c.report(Violation::shape(
                path,
                format!("expected a model definition, found {}", type_name(other)),
            ));
            None
        },
    }
}

fn agent_tools(
    c: &mut Collector,
    path: &str,
    value: &Document,
    tools: &[Entry<'_, Tool>],
) -> Option<Vec<Arc<Tool>>> {
    let items = c.check(sequence(value, path))?;
    let mut out = Vec::with_capacity(items.len());
    let mut valid = true;

    for (i, item) in items.iter().enumerate() {
        let shared = tools
            .iter()
            .find(|e| item.is_object() && e.document == item);
        let tool = match shared {
            Some(entry) => entry.entity.clone(),
            None => build_tool_entry(c, &index_path(path, i), item).map(Arc::new),
        };
        match tool {
            Some(tool) => out.push(tool),
            None => valid = false,
        }
    }

    valid.then_some(out)
}

fn build_system_prompt(c: &mut Collector, path: &str, value: &Document) -> Option<SystemPrompt> {
    let map = c.check(mapping(value, path))?;

    let version = c.check(required_non_empty(map, "version", path));
    let prompt_path = c.check(required_non_empty(map, "path", path).and_then(|p| {
        has_extension(p, PROMPT_EXTENSIONS, &join_path(path, "path"))
    }));

    Some(SystemPrompt {
        version: version?.to_string(),
        path: prompt_path?.to_string(),
    })
}
