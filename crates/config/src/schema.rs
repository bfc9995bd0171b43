//! Typed configuration entities (models, tools, agents) and the read-only
//! query surface over them.
//!
//! Values of these types only come out of [`crate::validate`], after every
//! placeholder has been resolved, so lookups here never fail for structural
//! reasons: a missing name is `None` or an empty slice.

use std::{fmt, sync::Arc};

use {indexmap::IndexMap, serde::Serialize};

use crate::settings::Settings;

/// Top-level key holding OpenAPI tools, and the leading segment of their
/// reference strings (`openapi.<name>`).
pub const OPENAPI_CATEGORY: &str = "openapi";
/// Top-level key of the platform-native tools section, and the leading
/// segment of their reference strings (`ai_foundry.tools.<name>`).
pub const NATIVE_CATEGORY: &str = "ai_foundry";
/// Key of the tool table inside the native section.
pub const NATIVE_TOOLS_KEY: &str = "tools";
/// Accepted system prompt file extensions.
pub const PROMPT_EXTENSIONS: &[&str] = &[".md", ".txt"];

// ── Models ──────────────────────────────────────────────────────────────────

/// Supported model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    AzureOpenai,
    Openai,
    Anthropic,
    AzureAiFoundry,
    Ollama,
}

impl Provider {
    pub const ALL: &'static [Self] = &[
        Self::AzureOpenai,
        Self::Openai,
        Self::Anthropic,
        Self::AzureAiFoundry,
        Self::Ollama,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AzureOpenai => "azure_openai",
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::AzureAiFoundry => "azure_ai_foundry",
            Self::Ollama => "ollama",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == name)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric tuning knobs for a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u64>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    /// Any other numeric knob, kept as-is.
    #[serde(flatten)]
    pub extra: IndexMap<String, f64>,
}

impl ModelParams {
    /// Look a knob up by its document key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "temperature" => self.temperature,
            "top_p" => self.top_p,
            #[allow(clippy::cast_precision_loss)]
            "max_tokens" => self.max_tokens.map(|v| v as f64),
            "frequency_penalty" => self.frequency_penalty,
            "presence_penalty" => self.presence_penalty,
            other => self.extra.get(other).copied(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A model definition from the `models` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub provider: Provider,
    pub id: String,
    pub version: String,
    /// Provider-specific settings (endpoint, api key, deployment, ...).
    /// Credentials are redacted when serialized.
    pub config: Settings,
    pub params: ModelParams,
}

impl Model {
    /// A non-secret string entry from `config`.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get_str(key)
    }
}

// ── Tools ───────────────────────────────────────────────────────────────────

/// A tool described by an OpenAPI schema file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiTool {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub schema_path: String,
    /// String values only. `Authorization` and similar headers are secrets.
    pub headers: Settings,
}

/// A tool provided natively by the agent platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeTool {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub connection_ids: Vec<String>,
    pub config: Settings,
}

/// Which variant a [`Tool`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    OpenApi,
    Native,
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenApi => f.write_str("openapi"),
            Self::Native => f.write_str("native"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tool {
    OpenApi(OpenApiTool),
    Native(NativeTool),
}

impl Tool {
    #[must_use]
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::OpenApi(_) => ToolKind::OpenApi,
            Self::Native(_) => ToolKind::Native,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::OpenApi(t) => t.name.as_deref(),
            Self::Native(t) => Some(&t.name),
        }
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::OpenApi(t) => t.description.as_deref(),
            Self::Native(t) => Some(&t.description),
        }
    }

    #[must_use]
    pub fn as_openapi(&self) -> Option<&OpenApiTool> {
        match self {
            Self::OpenApi(t) => Some(t),
            Self::Native(_) => None,
        }
    }

    #[must_use]
    pub fn as_native(&self) -> Option<&NativeTool> {
        match self {
            Self::Native(t) => Some(t),
            Self::OpenApi(_) => None,
        }
    }
}

/// The platform-native tools section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NativeToolsSection {
    /// Section-level defaults (every key except `tools`), reachable from
    /// inner tools through `${ref:tools.ai_foundry.<key>}`.
    pub defaults: Settings,
    pub tools: IndexMap<String, Arc<Tool>>,
}

impl NativeToolsSection {
    #[must_use]
    pub fn default_project_endpoint(&self) -> Option<&str> {
        self.defaults.get_str("default_project_endpoint")
    }
}

/// The `tools` container.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolsConfig {
    pub openapi: IndexMap<String, Arc<Tool>>,
    pub ai_foundry: NativeToolsSection,
}

impl ToolsConfig {
    /// Resolve `openapi.<name>` or `ai_foundry.tools.<name>`. Any other
    /// shape is simply not found.
    #[must_use]
    pub fn get(&self, reference: &str) -> Option<&Arc<Tool>> {
        let parts: Vec<&str> = reference.split('.').collect();
        match parts.as_slice() {
            [OPENAPI_CATEGORY, name] => self.openapi.get(*name),
            [NATIVE_CATEGORY, NATIVE_TOOLS_KEY, name] => self.ai_foundry.tools.get(*name),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.openapi.len() + self.ai_foundry.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Agents ──────────────────────────────────────────────────────────────────

/// Where an agent's system prompt lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemPrompt {
    pub version: String,
    /// Ends with one of [`PROMPT_EXTENSIONS`].
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agent {
    pub version: String,
    pub name: String,
    pub description: String,
    /// Key of the model under `models`.
    pub model_name: String,
    /// Shared with the `models` table and with any other agent using it.
    pub model: Arc<Model>,
    pub tools: Vec<Arc<Tool>>,
    pub platform: String,
    pub system_prompt: SystemPrompt,
}

impl Agent {
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[must_use]
    pub fn model_provider(&self) -> Provider {
        self.model.provider
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model.id
    }

    #[must_use]
    pub fn model_config(&self) -> &Settings {
        &self.model.config
    }

    #[must_use]
    pub fn model_params(&self) -> &ModelParams {
        &self.model.params
    }

    #[must_use]
    pub fn tools(&self) -> &[Arc<Tool>] {
        &self.tools
    }

    /// First tool whose name is `name`.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == Some(name))
            .map(|t| &**t)
    }

    #[must_use]
    pub fn has_tool(&self, name: &str) -> bool {
        self.tool(name).is_some()
    }

    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Names of the named tools, in declaration order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().filter_map(|t| t.name()).collect()
    }

    #[must_use]
    pub fn has_tool_kind(&self, kind: ToolKind) -> bool {
        self.tools.iter().any(|t| t.kind() == kind)
    }

    #[must_use]
    pub fn tools_by_kind(&self, kind: ToolKind) -> Vec<&Tool> {
        self.tools
            .iter()
            .filter(|t| t.kind() == kind)
            .map(|t| &**t)
            .collect()
    }
}

// ── Root ────────────────────────────────────────────────────────────────────

/// A fully resolved, validated configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub(crate) version: String,
    pub(crate) models: IndexMap<String, Arc<Model>>,
    pub(crate) tools: ToolsConfig,
    pub(crate) agents: IndexMap<String, Agent>,
}

impl Configuration {
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn models(&self) -> &IndexMap<String, Arc<Model>> {
        &self.models
    }

    #[must_use]
    pub fn tools(&self) -> &ToolsConfig {
        &self.tools
    }

    #[must_use]
    pub fn agents(&self) -> &IndexMap<String, Agent> {
        &self.agents
    }

    #[must_use]
    pub fn get_model(&self, name: &str) -> Option<&Model> {
        self.models.get(name).map(|m| &**m)
    }

    #[must_use]
    pub fn get_agent(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    /// Resolve a tool reference string (`openapi.<name>` or
    /// `ai_foundry.tools.<name>`).
    #[must_use]
    pub fn get_tool(&self, reference: &str) -> Option<&Tool> {
        self.tools.get(reference).map(|t| &**t)
    }

    /// Model names, in declaration order.
    #[must_use]
    pub fn list_models(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Agent names, in declaration order.
    #[must_use]
    pub fn list_agents(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    /// The resolved tools of an agent; empty when the agent does not exist.
    #[must_use]
    pub fn get_agent_tools(&self, agent: &str) -> &[Arc<Tool>] {
        self.agents
            .get(agent)
            .map(|a| a.tools.as_slice())
            .unwrap_or_default()
    }
}
