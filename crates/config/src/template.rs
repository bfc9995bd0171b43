//! Example configuration written by `agents-config init`.
//!
//! It exercises every section: a model with params, both tool categories,
//! and an agent that pulls its model and tools in by reference.

const EXAMPLE_CONFIG: &str = r##"# Agent configuration
# ===================
# Placeholders are allowed in any string value:
#   ${env:NAME}          value of environment variable NAME (must be set)
#   ${ref:dotted.path}   value found at that path in this document
#
# A string that is exactly one ${ref:...} is replaced by the whole target
# (a mapping stays a mapping). Embedded in other text, the target must be a
# string, number or boolean.

version: "1.0"

# ══════════════════════════════════════════════════════════════════════════════
# MODELS
# ══════════════════════════════════════════════════════════════════════════════
# provider: azure_openai | openai | anthropic | azure_ai_foundry | ollama

models:
  gpt-4o:
    provider: azure_openai
    id: gpt-4o
    version: "2024-08-06"
    config:
      endpoint: "${env:AZURE_OPENAI_ENDPOINT}"
      api_key: "${env:AZURE_OPENAI_API_KEY}"
      api_version: "2024-08-01-preview"
      deployment: gpt-4o
    params:
      temperature: 0.7             # 0.0 to 2.0
      top_p: 0.95                  # 0.0 to 1.0
      max_tokens: 4000             # positive integer

# ══════════════════════════════════════════════════════════════════════════════
# TOOLS
# ══════════════════════════════════════════════════════════════════════════════
# Agents reference these as ${ref:tools.openapi.<name>} and
# ${ref:tools.ai_foundry.tools.<name>}.

tools:
  openapi:
    weather:
      name: weather
      description: Current weather for a city
      version: "1.0"
      schema_path: schemas/weather.json
      headers:
        Accept: application/json

  ai_foundry:
    default_project_endpoint: "${env:AZURE_AI_PROJECT_ENDPOINT}"
    tools:
      bing_search:
        name: bing_search
        description: Grounded web search
        type: bing_grounding
        connection_ids:
          - "${env:BING_CONNECTION_ID}"
        config:
          project_endpoint: "${ref:tools.ai_foundry.default_project_endpoint}"

# ══════════════════════════════════════════════════════════════════════════════
# AGENTS
# ══════════════════════════════════════════════════════════════════════════════

agents:
  researcher:
    version: "1.0"
    name: Researcher
    description: Answers questions using web search and weather data
    model: "${ref:models.gpt-4o}"
    tools:
      - "${ref:tools.ai_foundry.tools.bing_search}"
      - "${ref:tools.openapi.weather}"
    platform: azure_ai_foundry
    system_prompt:
      version: "1.0"
      path: prompts/researcher.md
"##;

/// The example configuration, as YAML.
#[must_use]
pub fn example_config() -> &'static str {
    EXAMPLE_CONFIG
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            env_subst::missing_environment_variables,
            loader::{Format, load_from_value_with_env, parse_document},
        },
        std::collections::HashMap,
    };

    #[test]
    fn example_names_its_variables() {
        let doc = parse_document(example_config(), Format::Yaml, "example").unwrap();
        assert_eq!(missing_environment_variables(&doc, &HashMap::new()), vec![
            "AZURE_AI_PROJECT_ENDPOINT",
            "AZURE_OPENAI_API_KEY",
            "AZURE_OPENAI_ENDPOINT",
            "BING_CONNECTION_ID",
        ]);
    }

    #[test]
    fn example_loads() {
        let env: HashMap<String, String> = [
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_OPENAI_API_KEY", "key"),
            ("AZURE_AI_PROJECT_ENDPOINT", "https://project.example"),
            ("BING_CONNECTION_ID", "conn-1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let doc = parse_document(example_config(), Format::Yaml, "example").unwrap();
        let config = load_from_value_with_env(&doc, &env).unwrap();

        let agent = config.get_agent("researcher").unwrap();
        assert_eq!(agent.model_name(), "gpt-4o");
        assert_eq!(agent.tool_names(), vec!["bing_search", "weather"]);
        let bing = config.get_tool("ai_foundry.tools.bing_search").unwrap();
        assert_eq!(
            bing.as_native().unwrap().config.get_str("project_endpoint"),
            Some("https://project.example")
        );
        assert_eq!(agent.model().config.expose_str("api_key"), Some("key"));
    }
}
