//! Agent configuration loading: placeholder resolution and typed validation.
//!
//! Config files: `agents-config.yaml`, `agents-config.json`, or
//! `agents-config.toml`. Searched in `./` then the user config directory.
//!
//! Any string value may contain `${env:NAME}` and `${ref:dotted.path}`
//! placeholders. Loading substitutes environment variables, resolves
//! references against the document itself, then builds a [`Configuration`]
//! in which agents share the model and tool instances they reference.

pub mod document;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod placeholder;
pub mod resolve;
pub mod schema;
pub mod settings;
pub mod template;
pub mod validate;

pub use {
    document::Document,
    env_subst::{EnvSource, FnEnv, ProcessEnv, missing_environment_variables},
    error::{Error, Result},
    loader::{
        Format, config_dir, find_config_file, load_from_file, load_from_file_with_env,
        load_from_str, load_from_value, load_from_value_with_env, read_document,
        save_example_config,
    },
    resolve::resolve_document,
    schema::{
        Agent, Configuration, Model, ModelParams, NativeTool, OpenApiTool, Provider, SystemPrompt,
        Tool, ToolKind, ToolsConfig,
    },
    settings::{Setting, Settings},
    validate::{ValidationErrors, Violation, ViolationKind, build_configuration_with_source},
};
