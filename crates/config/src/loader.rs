use std::{
    fmt,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    document::Document,
    env_subst::{EnvSource, ProcessEnv},
    error::{Error, Result},
    resolve::resolve_document,
    schema::Configuration,
    template,
    validate::build_configuration_with_source,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "agents-config.yaml",
    "agents-config.yml",
    "agents-config.json",
    "agents-config.toml",
];

/// Text formats a configuration can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
    Toml,
}

impl Format {
    /// Pick the format from a file extension. Paths without an extension
    /// are read as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            None | Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            Some(other) => Err(Error::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => f.write_str("yaml"),
            Self::Json => f.write_str("json"),
            Self::Toml => f.write_str("toml"),
        }
    }
}

/// Build a configuration from an already-parsed document, reading
/// `${env:...}` values from the process environment.
pub fn load_from_value(raw: &Document) -> Result<Configuration> {
    load_from_value_with_env(raw, &ProcessEnv)
}

/// Build a configuration from an already-parsed document.
///
/// Runs environment substitution, reference resolution and validation, in
/// that order. The input is never modified.
pub fn load_from_value_with_env(raw: &Document, env: &dyn EnvSource) -> Result<Configuration> {
    let resolved = resolve_document(raw, env)?;
    let config = build_configuration_with_source(&resolved, raw).map_err(|errors| {
        warn!(violations = errors.len(), "configuration failed validation");
        Error::SchemaValidation(errors)
    })?;
    info!(
        models = config.models().len(),
        tools = config.tools().len(),
        agents = config.agents().len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parse `raw` in the given format and build a configuration from it.
pub fn load_from_str(raw: &str, format: Format) -> Result<Configuration> {
    let doc = parse_document(raw, format, "<string>")?;
    load_from_value(&doc)
}

/// Read, parse and build the configuration at `path`.
pub fn load_from_file(path: &Path) -> Result<Configuration> {
    load_from_file_with_env(path, &ProcessEnv)
}

pub fn load_from_file_with_env(path: &Path, env: &dyn EnvSource) -> Result<Configuration> {
    let doc = read_document(path)?;
    load_from_value_with_env(&doc, env)
}

/// Read and parse a config file without resolving anything.
pub fn read_document(path: &Path) -> Result<Document> {
    let format = Format::from_path(path)?;
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), %format, "read config file");
    parse_document(&raw, format, &path.display().to_string())
}

/// Parse config text into a document. `origin` names the source in errors.
pub fn parse_document(raw: &str, format: Format, origin: &str) -> Result<Document> {
    let parse_error = |message: String| Error::Parse {
        origin: origin.to_string(),
        message,
    };

    match format {
        Format::Yaml => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| parse_error(e.to_string()))?;
            serde_json::to_value(v).map_err(|e| parse_error(e.to_string()))
        },
        Format::Toml => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| parse_error(e.to_string()))?;
            serde_json::to_value(v).map_err(|e| parse_error(e.to_string()))
        },
        Format::Json => serde_json::from_str(raw).map_err(|e| parse_error(e.to_string())),
    }
}

/// Find the first config file in standard locations.
///
/// Search order:
/// 1. `./agents-config.{yaml,yml,json,toml}` (project-local)
/// 2. the same names under [`config_dir`] (user-global)
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/agents-config/` on
/// Linux).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "agents-config").map(|d| d.config_dir().to_path_buf())
}

/// Write the example configuration to `path`.
///
/// Creates parent directories if needed and refuses to overwrite an
/// existing file.
pub fn save_example_config(path: &Path) -> Result<()> {
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(io_error)?;
    file.write_all(template::example_config().as_bytes())
        .map_err(io_error)?;
    debug!(path = %path.display(), "saved example config");
    Ok(())
}
