use std::path::{Path, PathBuf};

use {
    agents_config::{Configuration, Error, ProcessEnv, ToolKind, ViolationKind},
    anyhow::{Context, Result, bail},
    clap::Subcommand,
};

#[derive(Subcommand)]
pub enum Command {
    /// Load the configuration and report every problem found.
    Check {
        /// Config file (defaults to the first one found in standard locations).
        path: Option<PathBuf>,
    },
    /// Print the resolved configuration.
    Show {
        path: Option<PathBuf>,
        /// Print the resolved configuration as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List environment variables the configuration needs but that are unset.
    Env { path: Option<PathBuf> },
    /// Write an example configuration to PATH.
    Init { path: PathBuf },
}

pub fn handle(command: Command) -> Result<()> {
    match command {
        Command::Check { path } => check(&config_path(path)?),
        Command::Show { path, json } => show(&config_path(path)?, json),
        Command::Env { path } => env(&config_path(path)?),
        Command::Init { path } => init(&path),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn config_path(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = path {
        return Ok(path);
    }
    match agents_config::find_config_file() {
        Some(path) => Ok(path),
        None => {
            let global = agents_config::config_dir()
                .map(|d| format!(" or {}", d.display()))
                .unwrap_or_default();
            bail!("no config file found (looked for agents-config.{{yaml,yml,json,toml}} in .{global})")
        },
    }
}

fn check(path: &Path) -> Result<()> {
    eprintln!("Checking {}\n", path.display());

    match agents_config::load_from_file(path) {
        Ok(config) => {
            eprintln!(
                "{BOLD}{GREEN}ok{RESET} {} model(s), {} tool(s), {} agent(s)",
                config.models().len(),
                config.tools().len(),
                config.agents().len()
            );
            Ok(())
        },
        Err(Error::SchemaValidation(errors)) => {
            for v in &errors {
                let color = match v.kind {
                    ViolationKind::Unresolved => YELLOW,
                    ViolationKind::Field | ViolationKind::Shape | ViolationKind::CrossReference => {
                        RED
                    },
                };
                if v.path.is_empty() {
                    eprintln!("  {BOLD}{color}{}{RESET} {}", v.kind, v.message);
                } else {
                    eprintln!("  {BOLD}{color}{}{RESET} {}: {}", v.kind, v.path, v.message);
                }
            }
            eprintln!("\n{} violation(s)", errors.len());
            std::process::exit(1);
        },
        Err(e) => {
            eprintln!("  {BOLD}{RED}error{RESET} {e}");
            std::process::exit(1);
        },
    }
}

fn show(path: &Path, json: bool) -> Result<()> {
    let config = agents_config::load_from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print_summary(&config);
    }
    Ok(())
}

fn print_summary(config: &Configuration) {
    println!("version: {}", config.version());

    println!("models:");
    for (name, model) in config.models() {
        println!("  {name}: {} {} (v{})", model.provider, model.id, model.version);
    }

    println!("tools:");
    for name in config.tools().openapi.keys() {
        println!("  openapi.{name}");
    }
    for (name, tool) in &config.tools().ai_foundry.tools {
        let tool_type = tool.as_native().map(|t| t.tool_type.as_str()).unwrap_or_default();
        println!("  ai_foundry.tools.{name} ({tool_type})");
    }

    println!("agents:");
    for (key, agent) in config.agents() {
        println!("  {key}: {}", agent.name);
        println!("    model:    {} ({})", agent.model_name(), agent.model_provider());
        println!("    platform: {}", agent.platform);
        println!("    prompt:   {}", agent.system_prompt.path);
        if agent.tool_count() > 0 {
            let openapi = agent.tools_by_kind(ToolKind::OpenApi).len();
            let native = agent.tools_by_kind(ToolKind::Native).len();
            println!(
                "    tools:    {} ({openapi} openapi, {native} native)",
                agent.tool_names().join(", ")
            );
        }
    }
}

fn env(path: &Path) -> Result<()> {
    let doc = agents_config::read_document(path)?;
    let missing = agents_config::missing_environment_variables(&doc, &ProcessEnv);

    if missing.is_empty() {
        eprintln!("All referenced environment variables are set.");
        return Ok(());
    }
    for name in &missing {
        println!("{name}");
    }
    eprintln!("\n{} variable(s) not set", missing.len());
    std::process::exit(1);
}

fn init(path: &Path) -> Result<()> {
    agents_config::save_example_config(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    eprintln!("Wrote example configuration to {}", path.display());
    Ok(())
}
