//! Command line interface

use crate::config::{ConfigError, DefinitionSource, ViewerConfig};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gsolve_schema::SliderInputs;
use gsolve_transport::Endpoint;
use std::path::{Path, PathBuf};

/// Default application server URL
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Default compute service URL
pub const DEFAULT_COMPUTE_URL: &str = "http://localhost:8081";

/// Build the `gsolve` command
pub fn command() -> Command {
    Command::new("gsolve")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Solve a parametric geometry definition and report the result")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("solve")
                .about("Run one compute request cycle")
                .arg(
                    Arg::new("grow")
                        .long("grow")
                        .value_parser(value_parser!(f64))
                        .help("Value of the `grow` slider"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(f64))
                        .help("Value of the `seed` slider"),
                )
                .arg(
                    Arg::new("input")
                        .long("input")
                        .action(ArgAction::Append)
                        .value_parser(parse_input)
                        .value_name("NAME=VALUE")
                        .help("Any other slider; repeatable"),
                )
                .arg(
                    Arg::new("endpoint")
                        .long("endpoint")
                        .value_parser(["app", "compute"])
                        .help("Solving service kind"),
                )
                .arg(
                    Arg::new("url")
                        .long("url")
                        .help("Solving service base URL"),
                )
                .arg(
                    Arg::new("definition")
                        .long("definition")
                        .help("Definition name, URL or local file"),
                )
                .arg(
                    Arg::new("export")
                        .long("export")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write the solved geometry to this file or directory"),
                ),
        )
        .subcommand(
            Command::new("check-config").about("Validate and print the effective configuration"),
        )
}

/// Parse `name=value`
///
/// # Errors
/// Message for clap if the argument is malformed or the value not finite.
pub fn parse_input(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("input name is empty".to_string());
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("bad value for {name}: {e}"))?;
    if !value.is_finite() {
        return Err(format!("value for {name} must be finite"));
    }
    Ok((name.to_string(), value))
}

/// Global options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalArgs {
    /// Config file
    pub config: Option<PathBuf>,
    /// JSON log output
    pub log_json: bool,
}

impl GlobalArgs {
    /// Extract from matches
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config: matches.get_one::<PathBuf>("config").cloned(),
            log_json: matches.get_flag("log-json"),
        }
    }

    /// Load the configured file, or defaults
    ///
    /// # Errors
    /// As [`ViewerConfig::load`].
    pub fn load_config(&self) -> Result<ViewerConfig, ConfigError> {
        match &self.config {
            Some(path) => ViewerConfig::load(path),
            None => Ok(ViewerConfig::default()),
        }
    }
}

/// `solve` options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveArgs {
    /// Slider overrides in command-line order
    pub inputs: Vec<(String, f64)>,
    /// `app` or `compute`
    pub endpoint: Option<String>,
    /// Base URL override
    pub url: Option<String>,
    /// Definition override
    pub definition: Option<String>,
    /// Export target
    pub export: Option<PathBuf>,
}

impl SolveArgs {
    /// Extract from `solve` matches
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mut inputs = Vec::new();
        for name in ["grow", "seed"] {
            if let Some(value) = matches.get_one::<f64>(name) {
                inputs.push((name.to_string(), *value));
            }
        }
        if let Some(extra) = matches.get_many::<(String, f64)>("input") {
            inputs.extend(extra.cloned());
        }
        Self {
            inputs,
            endpoint: matches.get_one::<String>("endpoint").cloned(),
            url: matches.get_one::<String>("url").cloned(),
            definition: matches.get_one::<String>("definition").cloned(),
            export: matches.get_one::<PathBuf>("export").cloned(),
        }
    }

    /// Overlay these options on `config`
    ///
    /// # Errors
    /// `ConfigError::Invalid` for non-finite slider values.
    pub fn apply(&self, mut config: ViewerConfig) -> Result<ViewerConfig, ConfigError> {
        config.transport.endpoint = self.endpoint(config.transport.endpoint);
        if let Some(definition) = &self.definition {
            config.definition = definition_source(definition);
        }
        let mut overrides = SliderInputs::new();
        for (name, value) in &self.inputs {
            overrides
                .set(name.clone(), *value)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        config.inputs = config.inputs.merged(&overrides);
        Ok(config)
    }

    fn endpoint(&self, current: Endpoint) -> Endpoint {
        let api_key = match &current {
            Endpoint::ComputeService { api_key, .. } => api_key.clone(),
            Endpoint::AppServer { .. } => None,
        };
        let kind_changed = matches!(
            (self.endpoint.as_deref(), &current),
            (Some("app"), Endpoint::ComputeService { .. })
                | (Some("compute"), Endpoint::AppServer { .. })
        );
        let url = match (&self.url, kind_changed) {
            (Some(url), _) => url.clone(),
            (None, false) => current.base_url().to_string(),
            (None, true) if self.endpoint.as_deref() == Some("compute") => {
                DEFAULT_COMPUTE_URL.to_string()
            }
            (None, true) => DEFAULT_APP_URL.to_string(),
        };

        match (self.endpoint.as_deref(), current) {
            (Some("compute"), _) | (None, Endpoint::ComputeService { .. }) => {
                Endpoint::compute_service(url, api_key)
            }
            _ => Endpoint::app_server(url),
        }
    }
}

/// Interpret a `--definition` value
///
/// URLs become pointers, existing files are uploaded, anything else is a
/// name the application server resolves.
#[must_use]
pub fn definition_source(value: &str) -> DefinitionSource {
    if value.starts_with("http://") || value.starts_with("https://") {
        DefinitionSource::Pointer {
            url: value.to_string(),
        }
    } else if Path::new(value).is_file() {
        DefinitionSource::File {
            path: PathBuf::from(value),
        }
    } else {
        DefinitionSource::Named {
            name: value.to_string(),
        }
    }
}
