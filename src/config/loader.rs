//! Configuration loader with JSON/TOML parsing and environment variable overrides

use super::schema::{ExportConfig, ExportInput, LoggingConfig, SinkConfig};
use super::secret::secret_string;
use crate::core::dates::normalize_dates;
use crate::domain::errors::ExporterError;
use crate::domain::result::Result;
use mongodb::bson;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Environment variable that overrides `mongoUrl`
pub const MONGO_URL_ENV: &str = "MONGO_URL";

/// On-disk format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, everything else is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Loads configuration from a JSON or TOML file
///
/// This function:
/// 1. Reads the file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the file into a generic tree
/// 4. Rewrites ISO-8601 date strings into BSON dates
/// 5. Applies environment variable overrides (`MONGO_URL`, `MONGO_EXPORTER_*`, `APIFY_*`)
/// 6. Checks required fields and validates the result
///
/// # Errors
///
/// Every failure is an [`ExporterError::Configuration`]; nothing has been
/// connected yet when this returns.
///
/// # Examples
///
/// ```no_run
/// use mongo_exporter::config::loader::load_config;
///
/// let config = load_config("INPUT.json").expect("Failed to load config");
/// println!("Exporting from {}", config.collection_name);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ExportConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ExporterError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ExporterError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config_str(&contents, ConfigFormat::from_path(path))
}

/// Reads only the `logging` section of a configuration file
///
/// Logging has to be set up before the full configuration is loaded, so any
/// problem with the file falls back to the default settings here and is
/// reported later by [`load_config`].
pub fn load_logging_config(path: impl AsRef<Path>) -> LoggingConfig {
    let path = path.as_ref();
    let mut logging = fs::read_to_string(path)
        .ok()
        .and_then(|contents| parse_input(&contents, ConfigFormat::from_path(path)).ok())
        .map(|input| input.logging)
        .unwrap_or_default();

    if let Some(level) = env_value("MONGO_EXPORTER_LOG_LEVEL") {
        logging.level = level;
    }
    logging
}

/// Parses configuration text; the in-memory half of [`load_config`]
pub fn parse_config_str(contents: &str, format: ConfigFormat) -> Result<ExportConfig> {
    let mut input = parse_input(contents, format)?;

    apply_env_overrides(&mut input)?;

    input.into_config().map_err(|e| {
        ExporterError::Configuration(format!("Configuration validation failed: {}", e))
    })
}

/// Parses configuration text into the raw input, without overrides or validation
pub fn parse_input(contents: &str, format: ConfigFormat) -> Result<ExportInput> {
    let contents = substitute_env_vars(contents)?;

    let tree = match format {
        ConfigFormat::Json => serde_json::from_str::<Value>(&contents).map_err(|e| {
            ExporterError::Configuration(format!("Failed to parse JSON: {}", e))
        })?,
        ConfigFormat::Toml => {
            let value: toml::Value = toml::from_str(&contents)?;
            toml_to_json(value)
        }
    };

    if !tree.is_object() {
        return Err(ExporterError::Configuration(
            "Configuration root must be an object".to_string(),
        ));
    }

    let input: ExportInput = bson::from_bson(normalize_dates(tree))?;
    Ok(input)
}

/// Converts a TOML tree into the JSON tree the rest of the loader expects
///
/// TOML datetimes become their RFC 3339 text so the date normalizer sees them
/// like any other date string.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, item)| (key, toml_to_json(item)))
                .collect(),
        ),
    }
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Lines starting with `#` are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ExporterError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        ExporterError::Configuration(format!("Environment variable {name} has invalid value '{raw}'"))
    })
}

/// Applies environment variable overrides
///
/// `MONGO_URL` replaces the connection target. The remaining variables follow
/// the `MONGO_EXPORTER_<KEY>` pattern, plus the `APIFY_*` variables of the
/// hosted platform for the proxy password and the dataset sink.
fn apply_env_overrides(input: &mut ExportInput) -> Result<()> {
    if let Some(val) = env_value(MONGO_URL_ENV) {
        input.mongo_url = Some(secret_string(val));
    }

    if let Some(val) = env_value("MONGO_EXPORTER_CONCURRENCY") {
        input.concurrency = Some(parse_env("MONGO_EXPORTER_CONCURRENCY", &val)?);
    }
    if let Some(val) = env_value("MONGO_EXPORTER_USE_TUNNEL") {
        input.use_tunnel = Some(parse_env("MONGO_EXPORTER_USE_TUNNEL", &val)?);
    }
    if let Some(val) = env_value("MONGO_EXPORTER_COUNT_TIMEOUT_SECS") {
        input.count_timeout_secs = Some(parse_env("MONGO_EXPORTER_COUNT_TIMEOUT_SECS", &val)?);
    }
    if let Some(val) = env_value("MONGO_EXPORTER_LOG_LEVEL") {
        input.logging.level = val;
    }

    if let Some(val) = env_value("APIFY_PROXY_PASSWORD") {
        input.proxy.password = Some(secret_string(val));
    }

    if let SinkConfig::Dataset {
        ref mut dataset_id,
        ref mut token,
        ..
    } = input.sink
    {
        if let Some(val) = env_value("APIFY_DEFAULT_DATASET_ID") {
            *dataset_id = Some(val);
        }
        if let Some(val) = env_value("APIFY_TOKEN") {
            *token = Some(secret_string(val));
        }
    }

    Ok(())
}
