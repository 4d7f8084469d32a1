//! Configuration file parsing and management.
//!
//! Settings come from TOML files and `DS_*` environment variables. Files
//! are merged with local files taking precedence over global ones, and the
//! environment is layered on top; command-line options are applied last by
//! the caller.

use crate::error::SweepError;
use crate::generate::{estimate_pattern_count, MAX_PATTERN_EXPANSION};
use crate::protocols::routes::validate_route;
use crate::types::SweepConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest repeated-character run accepted in `lengths`.
pub const MAX_RUN_LENGTH: usize = 63;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// concurrency = 10
/// timeout = "10s"
/// suffixes = [".loc.cc", ".hidns.vip"]
/// lengths = [2, 3]
/// words = "words.json"
/// store = "output.csv"
/// skip_known = true
///
/// [generation]
/// patterns = ["go\\d"]
///
/// [routes]
/// ".hidns.vip" = "https://registrar.example/check"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Name generation settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationConfig>,

    /// Extra registrar routes (suffix prefix -> endpoint URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<HashMap<String, String>>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-lookup timeout (as string, e.g., "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lengths: Option<Vec<usize>>,

    /// Word list path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<String>,

    /// Result store path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_known: Option<bool>,
}

/// Name generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    /// Wildcard patterns expanded into extra names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
}

impl FileConfig {
    /// Overlay the values set in this file onto `config`.
    pub fn apply_to(&self, config: &mut SweepConfig) -> Result<(), SweepError> {
        if let Some(defaults) = &self.defaults {
            if let Some(concurrency) = defaults.concurrency {
                config.concurrency = concurrency;
            }
            if let Some(timeout) = &defaults.timeout {
                config.timeout = Some(parse_timeout(timeout)?);
            }
            if let Some(suffixes) = &defaults.suffixes {
                config.suffixes = normalize_suffixes(suffixes);
            }
            if let Some(lengths) = &defaults.lengths {
                config.lengths = lengths.clone();
            }
            if let Some(words) = &defaults.words {
                config.words_path = words.clone();
            }
            if let Some(store) = &defaults.store {
                config.store_path = store.clone();
            }
            if let Some(skip_known) = defaults.skip_known {
                config.skip_known = skip_known;
            }
        }

        if let Some(patterns) = self.generation.as_ref().and_then(|g| g.patterns.as_ref()) {
            config.patterns = patterns.clone();
        }

        if let Some(routes) = &self.routes {
            config
                .routes
                .extend(routes.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(())
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// Fails if the file is missing, is not valid TOML, or holds values
    /// outside their accepted ranges.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, SweepError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SweepError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SweepError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| SweepError::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", e),
        })?;

        self.validate_config(&config)?;

        if self.verbose {
            tracing::info!(path = %path.display(), "loaded configuration file");
        }
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then the home directory, then the current directory;
    /// later files override earlier ones key by key. A discovered file that
    /// fails to load is an error rather than being skipped.
    pub fn discover_and_load(&self) -> Result<FileConfig, SweepError> {
        let mut merged_config = FileConfig::default();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged_config = self.merge_configs(merged_config, config);
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-sweep.toml", "./.domain-sweep.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-sweep.toml", "domain-sweep.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-sweep").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.suffixes.is_some() {
                        lower_defaults.suffixes = higher_defaults.suffixes;
                    }
                    if higher_defaults.lengths.is_some() {
                        lower_defaults.lengths = higher_defaults.lengths;
                    }
                    if higher_defaults.words.is_some() {
                        lower_defaults.words = higher_defaults.words;
                    }
                    if higher_defaults.store.is_some() {
                        lower_defaults.store = higher_defaults.store;
                    }
                    if higher_defaults.skip_known.is_some() {
                        lower_defaults.skip_known = higher_defaults.skip_known;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            generation: match (lower.generation, higher.generation) {
                (Some(mut lower_gen), Some(higher_gen)) => {
                    if higher_gen.patterns.is_some() {
                        lower_gen.patterns = higher_gen.patterns;
                    }
                    Some(lower_gen)
                }
                (lower_gen, higher_gen) => higher_gen.or(lower_gen),
            },
            routes: match (lower.routes, higher.routes) {
                (Some(mut lower_routes), Some(higher_routes)) => {
                    lower_routes.extend(higher_routes);
                    Some(lower_routes)
                }
                (lower_routes, higher_routes) => higher_routes.or(lower_routes),
            },
        }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), SweepError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > 100 {
                    return Err(SweepError::config("Concurrency must be between 1 and 100"));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                parse_timeout(timeout_str)?;
            }

            if let Some(suffixes) = &defaults.suffixes {
                if suffixes.is_empty() {
                    return Err(SweepError::config("'suffixes' cannot be empty"));
                }
                for suffix in suffixes {
                    validate_suffix_format(suffix)?;
                }
            }

            if let Some(lengths) = &defaults.lengths {
                for &length in lengths {
                    validate_length(length)?;
                }
            }
        }

        if let Some(patterns) = config.generation.as_ref().and_then(|g| g.patterns.as_ref()) {
            for pattern in patterns {
                validate_pattern(pattern)?;
            }
        }

        if let Some(routes) = &config.routes {
            for (prefix, url) in routes {
                validate_route(prefix, url)?;
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Values come from `DS_*` variables; invalid ones are warned about and
/// left unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub suffixes: Option<Vec<String>>,
    pub lengths: Option<Vec<usize>>,
    pub words: Option<String>,
    pub store: Option<String>,
    pub skip_known: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay the variables that were set onto `config`.
    pub fn apply_to(&self, config: &mut SweepConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Some(timeout);
        }
        if let Some(suffixes) = &self.suffixes {
            config.suffixes = suffixes.clone();
        }
        if let Some(lengths) = &self.lengths {
            config.lengths = lengths.clone();
        }
        if let Some(words) = &self.words {
            config.words_path = words.clone();
        }
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        if let Some(skip_known) = self.skip_known {
            config.skip_known = skip_known;
        }
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    parse_env_config(|key| env::var(key).ok())
}

/// Parse `DS_*` variables through `lookup`.
pub fn parse_env_config<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // DS_CONCURRENCY - concurrent lookups
    if let Some(val) = lookup("DS_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if (1..=100).contains(&concurrency) => {
                env_config.concurrency = Some(concurrency);
            }
            _ => tracing::warn!("Invalid DS_CONCURRENCY='{}', must be 1-100", val),
        }
    }

    // DS_TIMEOUT - per-lookup timeout
    if let Some(val) = lookup("DS_TIMEOUT") {
        match parse_timeout(&val) {
            Ok(timeout) => env_config.timeout = Some(timeout),
            Err(_) => tracing::warn!(
                "Invalid DS_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                val
            ),
        }
    }

    // DS_SUFFIX - comma-separated suffix list
    if let Some(val) = lookup("DS_SUFFIX") {
        let suffixes = split_list(&val);
        if suffixes.is_empty() {
            tracing::warn!("Ignoring empty DS_SUFFIX");
        } else if let Err(e) = suffixes.iter().try_for_each(|s| validate_suffix_format(s)) {
            tracing::warn!("Invalid DS_SUFFIX='{}': {}", val, e);
        } else {
            env_config.suffixes = Some(normalize_suffixes(&suffixes));
        }
    }

    // DS_LENGTHS - comma-separated run lengths
    if let Some(val) = lookup("DS_LENGTHS") {
        match parse_lengths(&val) {
            Ok(lengths) => env_config.lengths = Some(lengths),
            Err(e) => tracing::warn!("Invalid DS_LENGTHS='{}': {}", val, e),
        }
    }

    if let Some(val) = non_empty(lookup("DS_WORDS")) {
        env_config.words = Some(val);
    }

    if let Some(val) = non_empty(lookup("DS_STORE")) {
        env_config.store = Some(val);
    }

    if let Some(val) = lookup("DS_SKIP_KNOWN") {
        match parse_bool(&val) {
            Some(flag) => env_config.skip_known = Some(flag),
            None => tracing::warn!("Invalid DS_SKIP_KNOWN='{}', use true/false", val),
        }
    }

    // DS_CONFIG - explicit config file, replaces discovery
    if let Some(val) = non_empty(lookup("DS_CONFIG")) {
        env_config.config = Some(val);
    }

    env_config
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// A bare number is taken as seconds. Zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let seconds = if let Some(s) = timeout_str.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    };

    seconds.filter(|&s| s > 0)
}

/// [`parse_timeout_string`] as a `Duration`, with a config error on failure.
pub fn parse_timeout(timeout_str: &str) -> Result<Duration, SweepError> {
    parse_timeout_string(timeout_str)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            SweepError::config(format!(
                "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                timeout_str
            ))
        })
}

/// Parse a comma-separated list of run lengths.
pub fn parse_lengths(value: &str) -> Result<Vec<usize>, SweepError> {
    split_list(value)
        .iter()
        .map(|item| {
            let length = item
                .parse::<usize>()
                .map_err(|_| SweepError::config(format!("Invalid length '{}'", item)))?;
            validate_length(length)?;
            Ok(length)
        })
        .collect()
}

/// Suffixes must start with a dot and contain no whitespace.
pub fn validate_suffix_format(suffix: &str) -> Result<(), SweepError> {
    if suffix.len() < 2 || !suffix.starts_with('.') || suffix.contains(char::is_whitespace) {
        return Err(SweepError::config(format!(
            "Invalid suffix '{}': expected a form like '.loc.cc'",
            suffix
        )));
    }
    Ok(())
}

/// Lowercase and de-duplicate suffixes, keeping their order.
pub fn normalize_suffixes(suffixes: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(suffixes.len());
    for suffix in suffixes {
        let suffix = suffix.trim().to_lowercase();
        if !normalized.contains(&suffix) {
            normalized.push(suffix);
        }
    }
    normalized
}

pub fn validate_pattern(pattern: &str) -> Result<(), SweepError> {
    let count = estimate_pattern_count(pattern)?;
    if count > MAX_PATTERN_EXPANSION {
        return Err(SweepError::invalid_pattern(
            pattern,
            format!("expands to {} names (limit {})", count, MAX_PATTERN_EXPANSION),
        ));
    }
    Ok(())
}

fn validate_length(length: usize) -> Result<(), SweepError> {
    if length == 0 || length > MAX_RUN_LENGTH {
        return Err(SweepError::config(format!(
            "Length {} out of range, must be 1-{}",
            length, MAX_RUN_LENGTH
        )));
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
