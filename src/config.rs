//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};

/// Key/value config file with optional overrides of the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Listing URL.
    pub base_url: Option<String>,
    /// Directory receiving the output tables.
    pub output_dir: Option<PathBuf>,
    /// Detail fetch concurrency (same range as CLI).
    pub concurrency: Option<u8>,
    /// Attempts per URL (same range as CLI).
    pub max_attempts: Option<u8>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Skip the cleaning stage.
    pub skip_clean: Option<bool>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            bail!("Invalid config value for `concurrency`: {concurrency}. Expected range: 1..=100");
        }

        if let Some(max_attempts) = self.max_attempts
            && !(1..=10).contains(&max_attempts)
        {
            bail!("Invalid config value for `max_attempts`: {max_attempts}. Expected range: 1..=10");
        }

        if let Some(base_url) = &self.base_url
            && base_url.trim().is_empty()
        {
            bail!("Invalid config value for `base_url`: must not be empty");
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn filter(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Parsed values, or all-unset when no file was loaded.
    #[must_use]
    pub fn values(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/filmfetch/config.toml`
/// 2. `$HOME/.config/filmfetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("filmfetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("filmfetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads an explicit config file, which must exist.
pub fn load_explicit_file_config(path: &Path) -> Result<LoadedConfig> {
    let config = load_file_config(path)?;
    Ok(LoadedConfig {
        path: Some(path.to_path_buf()),
        config: Some(config),
    })
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = without_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "base_url" => {
                cfg.base_url = Some(unquote(value).with_context(context)?);
            }
            "output_dir" => {
                let parsed = unquote(value).with_context(context)?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "concurrency" => {
                cfg.concurrency = Some(parse_number(value).with_context(context)?);
            }
            "max_attempts" => {
                cfg.max_attempts = Some(parse_number(value).with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_number(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_number(value).with_context(context)?);
            }
            "skip_clean" => {
                cfg.skip_clean = Some(parse_flag(value).with_context(context)?);
            }
            "verbosity" => {
                let parsed = unquote(value).with_context(context)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Cuts a trailing `#` comment; a `#` inside a quoted value is kept.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    let cut = line.char_indices().find(|&(_, ch)| {
        if ch == '"' {
            quoted = !quoted;
        }
        ch == '#' && !quoted
    });
    cut.map_or(line, |(at, _)| &line[..at])
}

fn unquote(value: &str) -> Result<String> {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .context("Expected double-quoted string")
}

fn parse_number<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("Expected an unsigned integer, got '{value}'"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .with_context(|| format!("Expected 'true' or 'false', got '{value}'"))
}
