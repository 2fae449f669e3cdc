use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Where the user overlay is looked up when no `--config` is given.
const USER_CONFIG_PATH: &str = "~/.config/gh-owners-gate/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),
}

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub user_agent: String,
    pub per_page: u32,
    pub connect_timeout_ms: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".into(),
            user_agent: "gh-owners-gate".into(),
            per_page: 100,
            connect_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub owners_path: String,
    /// Budget for all remote calls of one evaluation; 0 means unbounded.
    pub timeout_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            owners_path: "OWNERS".into(),
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SecretsConfig {
    #[serde(default)]
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Empty means stderr only.
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        if self.file.trim().is_empty() {
            return None;
        }
        Some(expand_path(&self.file))
    }
}

impl SecretsConfig {
    pub fn dir_path(&self) -> PathBuf {
        expand_path(&self.dir)
    }
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    github: GitHubOverlay,
    #[serde(default)]
    evaluation: EvaluationOverlay,
    #[serde(default)]
    secrets: SecretsOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct GitHubOverlay {
    api_url: Option<String>,
    user_agent: Option<String>,
    per_page: Option<u32>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct EvaluationOverlay {
    owners_path: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SecretsOverlay {
    dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    level: Option<String>,
    file: Option<String>,
}

/// Expand `~` and environment variables; leave the path untouched if
/// expansion fails.
fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay from `explicit`, or from
    ///    ~/.config/gh-owners-gate/config.toml if that exists
    ///
    /// An explicit path must exist. Scalars in the overlay override defaults;
    /// omitted keys keep them.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = expand_path(USER_CONFIG_PATH);
                if !p.is_file() {
                    config.validate()?;
                    return Ok(config);
                }
                p
            }
        };
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let overlay: ConfigOverlay =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
        config.apply_overlay(overlay);
        config.validate()?;
        Ok(config)
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let g = overlay.github;
        set(&mut self.github.api_url, g.api_url);
        set(&mut self.github.user_agent, g.user_agent);
        set(&mut self.github.per_page, g.per_page);
        set(&mut self.github.connect_timeout_ms, g.connect_timeout_ms);

        let e = overlay.evaluation;
        set(&mut self.evaluation.owners_path, e.owners_path);
        set(&mut self.evaluation.timeout_ms, e.timeout_ms);

        set(&mut self.secrets.dir, overlay.secrets.dir);

        let l = overlay.logging;
        set(&mut self.logging.level, l.level);
        set(&mut self.logging.file, l.file);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.github.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "github.api_url",
                reason: "must not be empty".into(),
            });
        }
        if !(1..=100).contains(&self.github.per_page) {
            return Err(ConfigError::Invalid {
                key: "github.per_page",
                reason: format!("{} is outside 1..=100", self.github.per_page),
            });
        }
        if self.evaluation.owners_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "evaluation.owners_path",
                reason: "must not be empty".into(),
            });
        }
        if self.logging.level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Invalid {
                key: "logging.level",
                reason: format!("unknown level {:?}", self.logging.level),
            });
        }
        Ok(())
    }

    /// The merged configuration as TOML, for `--dump-config`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
