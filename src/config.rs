use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::classify::{Classifier, Role};

/// Default chunk ceiling: 5 MiB.
pub const DEFAULT_CHUNK_CEILING_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub limits: LimitsConfig,
    pub filters: FiltersConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

/// Which snapshot backend serves remote repositories.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// GitHub REST API: metadata, recursive tree listing, contents endpoint.
    #[default]
    Api,
    /// Branch zip archive downloaded and extracted to a temp directory.
    Archive,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub backend: Backend,
    pub api_base: String,
    pub web_base: String,
    /// Per-request timeout for every outbound HTTP call.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Api,
            api_base: "https://api.github.com".to_string(),
            web_base: "https://github.com".to_string(),
            timeout_secs: 30,
            user_agent: format!("repo-context/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Character caps per role and file-count caps per section.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LimitsConfig {
    pub documentation_chars: usize,
    pub configuration_chars: usize,
    pub source_chars: usize,
    pub max_documentation_files: Option<usize>,
    pub max_configuration_files: Option<usize>,
    pub max_source_files: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            documentation_chars: 3000,
            configuration_chars: 1000,
            source_chars: 1500,
            max_documentation_files: Some(5),
            max_configuration_files: Some(20),
            max_source_files: None,
        }
    }
}

impl LimitsConfig {
    /// Character ceiling for content of the given role.
    pub fn char_cap(&self, role: &Role) -> usize {
        match role {
            Role::Documentation => self.documentation_chars,
            Role::Configuration => self.configuration_chars,
            Role::Source(_) => self.source_chars,
            // Never retrieved; a zero cap keeps the match total.
            Role::Image | Role::Excluded => 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FiltersConfig {
    pub exclude_globs: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub chunk_ceiling_bytes: usize,
    pub include_file_listing: bool,
    pub include_image_listing: bool,
    /// Indented directory tree of retained files.
    pub include_structure: bool,
    /// Labels for package manifests at the repository root.
    pub include_tech_stack: bool,
    /// Source paths grouped by language, including files that hit a cap.
    pub include_source_index: bool,
    pub attribution: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            chunk_ceiling_bytes: DEFAULT_CHUNK_CEILING_BYTES,
            include_file_listing: true,
            include_image_listing: true,
            include_structure: true,
            include_tech_stack: true,
            include_source_index: true,
            attribution: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7340".to_string(),
        }
    }
}

impl Config {
    /// Classifier built from the configured exclude globs.
    pub fn classifier(&self) -> Result<Classifier> {
        Classifier::with_excludes(&self.filters.exclude_globs)
            .with_context(|| "Invalid pattern in filters.exclude_globs")
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be > 0");
        }

        if self.output.chunk_ceiling_bytes == 0 {
            anyhow::bail!("output.chunk_ceiling_bytes must be > 0");
        }

        let limits = &self.limits;
        if limits.documentation_chars == 0
            || limits.configuration_chars == 0
            || limits.source_chars == 0
        {
            anyhow::bail!("limits.*_chars must all be > 0");
        }

        self.classifier()?;
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
