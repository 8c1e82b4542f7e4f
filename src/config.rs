use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::periodics::{
    Classifier, ExecutionWindow, DEFAULT_CHUNK_LINES, DEFAULT_PLATFORMS, DEFAULT_SUCCESS_MARKER,
    DEFAULT_VARIANT_DELIMITER, DEFAULT_VERSION_PATTERN, DEFAULT_WINDOW_HOURS,
};

/// Configuration file structure for periodics-report.
///
/// Every section is optional; missing values fall back to the defaults
/// used for the HyperShift KubeVirt periodics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Where job names are discovered
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Where run history is read from
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Classification, window and rendering
    #[serde(default)]
    pub report: ReportConfig,

    /// Message delivery
    #[serde(default)]
    pub slack: SlackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobsConfig {
    /// Git repository holding the job definitions
    #[serde(default = "default_repo_url")]
    pub repo_url: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Local clone location (defaults to the user cache directory)
    pub checkout_dir: Option<PathBuf>,

    /// Directory inside the repository that holds the job files
    #[serde(default = "default_jobs_path")]
    pub jobs_path: String,

    /// Only files ending with this suffix are read
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// Regex applied to each trimmed line; capture group 1 is the job name
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,

    /// Fixed job names; when set, the repository is not consulted
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArtifactsConfig {
    /// Prefix of the job log directories
    #[serde(default = "default_artifacts_url")]
    pub base_url: String,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    /// Runs completed earlier than this many hours ago are ignored
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,

    #[serde(default = "default_variant_delimiter")]
    pub variant_delimiter: String,

    #[serde(default = "default_version_pattern")]
    pub version_pattern: String,

    #[serde(default = "default_success_marker")]
    pub success_marker: String,

    /// First line of the posted message
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub style: MessageStyle,

    /// Re-chunk mrkdwn sections to this many lines
    pub chunk_lines: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStyle {
    /// One mrkdwn section per version
    #[default]
    Mrkdwn,
    /// Nested rich-text lists with links and status emoji
    RichText,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SlackConfig {
    pub webhook_url: Option<String>,

    /// Used instead of `webhook-url` in development mode
    pub dev_webhook_url: Option<String>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            repo_url: default_repo_url(),
            branch: default_branch(),
            checkout_dir: None,
            jobs_path: default_jobs_path(),
            file_suffix: default_file_suffix(),
            name_pattern: default_name_pattern(),
            names: Vec::new(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            base_url: default_artifacts_url(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            platforms: default_platforms(),
            variant_delimiter: default_variant_delimiter(),
            version_pattern: default_version_pattern(),
            success_marker: default_success_marker(),
            title: default_title(),
            style: MessageStyle::default(),
            chunk_lines: None,
        }
    }
}

fn default_repo_url() -> String {
    "https://github.com/openshift/release.git".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_jobs_path() -> String {
    "ci-operator/jobs/openshift/hypershift".to_string()
}

fn default_file_suffix() -> String {
    "periodics.yaml".to_string()
}

fn default_name_pattern() -> String {
    r"^name: (.*kubevirt.*)$".to_string()
}

fn default_artifacts_url() -> String {
    "https://gcsweb-ci.apps.ci.l2s4.p1.openshiftapps.com/gcs/test-platform-results/logs/"
        .to_string()
}

fn default_max_concurrent_requests() -> usize {
    32
}

fn default_window_hours() -> u32 {
    DEFAULT_WINDOW_HOURS
}

fn default_platforms() -> Vec<String> {
    DEFAULT_PLATFORMS.iter().map(ToString::to_string).collect()
}

fn default_variant_delimiter() -> String {
    DEFAULT_VARIANT_DELIMITER.to_string()
}

fn default_version_pattern() -> String {
    DEFAULT_VERSION_PATTERN.to_string()
}

fn default_success_marker() -> String {
    DEFAULT_SUCCESS_MARKER.to_string()
}

fn default_title() -> String {
    "HyperShift-KubeVirt periodics summary".to_string()
}

impl ReportConfig {
    pub fn classifier(&self) -> Result<Classifier> {
        Classifier::new(
            self.platforms.clone(),
            self.variant_delimiter.as_str(),
            &self.version_pattern,
        )
        .with_context(|| format!("Invalid version pattern: {}", self.version_pattern))
    }

    pub fn window(&self) -> ExecutionWindow {
        ExecutionWindow::new(self.window_hours)
    }

    pub fn chunk_lines_or_default(&self) -> usize {
        self.chunk_lines.unwrap_or(DEFAULT_CHUNK_LINES)
    }
}

impl SlackConfig {
    /// Picks the webhook for the current mode.
    pub fn webhook(&self, development: bool) -> Option<&str> {
        if development {
            self.dev_webhook_url.as_deref()
        } else {
            self.webhook_url.as_deref()
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./periodics-report.toml
    /// 3. ./periodics-report.json
    /// 4. ./periodics-report.yaml
    /// 5. ./periodics-report.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "periodics-report.toml",
            "periodics-report.json",
            "periodics-report.yaml",
            "periodics-report.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
