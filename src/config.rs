//! Configuration file handling.
//!
//! Settings are layered: built-in defaults, then `.prpanel.toml` (or the
//! file given with `--config`), then environment variables and CLI flags.
//! The result is resolved once into [`Settings`] and passed by reference.

use crate::agent::AgentConfig;
use crate::cli::Args;
use crate::engine::VertexConfig;
use crate::gateway::McpConfig;
use crate::models::ReviewRequest;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".prpanel.toml";

/// Variables a run cannot start without.
pub const REQUIRED_VARS: &[(&str, &str)] = &[
    ("GCP_PROJECT_ID", "Your GCP project ID"),
    (
        "GITHUB_PERSONAL_ACCESS_TOKEN",
        "GitHub PAT used by the MCP server",
    ),
    (
        "GOOGLE_OAUTH_ACCESS_TOKEN",
        "Vertex AI access token (optional when gcloud is installed)",
    ),
];

const DEFAULT_OWNER: &str = "test-owner";
const DEFAULT_REPO: &str = "test-repo";
const DEFAULT_PR_NUMBER: u64 = 1;

/// Configuration errors. All of them are fatal before any work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0} not set")]
    MissingVar(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure, as stored in `.prpanel.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Reasoning engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Gemini model name.
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,

    /// Model calls allowed per agent before it is abandoned.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_model_timeout(),
            max_turns: default_max_turns(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_model_timeout() -> u64 {
    300
}

fn default_max_turns() -> usize {
    25
}

/// Tool gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// MCP endpoint.
    #[serde(default = "default_gateway_url")]
    pub url: String,

    #[serde(default = "default_gateway_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            timeout_seconds: default_gateway_timeout(),
        }
    }
}

fn default_gateway_url() -> String {
    "https://api.githubcopilot.com/mcp/".to_string()
}

fn default_gateway_timeout() -> u64 {
    60
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// JSON result file.
    #[serde(default = "default_output")]
    pub output: String,

    /// Optional Markdown file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            markdown: None,
        }
    }
}

fn default_output() -> String {
    "review_results.json".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// Look for [`CONFIG_FILE_NAME`] in `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Override file settings with whatever the CLI or environment provided.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
            self.gateway.timeout_seconds = timeout;
        }
        if let Some(max_turns) = args.max_turns {
            self.model.max_turns = max_turns;
        }
        if let Some(ref url) = args.mcp_url {
            self.gateway.url = url.clone();
        }
        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
        if let Some(ref markdown) = args.markdown {
            self.report.markdown = Some(markdown.display().to_string());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Everything a run needs, resolved from config, environment and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub request: ReviewRequest,
    pub project_id: String,
    pub location: String,
    pub github_token: String,
    /// Explicit Vertex AI token; `None` means ask gcloud.
    pub access_token: Option<String>,
    pub model: ModelConfig,
    pub gateway: GatewayConfig,
    pub output: PathBuf,
    pub markdown: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings. `config` must already be merged with `args`.
    pub fn resolve(config: Config, args: &Args) -> Result<Self, ConfigError> {
        let project_id = non_empty(args.project.as_deref())
            .ok_or(ConfigError::MissingVar("GCP_PROJECT_ID"))?;
        let github_token = non_empty(args.github_token.as_deref())
            .ok_or(ConfigError::MissingVar("GITHUB_PERSONAL_ACCESS_TOKEN"))?;

        let owner = non_empty(args.owner.as_deref());
        let repo = non_empty(args.repo.as_deref());
        let request = match (owner, repo, args.pr) {
            (Some(owner), Some(repo), Some(pr)) => ReviewRequest::new(owner, repo, pr),
            (owner, repo, pr) => {
                warn!("Using test values (set REPO_OWNER, REPO_NAME, PR_NUMBER)");
                ReviewRequest::new(
                    owner.unwrap_or_else(|| DEFAULT_OWNER.to_string()),
                    repo.unwrap_or_else(|| DEFAULT_REPO.to_string()),
                    pr.unwrap_or(DEFAULT_PR_NUMBER),
                )
            }
        };

        if request.pr_number == 0 {
            return Err(ConfigError::Invalid("PR number must be at least 1".to_string()));
        }
        if config.model.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be at least 1".to_string()));
        }

        Ok(Self {
            request,
            project_id,
            location: args.location.clone(),
            github_token,
            access_token: non_empty(args.access_token.as_deref()),
            output: PathBuf::from(&config.report.output),
            markdown: config.report.markdown.as_ref().map(PathBuf::from),
            model: config.model,
            gateway: config.gateway,
        })
    }

    pub fn vertex_config(&self) -> VertexConfig {
        VertexConfig {
            project_id: self.project_id.clone(),
            location: self.location.clone(),
            model: self.model.name.clone(),
            temperature: self.model.temperature,
            timeout_seconds: self.model.timeout_seconds,
        }
    }

    pub fn mcp_config(&self) -> McpConfig {
        McpConfig {
            url: self.gateway.url.clone(),
            token: self.github_token.clone(),
            timeout_seconds: self.gateway.timeout_seconds,
        }
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_turns: self.model.max_turns,
            ..AgentConfig::default()
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec![
            "prpanel",
            "--project",
            "my-proj",
            "--github-token",
            "ghp_x",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gemini-2.5-pro");
        assert_eq!(config.model.max_turns, 25);
        assert_eq!(config.gateway.url, "https://api.githubcopilot.com/mcp/");
        assert_eq!(config.report.output, "review_results.json");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[model]
name = "gemini-2.5-flash"
temperature = 0.0

[gateway]
timeout_seconds = 10

[report]
markdown = "review.md"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert_eq!(config.model.temperature, 0.0);
        assert_eq!(config.model.timeout_seconds, 300);
        assert_eq!(config.gateway.timeout_seconds, 10);
        assert_eq!(config.report.markdown.as_deref(), Some("review.md"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[gateway]"));
        assert!(toml_str.contains("[report]"));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.name, "gemini-2.5-pro");
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[model]\nmax_turns = 5\n").unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.model.max_turns, 5);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[model\n").unwrap();
        assert!(matches!(
            Config::load_from_dir(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str("[model]\nname = \"from-file\"\n").unwrap();
        config.merge_with_args(&args(&["--model", "from-cli", "--timeout", "30"]));

        assert_eq!(config.model.name, "from-cli");
        assert_eq!(config.model.timeout_seconds, 30);
        assert_eq!(config.gateway.timeout_seconds, 30);
    }

    #[test]
    fn test_resolve_settings() {
        let args = args(&["--owner", "acme", "--repo", "widgets", "--pr", "17"]);
        let mut config = Config::default();
        config.merge_with_args(&args);

        let settings = Settings::resolve(config, &args).unwrap();
        assert_eq!(settings.request, ReviewRequest::new("acme", "widgets", 17));
        assert_eq!(settings.project_id, "my-proj");
        assert_eq!(settings.output, PathBuf::from("review_results.json"));
        assert_eq!(settings.mcp_config().token, "ghp_x");
        assert_eq!(settings.vertex_config().model, "gemini-2.5-pro");
    }

    #[test]
    fn test_resolve_falls_back_to_test_pr() {
        let args = args(&["--owner", "acme"]);
        let settings = Settings::resolve(Config::default(), &args).unwrap();
        assert_eq!(settings.request, ReviewRequest::new("acme", "test-repo", 1));
    }

    #[test]
    fn test_missing_project_is_error() {
        let mut args = args(&[]);
        args.project = Some("  ".to_string());
        let err = Settings::resolve(Config::default(), &args).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GCP_PROJECT_ID")));
    }
}
