use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "codesmith.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Model endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Generation endpoint URL (Ollama-style NDJSON streaming).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model used for the planning stage.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Model used for code-producing stages (code, tests, docs, optimize).
    #[serde(default = "default_model_name")]
    pub tool_name: String,

    /// Environment variable holding the bearer token, if the endpoint
    /// requires one. Resolved once at startup.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Transient-failure retries per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between retries, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            name: default_model_name(),
            tool_name: default_model_name(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl ModelConfig {
    /// Reads the API key from the configured environment variable.
    ///
    /// Called once when the client is constructed; empty values count as
    /// absent.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
    }
}

/// Regeneration loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Attempt ceiling for the generate-test loop.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Number of interactive requests served per `run` invocation.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            iterations: default_iterations(),
        }
    }
}

/// Local execution of generated code and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Run the final artifact after saving it.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Timeout for every spawned interpreter/compiler, in seconds.
    #[serde(default = "default_execution_timeout")]
    pub timeout_secs: u64,

    /// Install packages the generated Python code asked for via
    /// pip-install lines. Off by default; packages are only reported.
    #[serde(default)]
    pub install_dependencies: bool,

    /// Custom test commands per language, e.g.
    /// `go = "go test {tests}"`. `{code}` and `{tests}` expand to the
    /// scratch file names.
    #[serde(default)]
    pub test_commands: HashMap<String, String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_execution_timeout(),
            install_dependencies: false,
            test_commands: HashMap::new(),
        }
    }
}

/// Reference page lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Fetch a reference page for each request.
    #[serde(default)]
    pub enabled: bool,

    /// User-Agent header for reference fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_agent: default_user_agent(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_model_name() -> String {
    "llama3.1:8b".to_string()
}

fn default_api_key_env() -> String {
    "CODESMITH_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    180
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    5
}

fn default_iterations() -> u32 {
    1
}

fn default_execution_timeout() -> u64 {
    120
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

impl Config {
    /// Load configuration, checking the project directory first and the
    /// user config directory second; defaults apply when neither exists.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let candidates = [
            project_dir.join(CONFIG_FILE),
            user_config_path().unwrap_or_default(),
        ];

        for config_path in &candidates {
            if config_path.as_os_str().is_empty() || !config_path.exists() {
                continue;
            }

            let content = fs::read_to_string(config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            let config: Self = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;

            return Ok(config);
        }

        Ok(Self::default())
    }
}

/// `~/.config/codesmith/codesmith.toml` (platform equivalent).
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("codesmith").join(CONFIG_FILE))
}
