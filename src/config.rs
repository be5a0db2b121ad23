use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// How the model backend is asked for its selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    /// Schema-constrained generation; the reply is already a `{name, arguments}` object.
    Structured,
    /// JSON-mode generation; the reply is text that should be a bare object.
    Json,
    /// Free text; the selection is recovered from surrounding prose.
    Text,
}

impl FromStr for ModelMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structured" | "schema" => Ok(Self::Structured),
            "json" => Ok(Self::Json),
            "text" | "free-text" | "plain" => Ok(Self::Text),
            other => Err(anyhow::anyhow!(
                "Unknown MODEL_MODE '{}' (expected structured, json or text)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Streamable-HTTP endpoint of the MCP server (tool listing and execution).
    pub mcp_server_url: String,
    /// Optional tools JSON file used as the catalog source instead of `tools/list`.
    pub tools_path: Option<PathBuf>,
    pub ollama_host: String,
    pub ollama_model: String,
    pub model_mode: ModelMode,
    pub model_temperature: f32,
    /// Per outbound HTTP call (model backend and MCP server).
    pub http_timeout_secs: u64,
    /// External deadline for one whole dispatch cycle.
    pub dispatch_timeout_secs: u64,
    /// Dispatch cycles allowed to run at once.
    pub max_concurrent_dispatches: usize,
    /// Maximum requests per batch dispatch.
    pub max_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
            mcp_server_url: "http://127.0.0.1:8000/mcp".to_string(),
            tools_path: None,
            ollama_host: "http://127.0.0.1:11434".to_string(),
            ollama_model: "llama3.1:latest".to_string(),
            model_mode: ModelMode::Structured,
            model_temperature: 0.0,
            http_timeout_secs: 120,
            dispatch_timeout_secs: 180,
            max_concurrent_dispatches: 4,
            max_batch_size: 16,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// `MODEL_MODE` picks how the selection is requested:
    /// - `structured`: schema-constrained output (default)
    /// - `json`: JSON mode, reply parsed from text
    /// - `text`: free text, selection recovered from prose
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            shutdown_timeout_secs: parse_var("SHUTDOWN_TIMEOUT", defaults.shutdown_timeout_secs)?,
            mcp_server_url: env::var("MCP_SERVER_URL").unwrap_or(defaults.mcp_server_url),
            tools_path: env::var("TOOLS_PATH").ok().map(PathBuf::from),
            ollama_host: env::var("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
            model_mode: parse_var("MODEL_MODE", defaults.model_mode)?,
            model_temperature: parse_var("MODEL_TEMPERATURE", defaults.model_temperature)?,
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            dispatch_timeout_secs: parse_var("DISPATCH_TIMEOUT_SECS", defaults.dispatch_timeout_secs)?,
            max_concurrent_dispatches: parse_var(
                "MAX_CONCURRENT_DISPATCHES",
                defaults.max_concurrent_dispatches,
            )?,
            max_batch_size: parse_var("MAX_BATCH_SIZE", defaults.max_batch_size)?,
        })
    }
}

/// Parse `key` if set, otherwise keep `default`.
fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
