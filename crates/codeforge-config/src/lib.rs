//! Environment-variable configuration. Missing credentials are a fatal
//! `ConfigError` at startup — config loading fails closed rather than
//! defaulting to an empty key and running anyway.

use std::env;
use std::time::Duration;

use codeforge_utils::CodeforgeError;

const DEFAULT_WORKSPACE_DIR: &str = "./workspace";
const DEFAULT_USAGE_LOG_FILE: &str = "api_usage.json";
const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_MAX_DEBUG_ATTEMPTS: u32 = 5;
const DEFAULT_REQUEST_DELAY_S: u64 = 6;
const DEFAULT_EXECUTE_TIMEOUT_S: u64 = 30;
const DEFAULT_INITIAL_BACKOFF_S: u64 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub mcp_api_key: String,
    pub mcp_endpoint: String,
    pub mcp_model: Option<String>,
    pub workspace_dir: String,
    pub usage_log_file: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub enable_rate_limiting: bool,
    pub rate_limit_delay_s: u64,
    pub max_debug_attempts: u32,
    pub test_timeout_s: u64,
    pub execute_timeout_s: u64,
    pub initial_backoff_s: u64,
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// `MCP_API_KEY` and `MCP_ENDPOINT` are required; everything else
    /// falls back to a documented default.
    pub fn from_env() -> Result<Self, CodeforgeError> {
        let mcp_api_key = env::var("MCP_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CodeforgeError::Config("MCP_API_KEY is required".to_string()))?;

        let mcp_endpoint = env::var("MCP_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CodeforgeError::Config("MCP_ENDPOINT is required".to_string()))?;

        let mcp_model = env::var("MCP_MODEL").ok().filter(|s| !s.is_empty());
        let workspace_dir = env::var("WORKSPACE_DIR").unwrap_or_else(|_| DEFAULT_WORKSPACE_DIR.to_string());
        let usage_log_file = env::var("USAGE_LOG_FILE").unwrap_or_else(|_| DEFAULT_USAGE_LOG_FILE.to_string());

        let timeout_seconds = parse_env_u64("TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS)?;
        let max_retries = parse_env_u32("MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        let enable_rate_limiting = env::var("ENABLE_RATE_LIMITING")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(true);

        Ok(Config {
            mcp_api_key,
            mcp_endpoint,
            mcp_model,
            workspace_dir,
            usage_log_file,
            timeout_seconds,
            max_retries,
            enable_rate_limiting,
            rate_limit_delay_s: DEFAULT_REQUEST_DELAY_S,
            max_debug_attempts: DEFAULT_MAX_DEBUG_ATTEMPTS,
            test_timeout_s: timeout_seconds,
            execute_timeout_s: DEFAULT_EXECUTE_TIMEOUT_S,
            initial_backoff_s: DEFAULT_INITIAL_BACKOFF_S,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn parse_env_u64(key: &str, default: u64) -> Result<u64, CodeforgeError> {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| CodeforgeError::Config(format!("{key} must be a positive integer, got {v:?}"))),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(key: &str, default: u32) -> Result<u32, CodeforgeError> {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|_| CodeforgeError::Config(format!("{key} must be a positive integer, got {v:?}"))),
        Err(_) => Ok(default),
    }
}
