//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use deckshift_core::ConverterConfig;

/// Runtime configuration for deckshift-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// Converter working directory; also exported as `PYTHONPATH`.
    /// Defaults to the parent of the current directory.
    pub project_root: PathBuf,

    /// Scratch root for per-request workspaces
    /// (default: `<project_root>/.tmp/convert`).
    pub scratch_dir: PathBuf,

    /// Interpreter used to run the converter. Defaults to the project's
    /// `.venv/bin/python` when present, `python3` otherwise.
    pub python: PathBuf,

    /// Module passed to `python -m` (default: `"src.main"`).
    pub converter_module: String,

    /// Wall-clock bound for one converter run.
    pub converter_timeout: Duration,

    /// Upload size cap in megabytes.
    pub max_upload_size_mb: usize,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origin allowlist; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_openapi: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let project_root = std::env::var_os("DECKSHIFT_PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(default_project_root);
        let scratch_dir = std::env::var_os("DECKSHIFT_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| project_root.join(".tmp").join("convert"));
        let python = std::env::var_os("DECKSHIFT_PYTHON")
            .map(PathBuf::from)
            .unwrap_or_else(|| ConverterConfig::discover_python(&project_root));

        Self {
            bind_address: env_or("DECKSHIFT_BIND", "0.0.0.0:3000"),
            project_root,
            scratch_dir,
            python,
            converter_module: env_or("DECKSHIFT_CONVERTER_MODULE", "src.main"),
            converter_timeout: Duration::from_secs(parse_env(
                "DECKSHIFT_CONVERTER_TIMEOUT_SECS",
                120,
            )),
            max_upload_size_mb: parse_env("DECKSHIFT_MAX_UPLOAD_SIZE_MB", 100),
            log_level: env_or("DECKSHIFT_LOG", "info"),
            log_json: env_flag("DECKSHIFT_LOG_JSON", false),
            cors_allowed_origins: std::env::var("DECKSHIFT_CORS_ORIGINS").ok(),
            enable_openapi: env_flag("DECKSHIFT_ENABLE_OPENAPI", true),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }

    /// Launch settings for the external converter.
    pub fn converter(&self) -> ConverterConfig {
        ConverterConfig::python(&self.python, &self.converter_module, &self.project_root)
            .with_timeout(self.converter_timeout)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn default_project_root() -> PathBuf {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| cwd.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(".."))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
