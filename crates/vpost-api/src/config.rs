//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use vpost_runner::WorkerConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size (bounds uploads)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// SQLite URL for the job store
    pub database_url: String,
    /// Allow-listed upload file extensions (lowercase, no dot)
    pub allowed_upload_extensions: Vec<String>,
    /// Allow-listed upload media types
    pub allowed_upload_types: Vec<String>,
    /// Default model selector passed to the worker
    pub default_model: String,
    /// Directory where uploads are staged before processing
    pub staging_dir: PathBuf,
    /// Worker program (interpreter or binary)
    pub worker_program: String,
    /// Worker script path, prepended to the positional arguments
    pub worker_script: Option<String>,
    /// Wall-clock timeout for one worker invocation
    pub process_timeout: Duration,
    /// Directory where the worker writes generated files
    pub generated_dir: PathBuf,
    /// Interval between timeout reaper sweeps
    pub reaper_interval: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 50 * 1024 * 1024, // 50MB
            environment: "development".to_string(),
            database_url: "sqlite://vpost.db".to_string(),
            allowed_upload_extensions: vec!["pdf".to_string()],
            allowed_upload_types: vec!["application/pdf".to_string()],
            default_model: "phi".to_string(),
            staging_dir: PathBuf::from("tmp/staging"),
            worker_program: "python3".to_string(),
            worker_script: Some("scripts/main.py".to_string()),
            process_timeout: Duration::from_secs(30 * 60),
            generated_dir: PathBuf::from("public/generated"),
            reaper_interval: Duration::from_secs(60),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            allowed_upload_extensions: std::env::var("UPLOAD_ALLOWED_EXTENSIONS")
                .map(|s| {
                    s.split(',')
                        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                        .collect()
                })
                .unwrap_or(defaults.allowed_upload_extensions),
            allowed_upload_types: std::env::var("UPLOAD_ALLOWED_TYPES")
                .map(|s| s.split(',').map(|t| t.trim().to_lowercase()).collect())
                .unwrap_or(defaults.allowed_upload_types),
            default_model: std::env::var("DEFAULT_MODEL").unwrap_or(defaults.default_model),
            staging_dir: std::env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            worker_program: std::env::var("WORKER_PROGRAM").unwrap_or(defaults.worker_program),
            worker_script: std::env::var("WORKER_SCRIPT")
                .map(Some)
                .unwrap_or(defaults.worker_script),
            process_timeout: Duration::from_secs(
                std::env::var("PROCESS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.process_timeout.as_secs()),
            ),
            generated_dir: std::env::var("GENERATED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.generated_dir),
            reaper_interval: Duration::from_secs(
                std::env::var("REAPER_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.reaper_interval.as_secs()),
            ),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// The worker configuration derived from this config.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            program: self.worker_program.clone(),
            args: self.worker_script.iter().cloned().collect(),
            timeout: self.process_timeout,
            generated_dir: self.generated_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.process_timeout, Duration::from_secs(1800));
        assert_eq!(config.allowed_upload_extensions, vec!["pdf"]);
        assert!(!config.is_production());
    }

    #[test]
    fn test_worker_config_derivation() {
        let config = ApiConfig::default();
        let worker = config.worker_config();
        assert_eq!(worker.program, "python3");
        assert_eq!(worker.args, vec!["scripts/main.py"]);
        assert_eq!(worker.timeout, config.process_timeout);
    }
}
