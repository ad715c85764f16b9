//! Configuration module for the voice-note gateway.
//!
//! All configuration is environment-driven (a `.env` file loaded by the
//! binary is honored because `from_env` reads the process environment after
//! dotenvy has populated it). Secrets are zeroized on drop.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// API secret authentication entry with a client identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthApiSecret {
    pub id: String,
    pub secret: String,
}

/// Server configuration
///
/// Contains everything needed to run the gateway: server settings (host,
/// port, TLS), the OpenAI-compatible service endpoints, the external audio
/// tooling paths, scratch/transcode bounds, the debug-upload S3 target, and
/// security settings (auth secrets, CORS, rate limiting).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // OpenAI-compatible services
    pub openai_api_key: Option<String>,
    /// Base URL for the speech-to-text API (`{base}/audio/transcriptions`)
    pub stt_base_url: String,
    pub stt_model: String,
    /// Base URL for the chat-completion API (`{base}/chat/completions`)
    pub llm_base_url: String,
    pub llm_model: String,

    // External audio tooling
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Directory for per-request temp artifacts
    pub scratch_dir: PathBuf,
    /// Wall-clock bound on one ffmpeg invocation
    pub transcode_timeout: Duration,
    /// Maximum accepted clip length in seconds
    pub max_clip_seconds: f64,

    // Debug upload storage (disabled unless the bucket is set)
    pub debug_s3_bucket: Option<String>,
    pub debug_s3_region: Option<String>,
    pub debug_s3_endpoint: Option<String>,
    pub debug_s3_access_key: Option<String>,
    pub debug_s3_secret_key: Option<String>,
    /// Overrides the generated `https://{bucket}.s3.{region}.amazonaws.com`
    /// base when debug files are served through a CDN
    pub debug_public_url_base: Option<String>,

    // Authentication configuration
    pub auth_api_secrets: Vec<AuthApiSecret>,
    pub auth_required: bool,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: u32,
}

/// Zeroize all secret fields when the config is dropped so sensitive data is
/// cleared from memory immediately after use.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.debug_s3_access_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.debug_s3_secret_key {
            key.zeroize();
        }
        for secret in &mut self.auth_api_secrets {
            secret.secret.zeroize();
        }
    }
}

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_STT_MODEL: &str = "whisper-1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o";
const DEFAULT_TRANSCODE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_CLIP_SECONDS: f64 = 300.0;
const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

impl ServerConfig {
    /// Load configuration from environment variables, applying defaults for
    /// everything that is not set.
    pub fn from_env() -> Result<Self, String> {
        let host = env_or("HOST", "0.0.0.0");
        let port = parse_env("PORT", 8080u16)?;

        let tls = match (env_opt("TLS_CERT_PATH"), env_opt("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(
                    "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string()
                );
            }
        };

        let config = Self {
            host,
            port,
            tls,
            openai_api_key: env_opt("OPENAI_API_KEY"),
            stt_base_url: env_or("STT_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            stt_model: env_or("STT_MODEL", DEFAULT_STT_MODEL),
            llm_base_url: env_or("LLM_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            llm_model: env_or("LLM_MODEL", DEFAULT_LLM_MODEL),
            ffmpeg_path: PathBuf::from(env_or("FFMPEG_PATH", "ffmpeg")),
            ffprobe_path: PathBuf::from(env_or("FFPROBE_PATH", "ffprobe")),
            scratch_dir: env_opt("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            transcode_timeout: Duration::from_secs(parse_env(
                "TRANSCODE_TIMEOUT_SECS",
                DEFAULT_TRANSCODE_TIMEOUT_SECS,
            )?),
            max_clip_seconds: parse_env("MAX_CLIP_SECONDS", DEFAULT_MAX_CLIP_SECONDS)?,
            debug_s3_bucket: env_opt("DEBUG_S3_BUCKET"),
            debug_s3_region: env_opt("DEBUG_S3_REGION"),
            debug_s3_endpoint: env_opt("DEBUG_S3_ENDPOINT"),
            debug_s3_access_key: env_opt("DEBUG_S3_ACCESS_KEY"),
            debug_s3_secret_key: env_opt("DEBUG_S3_SECRET_KEY"),
            debug_public_url_base: env_opt("DEBUG_PUBLIC_URL_BASE"),
            auth_api_secrets: parse_auth_secrets(&env_or("AUTH_API_SECRETS", ""))?,
            auth_required: parse_env("AUTH_REQUIRED", false)?,
            cors_allowed_origins: env_opt("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second: parse_env(
                "RATE_LIMIT_REQUESTS_PER_SECOND",
                DEFAULT_RATE_LIMIT_RPS,
            )?,
            rate_limit_burst_size: parse_env("RATE_LIMIT_BURST_SIZE", DEFAULT_RATE_LIMIT_BURST)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_clip_seconds <= 0.0 {
            return Err("MAX_CLIP_SECONDS must be positive".to_string());
        }
        if self.transcode_timeout.is_zero() {
            return Err("TRANSCODE_TIMEOUT_SECS must be positive".to_string());
        }
        if self.auth_required && self.auth_api_secrets.is_empty() {
            return Err(
                "AUTH_REQUIRED=true but AUTH_API_SECRETS is empty".to_string()
            );
        }
        Ok(())
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| format!("invalid {name} value '{raw}': {e}")),
        None => Ok(default),
    }
}

/// Parse `AUTH_API_SECRETS` entries of the form `id:secret`, comma-separated.
fn parse_auth_secrets(raw: &str) -> Result<Vec<AuthApiSecret>, String> {
    let mut secrets = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, secret) = entry
            .split_once(':')
            .ok_or_else(|| format!("invalid AUTH_API_SECRETS entry '{entry}', expected id:secret"))?;
        if id.is_empty() || secret.is_empty() {
            return Err(format!(
                "invalid AUTH_API_SECRETS entry '{entry}', expected id:secret"
            ));
        }
        secrets.push(AuthApiSecret {
            id: id.to_string(),
            secret: secret.to_string(),
        });
    }
    Ok(secrets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_auth_secrets_multiple_entries() {
        let secrets = parse_auth_secrets("app:s3cret, admin:topsecret").unwrap();
        assert_eq!(secrets.len(), 2);
        assert_eq!(secrets[0].id, "app");
        assert_eq!(secrets[0].secret, "s3cret");
        assert_eq!(secrets[1].id, "admin");
    }

    #[test]
    fn test_parse_auth_secrets_rejects_malformed_entry() {
        assert!(parse_auth_secrets("no-colon-here").is_err());
        assert!(parse_auth_secrets(":empty-id").is_err());
    }

    #[test]
    fn test_parse_auth_secrets_empty_is_ok() {
        assert!(parse_auth_secrets("").unwrap().is_empty());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        for name in [
            "HOST",
            "PORT",
            "AUTH_REQUIRED",
            "AUTH_API_SECRETS",
            "MAX_CLIP_SECONDS",
            "TRANSCODE_TIMEOUT_SECS",
        ] {
            unsafe { env::remove_var(name) };
        }
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_clip_seconds, 300.0);
        assert_eq!(config.transcode_timeout, Duration::from_secs(60));
        assert!(!config.auth_required);
        assert_eq!(config.stt_model, "whisper-1");
        assert_eq!(config.llm_model, "gpt-4o");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_auth_required_without_secrets() {
        unsafe {
            env::set_var("AUTH_REQUIRED", "true");
            env::remove_var("AUTH_API_SECRETS");
        }
        let result = ServerConfig::from_env();
        unsafe { env::remove_var("AUTH_REQUIRED") };
        assert!(result.is_err());
    }
}
