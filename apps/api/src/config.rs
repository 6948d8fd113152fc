use anyhow::{Context, Result};

use crate::media::cloudinary::SignatureAlgorithm;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_CLIPDROP_BASE_URL: &str = "https://clipdrop-api.co";
const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com";
const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where the per-user free usage counter lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaBackend {
    /// `usage_counters` table, updated with atomic upserts.
    Postgres,
    /// Private metadata on the identity provider's user record.
    Identity,
}

impl std::str::FromStr for QuotaBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(QuotaBackend::Postgres),
            "identity" | "clerk" => Ok(QuotaBackend::Identity),
            other => anyhow::bail!("Unknown QUOTA_BACKEND '{other}' (expected 'postgres' or 'identity')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub clipdrop_api_key: String,
    pub clipdrop_base_url: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
    pub cloudinary_base_url: String,
    pub cloudinary_signature_algorithm: SignatureAlgorithm,
    pub clerk_secret_key: String,
    pub clerk_api_url: String,
    /// PEM-encoded public key used to verify session tokens without a network call.
    pub clerk_jwt_key: String,
    pub clerk_authorized_parties: Vec<String>,
    pub quota_backend: QuotaBackend,
    /// Unset means free users are never blocked.
    pub free_usage_limit: Option<u32>,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            clipdrop_api_key: require_env("CLIPDROP_API_KEY")?,
            clipdrop_base_url: env_or("CLIPDROP_BASE_URL", DEFAULT_CLIPDROP_BASE_URL),
            cloudinary_cloud_name: require_env("CLOUDINARY_CLOUD_NAME")?,
            cloudinary_api_key: require_env("CLOUDINARY_API_KEY")?,
            cloudinary_api_secret: require_env("CLOUDINARY_API_SECRET")?,
            cloudinary_base_url: env_or("CLOUDINARY_BASE_URL", DEFAULT_CLOUDINARY_BASE_URL),
            cloudinary_signature_algorithm: env_or("CLOUDINARY_SIGNATURE_ALGORITHM", "sha1")
                .parse()?,
            clerk_secret_key: require_env("CLERK_SECRET_KEY")?,
            clerk_api_url: env_or("CLERK_API_URL", DEFAULT_CLERK_API_URL),
            // .env files usually carry the PEM on one line with literal "\n"
            clerk_jwt_key: require_env("CLERK_JWT_KEY")?.replace("\\n", "\n"),
            clerk_authorized_parties: parse_list(
                &std::env::var("CLERK_AUTHORIZED_PARTIES").unwrap_or_default(),
            ),
            quota_backend: env_or("QUOTA_BACKEND", "postgres").parse()?,
            free_usage_limit: std::env::var("FREE_USAGE_LIMIT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().parse::<u32>())
                .transpose()
                .context("FREE_USAGE_LIMIT must be a non-negative integer")?,
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a byte count")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
