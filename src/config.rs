//! Configuration management for picdrop.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `PICDROP_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use picdrop::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Token(config) => println!("Issuing a token for user {}", config.user_id),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `PICDROP_HOST` - Server bind address (default: 0.0.0.0)
//! - `PICDROP_PORT` - Server port (default: 3000)
//! - `PICDROP_API_VERSION` - API version segment (default: v1)
//! - `PICDROP_UPLOAD_DIR` - Storage directory (default: uploads)
//! - `PICDROP_UPLOAD_MAX_SIZE` - Maximum upload size in bytes (default: 5242880)
//! - `PICDROP_ALLOWED_TYPES` - Comma-separated MIME allow-list
//! - `PICDROP_UPLOAD_PUBLIC_PATH` - Upload URL prefix (default: /api/{version}/uploads)
//! - `PICDROP_TOKEN_SECRET` - HMAC secret for bearer tokens (required)
//! - `PICDROP_TOKEN_TTL` - Token lifetime in seconds (default: 3600)
//! - `PICDROP_CORS_ORIGINS` - Comma-separated allowed origins (default: any)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::ingest::validation::is_media_type;
use crate::ingest::{UploadPolicy, DEFAULT_MAX_UPLOAD_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default API version segment.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Default storage directory.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Default MIME allow-list, in command-line form.
pub const DEFAULT_ALLOWED_TYPES_ARG: &str = "image/jpeg,image/png,image/gif,image/webp";

/// Default token lifetime in seconds (1 hour).
pub const DEFAULT_TOKEN_TTL: u64 = 3600;

/// Longest accepted token lifetime in seconds (one year).
pub const MAX_TOKEN_TTL: u64 = 365 * 24 * 3600;

/// Characters axum would read as route syntax in a path prefix.
const ROUTE_SYNTAX_CHARS: [char; 4] = ['{', '}', ':', '*'];

/// User id the token command issues for by default.
pub const DEFAULT_TOKEN_USER_ID: u64 = 1;

/// Role the token command issues for by default.
pub const DEFAULT_TOKEN_ROLE: &str = "user";

// =============================================================================
// CLI Arguments
// =============================================================================

/// picdrop - image upload API with stub token authentication.
#[derive(Parser, Debug, Clone)]
#[command(name = "picdrop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the parsed arguments and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Issue a bearer token offline.
    Token(TokenConfig),
}

/// Options for `picdrop serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "PICDROP_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PICDROP_PORT")]
    pub port: u16,

    /// API version segment; routes live under `/api/{version}`.
    #[arg(long, default_value = DEFAULT_API_VERSION, env = "PICDROP_API_VERSION")]
    pub api_version: String,

    // =========================================================================
    // Upload Configuration
    // =========================================================================
    /// Directory uploads are stored in. Created at startup if missing.
    #[arg(long, default_value = DEFAULT_UPLOAD_DIR, env = "PICDROP_UPLOAD_DIR")]
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, env = "PICDROP_UPLOAD_MAX_SIZE")]
    pub upload_max_size: u64,

    /// Accepted MIME types (comma-separated).
    #[arg(
        long,
        default_value = DEFAULT_ALLOWED_TYPES_ARG,
        env = "PICDROP_ALLOWED_TYPES",
        value_delimiter = ','
    )]
    pub allowed_types: Vec<String>,

    /// URL prefix uploads are accepted and served under.
    ///
    /// Defaults to `/api/{version}/uploads`.
    #[arg(long, env = "PICDROP_UPLOAD_PUBLIC_PATH")]
    pub upload_public_path: Option<String>,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 bearer tokens.
    ///
    /// The server refuses to start without one.
    #[arg(long, env = "PICDROP_TOKEN_SECRET")]
    pub token_secret: Option<String>,

    /// Lifetime of issued tokens in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL, env = "PICDROP_TOKEN_TTL")]
    pub token_ttl: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "PICDROP_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    pub log_json: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_secret_or_empty().is_empty() {
            return Err(
                "No token secret provided. Set --token-secret or PICDROP_TOKEN_SECRET".to_string(),
            );
        }

        if self.upload_max_size == 0 {
            return Err("upload_max_size must be greater than 0".to_string());
        }

        if self.allowed_types.iter().all(|t| t.trim().is_empty()) {
            return Err("allowed_types must name at least one MIME type".to_string());
        }
        if let Some(bad) = self
            .allowed_types
            .iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty() && !is_media_type(t))
        {
            return Err(format!("'{}' is not a type/subtype MIME type", bad));
        }

        if self.token_ttl == 0 || self.token_ttl > MAX_TOKEN_TTL {
            return Err(format!(
                "token_ttl must be between 1 and {} seconds",
                MAX_TOKEN_TTL
            ));
        }

        if self.api_version.is_empty()
            || self.api_version.contains('/')
            || self.api_version.contains(ROUTE_SYNTAX_CHARS)
        {
            return Err("api_version must be a single non-empty path segment".to_string());
        }

        if let Some(ref path) = self.upload_public_path {
            if !path.starts_with('/') || path.trim_end_matches('/').is_empty() {
                return Err(
                    "upload_public_path must start with '/' and name at least one segment"
                        .to_string(),
                );
            }
            if path.contains(ROUTE_SYNTAX_CHARS) {
                return Err(format!(
                    "upload_public_path must not contain any of {:?}",
                    ROUTE_SYNTAX_CHARS
                ));
            }
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `/api/{version}`
    pub fn api_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }

    /// The upload prefix, resolving the default against the API version.
    pub fn upload_public_path(&self) -> String {
        match self.upload_public_path {
            Some(ref path) => path.trim_end_matches('/').to_string(),
            None => format!("{}/uploads", self.api_prefix()),
        }
    }

    /// Get the token secret, or "" if unset (call validate() first).
    pub fn token_secret_or_empty(&self) -> &str {
        self.token_secret.as_deref().unwrap_or("")
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl)
    }

    /// Build the upload policy from the allow-list and size limit.
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(
            self.allowed_types.iter().filter(|t| !t.trim().is_empty()),
            self.upload_max_size,
        )
    }
}

/// Output format of `picdrop token`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutputFormat {
    /// The bare token
    Token,
    /// A JSON object with the token, claims and expiry
    Json,
}

/// Options for `picdrop token`.
#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Secret key the server verifies tokens with.
    #[arg(long, env = "PICDROP_TOKEN_SECRET")]
    pub secret: String,

    /// User id to embed.
    #[arg(long, default_value_t = DEFAULT_TOKEN_USER_ID)]
    pub user_id: u64,

    /// Role to embed.
    #[arg(long, default_value = DEFAULT_TOKEN_ROLE)]
    pub role: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL)]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret must not be empty".to_string());
        }
        if self.ttl == 0 || self.ttl > MAX_TOKEN_TTL {
            return Err(format!("ttl must be between 1 and {} seconds", MAX_TOKEN_TTL));
        }
        if self.role.is_empty() {
            return Err("role must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
