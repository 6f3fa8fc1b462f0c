//! Runtime configuration: command-line flags with environment fallbacks.

use crate::error::AppError;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// reviewer-assigner: assigns pull request reviewers within teams
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "reviewer-assigner", version, about)]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Per-request timeout in seconds
    #[arg(long = "timeout-secs", env = "SERVER_TIMEOUT_SECS", default_value_t = 5)]
    pub timeout_secs: u64,

    /// SQLite database file
    #[arg(long = "database-path", env = "DATABASE_PATH", default_value = "reviewer-assigner.db")]
    pub database_path: PathBuf,

    /// Seed for reviewer selection; random when unset
    #[arg(long = "reviewer-seed", env = "REVIEWER_SEED")]
    pub reviewer_seed: Option<u64>,
}

impl Config {
    /// Reject values that parse but cannot run a server.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.host.trim().is_empty() {
            return Err(AppError::invalid_input_field("host must not be empty", "host"));
        }
        if self.port == 0 {
            return Err(AppError::invalid_input_field("port must be non-zero", "port"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::invalid_input_field(
                "timeout must be at least one second",
                "timeout_secs",
            ));
        }
        Ok(())
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| AppError::invalid_input_field(format!("invalid host: {}", self.host), "host"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
