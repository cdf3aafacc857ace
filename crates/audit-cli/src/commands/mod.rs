//! Subcommand implementations.

pub mod canonicalize;
pub mod log;
pub mod root;
pub mod search;
pub mod verify;

use std::io::{self, Read};

use audit_client::{AuditClient, ClientConfig, SessionOptions};
use audit_core::StandardEvent;

use crate::ServiceArgs;

/// Reads a file, or stdin when no path is given.
pub fn read_input(input: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match input {
        Some(path) => Ok(std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path, e))?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Opens a session against the configured service.
pub fn connect(
    service: ServiceArgs,
    options: SessionOptions,
) -> Result<AuditClient<StandardEvent>, Box<dyn std::error::Error>> {
    let base_url = service
        .base_url
        .ok_or("missing service URL: pass --base-url or set AUDIT_BASE_URL")?;
    let token = service
        .token
        .ok_or("missing token: pass --token or set AUDIT_TOKEN")?;
    tracing::debug!(base_url = %base_url, "connecting to audit service");

    Ok(AuditClient::with_config(
        ClientConfig::new(base_url, token),
        options,
    )?)
}
