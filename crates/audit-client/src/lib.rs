//! Client for the secure audit log service.
//!
//! This crate provides:
//! - [`AuditClient`], a session that logs and searches events and verifies
//!   every returned record (hash, signature, membership, consistency)
//! - The [`Transport`] seam with a `reqwest`-backed [`HttpTransport`]
//! - [`RootsProvider`] sources of published roots with a monotone cache
//!
//! A session with proof verification enabled tracks the last unpublished root
//! it saw and sends it as `prev_root` on the next log, so it must be driven by
//! one logical caller at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audit_client::{AuditClient, ClientConfig, SessionOptions};
//! use audit_core::StandardEvent;
//!
//! # async fn run() -> Result<(), audit_client::AuditError> {
//! let config = ClientConfig::new("https://audit.example.com", "token");
//! let client: AuditClient<StandardEvent> =
//!     AuditClient::with_config(config, SessionOptions::default().verify_proofs(true))?;
//!
//! let result = client.log(&StandardEvent::new("user logged in"), false).await?;
//! println!("membership: {:?}", result.membership_verification);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Client configuration.
pub mod config;
/// Error types for client operations.
pub mod error;
/// Log pipeline.
pub mod log;
/// Service response envelope decoding.
pub mod response;
/// Published root sources.
pub mod roots;
/// Search pipeline.
pub mod search;
/// Session state and construction.
pub mod session;
/// Transport seam and HTTP implementation.
pub mod transport;

pub use config::ClientConfig;
pub use error::{AuditError, TransportError};
pub use log::LogResult;
pub use response::{FieldError, ResponseHeader};
pub use roots::{ArweaveRootsProvider, MemoryRootsProvider, Root, RootsProvider};
pub use search::{SearchEvent, SearchInput, SearchOrder, SearchOutput};
pub use session::{AuditClient, SessionOptions};
pub use transport::{HttpTransport, RawResponse, Transport};
