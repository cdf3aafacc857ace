//! Log command implementation.

use std::sync::Arc;

use audit_client::SessionOptions;
use audit_core::{Ed25519Signer, StandardEvent};
use clap::Args;
use serde_json::json;

use super::connect;
use crate::output::{format_json, verdict_label};
use crate::ServiceArgs;

/// Event fields.
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Event message
    #[arg(long)]
    pub message: String,
    /// Who performed the action
    #[arg(long)]
    pub actor: Option<String>,
    /// What was done
    #[arg(long)]
    pub action: Option<String>,
    /// Outcome
    #[arg(long)]
    pub status: Option<String>,
    /// What the action was performed on
    #[arg(long)]
    pub target: Option<String>,
    /// Where the action originated
    #[arg(long)]
    pub source: Option<String>,
    /// Value before the change
    #[arg(long)]
    pub old: Option<String>,
    /// Value after the change
    #[arg(long)]
    pub new: Option<String>,
}

impl From<EventArgs> for StandardEvent {
    fn from(args: EventArgs) -> Self {
        StandardEvent {
            actor: args.actor,
            action: args.action,
            status: args.status,
            target: args.target,
            source: args.source,
            old: args.old,
            new: args.new,
            ..StandardEvent::new(args.message)
        }
    }
}

pub async fn run(
    service: ServiceArgs,
    event: EventArgs,
    key: Option<String>,
    tenant: Option<String>,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = SessionOptions::default().verify_proofs(verify);
    if let Some(path) = key {
        let signer = Ed25519Signer::from_pem_file(&path)
            .map_err(|e| format!("Failed to load signing key {}: {}", path, e))?;
        options = options.signer(Arc::new(signer));
    }
    if let Some(tenant) = tenant {
        options = options.tenant_id(tenant);
    }

    let client = connect(service, options)?;
    let result = client.log(&StandardEvent::from(event), true).await?;

    let report = json!({
        "hash": result.hash,
        "unpublished_root": result.unpublished_root,
        "event_verification": verdict_label(result.event_verification),
        "membership_verification": verdict_label(result.membership_verification),
        "consistency_verification": verdict_label(result.consistency_verification),
        "signature_verification": verdict_label(result.signature_verification),
    });
    println!("{}", format_json(&report));
    Ok(())
}
