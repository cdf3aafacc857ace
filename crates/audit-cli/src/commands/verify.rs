//! Offline proof and envelope verification.

use audit_canonical::Hash;
use audit_core::{
    envelope_hash, verify_consistency_proof, verify_membership_proof, EventEnvelope, StandardEvent,
    Verification,
};
use serde_json::{json, Value};

use super::read_input;
use crate::output::{format_json, verdict_label};

fn parse_hash(field: &str, value: &str) -> Result<Hash, Box<dyn std::error::Error>> {
    Ok(Hash::from_hex(value).map_err(|e| format!("Invalid {}: {}", field, e))?)
}

fn finish(verdict: Verification, strict: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", verdict_label(verdict));
    if strict && !verdict.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

pub fn membership(
    root: &str,
    leaf: &str,
    proof: &str,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = parse_hash("root", root)?;
    let leaf = parse_hash("leaf", leaf)?;
    finish(verify_membership_proof(&root, &leaf, Some(proof)), strict)
}

pub fn consistency(
    old_root: &str,
    new_root: &str,
    proof: &[String],
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let old_root = parse_hash("old root", old_root)?;
    let new_root = parse_hash("new root", new_root)?;
    finish(verify_consistency_proof(&old_root, &new_root, Some(proof)), strict)
}

pub fn envelope(
    input: Option<String>,
    hash: Option<String>,
    json_output: bool,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let value: Value = serde_json::from_str(&read_input(input)?)
        .map_err(|e| format!("Invalid JSON: {}", e))?;
    let raw = value.as_object().ok_or("Envelope must be a JSON object")?;
    let envelope = EventEnvelope::<StandardEvent>::from_raw(raw)
        .map_err(|e| format!("Invalid envelope: {}", e))?;

    let computed = envelope_hash(raw)?.to_hex();
    let hash_verdict = match &hash {
        Some(claimed) => Verification::from_outcome(*claimed == computed),
        None => Verification::NotVerified,
    };
    let signature_verdict = envelope.verify_signature();

    if json_output {
        let report = json!({
            "hash": computed,
            "event_verification": hash_verdict,
            "signature_verification": signature_verdict,
        });
        println!("{}", format_json(&report));
    } else {
        println!("hash:      {}", computed);
        println!("event:     {}", verdict_label(hash_verdict));
        println!("signature: {}", verdict_label(signature_verdict));
    }

    if strict && (hash_verdict.is_failed() || signature_verdict.is_failed()) {
        std::process::exit(1);
    }
    Ok(())
}
