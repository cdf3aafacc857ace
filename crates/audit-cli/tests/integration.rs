//! Integration tests for offline CLI commands.

use std::process::{Command, Output};

use audit_canonical::{canonicalize, Hash};
use audit_core::testing::MerkleTree;
use audit_core::{Ed25519Signer, Signer, StandardEvent};
use serde_json::{json, Value};
use tempfile::TempDir;

fn auditlog(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_auditlog"))
        .args(args)
        .env_remove("AUDIT_BASE_URL")
        .env_remove("AUDIT_TOKEN")
        .output()
        .expect("failed to run auditlog")
}

fn write_json(dir: &TempDir, name: &str, value: &Value) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path.to_string_lossy().into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn tree() -> MerkleTree {
    MerkleTree::from_leaves((0..7u8).map(|i| Hash::digest(&[i])).collect())
}

#[test]
fn canonicalize_sorts_keys() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "event.json", &json!({"message": "m", "actor": "a", "status": null}));

    let output = auditlog(&["canonicalize", &input]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), r#"{"actor":"a","message":"m"}"#);
}

#[test]
fn canonicalize_hash_matches_known_digest() {
    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "envelope.json", &json!({"event": {"message": "test"}}));

    let output = auditlog(&["canonicalize", "--hash", &input]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "9c9c3b5a627cce035d517c14c10779656e900532bf6e76a5d2c69148e45fdb8d"
    );
}

#[test]
fn canonicalize_rejects_invalid_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{not json").unwrap();

    let output = auditlog(&["canonicalize", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid JSON"));
}

#[test]
fn verify_membership_reports_verdict() {
    let tree = tree();
    let root = tree.root().to_hex();
    let leaf = tree.leaf(4).to_hex();
    let proof = tree.membership_proof(4);

    let output = auditlog(&[
        "verify-membership", "--root", &root, "--leaf", &leaf, "--proof", &proof, "--strict",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "success");

    let other = tree.leaf(3).to_hex();
    let output = auditlog(&[
        "verify-membership", "--root", &root, "--leaf", &other, "--proof", &proof, "--strict",
    ]);
    assert!(!output.status.success());
    assert_eq!(stdout(&output), "failed");
}

#[test]
fn verify_consistency_accepts_repeated_items() {
    let tree = tree();
    let old_root = tree.root_at(3).to_hex();
    let new_root = tree.root().to_hex();

    let mut args = vec![
        "verify-consistency".to_string(),
        "--old-root".to_string(),
        old_root,
        "--new-root".to_string(),
        new_root,
    ];
    for item in tree.consistency_proof(3) {
        args.push("--proof".to_string());
        args.push(item);
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = auditlog(&args);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "success");
}

#[test]
fn verify_membership_rejects_bad_hex() {
    let output = auditlog(&["verify-membership", "--root", "zz", "--leaf", "00", "--proof", ""]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid root"));
}

#[test]
fn verify_envelope_checks_hash_and_signature() {
    let signer = Ed25519Signer::from_seed(&[4u8; 32]).unwrap();
    let event = StandardEvent::new("signed from the cli");
    let signature = signer.sign_base64(&canonicalize(&event).unwrap());

    let envelope = json!({
        "event": event,
        "signature": signature,
        "public_key": signer.public_key(),
        "received_at": "2024-05-06T07:08:09.000010Z",
    });
    let hash = Hash::digest(&canonicalize(&envelope).unwrap()).to_hex();

    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "envelope.json", &envelope);

    let output = auditlog(&["verify-envelope", &input, "--hash", &hash, "--json", "--strict"]);
    assert!(output.status.success());
    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["hash"], hash);
    assert_eq!(report["event_verification"], "success");
    assert_eq!(report["signature_verification"], "success");

    let output = auditlog(&["verify-envelope", &input, "--hash", "notarealhash", "--strict"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("event:     failed"));
}

#[test]
fn verify_envelope_hashes_fields_as_written() {
    let envelope = json!({
        "event": {"message": "m", "extra": "kept"},
        "received_at": "2024-05-06T07:08:09.123Z",
    });
    let hash = Hash::digest(&canonicalize(&envelope).unwrap()).to_hex();

    let dir = TempDir::new().unwrap();
    let input = write_json(&dir, "envelope.json", &envelope);

    let output = auditlog(&["verify-envelope", &input, "--hash", &hash, "--json"]);
    assert!(output.status.success());
    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["hash"], hash);
    assert_eq!(report["event_verification"], "success");
}

#[test]
fn log_requires_service_url() {
    let output = auditlog(&["log", "--message", "hello"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("AUDIT_BASE_URL"));
}
