//! Canonicalize command implementation.

use audit_canonical::{canonicalize_value, Hash};
use serde_json::Value;

use super::read_input;

pub fn run(input: Option<String>, hash: bool) -> Result<(), Box<dyn std::error::Error>> {
    let json_str = read_input(input)?;

    let value: Value = serde_json::from_str(&json_str)
        .map_err(|e| format!("Invalid JSON: {}", e))?;

    let bytes = canonicalize_value(&value)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    if hash {
        println!("{}", Hash::digest(&bytes));
    } else {
        println!("{}", String::from_utf8_lossy(&bytes));
    }
    Ok(())
}
