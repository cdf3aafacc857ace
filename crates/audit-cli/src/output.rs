//! Output formatting utilities.

use audit_client::SearchEvent;
use audit_core::{StandardEvent, Verification};
use serde_json::Value;

/// Formats a value as pretty JSON.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Short name of a verdict.
pub fn verdict_label(verdict: Verification) -> &'static str {
    match verdict {
        Verification::NotVerified => "not_verified",
        Verification::Success => "success",
        Verification::Failed => "failed",
    }
}

/// Formats a search hit as a table row.
pub fn format_table_row(event: &SearchEvent<StandardEvent>) -> String {
    let received_at = event
        .envelope
        .received_at
        .map(|t| t.to_canonical_string())
        .unwrap_or_else(|| "?".to_string());
    let actor = event.envelope.event.actor.as_deref().unwrap_or("-");

    format!(
        "{:<27} {:<16} {:<12} {:<12} {}",
        received_at,
        truncate(actor, 16),
        verdict_label(event.membership_verification),
        verdict_label(event.signature_verification),
        truncate(&event.envelope.event.message, 60)
    )
}

/// Prints table header.
#[allow(clippy::print_literal)]
pub fn print_table_header() {
    println!(
        "{:<27} {:<16} {:<12} {:<12} {}",
        "RECEIVED_AT", "ACTOR", "MEMBERSHIP", "SIGNATURE", "MESSAGE"
    );
    println!("{}", "-".repeat(100));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
