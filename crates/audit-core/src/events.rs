use audit_canonical::{canonicalize, hash_canonical, CanonicalizationError, Hash, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::signature::verify_signature;
use crate::verification::Verification;

/// Schema of the events a session logs and searches.
///
/// The schema is a type parameter of the session: envelopes returned by the
/// service are re-decoded into it for signature checks, and its `Serialize`
/// impl decides the wire names of logged events. Fields that serialize as
/// `None`/`null` are treated as absent.
pub trait AuditEvent: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Tenant carried by the event, if the schema has one.
    fn tenant_id(&self) -> Option<&str> {
        None
    }

    /// Attaches a tenant. Schemas without a tenant field ignore this.
    fn set_tenant_id(&mut self, _tenant_id: String) {}
}

/// The service's default event schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardEvent {
    /// Free-form description of what happened.
    #[serde(default)]
    pub message: String,
    /// Who performed the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// What was done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Value after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,
    /// Value before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,
    /// Where the action originated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Outcome reported by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// What the action was performed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// When the action happened, as reported by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    /// Tenant the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl StandardEvent {
    /// Creates an event with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl AuditEvent for StandardEvent {
    fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    fn set_tenant_id(&mut self, tenant_id: String) {
        self.tenant_id = Some(tenant_id);
    }
}

/// Server-side record wrapping an event with receipt metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    /// The logged event.
    pub event: E,
    /// Base64 ed25519 signature over the canonical event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Signer's public key: bare base64, PEM, or a JSON key envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// When the service received the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<Timestamp>,
}

impl<E: AuditEvent> EventEnvelope<E> {
    /// Re-decodes a free-form envelope map under the schema `E`.
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(raw.clone()))
    }

    /// Verifies the envelope's signature over the canonical event.
    ///
    /// Only the event is signed; receipt time and signature material are not.
    pub fn verify_signature(&self) -> Verification {
        match (&self.signature, &self.public_key) {
            (None, None) => Verification::NotVerified,
            _ => match canonicalize(&self.event) {
                Ok(message) => verify_signature(
                    &message,
                    self.signature.as_deref(),
                    self.public_key.as_deref(),
                ),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to canonicalize event for signature check");
                    Verification::Failed
                }
            },
        }
    }
}

/// SHA-256 of the canonical encoding of an envelope exactly as received.
///
/// The raw map is hashed rather than the schema-typed envelope, so fields the
/// schema does not declare and the service's own timestamp text are covered.
pub fn envelope_hash(raw: &Map<String, Value>) -> Result<Hash, CanonicalizationError> {
    hash_canonical(&Value::Object(raw.clone()))
}

/// Checks `claimed` (hex) against [`envelope_hash`] of `raw`.
///
/// Returns the verdict together with the computed hex digest so callers
/// can report both sides of a mismatch.
pub fn verify_envelope_hash(
    raw: &Map<String, Value>,
    claimed: &str,
) -> Result<(Verification, String), CanonicalizationError> {
    let computed = envelope_hash(raw)?.to_hex();
    let verdict = Verification::from_outcome(computed == claimed);
    Ok((verdict, computed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn standard_event_omits_absent_fields() {
        let mut event = StandardEvent::new("m");
        event.actor = Some("a".into());
        event.status = Some(String::new());

        assert_eq!(
            canonicalize(&event).unwrap(),
            br#"{"actor":"a","message":"m","status":""}"#.to_vec()
        );
    }

    #[test]
    fn verifies_hash_of_raw_envelope() {
        let raw = json!({"event": {"message": "test"}});

        let (verdict, computed) = verify_envelope_hash(
            raw.as_object().unwrap(),
            "9c9c3b5a627cce035d517c14c10779656e900532bf6e76a5d2c69148e45fdb8d",
        )
        .unwrap();
        assert_eq!(verdict, Verification::Success);
        assert_eq!(
            computed,
            "9c9c3b5a627cce035d517c14c10779656e900532bf6e76a5d2c69148e45fdb8d"
        );

        let (verdict, _) = verify_envelope_hash(raw.as_object().unwrap(), "notarealhash").unwrap();
        assert_eq!(verdict, Verification::Failed);
    }

    #[test]
    fn raw_hash_covers_undeclared_fields_and_timestamp_text() {
        let raw = json!({
            "event": {"message": "m", "extra": "x"},
            "received_at": "2024-03-04T05:06:07.123Z"
        });
        let expected = hash_canonical(&raw).unwrap();
        assert_eq!(envelope_hash(raw.as_object().unwrap()).unwrap(), expected);

        let typed = EventEnvelope::<StandardEvent>::from_raw(raw.as_object().unwrap()).unwrap();
        assert_ne!(hash_canonical(&typed).unwrap(), expected);
    }

    #[test]
    fn received_at_accepts_both_layouts() {
        let with_z = json!({"event": {"message": "x"}, "received_at": "2023-01-02T03:04:05.123456Z"});
        let without_z = json!({"event": {"message": "x"}, "received_at": "2023-01-02T03:04:05.123456"});

        let a = EventEnvelope::<StandardEvent>::from_raw(with_z.as_object().unwrap()).unwrap();
        let b = EventEnvelope::<StandardEvent>::from_raw(without_z.as_object().unwrap()).unwrap();
        assert_eq!(a.received_at, b.received_at);
        assert!(a.received_at.is_some());
    }

    #[test]
    fn standard_event_without_message_still_reifies() {
        let raw = json!({"event": {"actor": "a"}});
        let envelope = EventEnvelope::<StandardEvent>::from_raw(raw.as_object().unwrap()).unwrap();
        assert_eq!(envelope.event.actor.as_deref(), Some("a"));
        assert!(envelope.event.message.is_empty());
    }

    #[test]
    fn unsigned_envelope_is_not_verified() {
        let envelope = EventEnvelope {
            event: StandardEvent::new("m"),
            signature: None,
            public_key: None,
            received_at: None,
        };
        assert_eq!(envelope.verify_signature(), Verification::NotVerified);
    }

    #[test]
    fn bogus_public_key_fails_signature() {
        let envelope = EventEnvelope {
            event: StandardEvent::new("m"),
            signature: Some("c2lnbmF0dXJl".into()),
            public_key: Some("notarealpublickey".into()),
            received_at: None,
        };
        assert_eq!(envelope.verify_signature(), Verification::Failed);
    }
}
