//! Log pipeline.
//!
//! Each event is prepared (tenant, signature), submitted, and the returned
//! record is checked: hash against the canonical envelope, signature, and with
//! proof verification enabled membership in the unpublished root and
//! consistency with the previous log's root.

use audit_canonical::{canonicalize, Hash};
use audit_core::{
    public_key_envelope, verify_consistency_proof, verify_membership_proof, AuditEvent,
    EventEnvelope, Verification,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::AuditError;
use crate::session::AuditClient;

const LOG_PATH: &str = "v1/log";
const LOG_BULK_PATH: &str = "v1/log_bulk";
const LOG_BULK_ASYNC_PATH: &str = "v1/log_bulk_async";

#[derive(Serialize)]
struct PreparedEvent<E> {
    event: E,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_key: Option<String>,
}

#[derive(Serialize)]
struct LogRequest<E> {
    #[serde(flatten)]
    prepared: PreparedEvent<E>,
    verbose: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    prev_root: Option<String>,
}

#[derive(Serialize)]
struct LogBulkRequest<E> {
    events: Vec<PreparedEvent<E>>,
    verbose: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    prev_root: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogResponse {
    #[serde(default)]
    envelope: Option<Map<String, Value>>,
    hash: String,
    #[serde(default)]
    unpublished_root: Option<String>,
    #[serde(default)]
    membership_proof: Option<String>,
    #[serde(default)]
    consistency_proof: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct LogBulkResponse {
    #[serde(default)]
    results: Vec<LogResponse>,
}

/// A logged event as returned by the service, with its verdicts.
#[derive(Debug, Clone, Serialize)]
pub struct LogResult<E> {
    /// Returned envelope under the session schema (verbose responses only).
    pub envelope: Option<EventEnvelope<E>>,
    /// Returned envelope as received.
    #[serde(skip)]
    pub envelope_raw: Option<Map<String, Value>>,
    /// Hex hash of the record.
    pub hash: String,
    /// Unpublished root after the event was appended.
    pub unpublished_root: Option<String>,
    /// Membership proof of `hash` in `unpublished_root`.
    pub membership_proof: Option<String>,
    /// Consistency proof from the previous unpublished root.
    pub consistency_proof: Option<Vec<String>>,
    /// Hash check of the returned envelope.
    pub event_verification: Verification,
    /// Membership check.
    pub membership_verification: Verification,
    /// Consistency check.
    pub consistency_verification: Verification,
    /// Signature check.
    pub signature_verification: Verification,
}

impl<E: AuditEvent> AuditClient<E> {
    /// Logs one event.
    ///
    /// Fails with [`AuditError::HashMismatch`] when the returned record does
    /// not hash to the returned hash, unless event verification is skipped.
    #[instrument(skip(self, event))]
    pub async fn log(&self, event: &E, verbose: bool) -> Result<LogResult<E>, AuditError> {
        let request = LogRequest {
            prepared: self.prepare(event)?,
            verbose: verbose || self.options.verify_proofs,
            prev_root: self.prev_root(),
        };

        let (header, response): (_, LogResponse) = self.post(LOG_PATH, &request).await?;
        debug!(request_id = %header.request_id, hash = %response.hash, "event logged");
        self.process_log_response(response)
    }

    /// Logs several events in one request; results keep the input order.
    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn log_bulk(&self, events: &[E], verbose: bool) -> Result<Vec<LogResult<E>>, AuditError> {
        let request = LogBulkRequest {
            events: events
                .iter()
                .map(|event| self.prepare(event))
                .collect::<Result<_, _>>()?,
            verbose: verbose || self.options.verify_proofs,
            prev_root: self.prev_root(),
        };

        let (header, response): (_, LogBulkResponse) = self.post(LOG_BULK_PATH, &request).await?;
        debug!(request_id = %header.request_id, results = response.results.len(), "events logged");
        response
            .results
            .into_iter()
            .map(|result| self.process_log_response(result))
            .collect()
    }

    /// Queues several events and returns the request id to poll.
    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn log_bulk_async(&self, events: &[E], verbose: bool) -> Result<String, AuditError> {
        let request = LogBulkRequest {
            events: events
                .iter()
                .map(|event| self.prepare(event))
                .collect::<Result<_, _>>()?,
            verbose: verbose || self.options.verify_proofs,
            prev_root: self.prev_root(),
        };
        self.post_async(LOG_BULK_ASYNC_PATH, &request).await
    }

    fn prev_root(&self) -> Option<String> {
        if !self.options.verify_proofs {
            return None;
        }
        self.last_unpublished_root().map(|root| root.to_hex())
    }

    fn prepare(&self, event: &E) -> Result<PreparedEvent<E>, AuditError> {
        let mut event = event.clone();
        if !self.options.tenant_id.is_empty() && event.tenant_id().map_or(true, str::is_empty) {
            event.set_tenant_id(self.options.tenant_id.clone());
        }

        let Some(signer) = &self.options.signer else {
            return Ok(PreparedEvent {
                event,
                signature: None,
                public_key: None,
            });
        };

        let message = canonicalize(&event)?;
        Ok(PreparedEvent {
            signature: Some(signer.sign_base64(&message)),
            public_key: Some(public_key_envelope(
                signer.as_ref(),
                &self.options.public_key_info,
            )?),
            event,
        })
    }

    fn process_log_response(&self, response: LogResponse) -> Result<LogResult<E>, AuditError> {
        let envelope = response
            .envelope
            .as_ref()
            .map(EventEnvelope::<E>::from_raw)
            .transpose()?;

        let mut result = LogResult {
            envelope,
            envelope_raw: response.envelope,
            hash: response.hash,
            unpublished_root: response.unpublished_root,
            membership_proof: response.membership_proof,
            consistency_proof: response.consistency_proof,
            event_verification: Verification::NotVerified,
            membership_verification: Verification::NotVerified,
            consistency_verification: Verification::NotVerified,
            signature_verification: Verification::NotVerified,
        };

        if let Some(envelope_raw) = &result.envelope_raw {
            result.event_verification = self.check_event_hash(envelope_raw, &result.hash)?;
        }
        if let Some(envelope) = &result.envelope {
            result.signature_verification = envelope.verify_signature();
        }

        let unpublished_root = result
            .unpublished_root
            .as_deref()
            .and_then(|hex| match Hash::from_hex(hex) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    warn!(error = %err, "unpublished root is not a valid hash");
                    None
                }
            });

        if self.options.verify_proofs {
            if let Some(root) = &unpublished_root {
                result.membership_verification = match Hash::from_hex(&result.hash) {
                    Ok(leaf) => verify_membership_proof(root, &leaf, result.membership_proof.as_deref()),
                    Err(_) if result.membership_proof.is_some() => Verification::Failed,
                    Err(_) => Verification::NotVerified,
                };

                if let Some(previous) = self.last_unpublished_root() {
                    result.consistency_verification =
                        verify_consistency_proof(&previous, root, result.consistency_proof.as_deref());
                }
            }

            if result.membership_verification.is_failed() || result.consistency_verification.is_failed() {
                warn!(
                    hash = %result.hash,
                    membership = ?result.membership_verification,
                    consistency = ?result.consistency_verification,
                    "log proof verification failed"
                );
            }
        }

        if let Some(root) = unpublished_root {
            self.set_last_unpublished_root(root);
        }
        Ok(result)
    }
}
