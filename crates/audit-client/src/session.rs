use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use audit_canonical::Hash;
use audit_core::{verify_envelope_hash, AuditEvent, Signer, StandardEvent, Verification};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{ClientConfig, DEFAULT_ARWEAVE_URL};
use crate::error::AuditError;
use crate::response::{decode_envelope, decode_result, ResponseHeader};
use crate::roots::{ArweaveRootsProvider, RootsProvider};
use crate::transport::{HttpTransport, Transport};

/// Per-session verification and signing options.
#[derive(Clone)]
pub struct SessionOptions {
    pub(crate) verify_proofs: bool,
    pub(crate) skip_event_verification: bool,
    pub(crate) signer: Option<Arc<dyn Signer>>,
    pub(crate) public_key_info: BTreeMap<String, String>,
    pub(crate) tenant_id: String,
    pub(crate) roots_provider: Option<Arc<dyn RootsProvider>>,
    pub(crate) arweave_base_url: String,
    pub(crate) http_timeout: Duration,
    pub(crate) user_agent: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        let http = ClientConfig::default();
        Self {
            verify_proofs: false,
            skip_event_verification: false,
            signer: None,
            public_key_info: BTreeMap::new(),
            tenant_id: String::new(),
            roots_provider: None,
            arweave_base_url: DEFAULT_ARWEAVE_URL.to_string(),
            http_timeout: http.timeout,
            user_agent: http.user_agent,
        }
    }
}

impl SessionOptions {
    /// Verify membership and consistency proofs on every result.
    ///
    /// Also forces verbose log responses and sends `prev_root` with each log.
    pub fn verify_proofs(mut self, enabled: bool) -> Self {
        self.verify_proofs = enabled;
        self
    }

    /// Report hash mismatches as `Failed` verdicts instead of errors.
    pub fn skip_event_verification(mut self, skip: bool) -> Self {
        self.skip_event_verification = skip;
        self
    }

    /// Sign every logged event with `signer`.
    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Extra entries for the public key envelope sent with signed events.
    pub fn public_key_info(mut self, info: BTreeMap<String, String>) -> Self {
        self.public_key_info = info;
        self
    }

    /// Tenant attached to events that carry none.
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Source of published roots; an Arweave provider is built on demand otherwise.
    pub fn roots_provider(mut self, provider: Arc<dyn RootsProvider>) -> Self {
        self.roots_provider = Some(provider);
        self
    }

    /// Gateway used by the on-demand Arweave provider.
    pub fn arweave_base_url(mut self, url: impl Into<String>) -> Self {
        self.arweave_base_url = url.into();
        self
    }

    /// Request timeout for the on-demand Arweave provider.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// User agent for the on-demand Arweave provider.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("verify_proofs", &self.verify_proofs)
            .field("skip_event_verification", &self.skip_event_verification)
            .field("signer", &self.signer.as_ref().map(|s| s.algorithm().to_string()))
            .field("public_key_info", &self.public_key_info)
            .field("tenant_id", &self.tenant_id)
            .field("roots_provider", &self.roots_provider.is_some())
            .field("arweave_base_url", &self.arweave_base_url)
            .field("http_timeout", &self.http_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// A session against the audit log service for events of schema `E`.
///
/// With proof verification enabled the session remembers the last unpublished
/// root it received and chains it into the next log, so it must be used by
/// one logical caller at a time. Without proof verification concurrent calls
/// are fine.
pub struct AuditClient<E = StandardEvent> {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) options: SessionOptions,
    last_unpublished_root: Mutex<Option<Hash>>,
    roots_provider: OnceLock<Arc<dyn RootsProvider>>,
    _schema: PhantomData<fn() -> E>,
}

impl<E: AuditEvent> AuditClient<E> {
    /// Session over an existing transport.
    pub fn new(transport: Arc<dyn Transport>, options: SessionOptions) -> Self {
        let roots_provider = OnceLock::new();
        if let Some(provider) = &options.roots_provider {
            let _ = roots_provider.set(Arc::clone(provider));
        }
        Self {
            transport,
            options,
            last_unpublished_root: Mutex::new(None),
            roots_provider,
            _schema: PhantomData,
        }
    }

    /// Session over an [`HttpTransport`] built from `config`.
    ///
    /// The on-demand Arweave provider inherits the config's timeout and user agent.
    pub fn with_config(config: ClientConfig, options: SessionOptions) -> Result<Self, AuditError> {
        let options = options
            .http_timeout(config.timeout)
            .user_agent(config.user_agent.clone());
        Ok(Self::new(Arc::new(HttpTransport::new(config)?), options))
    }

    /// Options the session was built with.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The unpublished root returned by the most recent log, if any.
    pub fn last_unpublished_root(&self) -> Option<Hash> {
        *self
            .last_unpublished_root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_last_unpublished_root(&self, root: Hash) {
        *self
            .last_unpublished_root
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(root);
    }

    /// Provider for published roots, built for `tree_name` on first use.
    pub(crate) fn roots_provider(&self, tree_name: &str) -> Result<Arc<dyn RootsProvider>, AuditError> {
        if let Some(provider) = self.roots_provider.get() {
            return Ok(Arc::clone(provider));
        }
        debug!(tree_name, "creating published roots provider");
        let provider: Arc<dyn RootsProvider> = Arc::new(ArweaveRootsProvider::new(
            tree_name,
            self.options.arweave_base_url.clone(),
            self.options.http_timeout,
            self.options.user_agent.clone(),
        )?);
        Ok(Arc::clone(self.roots_provider.get_or_init(|| provider)))
    }

    /// POSTs `body` to `path`, polling once if the service queues the request.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<(ResponseHeader, T), AuditError> {
        let mut raw = self
            .transport
            .post_json(path, serde_json::to_value(body)?)
            .await?;

        if raw.is_accepted() {
            if let Some(request_id) = raw.request_id().map(str::to_owned) {
                debug!(path, request_id = %request_id, "request accepted, polling for result");
                raw = self.transport.poll_by_id(&request_id).await?;
            }
        }
        decode_result(raw)
    }

    /// POSTs `body` to `path` and returns the request id without waiting.
    pub(crate) async fn post_async(&self, path: &str, body: &impl Serialize) -> Result<String, AuditError> {
        let raw = self
            .transport
            .post_json(path, serde_json::to_value(body)?)
            .await?;
        match decode_envelope(raw) {
            Err(AuditError::AcceptedPending { request_id }) => Ok(request_id),
            Ok((header, _)) => Ok(header.request_id),
            Err(err) => Err(err),
        }
    }

    /// Hash check shared by the log and search pipelines.
    ///
    /// A mismatch is an error unless event verification is skipped, in which
    /// case it becomes a `Failed` verdict.
    pub(crate) fn check_event_hash(
        &self,
        envelope_raw: &Map<String, Value>,
        returned: &str,
    ) -> Result<Verification, AuditError> {
        let (verdict, computed) = verify_envelope_hash(envelope_raw, returned)?;
        if verdict.is_failed() {
            if !self.options.skip_event_verification {
                return Err(AuditError::HashMismatch {
                    computed,
                    returned: returned.to_string(),
                });
            }
            warn!(hash = returned, computed = %computed, "event hash mismatch");
        }
        Ok(verdict)
    }
}

impl<E> fmt::Debug for AuditClient<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditClient")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
