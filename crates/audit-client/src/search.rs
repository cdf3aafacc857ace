//! Search pipeline.
//!
//! Every returned event is re-decoded under the session schema and checked
//! like a logged one. With proof verification enabled, published events are
//! checked against roots from the session's [`RootsProvider`] and unpublished
//! ones against the unpublished root in the response.
//!
//! [`RootsProvider`]: crate::roots::RootsProvider

use std::collections::{BTreeMap, BTreeSet};

use audit_canonical::Hash;
use audit_core::{
    verify_consistency_proof, verify_membership_proof, AuditEvent, EventEnvelope, Verification,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::AuditError;
use crate::roots::Root;
use crate::session::AuditClient;

const SEARCH_PATH: &str = "v1/search";
const RESULTS_PATH: &str = "v1/results";
const ROOT_PATH: &str = "v1/root";

/// Sort direction for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    Desc,
}

/// Search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchInput {
    /// Query string, e.g. `actor:alice status:success`.
    pub query: String,
    /// Sort direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SearchOrder>,
    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Lower time bound: a timestamp or a relative span such as `7d`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Upper time bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Events per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Total events the search may return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    /// Return proof material with each event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    /// Field values the results are restricted to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_restriction: Option<BTreeMap<String, Vec<String>>>,
}

impl SearchInput {
    /// Search for `query` with service defaults for everything else.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

#[derive(Serialize)]
struct ResultsRequest<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
}

#[derive(Serialize)]
struct RootRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    tree_size: Option<u64>,
}

#[derive(Deserialize)]
struct RootResponse {
    data: Root,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    count: u64,
    #[serde(default)]
    events: Vec<RawSearchEvent>,
    #[serde(default)]
    root: Option<Root>,
    #[serde(default)]
    unpublished_root: Option<Root>,
}

#[derive(Debug, Deserialize)]
struct RawSearchEvent {
    envelope: Map<String, Value>,
    hash: String,
    #[serde(default)]
    leaf_index: Option<i64>,
    #[serde(default)]
    membership_proof: Option<String>,
    #[serde(default)]
    published: Option<bool>,
}

/// One search hit with its verdicts.
#[derive(Debug, Clone, Serialize)]
pub struct SearchEvent<E> {
    /// Envelope under the session schema.
    pub envelope: EventEnvelope<E>,
    /// Envelope as received.
    #[serde(skip)]
    pub envelope_raw: Map<String, Value>,
    /// Hex hash of the record.
    pub hash: String,
    /// Zero-based position of the record in the tree.
    pub leaf_index: Option<i64>,
    /// Membership proof of `hash`.
    pub membership_proof: Option<String>,
    /// Whether the proof is against a published root.
    pub published: Option<bool>,
    /// Hash check of the envelope.
    pub event_verification: Verification,
    /// Membership check.
    pub membership_verification: Verification,
    /// Consistency check between the published roots around this record.
    pub consistency_verification: Verification,
    /// Signature check.
    pub signature_verification: Verification,
}

/// A page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutput<E> {
    /// Pagination id for [`AuditClient::search_results`].
    pub id: String,
    /// When the pagination id expires.
    pub expires_at: Option<String>,
    /// Total matching events.
    pub count: u64,
    /// Events on this page.
    pub events: Vec<SearchEvent<E>>,
    /// Latest published root.
    pub root: Option<Root>,
    /// Current unpublished root.
    pub unpublished_root: Option<Root>,
}

impl<E: AuditEvent> AuditClient<E> {
    /// Runs a search and verifies every returned event.
    #[instrument(skip(self, input), fields(query = %input.query))]
    pub async fn search(&self, input: &SearchInput) -> Result<SearchOutput<E>, AuditError> {
        let (header, response): (_, SearchResponse) = self.post(SEARCH_PATH, input).await?;
        debug!(request_id = %header.request_id, count = response.count, "search returned");
        self.process_search_response(response).await
    }

    /// Fetches another page of an earlier search.
    #[instrument(skip(self))]
    pub async fn search_results(
        &self,
        id: &str,
        limit: Option<u32>,
        offset: Option<u64>,
    ) -> Result<SearchOutput<E>, AuditError> {
        let request = ResultsRequest { id, limit, offset };
        let (_, response): (_, SearchResponse) = self.post(RESULTS_PATH, &request).await?;
        self.process_search_response(response).await
    }

    /// Runs a search and pages through every result.
    ///
    /// Stops once `count` events are collected or a page comes back empty.
    #[instrument(skip(self, input), fields(query = %input.query))]
    pub async fn search_all(&self, input: &SearchInput) -> Result<SearchOutput<E>, AuditError> {
        let mut output = self.search(input).await?;

        while (output.events.len() as u64) < output.count {
            let offset = output.events.len() as u64;
            let page = self.search_results(&output.id, input.limit, Some(offset)).await?;
            if page.events.is_empty() {
                debug!(offset, count = output.count, "empty page before count reached");
                break;
            }
            output.events.extend(page.events);
        }
        Ok(output)
    }

    /// Current published root, or the root at `tree_size`.
    #[instrument(skip(self))]
    pub async fn root(&self, tree_size: Option<u64>) -> Result<Root, AuditError> {
        let (_, response): (_, RootResponse) = self.post(ROOT_PATH, &RootRequest { tree_size }).await?;
        Ok(response.data)
    }

    async fn process_search_response(&self, response: SearchResponse) -> Result<SearchOutput<E>, AuditError> {
        let mut events = Vec::with_capacity(response.events.len());
        for raw in response.events {
            events.push(self.verify_search_event(raw)?);
        }

        if self.options.verify_proofs {
            if let Some(root) = &response.root {
                let provider = self.roots_provider(&root.tree_name)?;
                let roots = provider.fetch(&required_tree_sizes(root, &events)).await;
                for event in &mut events {
                    verify_event_proofs(event, root, response.unpublished_root.as_ref(), &roots);
                }
            }
        }

        Ok(SearchOutput {
            id: response.id,
            expires_at: response.expires_at,
            count: response.count,
            events,
            root: response.root,
            unpublished_root: response.unpublished_root,
        })
    }

    fn verify_search_event(&self, raw: RawSearchEvent) -> Result<SearchEvent<E>, AuditError> {
        let event_verification = self.check_event_hash(&raw.envelope, &raw.hash)?;
        let envelope = EventEnvelope::<E>::from_raw(&raw.envelope)?;
        let signature_verification = envelope.verify_signature();

        Ok(SearchEvent {
            envelope,
            envelope_raw: raw.envelope,
            hash: raw.hash,
            leaf_index: raw.leaf_index,
            membership_proof: raw.membership_proof,
            published: raw.published,
            event_verification,
            membership_verification: Verification::NotVerified,
            consistency_verification: Verification::NotVerified,
            signature_verification,
        })
    }
}

// Sizes needed to check every event: the tree after each leaf, the tree just
// before it, and the published root itself.
fn required_tree_sizes<E>(root: &Root, events: &[SearchEvent<E>]) -> BTreeSet<u64> {
    let mut sizes = BTreeSet::from([root.size]);
    for index in events.iter().filter_map(|event| leaf_index(event.leaf_index)) {
        sizes.insert(index + 1);
        if index >= 1 {
            sizes.insert(index);
        }
    }
    sizes
}

fn leaf_index(value: Option<i64>) -> Option<u64> {
    value.and_then(|index| u64::try_from(index).ok())
}

fn decode_root(root: &Root) -> Option<Hash> {
    match root.hash() {
        Ok(hash) => Some(hash),
        Err(err) => {
            warn!(tree_size = root.size, error = %err, "root hash is not valid hex");
            None
        }
    }
}

fn verify_event_proofs<E>(
    event: &mut SearchEvent<E>,
    root: &Root,
    unpublished_root: Option<&Root>,
    roots: &BTreeMap<u64, Root>,
) {
    let leaf = Hash::from_hex(&event.hash).ok();
    let proof = event.membership_proof.as_deref();

    let membership_root = if event.published.unwrap_or(false) {
        Some(root)
    } else {
        unpublished_root
    };
    event.membership_verification = match (membership_root.and_then(decode_root), leaf) {
        (Some(root_hash), Some(leaf)) => verify_membership_proof(&root_hash, &leaf, proof),
        (Some(_), None) if proof.is_some() => Verification::Failed,
        _ => Verification::NotVerified,
    };

    if event.published.unwrap_or(false) {
        event.consistency_verification = match leaf_index(event.leaf_index) {
            Some(index) if index >= 1 => consistency_between(roots, index),
            _ => Verification::NotVerified,
        };
    }

    if event.membership_verification.is_failed() || event.consistency_verification.is_failed() {
        warn!(
            hash = %event.hash,
            membership = ?event.membership_verification,
            consistency = ?event.consistency_verification,
            "search proof verification failed"
        );
    }
}

// Consistency of the published root at `size` with the one at `size + 1`.
fn consistency_between(roots: &BTreeMap<u64, Root>, size: u64) -> Verification {
    let (Some(old), Some(new)) = (roots.get(&size), roots.get(&(size + 1))) else {
        return Verification::NotVerified;
    };
    match (decode_root(old), decode_root(new)) {
        (Some(old_hash), Some(new_hash)) => {
            verify_consistency_proof(&old_hash, &new_hash, new.consistency_proof.as_deref())
        }
        _ => Verification::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::testing::MerkleTree;
    use audit_core::StandardEvent;
    use serde_json::json;

    fn root(size: u64) -> Root {
        Root {
            tree_name: "t".into(),
            size,
            root_hash: "00".repeat(32),
            url: None,
            published_at: None,
            consistency_proof: None,
        }
    }

    fn event(leaf_index: Option<i64>) -> SearchEvent<StandardEvent> {
        SearchEvent {
            envelope: EventEnvelope {
                event: StandardEvent::new("m"),
                signature: None,
                public_key: None,
                received_at: None,
            },
            envelope_raw: Map::new(),
            hash: "00".repeat(32),
            leaf_index,
            membership_proof: None,
            published: Some(true),
            event_verification: Verification::NotVerified,
            membership_verification: Verification::NotVerified,
            consistency_verification: Verification::NotVerified,
            signature_verification: Verification::NotVerified,
        }
    }

    #[test]
    fn required_sizes_cover_neighbouring_roots() {
        let sizes = required_tree_sizes(&root(20), &[event(Some(0)), event(Some(5)), event(Some(-1)), event(None)]);
        assert_eq!(sizes.into_iter().collect::<Vec<_>>(), vec![1, 5, 6, 20]);
    }

    #[test]
    fn missing_roots_leave_consistency_unverified() {
        let roots = BTreeMap::from([(3, root(3))]);
        assert_eq!(consistency_between(&roots, 3), Verification::NotVerified);
    }

    #[test]
    fn published_membership_uses_response_root() {
        let tree = MerkleTree::from_leaves(vec![Hash::digest(b"a"), Hash::digest(b"b")]);
        let mut published = root(2);
        published.root_hash = tree.root().to_hex();

        let mut event = event(Some(1));
        event.hash = tree.leaf(1).to_hex();
        event.membership_proof = Some(tree.membership_proof(1));

        verify_event_proofs(&mut event, &published, None, &BTreeMap::new());
        assert_eq!(event.membership_verification, Verification::Success);
        assert_eq!(event.consistency_verification, Verification::NotVerified);
    }

    #[test]
    fn search_input_omits_unset_fields() {
        let mut input = SearchInput::new("actor:alice");
        input.order = Some(SearchOrder::Desc);
        input.limit = Some(10);
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({"query": "actor:alice", "order": "desc", "limit": 10})
        );
    }
}
