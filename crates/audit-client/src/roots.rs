//! Published root sources.
//!
//! Roots published to external storage anchor consistency checks across
//! publications. Providers keep a monotone cache keyed by tree size: entries
//! are added or enriched but never evicted, so repeated requests for a size
//! never refetch it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use audit_canonical::{Hash, Timestamp, ValidationError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::config::{ClientConfig, DEFAULT_ARWEAVE_URL};
use crate::error::AuditError;

/// A signed-off Merkle root for a given tree size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Name of the tree the root belongs to.
    pub tree_name: String,
    /// Number of leaves covered by the root.
    pub size: u64,
    /// Hex root hash.
    pub root_hash: String,
    /// Where the root was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// When the root was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    /// Consistency proof from the previous published root to this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_proof: Option<Vec<String>>,
}

impl Root {
    /// Decoded root hash.
    pub fn hash(&self) -> Result<Hash, ValidationError> {
        Hash::from_hex(&self.root_hash)
    }
}

/// Source of published roots keyed by tree size.
///
/// Implementations may return a subset of the requested sizes; callers treat
/// missing sizes as unverifiable.
#[async_trait]
pub trait RootsProvider: Send + Sync {
    /// Returns the cached roots after fetching any of `tree_sizes` not yet cached.
    async fn fetch(&self, tree_sizes: &BTreeSet<u64>) -> BTreeMap<u64, Root>;

    /// Merges `roots` into the cache and returns the merged cache.
    fn override_roots(&self, roots: BTreeMap<u64, Root>) -> BTreeMap<u64, Root>;
}

#[derive(Debug, Default)]
struct RootCache {
    roots: RwLock<BTreeMap<u64, Root>>,
}

impl RootCache {
    fn snapshot(&self) -> BTreeMap<u64, Root> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn missing(&self, sizes: &BTreeSet<u64>) -> BTreeSet<u64> {
        let roots = self.roots.read().unwrap_or_else(PoisonError::into_inner);
        sizes
            .iter()
            .copied()
            .filter(|size| !roots.contains_key(size))
            .collect()
    }

    // An existing entry is only replaced by the same root carrying a
    // consistency proof the cached one lacked.
    fn merge(&self, incoming: BTreeMap<u64, Root>) -> BTreeMap<u64, Root> {
        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);
        for (size, root) in incoming {
            let Some(existing) = roots.get(&size) else {
                roots.insert(size, root);
                continue;
            };
            if existing.root_hash != root.root_hash {
                warn!(
                    tree_size = size,
                    cached = %existing.root_hash,
                    incoming = %root.root_hash,
                    "conflicting root for cached tree size, keeping cached root"
                );
                continue;
            }
            if existing.consistency_proof.is_none() && root.consistency_proof.is_some() {
                roots.insert(size, root);
            }
        }
        roots.clone()
    }
}

/// Cache-only provider. Roots enter through [`RootsProvider::override_roots`].
#[derive(Debug, Default)]
pub struct MemoryRootsProvider {
    cache: RootCache,
}

impl MemoryRootsProvider {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider preloaded with `roots`.
    pub fn with_roots(roots: impl IntoIterator<Item = Root>) -> Self {
        let provider = Self::new();
        provider
            .cache
            .merge(roots.into_iter().map(|root| (root.size, root)).collect());
        provider
    }
}

#[async_trait]
impl RootsProvider for MemoryRootsProvider {
    async fn fetch(&self, tree_sizes: &BTreeSet<u64>) -> BTreeMap<u64, Root> {
        let missing = self.cache.missing(tree_sizes);
        if !missing.is_empty() {
            debug!(?missing, "roots not available in memory");
        }
        self.cache.snapshot()
    }

    fn override_roots(&self, roots: BTreeMap<u64, Root>) -> BTreeMap<u64, Root> {
        self.cache.merge(roots)
    }
}

/// Provider reading roots published to Arweave.
///
/// Transactions are located through the gateway's GraphQL endpoint by their
/// `tree_name` and `tree_size` tags; each transaction's data is a JSON [`Root`].
#[derive(Debug)]
pub struct ArweaveRootsProvider {
    tree_name: String,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    client: Client,
    cache: RootCache,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: GraphqlData,
}

#[derive(Deserialize)]
struct GraphqlData {
    transactions: Transactions,
}

#[derive(Deserialize)]
struct Transactions {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct Edge {
    node: Node,
}

#[derive(Deserialize)]
struct Node {
    id: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Deserialize)]
struct Tag {
    name: String,
    value: String,
}

impl ArweaveRootsProvider {
    /// Provider for `tree_name` on the gateway at `base_url`.
    ///
    /// Gateway requests share the service's `timeout` and `user_agent`.
    pub fn new(
        tree_name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: impl Into<String>,
    ) -> Result<Self, AuditError> {
        let tree_name = tree_name.into();
        if tree_name.is_empty() {
            return Err(AuditError::Config("roots provider requires a tree name".into()));
        }
        let user_agent = user_agent.into();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.as_str())
            .build()
            .map_err(|e| AuditError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            tree_name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            user_agent,
            client,
            cache: RootCache::default(),
        })
    }

    /// Provider for `tree_name` on the public Arweave gateway with default
    /// client settings.
    pub fn public(tree_name: impl Into<String>) -> Result<Self, AuditError> {
        let defaults = ClientConfig::default();
        Self::new(tree_name, DEFAULT_ARWEAVE_URL, defaults.timeout, defaults.user_agent)
    }

    /// Tree this provider reads roots for.
    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    fn graphql_query(&self, sizes: &BTreeSet<u64>) -> Value {
        let sizes: Vec<String> = sizes.iter().map(u64::to_string).collect();
        let query = format!(
            r#"{{ transactions(tags: [{{name: "tree_size", values: {sizes}}}, {{name: "tree_name", values: [{name}]}}]) {{ edges {{ node {{ id tags {{ name value }} }} }} }} }}"#,
            sizes = serde_json::to_string(&sizes).unwrap_or_else(|_| "[]".into()),
            name = serde_json::to_string(&self.tree_name).unwrap_or_else(|_| "\"\"".into()),
        );
        json!({ "query": query })
    }

    async fn transactions(&self, sizes: &BTreeSet<u64>) -> Result<Vec<Node>, reqwest::Error> {
        let url = format!("{}/graphql", self.base_url);
        let response: GraphqlResponse = self
            .client
            .post(&url)
            .json(&self.graphql_query(sizes))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response
            .data
            .transactions
            .edges
            .into_iter()
            .map(|edge| edge.node)
            .collect())
    }

    async fn transaction_root(&self, id: &str) -> Result<Root, reqwest::Error> {
        let url = format!("{}/{}/", self.base_url, id);
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl RootsProvider for ArweaveRootsProvider {
    #[instrument(skip(self), fields(tree_name = %self.tree_name))]
    async fn fetch(&self, tree_sizes: &BTreeSet<u64>) -> BTreeMap<u64, Root> {
        let missing = self.cache.missing(tree_sizes);
        if missing.is_empty() {
            debug!("all requested roots cached");
            return self.cache.snapshot();
        }

        let nodes = match self.transactions(&missing).await {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(error = %err, "failed to query published roots");
                return self.cache.snapshot();
            }
        };

        let mut fetched = BTreeMap::new();
        for node in nodes {
            let Some(size) = node
                .tags
                .iter()
                .find(|tag| tag.name == "tree_size")
                .and_then(|tag| tag.value.parse::<u64>().ok())
            else {
                continue;
            };
            if !missing.contains(&size) || fetched.contains_key(&size) {
                continue;
            }

            match self.transaction_root(&node.id).await {
                Ok(root) => {
                    debug!(tree_size = size, transaction = %node.id, "fetched published root");
                    fetched.insert(size, root);
                }
                Err(err) => {
                    warn!(tree_size = size, transaction = %node.id, error = %err, "failed to fetch published root");
                }
            }
        }

        self.cache.merge(fetched)
    }

    fn override_roots(&self, roots: BTreeMap<u64, Root>) -> BTreeMap<u64, Root> {
        self.cache.merge(roots)
    }
}
