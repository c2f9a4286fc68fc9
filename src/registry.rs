//! Source Registry
//!
//! Holds every registered data source together with its query capability.
//! Routing by collection name uses the statically declared
//! `exposed_collections`, never a live listing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::observability::Sensitive;
use pocket_core::{FederationError, FederationResult, QueryExecutor};

/// Where a source's data physically lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLocation {
    #[default]
    Local,
    Remote,
}

/// Metadata of a registered external collection provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub id: String,
    pub display_name: String,
    pub exposed_collections: BTreeSet<String>,
    #[serde(default)]
    pub location: SourceLocation,
    /// Lower sorts first when several sources expose the same collection.
    #[serde(default)]
    pub priority: i32,
    /// Opaque connection hint, never interpreted here. Accepted on input but
    /// never written out, so serialized metadata carries no endpoint at all
    /// rather than a redacted placeholder.
    #[serde(default, skip_serializing)]
    pub endpoint: Option<Sensitive<String>>,
}

impl DataSource {
    pub fn new<I, S>(id: impl Into<String>, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            exposed_collections: collections.into_iter().map(Into::into).collect(),
            location: SourceLocation::Local,
            priority: 0,
            endpoint: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the source as remote, reachable at `endpoint`.
    pub fn remote(mut self, endpoint: impl Into<String>) -> Self {
        self.location = SourceLocation::Remote;
        self.endpoint = Some(Sensitive::new(endpoint.into()));
        self
    }

    pub fn exposes(&self, collection: &str) -> bool {
        self.exposed_collections.contains(collection)
    }
}

struct RegisteredSource {
    source: DataSource,
    executor: Arc<dyn QueryExecutor>,
    /// Registration sequence, breaks priority ties.
    seq: u64,
}

/// Registry of all federated sources
///
/// Not synchronized itself; the engine serializes mutations behind a lock.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, RegisteredSource>,
    next_seq: u64,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source. Ids are unique; re-registering an id is rejected.
    pub fn register(
        &mut self,
        source: DataSource,
        executor: Arc<dyn QueryExecutor>,
    ) -> FederationResult<()> {
        if self.sources.contains_key(&source.id) {
            return Err(FederationError::duplicate_source(&source.id));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.sources.insert(
            source.id.clone(),
            RegisteredSource {
                source,
                executor,
                seq,
            },
        );
        Ok(())
    }

    /// Removes a source. Unknown ids are a no-op; returns whether anything was removed.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.sources.remove(id).is_some()
    }

    /// Sources exposing `collection`, by ascending priority then registration order.
    pub fn resolve_sources_for_collection(&self, collection: &str) -> Vec<&DataSource> {
        let mut matching: Vec<&RegisteredSource> = self
            .sources
            .values()
            .filter(|entry| entry.source.exposes(collection))
            .collect();
        matching.sort_by_key(|entry| (entry.source.priority, entry.seq));
        matching.into_iter().map(|entry| &entry.source).collect()
    }

    /// Orders a caller-supplied id list by priority, keeping caller order among
    /// ties and dropping repeats. Unknown ids count as priority 0.
    pub fn order_by_priority(&self, ids: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut ordered: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        ordered.sort_by_key(|id| self.sources.get(id).map_or(0, |entry| entry.source.priority));
        ordered
    }

    /// Gets a source's executor by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn QueryExecutor>> {
        self.sources.get(id).map(|entry| Arc::clone(&entry.executor))
    }

    /// Gets a source's metadata by id
    pub fn source(&self, id: &str) -> Option<&DataSource> {
        self.sources.get(id).map(|entry| &entry.source)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// All sources in registration order.
    pub fn sources(&self) -> Vec<&DataSource> {
        let mut entries: Vec<&RegisteredSource> = self.sources.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| &entry.source).collect()
    }

    /// Source id -> exposed collection names, for discovery UIs.
    pub fn catalog(&self) -> BTreeMap<String, Vec<String>> {
        self.sources
            .iter()
            .map(|(id, entry)| {
                let collections = entry.source.exposed_collections.iter().cloned().collect();
                (id.clone(), collections)
            })
            .collect()
    }

    /// Returns the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns true if no sources are registered
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
