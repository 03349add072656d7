//! Taxonomy DAG manager 
//!
//! Maintains, per taxonomy `version`, an in-memory DAG built from
//! `TaxonomyNode` records. The cache is process-wide, keyed by version,
//! with explicit invalidation ("a process-wide DAG cache keyed
//! by taxonomy version with explicit invalidation"), modeled the same way
//! the reference platform keeps a process-wide, `DashMap`-backed cache in
//! front of its knowledge-graph storage layer.

use crate::entities::TaxonomyNode;
use crate::error::{CoreError, Result};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One version's worth of taxonomy, built once and reused until invalidated.
struct VersionGraph {
    nodes_by_id: HashMap<Uuid, TaxonomyNode>,
    children: HashMap<Uuid, Vec<Uuid>>,
    /// `canonical_path.join("\u{0}")` -> node_id, for `resolve_path`.
    by_path: HashMap<String, Uuid>,
    root_id: Uuid,
}

fn path_key(path: &[String]) -> String {
    path.join("\u{0}")
}

impl VersionGraph {
    /// Build and validate a DAG from a flat node list.
    ///
    /// # Errors
    /// Returns `CoreError::Validation` if the nodes don't form a single
    /// rooted acyclic graph, or if two nodes share a `canonical_path`.
    fn build(nodes: Vec<TaxonomyNode>) -> Result<Self> {
        let mut nodes_by_id = HashMap::new();
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        let mut by_path = HashMap::new();
        let mut roots = Vec::new();

        for node in nodes {
            if let Some(existing) = by_path.insert(path_key(&node.canonical_path), node.node_id) {
                return Err(CoreError::validation(format!(
                    "duplicate canonical_path {:?} for nodes {existing} and {}",
                    node.canonical_path, node.node_id
                )));
            }
            if node.parent_id.is_none() {
                roots.push(node.node_id);
            } else if let Some(parent) = node.parent_id {
                children.entry(parent).or_default().push(node.node_id);
            }
            nodes_by_id.insert(node.node_id, node);
        }

        let root_id = match roots.as_slice() {
            [single] => *single,
            [] => {
                return Err(CoreError::validation(
                    "taxonomy version has no root node (all nodes have a parent_id)",
                ))
            }
            _ => {
                return Err(CoreError::validation(format!(
                    "taxonomy version has {} roots, expected exactly one",
                    roots.len()
                )))
            }
        };

        Self::assert_acyclic(&nodes_by_id, &children, root_id)?;

        Ok(Self {
            nodes_by_id,
            children,
            by_path,
            root_id,
        })
    }

    fn assert_acyclic(
        nodes_by_id: &HashMap<Uuid, TaxonomyNode>,
        children: &HashMap<Uuid, Vec<Uuid>>,
        root_id: Uuid,
    ) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = vec![root_id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(CoreError::validation(format!(
                    "cycle detected in taxonomy DAG at node {id}"
                )));
            }
            if let Some(kids) = children.get(&id) {
                stack.extend(kids.iter().copied());
            }
        }
        if visited.len() != nodes_by_id.len() {
            return Err(CoreError::validation(
                "taxonomy DAG has nodes unreachable from the root",
            ));
        }
        Ok(())
    }

    fn descendants(&self, ids: &[Uuid]) -> HashSet<Uuid> {
        let mut out: HashSet<Uuid> = ids.iter().copied().collect();
        let mut stack: Vec<Uuid> = ids.to_vec();
        while let Some(id) = stack.pop() {
            if let Some(kids) = self.children.get(&id) {
                for kid in kids {
                    if out.insert(*kid) {
                        stack.push(*kid);
                    }
                }
            }
        }
        out
    }

    fn resolve_path(&self, path: &[String]) -> Option<Uuid> {
        self.by_path.get(&path_key(path)).copied()
    }

    fn paths_for(&self, ids: &[Uuid]) -> Vec<Vec<String>> {
        ids.iter()
            .filter_map(|id| self.nodes_by_id.get(id).map(|n| n.canonical_path.clone()))
            .collect()
    }
}

/// `true` iff `ancestor_path` is an element-wise prefix of `candidate_path`.
#[must_use]
pub fn is_descendant_of(candidate_path: &[String], ancestor_path: &[String]) -> bool {
    candidate_path.len() >= ancestor_path.len()
        && candidate_path
            .iter()
            .zip(ancestor_path.iter())
            .all(|(a, b)| a == b)
}

/// Process-wide, version-keyed cache of taxonomy DAGs.
#[derive(Default)]
pub struct TaxonomyDagManager {
    versions: DashMap<String, Arc<RwLock<Arc<VersionGraph>>>>,
}

impl TaxonomyDagManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)build the cached DAG for `version` from a flat node list. Call
    /// on migration to invalidate stale state ("invalidation is
    /// explicit (on migration)").
    ///
    /// # Errors
    /// See [`VersionGraph::build`].
    pub fn load_version(&self, version: &str, nodes: Vec<TaxonomyNode>) -> Result<()> {
        let graph = Arc::new(VersionGraph::build(nodes)?);
        match self.versions.get(version) {
            Some(slot) => {
                *slot.write().expect("dag lock poisoned") = graph;
            }
            None => {
                self.versions
                    .insert(version.to_string(), Arc::new(RwLock::new(graph)));
            }
        }
        Ok(())
    }

    /// Drop the cached DAG for `version`, forcing the next access to error
    /// until `load_version` is called again.
    pub fn invalidate(&self, version: &str) {
        self.versions.remove(version);
    }

    fn graph(&self, version: &str) -> Result<Arc<VersionGraph>> {
        self.versions
            .get(version)
            .map(|slot| Arc::clone(&slot.read().expect("dag lock poisoned")))
            .ok_or_else(|| {
                CoreError::validation(format!("taxonomy version {version} is not loaded"))
            })
    }

    /// Expand `node_ids` to themselves plus every descendant 
    ///
    /// # Errors
    /// `CoreError::Validation` if `version` hasn't been loaded.
    pub fn descendants(&self, node_ids: &[Uuid], version: &str) -> Result<HashSet<Uuid>> {
        Ok(self.graph(version)?.descendants(node_ids))
    }

    /// Resolve a canonical path to its node id at `version`.
    ///
    /// # Errors
    /// `CoreError::TaxonomyPathNotFound` if the path doesn't exist at that
    /// version ("the orchestrator must not silently insert").
    pub fn resolve_path(&self, path: &[String], version: &str) -> Result<Uuid> {
        let graph = self.graph(version)?;
        graph
            .resolve_path(path)
            .ok_or_else(|| CoreError::TaxonomyPathNotFound {
                path: path.to_vec(),
                version: version.to_string(),
            })
    }

    /// Root node id for a loaded version.
    ///
    /// # Errors
    /// `CoreError::Validation` if `version` hasn't been loaded.
    pub fn root(&self, version: &str) -> Result<Uuid> {
        Ok(self.graph(version)?.root_id)
    }

    /// Resolve each id in `node_ids` to its canonical path at `version`,
    /// the reverse of `resolve_path`. Ids not present in the loaded DAG
    /// are silently skipped rather than erroring the whole batch.
    ///
    /// # Errors
    /// `CoreError::Validation` if `version` hasn't been loaded.
    pub fn paths_for(&self, node_ids: &[Uuid], version: &str) -> Result<Vec<Vec<String>>> {
        Ok(self.graph(version)?.paths_for(node_ids))
    }
}
