//! Volume location list
//!
//! The ordered set of data nodes currently holding a replica of one volume.

use std::sync::Arc;

use serde::Serialize;

/// One data node, identified by `id`
///
/// Two nodes are the same member if their ids match, regardless of how many
/// times they are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataNode {
    pub id: String,
    pub public_url: String,
}

impl DataNode {
    pub fn new(id: impl Into<String>, public_url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            public_url: public_url.into(),
        })
    }
}

/// Ordered, deduplicated set of nodes holding one volume's replicas
///
/// Membership is by node identity (`DataNode::id`). `add` and `remove` are
/// idempotent and report whether they changed anything.
#[derive(Debug, Clone, Default)]
pub struct VolumeLocationList {
    nodes: Vec<Arc<DataNode>>,
}

impl VolumeLocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; returns false if it was already a member
    pub fn add(&mut self, node: Arc<DataNode>) -> bool {
        if self.contains(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Remove a node by id; returns false if it was not a member
    pub fn remove(&mut self, node_id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != node_id);
        self.nodes.len() != before
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    /// Current replica count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[Arc<DataNode>] {
        &self.nodes
    }
}
