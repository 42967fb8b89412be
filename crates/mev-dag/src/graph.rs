use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use mev_types::{MevError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DagNodeType {
    #[serde(rename = "op_node")]
    Operation,
    #[serde(rename = "data_resource_node")]
    DataResource,
}

impl DagNodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DagNodeType::Operation => "op_node",
            DagNodeType::DataResource => "data_resource_node",
        }
    }
}

/// Identity of a node: `(node_id, node_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub node_id: String,
    pub node_type: DagNodeType,
}

impl NodeKey {
    pub fn new(node_id: impl Into<String>, node_type: DagNodeType) -> Self {
        Self {
            node_id: node_id.into(),
            node_type,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.node_id, self.node_type.as_str())
    }
}

/// A graph node. Equality and hashing use only the [`NodeKey`]; the name and
/// payload are display data.
#[derive(Debug, Clone)]
pub struct DagNode {
    key: NodeKey,
    node_name: Option<String>,
    op_data: Option<Value>,
    parents: BTreeSet<NodeKey>,
}

impl DagNode {
    pub fn new(node_id: impl Into<String>, node_type: DagNodeType) -> Self {
        Self {
            key: NodeKey::new(node_id, node_type),
            node_name: None,
            op_data: None,
            parents: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.op_data = Some(data);
        self
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn node_id(&self) -> &str {
        &self.key.node_id
    }

    pub fn node_type(&self) -> DagNodeType {
        self.key.node_type
    }

    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    pub fn op_data(&self) -> Option<&Value> {
        self.op_data.as_ref()
    }

    pub fn parents(&self) -> impl Iterator<Item = &NodeKey> {
        self.parents.iter()
    }
}

impl PartialEq for DagNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DagNode {}

impl Hash for DagNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Wire form of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: String,
    pub node_type: DagNodeType,
    pub node_name: Option<String>,
    #[serde(rename = "parentIds")]
    pub parent_ids: Vec<String>,
    pub data: Value,
}

impl From<SerializedNode> for Value {
    fn from(node: SerializedNode) -> Self {
        let mut out = Map::new();
        out.insert("id".into(), Value::String(node.id));
        out.insert(
            "node_type".into(),
            Value::String(node.node_type.as_str().into()),
        );
        out.insert("node_name".into(), Value::from(node.node_name));
        out.insert("parentIds".into(), Value::from(node.parent_ids));
        out.insert("data".into(), node.data);
        Value::Object(out)
    }
}

/// Node descriptor used when building a graph from an edge list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub node_type: DagNodeType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagEdge {
    pub parent: NodeSpec,
    pub child: NodeSpec,
}

/// Arena of nodes keyed by identity. Parent links are stored as keys and
/// resolved through the arena, so the graph owns every node exactly once.
///
/// Building is single-writer: callers sharing a graph across threads must
/// serialize access to it (e.g. behind a mutex).
#[derive(Debug, Clone, Default)]
pub struct SimpleDag {
    nodes: BTreeMap<NodeKey, DagNode>,
}

impl SimpleDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from `(parent, child)` pairs, creating each node on
    /// first mention.
    pub fn from_edges(edges: &[DagEdge]) -> Result<Self> {
        let mut dag = Self::new();
        for edge in edges {
            let parent = dag.create_from_spec(&edge.parent);
            let child = dag.create_from_spec(&edge.child);
            dag.add_parent(&child, &parent)?;
        }
        tracing::debug!(nodes = dag.len(), edges = edges.len(), "Built DAG from edge list");
        Ok(dag)
    }

    fn create_from_spec(&mut self, spec: &NodeSpec) -> NodeKey {
        self.get_or_create_node(
            &spec.id,
            spec.node_type,
            spec.name.as_deref(),
            spec.data.clone(),
        )
        .key()
        .clone()
    }

    /// Inserts `node` unless an equal node is already present, in which case
    /// the stored node is kept. Returns whether the node was inserted.
    pub fn add_node(&mut self, node: DagNode) -> bool {
        if self.nodes.contains_key(&node.key) {
            tracing::debug!(node = %node.key, "Node already present; keeping existing");
            return false;
        }
        self.nodes.insert(node.key.clone(), node);
        true
    }

    /// Returns the node whose id is `node_id`, creating it if there is none.
    /// An exact `(id, type)` match wins; otherwise any node with the id is
    /// returned, so a second call never grows the graph.
    pub fn get_or_create_node(
        &mut self,
        node_id: &str,
        node_type: DagNodeType,
        node_name: Option<&str>,
        op_data: Option<Value>,
    ) -> &DagNode {
        let requested = NodeKey::new(node_id, node_type);
        let existing = if self.nodes.contains_key(&requested) {
            Some(requested)
        } else {
            self.nodes.keys().find(|k| k.node_id == node_id).cloned()
        };
        if let Some(key) = &existing {
            if key.node_type != node_type {
                tracing::warn!(
                    node = node_id,
                    existing = key.node_type.as_str(),
                    requested = node_type.as_str(),
                    "Returning existing node with a different node type"
                );
            }
        }
        let key = existing.unwrap_or_else(|| NodeKey::new(node_id, node_type));
        self.nodes.entry(key.clone()).or_insert_with(|| DagNode {
            key,
            node_name: node_name.map(String::from),
            op_data,
            parents: BTreeSet::new(),
        })
    }

    /// Records `parent` as a parent of `child`. Both must already be in the
    /// graph. Returns `false` when the link already existed.
    pub fn add_parent(&mut self, child: &NodeKey, parent: &NodeKey) -> Result<bool> {
        if !self.nodes.contains_key(parent) {
            return Err(MevError::UnknownNode {
                node_id: parent.node_id.clone(),
            });
        }
        if !self.nodes.contains_key(child) {
            return Err(MevError::UnknownNode {
                node_id: child.node_id.clone(),
            });
        }
        if child == parent || self.is_ancestor(child, parent) {
            tracing::warn!(
                child = %child,
                parent = %parent,
                "Rejected edge that would close a cycle"
            );
            return Err(MevError::CycleDetected {
                child: child.node_id.clone(),
                parent: parent.node_id.clone(),
            });
        }

        let inserted = self
            .nodes
            .get_mut(child)
            .map(|node| node.parents.insert(parent.clone()))
            .unwrap_or(false);
        Ok(inserted)
    }

    /// Whether `ancestor` is reachable by following parent links up from `of`.
    pub fn is_ancestor(&self, ancestor: &NodeKey, of: &NodeKey) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&NodeKey> = self
            .nodes
            .get(of)
            .map(|n| n.parents.iter().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.parents.iter());
            }
        }
        false
    }

    pub fn node(&self, key: &NodeKey) -> Option<&DagNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DagNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parents_of(&self, key: &NodeKey) -> Vec<&DagNode> {
        self.nodes
            .get(key)
            .map(|n| n.parents.iter().filter_map(|p| self.nodes.get(p)).collect())
            .unwrap_or_default()
    }

    pub fn children_of(&self, key: &NodeKey) -> Vec<&DagNode> {
        self.nodes
            .values()
            .filter(|n| n.parents.contains(key))
            .collect()
    }

    /// Node keys ordered so every node comes after all of its parents.
    pub fn topological_order(&self) -> Vec<NodeKey> {
        let mut pending: BTreeMap<&NodeKey, usize> = self
            .nodes
            .iter()
            .map(|(k, n)| (k, n.parents.len()))
            .collect();
        let mut children: BTreeMap<&NodeKey, Vec<&NodeKey>> = BTreeMap::new();
        for (key, node) in &self.nodes {
            for parent in &node.parents {
                children.entry(parent).or_default().push(key);
            }
        }

        let mut ready: VecDeque<&NodeKey> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(k, _)| *k)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(key) = ready.pop_front() {
            order.push(key.clone());
            for child in children.get(key).into_iter().flatten() {
                if let Some(count) = pending.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(*child);
                    }
                }
            }
        }
        order
    }

    /// One entry per node. Consumers must not rely on the order.
    pub fn serialize(&self) -> Vec<SerializedNode> {
        self.nodes
            .values()
            .map(|node| SerializedNode {
                id: node.key.node_id.clone(),
                node_type: node.key.node_type,
                node_name: node.node_name.clone(),
                parent_ids: node.parents.iter().map(|p| p.node_id.clone()).collect(),
                data: node.op_data.clone().unwrap_or(Value::Null),
            })
            .collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.serialize().into_iter().map(Value::from).collect())
    }
}
