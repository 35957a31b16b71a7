//! Context tree: an n-ary tree of annotation blocks ordered by precedence.
//!
//! ```text
//! root
//! ├── parented
//! │   └── service ── channel ── operation ── message
//! │         └── leaves (one per block that describes the entity)
//! └── orphaned
//!     └── leaves whose parent has not been seen (yet)
//! ```
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. A flat index maps
//! every reachable [`NodeKey`] to its node; structure and index are only ever
//! changed together.

pub mod build;

use gendoc_syntax::{GenDocBlock, Precedence};
use std::collections::{HashMap, VecDeque};
use std::fmt;

pub use build::build;

/// Separates an entity id from the counter of a pending leaf key.
pub const LEAF_SUFFIX: &str = "__leaf__";

const ROOT: &str = "root";
const PARENTED: &str = "parented";
const ORPHANED: &str = "orphaned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub precedence: Precedence,
    pub id: String,
}

impl NodeKey {
    pub fn new(precedence: Precedence, id: impl Into<String>) -> Self {
        NodeKey {
            precedence,
            id: id.into(),
        }
    }

    /// Key of the entity a leaf key belongs to.
    pub fn owner(&self) -> NodeKey {
        let id = match self.id.rsplit_once(LEAF_SUFFIX) {
            Some((id, _)) => id,
            None => &self.id,
        };
        NodeKey::new(self.precedence, id)
    }

    /// Key one precedence level up, under which `parent_id` would live.
    pub fn parent_of(precedence: Precedence, parent_id: &str) -> Option<NodeKey> {
        precedence
            .parent()
            .map(|level| NodeKey::new(level, parent_id))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_#_{}", u8::from(self.precedence), self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub key: NodeKey,
    /// Empty for the structural nodes (root, parented, orphaned).
    pub block: Option<GenDocBlock>,
    pub children: Vec<NodeId>,
    pub is_leaf: bool,
}

impl Node {
    fn structural(id: &str) -> Self {
        Node {
            key: NodeKey::new(Precedence::Structural, id),
            block: None,
            children: Vec::new(),
            is_leaf: false,
        }
    }

    /// Node standing for an entity (service, channel, ...).
    pub fn entity(key: NodeKey, block: GenDocBlock) -> Self {
        Node {
            key,
            block: Some(block),
            children: Vec::new(),
            is_leaf: false,
        }
    }

    /// Node carrying one block's content, to be merged into its entity.
    pub fn leaf(key: NodeKey, block: GenDocBlock) -> Self {
        Node {
            key,
            block: Some(block),
            children: Vec::new(),
            is_leaf: true,
        }
    }
}

pub struct Tree {
    nodes: Vec<Node>,
    index: HashMap<NodeKey, NodeId>,
    root: NodeId,
    parented: NodeId,
    orphaned: NodeId,
    leaf_counter: u64,
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let root = Node::structural(ROOT);
        let mut tree = Tree {
            index: HashMap::from([(root.key.clone(), NodeId(0))]),
            nodes: vec![root],
            root: NodeId(0),
            parented: NodeId(0),
            orphaned: NodeId(0),
            leaf_counter: 0,
        };
        tree.orphaned = tree.add(Node::structural(ORPHANED), tree.root);
        tree.parented = tree.add(Node::structural(PARENTED), tree.root);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn parented(&self) -> NodeId {
        self.parented
    }

    pub fn orphaned(&self) -> NodeId {
        self.orphaned
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn orphan_count(&self) -> usize {
        self.children(self.orphaned).len()
    }

    pub fn find(&self, key: &NodeKey) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Unique key for a pending leaf of the entity `key`.
    pub fn leaf_key(&mut self, key: &NodeKey) -> NodeKey {
        self.leaf_counter += 1;
        NodeKey::new(
            key.precedence,
            format!("{}{}{}", key.id, LEAF_SUFFIX, self.leaf_counter),
        )
    }

    /// Insert `node` as the last child of `parent`.
    pub fn add(&mut self, node: Node, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.attach(id, parent);
        id
    }

    /// Hang an existing (detached) node under `parent` and index it again.
    pub fn attach(&mut self, id: NodeId, parent: NodeId) {
        let key = self.nodes[id.0].key.clone();
        self.index.insert(key, id);
        self.nodes[parent.0].children.push(id);
    }

    /// Remove the node at `key` from its parent and from the index. The
    /// detached node keeps its own children and can be re-attached.
    pub fn delete(&mut self, key: &NodeKey) -> Option<NodeId> {
        let id = self.index.remove(key)?;
        if let Some(parent) = self.find_parent(id) {
            self.nodes[parent.0].children.retain(|&child| child != id);
        }
        Some(id)
    }

    /// Breadth-first search from the root for the node holding `child`.
    pub fn find_parent(&self, child: NodeId) -> Option<NodeId> {
        let mut queue = VecDeque::from([self.root()]);
        while let Some(id) = queue.pop_front() {
            for &c in self.children(id) {
                if c == child {
                    return Some(id);
                }
                queue.push_back(c);
            }
        }
        None
    }

    /// Children of `id` split into (leaves, entities).
    pub fn partition_children(&self, id: NodeId) -> (Vec<&Node>, Vec<NodeId>) {
        let mut leaves = Vec::new();
        let mut entities = Vec::new();
        for &child in self.children(id) {
            let node = self.node(child);
            if node.is_leaf {
                leaves.push(node);
            } else {
                entities.push(child);
            }
        }
        (leaves, entities)
    }

    /// Depth of `id` below the root, if it is reachable.
    #[cfg(test)]
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut depth = 0;
        let mut current = id;
        while current != self.root() {
            current = self.find_parent(current)?;
            depth += 1;
        }
        Some(depth)
    }
}
