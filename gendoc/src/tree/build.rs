//! Building the context tree from a precedence-sorted block list.
//!
//! The first pass places each block in order. A block whose parent has not
//! been placed yet lands under `orphaned`. The second pass then repeatedly
//! tries to rehome orphans until a whole pass changes nothing.

use super::{Node, NodeId, NodeKey, Tree};
use gendoc_syntax::{GenDocBlock, Precedence};
use tracing::{debug, info};

/// Build the tree for `blocks`, which must be sorted by precedence.
pub fn build(blocks: &[GenDocBlock]) -> Tree {
    let mut tree = Tree::new();
    for block in blocks {
        match block.precedence {
            Precedence::Service => place_service(&mut tree, block),
            Precedence::Channel | Precedence::Operation | Precedence::Message => {
                place_child(&mut tree, block)
            }
            Precedence::Structural => debug!(id = %block.annotation.id, "skipping structural block"),
        }
    }
    reconcile(&mut tree);
    tree
}

fn entity_key(block: &GenDocBlock) -> NodeKey {
    NodeKey::new(block.precedence, block.annotation.id.as_str())
}

/// Services have no parent: merge into an existing one or start a new branch.
fn place_service(tree: &mut Tree, block: &GenDocBlock) {
    let key = entity_key(block);
    let leaf = Node::leaf(tree.leaf_key(&key), block.clone());
    let owner = match tree.find(&key) {
        Some(owner) => owner,
        None => tree.add(Node::entity(key, block.clone()), tree.parented()),
    };
    tree.add(leaf, owner);
}

fn place_child(tree: &mut Tree, block: &GenDocBlock) {
    let key = entity_key(block);
    let leaf = Node::leaf(tree.leaf_key(&key), block.clone());
    match find_declared_parent(tree, block) {
        Some(parent) => {
            let owner = find_or_create(tree, key, block, parent);
            tree.add(leaf, owner);
        }
        None => {
            tree.add(leaf, tree.orphaned());
        }
    }
}

fn find_declared_parent(tree: &Tree, block: &GenDocBlock) -> Option<NodeId> {
    NodeKey::parent_of(block.precedence, &block.annotation.parent)
        .and_then(|key| tree.find(&key))
}

fn find_or_create(tree: &mut Tree, key: NodeKey, block: &GenDocBlock, parent: NodeId) -> NodeId {
    match tree.find(&key) {
        Some(existing) => existing,
        None => tree.add(Node::entity(key, block.clone()), parent),
    }
}

/// Run reconciliation passes until the orphan count is stable.
fn reconcile(tree: &mut Tree) {
    let mut passes = 0;
    while tree.orphan_count() > 0 {
        let before = tree.orphan_count();
        passes += 1;
        adopt_by_owner(tree);
        adopt_by_parent(tree);
        debug!(pass = passes, orphans = tree.orphan_count(), "reconciliation pass");
        if tree.orphan_count() == before {
            break;
        }
    }
    debug!(passes, "reconciliation finished");
}

/// Move orphan leaves under their entity, if it has since been created.
fn adopt_by_owner(tree: &mut Tree) {
    for orphan in tree.children(tree.orphaned()).to_vec() {
        let key = tree.node(orphan).key.clone();
        if let Some(owner) = tree.find(&key.owner()) {
            move_under(tree, &key, owner);
        }
    }
}

/// Move orphan leaves whose declared parent now exists under that parent,
/// creating their entity there if needed.
fn adopt_by_parent(tree: &mut Tree) {
    for orphan in tree.children(tree.orphaned()).to_vec() {
        let node = tree.node(orphan);
        let Some(block) = node.block.clone() else {
            continue;
        };
        let key = node.key.clone();
        if let Some(parent) = find_declared_parent(tree, &block) {
            let owner = find_or_create(tree, key.owner(), &block, parent);
            move_under(tree, &key, owner);
        }
    }
}

fn move_under(tree: &mut Tree, key: &NodeKey, owner: NodeId) {
    if let Some(id) = tree.delete(key) {
        tree.attach(id, owner);
    }
}

/// Log every leaf that could not be placed. Orphans are expected, e.g. for
/// schema files of messages no service declares.
pub fn log_orphans(tree: &Tree) {
    for &orphan in tree.children(tree.orphaned()) {
        let node = tree.node(orphan);
        info!(key = %node.key, "orphaned annotation");
    }
}
