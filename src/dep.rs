//! The resolved dependency graph handed to the generator.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`], so shared
//! subgraphs and cycles are representable without owning back-edges. The
//! root list preserves the order the caller supplied; the first root names
//! the default target.

use crate::symbol::Symbol;

/// Arena index of a [`DepNode`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(usize);

/// One target in the resolved dependency graph.
#[derive(Debug, Clone)]
pub struct DepNode {
    /// The target name.
    pub output: Symbol,
    /// Normal prerequisites, in makefile order.
    pub deps: Vec<NodeId>,
    /// Prerequisites that order the build without triggering rebuilds.
    pub order_onlys: Vec<NodeId>,
    /// Unevaluated recipe lines; the evaluator turns these into
    /// [`crate::command::Command`] values.
    pub cmds: Vec<String>,
    /// True when the target was declared `.PHONY`.
    pub is_phony: bool,
}

impl DepNode {
    /// A node with no prerequisites and no recipe.
    #[must_use]
    pub fn new(output: Symbol) -> Self {
        Self {
            output,
            deps: Vec::new(),
            order_onlys: Vec::new(),
            cmds: Vec::new(),
            is_phony: false,
        }
    }
}

/// The node arena plus the caller-ordered root list.
#[derive(Debug, Default)]
pub struct DepGraph {
    nodes: Vec<DepNode>,
    roots: Vec<NodeId>,
}

impl DepGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the arena and return its id.
    pub fn add_node(&mut self, node: DepNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Append `id` to the root list.
    pub fn add_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    /// Borrow the node behind `id`.
    ///
    /// # Panics
    ///
    /// Panics when `id` does not belong to this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &DepNode {
        &self.nodes[id.0]
    }

    /// Mutably borrow the node behind `id`, e.g. to wire up edges after
    /// all nodes exist.
    ///
    /// # Panics
    ///
    /// Panics when `id` does not belong to this graph.
    pub fn node_mut(&mut self, id: NodeId) -> &mut DepNode {
        &mut self.nodes[id.0]
    }

    /// The caller-supplied roots, in order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
}
