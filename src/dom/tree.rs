//! PageTree: arena-backed content tree
//!
//! Slotted arena with generational node ids. Slot reuse bumps the slot
//! generation, so a stale `NodeId` held across a removal simply stops
//! resolving instead of aliasing a new node. Nothing outside the arena
//! keeps nodes alive.
//!
//! # Mutation journal
//! Every node attached under the root is recorded in an `added` journal.
//! The embedder drains it between synchronous turns and feeds the ids to
//! the scanner as a `NodesAdded` event, the same cadence a DOM
//! MutationObserver delivers `childList` records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Geometry
// =============================================================================

/// Axis-aligned rectangle in viewport coordinates (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Viewport dimensions (CSS pixels)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
        }
    }
}

// =============================================================================
// Node types
// =============================================================================

/// Generational handle to a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub index: u32,
    pub generation: u32,
}

/// Node payload: element with attributes, or a text leaf
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: HashMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Option<Rect>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Declarative node description for JSON document loading
///
/// Either `text` is set (text leaf) or `tag` + optional `attrs`/`children`
/// (element). Used by the WASM facade to mirror host DOM content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub attrs: HashMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

// =============================================================================
// PageTree
// =============================================================================

/// Arena-backed content tree with a fixed `body` root
#[derive(Debug, Clone)]
pub struct PageTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    viewport: Viewport,
    added: Vec<NodeId>,
}

impl Default for PageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTree {
    pub fn new() -> Self {
        let root_node = Node {
            kind: NodeKind::Element {
                tag: "body".to_string(),
                attrs: HashMap::new(),
            },
            parent: None,
            children: Vec::new(),
            rect: None,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root_node),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            viewport: Viewport::default(),
            added: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Viewport { width, height };
    }

    // -------------------------------------------------------------------------
    // Allocation
    // -------------------------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node {
            kind: NodeKind::Element {
                tag: tag.to_string(),
                attrs: HashMap::new(),
            },
            parent: None,
            children: Vec::new(),
            rect: None,
        })
    }

    /// Create a detached text leaf
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(Node {
            kind: NodeKind::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
            rect: None,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// True if `id` still resolves to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.get(id).map(|n| &n.kind), Some(NodeKind::Text(_)))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.get(id).map(|n| &n.kind), Some(NodeKind::Element { .. }))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.get_mut(id) {
            if let NodeKind::Text(content) = &mut node.kind {
                *content = text.to_string();
            }
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.get(name).map(|v| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.get_mut(id) {
            if let NodeKind::Element { attrs, .. } = &mut node.kind {
                attrs.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.get_mut(id) {
            if let NodeKind::Element { attrs, .. } = &mut node.kind {
                attrs.remove(name);
            }
        }
    }

    /// True if the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Closest ancestor (including `id` itself) matching the predicate
    pub fn closest<F>(&self, id: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&PageTree, NodeId) -> bool,
    {
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.contains(node) {
                return None;
            }
            if predicate(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------

    pub fn set_bounds(&mut self, id: NodeId, rect: Rect) {
        if let Some(node) = self.get_mut(id) {
            node.rect = Some(rect);
        }
    }

    /// Bounding rect, resolved on demand.
    ///
    /// A text leaf reports its parent container's rect (text nodes have no
    /// box of their own). Unset rects read as `Rect::ZERO`, matching a
    /// zero-sized `getBoundingClientRect` from an unlaid-out element.
    pub fn bounds_of(&self, id: NodeId) -> Rect {
        let target = if self.is_text(id) {
            match self.parent(id) {
                Some(parent) => parent,
                None => return Rect::ZERO,
            }
        } else {
            id
        };
        self.get(target).and_then(|n| n.rect).unwrap_or(Rect::ZERO)
    }

    // -------------------------------------------------------------------------
    // Structure mutation
    // -------------------------------------------------------------------------

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), String> {
        self.insert_at(parent, child, None)
    }

    /// Insert a detached node before `reference` under `parent`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), String> {
        self.insert_at(parent, child, Some(reference))
    }

    fn insert_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), String> {
        if !self.is_element(parent) {
            return Err(format!("insert target {:?} is not a live element", parent));
        }
        if self.get(child).is_none() {
            return Err(format!("child {:?} is not live", child));
        }
        if self.get(child).and_then(|n| n.parent).is_some() {
            return Err(format!("child {:?} is already attached", child));
        }

        let position = match reference {
            Some(reference) => {
                let children = self.children(parent);
                match children.iter().position(|&c| c == reference) {
                    Some(position) => position,
                    None => return Err(format!("reference {:?} is not a child", reference)),
                }
            }
            None => self.children(parent).len(),
        };

        if let Some(node) = self.get_mut(parent) {
            node.children.insert(position, child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }

        if self.is_attached(parent) {
            self.added.push(child);
        }
        Ok(())
    }

    /// Replace `target` with a sequence of detached nodes at its position.
    ///
    /// The target subtree is freed. Fails if the target has no live parent
    /// (the host removed it between classification and splice).
    pub fn replace_with_nodes(
        &mut self,
        target: NodeId,
        replacements: Vec<NodeId>,
    ) -> Result<(), String> {
        let parent = self
            .parent(target)
            .ok_or_else(|| format!("replace target {:?} is detached", target))?;
        let position = self
            .children(parent)
            .iter()
            .position(|&c| c == target)
            .ok_or_else(|| format!("replace target {:?} not among parent children", target))?;

        if let Some(node) = self.get_mut(parent) {
            node.children.remove(position);
        }
        self.free_subtree(target);

        let attached = self.is_attached(parent);
        for (offset, &replacement) in replacements.iter().enumerate() {
            if let Some(node) = self.get_mut(parent) {
                node.children.insert(position + offset, replacement);
            }
            if let Some(node) = self.get_mut(replacement) {
                node.parent = Some(parent);
            }
            if attached {
                self.added.push(replacement);
            }
        }
        Ok(())
    }

    /// Detach and free a subtree
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.get_mut(parent) {
                node.children.retain(|&c| c != id);
            }
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            self.free_subtree(child);
        }
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.node.is_some() {
                slot.node = None;
                slot.generation += 1;
                self.free.push(id.index);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    /// All text leaves under the root, document order
    pub fn text_leaves(&self) -> Vec<NodeId> {
        self.descendant_text_leaves(self.root)
    }

    /// Text leaves under `id` (including `id` itself if it is one), document order
    pub fn descendant_text_leaves(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        self.collect_text_leaves(id, &mut leaves);
        leaves
    }

    fn collect_text_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_text(id) {
            out.push(id);
            return;
        }
        let children: &[NodeId] = self.children(id);
        for &child in children {
            self.collect_text_leaves(child, out);
        }
    }

    /// All elements under the root (including the root), document order
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.is_element(id) {
                out.push(id);
                let children = self.children(id);
                for &child in children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Concatenated text of a subtree, document order
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for leaf in self.descendant_text_leaves(id) {
            if let Some(text) = self.text(leaf) {
                out.push_str(text);
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Mutation journal
    // -------------------------------------------------------------------------

    /// Drain the added-node journal, dropping ids that died since recording
    pub fn drain_added(&mut self) -> Vec<NodeId> {
        let added = std::mem::take(&mut self.added);
        added.into_iter().filter(|&id| self.contains(id)).collect()
    }

    /// Discard pending journal entries without delivering them
    pub fn clear_journal(&mut self) {
        self.added.clear();
    }

    // -------------------------------------------------------------------------
    // Document loading
    // -------------------------------------------------------------------------

    /// Build a subtree from a declarative spec under `parent`
    pub fn build_spec(&mut self, parent: NodeId, spec: &NodeSpec) -> Result<NodeId, String> {
        let id = if let Some(text) = &spec.text {
            self.create_text(text)
        } else {
            let tag = spec.tag.as_deref().unwrap_or("div");
            let element = self.create_element(tag);
            for (name, value) in &spec.attrs {
                self.set_attr(element, name, value);
            }
            element
        };
        self.append_child(parent, id)?;
        for child in &spec.children {
            self.build_spec(id, child)?;
        }
        Ok(id)
    }

    /// Number of live nodes (diagnostics)
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }
}

// =============================================================================
// Tests
// =============================================================================
