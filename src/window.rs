use super::*;

use crate::navigation::SessionHistory;

/// Stable handle of a browsing context. Ids are never reused by the registry
/// that allocated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(usize);

impl WindowId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// A single browsing context: a top-level window, a frame or an iframe.
#[derive(Debug)]
pub struct WindowNode {
    pub(crate) id: WindowId,
    pub(crate) name: String,
    pub(crate) parent: Option<WindowId>,
    pub(crate) children: Vec<WindowId>,
    pub(crate) document: Document,
    pub(crate) pending_refresh: Option<i64>,
    pub(crate) opener: Option<WindowId>,
    pub(crate) history: SessionHistory,
}

impl WindowNode {
    pub(crate) fn new(id: WindowId, name: &str, parent: Option<WindowId>) -> Self {
        let document = Document::blank(Document::about_blank_url());
        let history = SessionHistory::new(document.url());
        Self {
            id,
            name: name.to_string(),
            parent,
            children: Vec::new(),
            document,
            pending_refresh: None,
            opener: None,
            history,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<WindowId> {
        self.parent
    }

    pub fn children(&self) -> &[WindowId] {
        &self.children
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn url(&self) -> &Url {
        self.document.url()
    }

    /// Id of the outstanding refresh timer, if one is armed.
    pub fn pending_refresh(&self) -> Option<i64> {
        self.pending_refresh
    }

    pub fn opener(&self) -> Option<WindowId> {
        self.opener
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena of every live [`WindowNode`] owned by one browser context.
///
/// All links between windows (`parent`, `children`, `opener`) are ids resolved
/// through this table, so removing a node can never leave a dangling owner.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    nodes: HashMap<WindowId, WindowNode>,
    top_level: Vec<WindowId>,
    next_id: usize,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&mut self) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Inserts a node allocated by [`Self::allocate_id`] and links it under its
    /// parent (appended, so children keep declaration order) or into the
    /// top-level set.
    pub(crate) fn register(&mut self, node: WindowNode) {
        let id = node.id;
        debug_assert!(id.0 < self.next_id && !self.nodes.contains_key(&id));
        match node.parent {
            Some(parent) => {
                if let Some(parent_node) = self.get_mut(parent) {
                    parent_node.children.push(id);
                }
            }
            None => self.top_level.push(id),
        }
        self.nodes.insert(id, node);
    }

    /// Removes a single node. Unregistering an absent node is a no-op.
    ///
    /// Callers tear the subtree down deepest-first, so by the time a node is
    /// unregistered it has no children left.
    pub(crate) fn unregister(&mut self, id: WindowId) -> Option<WindowNode> {
        let node = self.nodes.remove(&id)?;
        debug_assert!(node.children.is_empty());
        match node.parent {
            Some(parent) => {
                if let Some(parent_node) = self.get_mut(parent) {
                    parent_node.children.retain(|child| *child != id);
                }
            }
            None => self.top_level.retain(|top| *top != id),
        }
        for other in self.nodes.values_mut() {
            if other.opener == Some(id) {
                other.opener = None;
            }
        }
        Some(node)
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: WindowId) -> Option<&mut WindowNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn top_level_windows(&self) -> &[WindowId] {
        &self.top_level
    }

    /// Number of live windows, frames included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every live window, each top-level tree in pre-order.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for top in &self.top_level {
            out.push(*top);
            out.extend(self.descendants(*top));
        }
        out
    }

    /// Descendants of `id` in depth-first document order, `id` excluded.
    pub fn descendants(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut stack = match self.get(id) {
            Some(node) => node.children.iter().rev().copied().collect::<Vec<_>>(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.get(next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// `id` and its descendants, children before parents, siblings in
    /// declaration order.
    pub fn post_order(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![(id, false)];
        while let Some((next, expanded)) = stack.pop() {
            if expanded {
                out.push(next);
                continue;
            }
            stack.push((next, true));
            if let Some(node) = self.get(next) {
                stack.extend(node.children.iter().rev().map(|child| (*child, false)));
            }
        }
        out
    }

    /// Parent, grandparent, ... up to the top-level window.
    pub fn ancestors(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(WindowNode::parent);
        while let Some(ancestor) = cursor {
            out.push(ancestor);
            cursor = self.get(ancestor).and_then(WindowNode::parent);
        }
        out
    }

    pub fn top_of(&self, id: WindowId) -> Option<WindowId> {
        if !self.contains(id) {
            return None;
        }
        Some(self.ancestors(id).last().copied().unwrap_or(id))
    }

    pub fn depth(&self, id: WindowId) -> usize {
        self.ancestors(id).len()
    }

    /// Browsing-context name resolution.
    ///
    /// Checks `scope`, then its subtree, then each ancestor together with that
    /// ancestor's whole subtree, nearest first, and finally every top-level
    /// tree. `None` means the caller should open a new top-level window with
    /// that name.
    pub fn lookup_by_name(&self, scope: WindowId, name: &str) -> Option<WindowId> {
        if name.is_empty() || !self.contains(scope) {
            return None;
        }
        if let Some(found) = self.find_named_in_subtree(scope, name) {
            return Some(found);
        }
        for ancestor in self.ancestors(scope) {
            if let Some(found) = self.find_named_in_subtree(ancestor, name) {
                return Some(found);
            }
        }
        self.lookup_globally(name)
    }

    /// Name lookup across every top-level tree, in open order.
    pub fn lookup_globally(&self, name: &str) -> Option<WindowId> {
        if name.is_empty() {
            return None;
        }
        self.top_level
            .iter()
            .find_map(|top| self.find_named_in_subtree(*top, name))
    }

    fn find_named_in_subtree(&self, root: WindowId, name: &str) -> Option<WindowId> {
        if self.get(root).is_some_and(|node| node.name == name) {
            return Some(root);
        }
        self.descendants(root)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|node| node.name == name))
    }
}
