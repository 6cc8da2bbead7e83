//! Hierarchical names of a generated network.
//!
//! The generator emits flat tables: nodes, states and the children linking
//! them. Each node owns a singly linked list of children threaded through the
//! child table; a child is either a nested node or a state.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMeta {
    pub name: &'static str,
    /// Node owning the state.
    pub parent: usize,
    /// Data index of the state in segment 0.
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMeta {
    pub name: &'static str,
    pub parent: Option<usize>,
    pub first_child: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Node(usize),
    State(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildMeta {
    pub kind: ChildKind,
    pub next: Option<usize>,
}

/// Name tables of a network. Node 0 is the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkMeta {
    pub name: &'static str,
    pub nodes: &'static [NodeMeta],
    pub states: &'static [StateMeta],
    pub children: &'static [ChildMeta],
}

impl NetworkMeta {
    fn children_of(&self, node: usize) -> impl Iterator<Item = ChildKind> + '_ {
        std::iter::successors(self.nodes[node].first_child, |&child| self.children[child].next)
            .map(|child| self.children[child].kind)
    }

    /// Resolves a dotted node path relative to the root. The empty path is the
    /// root itself.
    pub fn find_node(&self, path: &str) -> Option<usize> {
        if self.nodes.is_empty() {
            return None;
        }
        if path.is_empty() {
            return Some(0);
        }

        path.split('.').try_fold(0, |node, name| {
            self.children_of(node).find_map(|child| match child {
                ChildKind::Node(id) if self.nodes[id].name == name => Some(id),
                _ => None,
            })
        })
    }

    /// Finds a state directly owned by `node`.
    pub fn find_state(&self, node: usize, name: &str) -> Option<&StateMeta> {
        self.children_of(node).find_map(|child| match child {
            ChildKind::State(id) if self.states[id].name == name => Some(&self.states[id]),
            _ => None,
        })
    }

    /// Resolves `node.sub.state` to the data index of the state.
    pub fn find_variable(&self, path: &str) -> Option<usize> {
        let (node, name) = match path.rsplit_once('.') {
            Some((node, name)) => (self.find_node(node)?, name),
            None => (self.find_node("")?, path),
        };
        self.find_state(node, name).map(|state| state.index)
    }
}
