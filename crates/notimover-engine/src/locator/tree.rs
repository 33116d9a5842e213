//! Bounded accessibility-tree traversal producing flat node records.

use tracing::trace;

use crate::{
    error::{AxError, AxResult},
    geom::Rect,
    ids::ElementRef,
    platform::AxQuery,
};

/// Attributes captured for one element during traversal.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeInfo {
    /// Element handle.
    pub element: ElementRef,
    /// Distance from the window root (root is 0).
    pub depth: usize,
    /// Index of the parent record; `None` for the root.
    pub parent: Option<usize>,
    /// `AXRole`, if readable.
    pub role: Option<String>,
    /// `AXSubrole`, if readable.
    pub subrole: Option<String>,
    /// `AXIdentifier`, if readable.
    pub identifier: Option<String>,
    /// Position and size, when both are readable.
    pub frame: Option<Rect>,
}

impl NodeInfo {
    /// True when the node has a readable, non-degenerate frame.
    pub fn has_size(&self) -> bool {
        self.frame.is_some_and(|f| f.size().is_positive())
    }
}

/// Walk the tree under `root` in pre-order, visiting at most `max_nodes`
/// elements and descending at most `max_depth` levels.
///
/// Attribute failures on descendants are recorded as absent values. Only a
/// root that is gone or unauthorized aborts the walk.
pub fn collect(
    query: &dyn AxQuery,
    root: ElementRef,
    max_depth: usize,
    max_nodes: usize,
) -> AxResult<Vec<NodeInfo>> {
    let role = match query.role(root) {
        Ok(v) => v,
        Err(e @ (AxError::Gone | AxError::Permission)) => return Err(e),
        Err(_) => None,
    };
    let mut nodes = vec![read_node(query, root, 0, None, role)];
    // Explicit stack keeps pre-order without recursion; children are pushed
    // in reverse so the first child is visited next.
    let mut stack: Vec<usize> = vec![0];
    while let Some(idx) = stack.pop() {
        let depth = nodes[idx].depth;
        if depth >= max_depth {
            continue;
        }
        let kids = match query.children(nodes[idx].element) {
            Ok(k) => k,
            Err(e) => {
                trace!(el = %nodes[idx].element, error = %e, "tree: children unreadable");
                continue;
            }
        };
        let mut pushed = Vec::with_capacity(kids.len());
        for child in kids {
            if nodes.len() >= max_nodes {
                trace!(cap = max_nodes, "tree: node cap reached");
                break;
            }
            let role = query.role(child).ok().flatten();
            nodes.push(read_node(query, child, depth + 1, Some(idx), role));
            pushed.push(nodes.len() - 1);
        }
        stack.extend(pushed.into_iter().rev());
    }
    Ok(reorder_preorder(nodes))
}

/// Read the remaining attributes of one element.
fn read_node(
    query: &dyn AxQuery,
    element: ElementRef,
    depth: usize,
    parent: Option<usize>,
    role: Option<String>,
) -> NodeInfo {
    let subrole = query.subrole(element).ok().flatten();
    let identifier = query.identifier(element).ok().flatten();
    let pos = query.position(element).ok().flatten();
    let size = query.size(element).ok().flatten();
    let frame = match (pos, size) {
        (Some(p), Some(s)) => Some(Rect::from_parts(p, s)),
        _ => None,
    };
    NodeInfo {
        element,
        depth,
        parent,
        role,
        subrole,
        identifier,
        frame,
    }
}

/// Records are appended breadth-wise per parent during the walk; rebuild the
/// list in true pre-order so "first in pre-order" is simply the lowest index.
fn reorder_preorder(nodes: Vec<NodeInfo>) -> Vec<NodeInfo> {
    if nodes.is_empty() {
        return nodes;
    }
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, n) in nodes.iter().enumerate() {
        if let Some(p) = n.parent {
            children[p].push(i);
        }
    }
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack = vec![0usize];
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev().copied());
    }
    let mut remap = vec![0usize; nodes.len()];
    for (new_idx, &old_idx) in order.iter().enumerate() {
        remap[old_idx] = new_idx;
    }
    let mut slots: Vec<Option<NodeInfo>> = nodes.into_iter().map(Some).collect();
    order
        .iter()
        .filter_map(|&old| slots[old].take())
        .map(|mut n| {
            n.parent = n.parent.map(|p| remap[p]);
            n
        })
        .collect()
}
