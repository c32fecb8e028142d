use indextree::NodeId;

use crate::stylesheet::Stylesheet;

/// Counts how many rule or at-rule levels separate a node from the document root.
///
/// # Arguments
///
/// * `stylesheet` - The document the node belongs to.
/// * `node` - The rule or at-rule to measure.
///
/// # Returns
///
/// `Some(0)` for a node directly under the root, or `None` when the node is
/// not part of the document (no parent, or a detached chain).
pub fn count_ancestors(stylesheet: &Stylesheet, node: NodeId) -> Option<usize> {
    let root = stylesheet.root();
    let mut parent = stylesheet.parent(node)?;
    let mut ancestors = 0;

    while parent != root {
        ancestors += 1;
        parent = stylesheet.parent(parent)?;
    }

    Some(ancestors)
}
