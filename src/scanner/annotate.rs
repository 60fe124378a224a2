//! AnnotationRenderer / AnnotationStripper
//!
//! The renderer replaces a matched leaf with a fragment: byte-exact
//! unmatched text runs plus one marker element per match, original order
//! preserved. The stripper is the inverse: every marker collapses back to a
//! plain text node of its displayed text, restoring the pre-annotation
//! string byte-identically for unchanged leaves.

use crate::dom::{NodeId, PageTree};
use crate::scanner::classify::{is_marker, MARKER_CLASS};
use crate::scanner::crossnode;
use crate::scanner::patterns::EntityMatch;

/// Marker metadata attributes
pub const DATA_VALUE: &str = "data-value";
pub const DATA_KIND: &str = "data-kind";

/// Marker element tag
pub const MARKER_TAG: &str = "span";

/// Build one marker element (detached) for a match
fn build_marker(tree: &mut PageTree, entity: &EntityMatch) -> NodeId {
    let marker = tree.create_element(MARKER_TAG);
    tree.set_attr(marker, "class", MARKER_CLASS);
    tree.set_attr(marker, DATA_VALUE, &entity.normalized_text);
    tree.set_attr(marker, DATA_KIND, entity.kind.as_str());
    let label = tree.create_text(&entity.normalized_text);
    tree.append_child(marker, label).ok();
    marker
}

/// Replace `leaf` with unmatched text + markers for its matches.
///
/// Matches must be ordered and non-overlapping (the matcher guarantees
/// both). The leaf's parent is re-checked immediately before the splice;
/// a host mutation racing the scan turns into an `Err` the caller records
/// as a soft skip, never a batch abort.
///
/// Returns the number of markers created.
pub fn render_leaf(
    tree: &mut PageTree,
    leaf: NodeId,
    matches: &[EntityMatch],
) -> Result<usize, String> {
    if matches.is_empty() {
        return Ok(0);
    }
    let text = tree
        .text(leaf)
        .ok_or_else(|| format!("leaf {:?} is no longer a live text node", leaf))?
        .to_string();
    if tree.parent(leaf).is_none() {
        return Err(format!("leaf {:?} detached before annotation", leaf));
    }

    let mut fragment: Vec<NodeId> = Vec::new();
    let mut last = 0usize;
    for entity in matches {
        if entity.start > last {
            let run = tree.create_text(&text[last..entity.start]);
            fragment.push(run);
        }
        fragment.push(build_marker(tree, entity));
        last = entity.end;
    }
    if last < text.len() {
        let tail = tree.create_text(&text[last..]);
        fragment.push(tail);
    }

    tree.replace_with_nodes(leaf, fragment)?;
    Ok(matches.len())
}

/// Remove every marker in the tree, restoring plain text, and clear all
/// cross-node side attributes. Idempotent: a clean tree is a no-op.
///
/// Returns the number of markers removed.
pub fn strip_all(tree: &mut PageTree) -> usize {
    let markers: Vec<NodeId> = tree
        .elements()
        .into_iter()
        .filter(|&element| is_marker(tree, element))
        .collect();

    let mut removed = 0;
    for marker in markers {
        let displayed = tree.text_content(marker);
        let replacement = tree.create_text(&displayed);
        match tree.replace_with_nodes(marker, vec![replacement]) {
            Ok(()) => removed += 1,
            Err(_) => {
                // Marker died under us (host removed the subtree); nothing
                // to restore, drop the orphan replacement
                tree.remove(replacement);
            }
        }
    }

    crossnode::clear_side_attrs(tree);
    removed
}

// ==================== TESTS ====================
