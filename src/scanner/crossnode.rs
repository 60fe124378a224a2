//! CrossNodeMatcher - matches straddling two adjacent text leaves
//!
//! Conservative mode cannot excise a match that an element boundary splits
//! (`alice.` | `eth`) without risking the boundary element itself, so the
//! result is advisory: both parent containers get correlated side
//! attributes and the text is left untouched. False positives from
//! unrelated fragments concatenating into a matching string are an accepted
//! heuristic risk. Only immediately adjacent pairs are considered, never
//! longer chains.

use crate::dom::{NodeId, PageTree};
use crate::scanner::annotate::{DATA_KIND, DATA_VALUE};
use crate::scanner::patterns::{EntityKind, EntityMatch, PatternMatcher};
use serde::{Deserialize, Serialize};

/// Shared correlation id attribute carried by both parents of a pair
pub const CROSS_ID_ATTR: &str = "data-cross-id";

/// An accepted cross-node detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossNodeHit {
    pub cross_id: u64,
    pub value: String,
    pub kind: EntityKind,
    pub leading: NodeId,
    pub trailing: NodeId,
}

/// Match the concatenation of two adjacent leaves, accepting only a match
/// whose span crosses the leaf boundary
pub fn detect_pair(
    tree: &PageTree,
    matcher: &PatternMatcher,
    first: NodeId,
    second: NodeId,
) -> Option<EntityMatch> {
    let head = tree.text(first)?;
    let tail = tree.text(second)?;
    let boundary = head.len();
    let blob = format!("{head}{tail}");
    if !matcher.contains_any(&blob) {
        return None;
    }
    let hit = matcher
        .iter_matches(&blob)
        .find(|m| m.start < boundary && m.end > boundary);
    hit
}

/// Stamp both parent containers with the correlated side attributes.
///
/// The leading container carries the full metadata payload; the trailing
/// one only the shared id. Returns `None` when either parent is gone or a
/// pair marking is already present (idempotence).
pub fn mark_pair(
    tree: &mut PageTree,
    first: NodeId,
    second: NodeId,
    entity: &EntityMatch,
    cross_id: u64,
) -> Option<CrossNodeHit> {
    let leading = tree.parent(first)?;
    let trailing = tree.parent(second)?;
    if tree.attr(leading, CROSS_ID_ATTR).is_some() || tree.attr(trailing, CROSS_ID_ATTR).is_some()
    {
        return None;
    }

    let id_value = cross_id.to_string();
    tree.set_attr(leading, CROSS_ID_ATTR, &id_value);
    tree.set_attr(leading, DATA_VALUE, &entity.normalized_text);
    tree.set_attr(leading, DATA_KIND, entity.kind.as_str());
    tree.set_attr(trailing, CROSS_ID_ATTR, &id_value);

    Some(CrossNodeHit {
        cross_id,
        value: entity.normalized_text.clone(),
        kind: entity.kind,
        leading,
        trailing,
    })
}

/// Remove every cross-node side attribute in the tree
pub fn clear_side_attrs(tree: &mut PageTree) {
    let stamped: Vec<NodeId> = tree
        .elements()
        .into_iter()
        .filter(|&element| tree.attr(element, CROSS_ID_ATTR).is_some())
        .collect();
    for element in stamped {
        tree.remove_attr(element, CROSS_ID_ATTR);
        tree.remove_attr(element, DATA_VALUE);
        tree.remove_attr(element, DATA_KIND);
    }
}

// ==================== TESTS ====================
