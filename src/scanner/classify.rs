//! NodeClassifier - scan eligibility for text leaves
//!
//! Pure checks, no side effects. A leaf is eligible unless its container is
//! script-like, inert metadata, detached, or already inside a marker the
//! renderer inserted (which is also what keeps the scanner's own mutations
//! from re-triggering it into a loop).

use crate::dom::{NodeId, PageTree};

/// Class carried by every marker element the renderer inserts
pub const MARKER_CLASS: &str = "ens-detected";

/// Container tags whose text is never rendered
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

/// `type` attribute marking inert metadata containers
const INERT_TYPE: &str = "speculationrules";

/// True if `id` is an element carrying the marker class
pub fn is_marker(tree: &PageTree, id: NodeId) -> bool {
    tree.attr(id, "class")
        .map(|class| class.split_whitespace().any(|c| c == MARKER_CLASS))
        .unwrap_or(false)
}

/// True if the text leaf may be scanned
pub fn is_eligible(tree: &PageTree, leaf: NodeId) -> bool {
    if !tree.is_text(leaf) {
        return false;
    }
    let parent = match tree.parent(leaf) {
        Some(parent) => parent,
        None => return false,
    };
    if let Some(tag) = tree.tag(parent) {
        if SKIPPED_TAGS.iter().any(|skip| tag.eq_ignore_ascii_case(skip)) {
            return false;
        }
    }
    if tree.attr(parent, "type") == Some(INERT_TYPE) {
        return false;
    }
    // Never re-annotate an annotation
    if tree.closest(parent, is_marker).is_some() {
        return false;
    }
    true
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_under(tag: &str) -> (PageTree, NodeId, NodeId) {
        let mut tree = PageTree::new();
        let container = tree.create_element(tag);
        tree.append_child(tree.root(), container).unwrap();
        let leaf = tree.create_text("alice.eth");
        tree.append_child(container, leaf).unwrap();
        (tree, container, leaf)
    }

    #[test]
    fn test_plain_container_is_eligible() {
        let (tree, _, leaf) = leaf_under("div");
        assert!(is_eligible(&tree, leaf));
    }

    #[test]
    fn test_script_like_containers_rejected() {
        for tag in ["script", "style", "noscript", "SCRIPT"] {
            let (tree, _, leaf) = leaf_under(tag);
            assert!(!is_eligible(&tree, leaf), "tag {tag} should be rejected");
        }
    }

    #[test]
    fn test_speculation_rules_rejected() {
        let (mut tree, container, leaf) = leaf_under("div");
        tree.set_attr(container, "type", "speculationrules");
        assert!(!is_eligible(&tree, leaf));
    }

    #[test]
    fn test_detached_leaf_rejected() {
        let mut tree = PageTree::new();
        let orphan = tree.create_text("alice.eth");
        assert!(!is_eligible(&tree, orphan));
    }

    #[test]
    fn test_leaf_inside_marker_rejected() {
        let (mut tree, container, leaf) = leaf_under("span");
        tree.set_attr(container, "class", MARKER_CLASS);
        assert!(!is_eligible(&tree, leaf));
    }

    #[test]
    fn test_leaf_under_marker_ancestor_rejected() {
        let mut tree = PageTree::new();
        let marker = tree.create_element("span");
        tree.set_attr(marker, "class", format!("highlight {MARKER_CLASS}").as_str());
        tree.append_child(tree.root(), marker).unwrap();
        let inner = tree.create_element("b");
        tree.append_child(marker, inner).unwrap();
        let leaf = tree.create_text("alice.eth");
        tree.append_child(inner, leaf).unwrap();
        assert!(!is_eligible(&tree, leaf));
    }

    #[test]
    fn test_element_is_not_eligible() {
        let (tree, container, _) = leaf_under("div");
        assert!(!is_eligible(&tree, container));
    }
}
