//! DualModeScanner - Conservative / Aggressive scan strategies
//!
//! The mode is resolved once per page load from a hostname allow-list and
//! stays fixed for the page's lifetime. Dispatch goes through the
//! `ScanStrategy` trait so no per-scan `if mode` checks leak into the walk.
//!
//! - **Conservative** (default): per-leaf matching with processed-set
//!   short-circuiting plus a cross-node pass over adjacent leaf pairs.
//!   Preserves host page structure.
//! - **Aggressive** (allow-listed hosts): per-element blob matching with
//!   destructive child rebuilds. Higher catch rate on integration-heavy
//!   layouts, at the cost of coalescing sibling structure.

use crate::dom::{NodeId, PageTree};
use crate::scanner::annotate;
use crate::scanner::classify;
use crate::scanner::crossnode::{self, CrossNodeHit};
use crate::scanner::patterns::{EntityMatch, PatternMatcher};
use crate::scanner::processed::ProcessedSet;
use crate::scanner::viewport::is_near_viewport;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// =============================================================================
// Mode selection
// =============================================================================

/// Hosts whose layouts need the aggressive strategy
pub const DEFAULT_AGGRESSIVE_HOSTS: &[&str] = &["x.com", "twitter.com", "web.telegram.org"];

/// Scanning strategy, fixed per page load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Conservative,
    Aggressive,
}

impl ScanMode {
    /// Resolve the mode for a hostname: aggressive when the host equals an
    /// allow-list entry or is a subdomain of one
    pub fn for_host(hostname: &str, allowlist: &[String]) -> ScanMode {
        let host = hostname.to_ascii_lowercase();
        let aggressive = allowlist.iter().any(|entry| {
            let entry = entry.to_ascii_lowercase();
            host == entry || host.ends_with(&format!(".{entry}"))
        });
        if aggressive {
            ScanMode::Aggressive
        } else {
            ScanMode::Conservative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Conservative => "conservative",
            ScanMode::Aggressive => "aggressive",
        }
    }
}

// =============================================================================
// Scan report
// =============================================================================

/// Error during a scan phase (non-fatal, the batch continues)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanError {
    pub phase: String,
    pub message: String,
}

/// Per-phase timings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanTimings {
    pub total_us: u64,
    pub walk_us: u64,
    pub cross_node_us: u64,
}

/// Outcome of one scan invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub mode: ScanMode,
    pub markers_created: usize,
    pub leaves_visited: usize,
    pub leaves_skipped_processed: usize,
    pub leaves_skipped_offscreen: usize,
    pub elements_rebuilt: usize,
    pub cross_node_hits: Vec<CrossNodeHit>,
    pub errors: Vec<ScanError>,
    pub timings: ScanTimings,
}

impl ScanReport {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            markers_created: 0,
            leaves_visited: 0,
            leaves_skipped_processed: 0,
            leaves_skipped_offscreen: 0,
            elements_rebuilt: 0,
            cross_node_hits: Vec::new(),
            errors: Vec::new(),
            timings: ScanTimings::default(),
        }
    }
}

// =============================================================================
// Strategy dispatch
// =============================================================================

/// Shared per-scan context handed to a strategy
pub struct ScanPass<'a> {
    pub matcher: &'a PatternMatcher,
    pub processed: &'a mut ProcessedSet,
    pub viewport_margin: f64,
    pub cross_seq: &'a mut u64,
}

/// One scanning strategy over the filtered, classified leaves
pub trait ScanStrategy {
    fn run(&self, pass: &mut ScanPass<'_>, tree: &mut PageTree, report: &mut ScanReport);
}

/// Static strategy lookup for a resolved mode
pub fn strategy_for(mode: ScanMode) -> &'static dyn ScanStrategy {
    match mode {
        ScanMode::Conservative => &ConservativeScan,
        ScanMode::Aggressive => &AggressiveScan,
    }
}

// =============================================================================
// Conservative strategy
// =============================================================================

/// Per-leaf scanning with processed tracking and cross-node pairing
pub struct ConservativeScan;

impl ScanStrategy for ConservativeScan {
    fn run(&self, pass: &mut ScanPass<'_>, tree: &mut PageTree, report: &mut ScanReport) {
        let walk_start = instant::Instant::now();
        let viewport_height = tree.viewport().height;

        // Phase 1: walk and match eligible, unprocessed, viewport-near leaves
        let all_leaves = tree.text_leaves();
        let mut visited: Vec<(NodeId, Vec<EntityMatch>)> = Vec::new();
        let mut visited_set: HashSet<NodeId> = HashSet::new();
        for &leaf in &all_leaves {
            if !classify::is_eligible(tree, leaf) {
                continue;
            }
            if !is_near_viewport(&tree.bounds_of(leaf), viewport_height, pass.viewport_margin) {
                // Stays eligible for a future scan: scroll changes what is
                // visible, not what is matchable
                report.leaves_skipped_offscreen += 1;
                continue;
            }
            if pass.processed.is_processed(leaf) {
                report.leaves_skipped_processed += 1;
                continue;
            }
            report.leaves_visited += 1;
            let matches = match tree.text(leaf) {
                Some(text) if pass.matcher.contains_any(text) => pass.matcher.find_matches(text),
                _ => Vec::new(),
            };
            visited.push((leaf, matches));
            visited_set.insert(leaf);
        }
        report.timings.walk_us = walk_start.elapsed().as_micros() as u64;

        // Phase 2: cross-node pairs, before any splicing invalidates leaf ids.
        // Adjacency means consecutive text leaves in document order where
        // both halves were visited this round.
        let cross_start = instant::Instant::now();
        for pair in all_leaves.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if !visited_set.contains(&first) || !visited_set.contains(&second) {
                continue;
            }
            if let Some(entity) = crossnode::detect_pair(tree, pass.matcher, first, second) {
                *pass.cross_seq += 1;
                let cross_id = *pass.cross_seq;
                if let Some(hit) = crossnode::mark_pair(tree, first, second, &entity, cross_id) {
                    report.cross_node_hits.push(hit);
                }
            }
        }
        report.timings.cross_node_us = cross_start.elapsed().as_micros() as u64;

        // Phase 3: annotate. A matched leaf is replaced (its id dies with
        // it); an unmatched leaf is marked processed so it is not rescanned
        // until invalidated.
        for (leaf, matches) in visited {
            if matches.is_empty() {
                pass.processed.mark_processed(leaf);
                continue;
            }
            match annotate::render_leaf(tree, leaf, &matches) {
                Ok(created) => report.markers_created += created,
                Err(message) => {
                    // Host mutation raced us on this one leaf; skip it,
                    // the rest of the batch proceeds
                    report.errors.push(ScanError {
                        phase: "annotate".to_string(),
                        message,
                    });
                }
            }
        }
    }
}

// =============================================================================
// Aggressive strategy
// =============================================================================

/// Per-element blob matching with destructive child rebuilds
pub struct AggressiveScan;

impl AggressiveScan {
    /// Blob for an element: direct text children plus single-text-child
    /// element children. `None` when the element holds a marker already
    /// (rebuilt output is left alone, which is what makes a repeat scan of
    /// an annotated subtree a no-op).
    fn element_blob(tree: &PageTree, element: NodeId) -> Option<String> {
        let mut blob = String::new();
        for &child in tree.children(element) {
            if let Some(text) = tree.text(child) {
                blob.push_str(text);
            } else if classify::is_marker(tree, child) {
                return None;
            } else if tree.children(child).len() == 1 {
                let only = tree.children(child)[0];
                if let Some(text) = tree.text(only) {
                    blob.push_str(text);
                }
            }
        }
        Some(blob)
    }
}

impl ScanStrategy for AggressiveScan {
    fn run(&self, pass: &mut ScanPass<'_>, tree: &mut PageTree, report: &mut ScanReport) {
        let walk_start = instant::Instant::now();
        let viewport_height = tree.viewport().height;

        // Document order: a parent that rebuilds swallows its wrapper
        // children, so descendants of a rebuilt element are dead by the
        // time the walk reaches them
        let elements = tree.elements();
        for &element in elements.iter() {
            if !tree.is_element(element) {
                continue;
            }
            if element == tree.root() {
                // The root container holds the whole page; it is never a
                // rebuild candidate
                continue;
            }
            if tree.closest(element, classify::is_marker).is_some() {
                continue;
            }
            if !is_near_viewport(
                &tree.bounds_of(element),
                viewport_height,
                pass.viewport_margin,
            ) {
                continue;
            }
            let blob = match Self::element_blob(tree, element) {
                Some(blob) if !blob.is_empty() && pass.matcher.contains_any(&blob) => blob,
                _ => continue,
            };
            let matches = pass.matcher.find_matches(&blob);
            if matches.is_empty() {
                continue;
            }

            // Destructive: the element's entire child content becomes the
            // reconstructed fragment. Coalescing unrelated siblings is the
            // documented cost of this mode.
            let old_children: Vec<NodeId> = tree.children(element).to_vec();
            for child in old_children {
                tree.remove(child);
            }
            let mut last = 0usize;
            let mut append = |tree: &mut PageTree, node: NodeId| {
                if let Err(message) = tree.append_child(element, node) {
                    report.errors.push(ScanError {
                        phase: "rebuild".to_string(),
                        message,
                    });
                }
            };
            for entity in &matches {
                if entity.start > last {
                    let run = tree.create_text(&blob[last..entity.start]);
                    append(tree, run);
                }
                let marker = tree.create_element(annotate::MARKER_TAG);
                tree.set_attr(marker, "class", classify::MARKER_CLASS);
                tree.set_attr(marker, annotate::DATA_VALUE, &entity.normalized_text);
                tree.set_attr(marker, annotate::DATA_KIND, entity.kind.as_str());
                let label = tree.create_text(&entity.normalized_text);
                tree.append_child(marker, label).ok();
                append(tree, marker);
                last = entity.end;
            }
            if last < blob.len() {
                let tail = tree.create_text(&blob[last..]);
                append(tree, tail);
            }

            report.elements_rebuilt += 1;
            report.markers_created += matches.len();
        }
        report.timings.walk_us = walk_start.elapsed().as_micros() as u64;
    }
}

// ==================== TESTS ====================
