//! PageScanner - scanning orchestrator
//!
//! One value owns the whole pipeline: matcher, mode, processed set,
//! debounce scheduler, feature flag, overlay controller and notice slot.
//! The host feeds it page events and a millisecond clock; it decides when
//! to scan and what to annotate. Nothing here touches ambient globals,
//! which is what keeps every scheduling test deterministic.

use crate::dom::{NodeId, PageTree};
use crate::scanner::annotate;
use crate::scanner::classify;
use crate::scanner::engine::{
    strategy_for, ScanMode, ScanPass, ScanReport, DEFAULT_AGGRESSIVE_HOSTS,
};
use crate::scanner::overlay::{
    position_card, Notice, NoticePhase, OverlayController, OverlayMessage, ProfilePayload,
    ANCHOR_OFFSET_Y,
};
use crate::scanner::patterns::{EntityKind, MatcherConfig, PatternMatcher};
use crate::scanner::processed::ProcessedSet;
use crate::scanner::schedule::{PageEvent, ScanScheduler, DEBOUNCE_MS};
use crate::scanner::state::FeatureState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Configuration
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_aggressive_hosts() -> Vec<String> {
    DEFAULT_AGGRESSIVE_HOSTS
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn default_debounce_ms() -> f64 {
    DEBOUNCE_MS
}

/// Scanner configuration, deserializable from host-provided JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Recognize the legacy `.xyz` suffix alongside the reserved ones
    #[serde(default = "default_true")]
    pub legacy_suffixes: bool,
    /// Hosts scanned with the aggressive strategy
    #[serde(default = "default_aggressive_hosts")]
    pub aggressive_hosts: Vec<String>,
    /// Quiet window before a batched rescan
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: f64,
    /// Extra pixels above and below the viewport still considered near
    #[serde(default)]
    pub viewport_margin: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            legacy_suffixes: true,
            aggressive_hosts: default_aggressive_hosts(),
            debounce_ms: DEBOUNCE_MS,
            viewport_margin: 0.0,
        }
    }
}

// =============================================================================
// PageScanner
// =============================================================================

/// Cumulative counters across the scanner's lifetime
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScannerStats {
    pub scans_run: u64,
    pub markers_total: usize,
}

/// The scanning pipeline for one page load
pub struct PageScanner {
    config: ScannerConfig,
    matcher: PatternMatcher,
    mode: ScanMode,
    processed: ProcessedSet,
    scheduler: ScanScheduler,
    feature: FeatureState,
    overlay: OverlayController,
    notice: Option<Notice>,
    cross_seq: u64,
    stats: ScannerStats,
}

impl PageScanner {
    pub fn new(hostname: &str, config: ScannerConfig) -> Self {
        let matcher = PatternMatcher::new(&MatcherConfig {
            legacy_suffixes: config.legacy_suffixes,
        });
        let mode = ScanMode::for_host(hostname, &config.aggressive_hosts);
        let scheduler = ScanScheduler::new(config.debounce_ms);
        Self {
            config,
            matcher,
            mode,
            processed: ProcessedSet::new(),
            scheduler,
            feature: FeatureState::default(),
            overlay: OverlayController::new(),
            notice: None,
            cross_seq: 0,
            stats: ScannerStats::default(),
        }
    }

    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.feature.enabled()
    }

    pub fn stats(&self) -> &ScannerStats {
        &self.stats
    }

    // -------------------------------------------------------------------------
    // Event intake
    // -------------------------------------------------------------------------

    /// Feed one page event. Everything except the feature toggle is ignored
    /// while the feature is off.
    pub fn handle_event(&mut self, tree: &mut PageTree, event: &PageEvent, now_ms: f64) {
        let enabled = self.feature.enabled();
        match event {
            PageEvent::FeatureToggled(on) => {
                self.set_enabled(tree, *on);
            }
            PageEvent::NodesAdded(ids) if enabled => {
                if self.mode == ScanMode::Conservative {
                    // A changed leaf drags its text siblings back into scope,
                    // matching how split names land across adjacent nodes
                    for &id in ids {
                        for leaf in tree.descendant_text_leaves(id) {
                            self.processed.invalidate_with_siblings(tree, leaf);
                        }
                    }
                }
                self.scheduler.observe(now_ms);
            }
            PageEvent::Scrolled | PageEvent::Resized if enabled => {
                self.scheduler.observe(now_ms);
            }
            _ => {}
        }
    }

    /// Drive the pipeline: deliver journaled insertions, expire the notice,
    /// and fire a due debounced scan
    pub fn poll(&mut self, tree: &mut PageTree, now_ms: f64) -> Option<ScanReport> {
        let added = tree.drain_added();
        if !added.is_empty() {
            self.handle_event(tree, &PageEvent::NodesAdded(added), now_ms);
        }
        if let Some(notice) = &self.notice {
            if notice.phase(now_ms) == NoticePhase::Expired {
                self.notice = None;
            }
        }
        if self.feature.enabled() && self.scheduler.fire_due(now_ms) {
            return Some(self.scan(tree));
        }
        None
    }

    /// Run one scan immediately, regardless of the debounce state
    pub fn scan(&mut self, tree: &mut PageTree) -> ScanReport {
        let start = instant::Instant::now();
        let mut report = ScanReport::new(self.mode);
        let mut pass = ScanPass {
            matcher: &self.matcher,
            processed: &mut self.processed,
            viewport_margin: self.config.viewport_margin,
            cross_seq: &mut self.cross_seq,
        };
        strategy_for(self.mode).run(&mut pass, tree, &mut report);
        report.timings.total_us = start.elapsed().as_micros() as u64;
        self.stats.scans_run += 1;
        self.stats.markers_total += report.markers_created;
        report
    }

    // -------------------------------------------------------------------------
    // Feature flag
    // -------------------------------------------------------------------------

    /// Toggle the feature. Disabling tears everything down synchronously;
    /// enabling runs one immediate scan and returns its report.
    pub fn set_enabled(&mut self, tree: &mut PageTree, enabled: bool) -> Option<ScanReport> {
        if self.feature.enabled() == enabled {
            return None;
        }
        self.feature.set(enabled);
        if enabled {
            // The teardown's own splices are stale by now
            tree.clear_journal();
            Some(self.scan(tree))
        } else {
            self.teardown(tree);
            None
        }
    }

    /// Apply a raw feature-flag payload from the host's settings channel.
    /// Anything but a clean boolean transition is a no-op.
    pub fn apply_flag_value(&mut self, tree: &mut PageTree, raw: &Value) -> Option<ScanReport> {
        match self.feature.apply_raw(raw) {
            Some(true) => {
                tree.clear_journal();
                Some(self.scan(tree))
            }
            Some(false) => {
                self.teardown(tree);
                None
            }
            None => None,
        }
    }

    fn teardown(&mut self, tree: &mut PageTree) {
        annotate::strip_all(tree);
        self.overlay.close();
        self.scheduler.cancel();
        self.processed.clear();
        self.notice = None;
        tree.clear_journal();
    }

    // -------------------------------------------------------------------------
    // Overlay lifecycle
    // -------------------------------------------------------------------------

    /// Pointer entered a marker: open (or retarget) the profile card,
    /// anchored under the marker's on-screen box
    pub fn hover(&mut self, tree: &PageTree, marker: NodeId) -> Option<ProfilePayload> {
        if !self.feature.enabled() || !classify::is_marker(tree, marker) {
            return None;
        }
        let value = tree.attr(marker, annotate::DATA_VALUE)?.to_string();
        let kind = match tree.attr(marker, annotate::DATA_KIND)? {
            "ens" => EntityKind::Ens,
            "address" => EntityKind::Address,
            _ => return None,
        };
        let rect = tree.bounds_of(marker);
        let viewport = tree.viewport();
        let (x, y) = position_card(
            rect.left,
            rect.bottom() + ANCHOR_OFFSET_Y,
            viewport.width,
            viewport.height,
        );
        let payload = ProfilePayload { value, kind, x, y };
        self.overlay.open(payload.clone());
        Some(payload)
    }

    /// Pointer went down somewhere on the page. Closes the card unless the
    /// press landed on the card itself or on a marker (which is about to
    /// retarget it). Returns whether a card was closed.
    pub fn pointer_down(
        &mut self,
        tree: &PageTree,
        target: Option<NodeId>,
        inside_overlay: bool,
    ) -> bool {
        if inside_overlay {
            return false;
        }
        if let Some(node) = target {
            if tree.closest(node, classify::is_marker).is_some() {
                return false;
            }
        }
        self.overlay.close()
    }

    /// The card surface finished loading; hand it the pending render message
    pub fn surface_loaded(&mut self) -> Option<OverlayMessage> {
        self.overlay.surface_loaded()
    }

    /// Message arriving from the card surface
    pub fn handle_surface_message(&mut self, message: &OverlayMessage) {
        self.overlay.handle_message(message);
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    // -------------------------------------------------------------------------
    // Notice banner
    // -------------------------------------------------------------------------

    pub fn show_notice(&mut self, text: &str, now_ms: f64) {
        self.notice = Some(Notice::new(text, now_ms));
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn notice_phase(&self, now_ms: f64) -> Option<NoticePhase> {
        self.notice.as_ref().map(|n| n.phase(now_ms))
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::classify::is_marker;
    use crate::scanner::crossnode::CROSS_ID_ATTR;
    use serde_json::json;

    fn scanner() -> PageScanner {
        PageScanner::new("example.org", ScannerConfig::default())
    }

    fn page_with_text(text: &str) -> (PageTree, NodeId) {
        let mut tree = PageTree::new();
        let p = tree.create_element("p");
        tree.append_child(tree.root(), p).unwrap();
        let leaf = tree.create_text(text);
        tree.append_child(p, leaf).unwrap();
        tree.clear_journal();
        (tree, p)
    }

    fn markers(tree: &PageTree) -> Vec<NodeId> {
        tree.elements()
            .into_iter()
            .filter(|&e| is_marker(tree, e))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Debounced pipeline
    // -------------------------------------------------------------------------

    #[test]
    fn test_insertion_scans_after_quiet_window() {
        let (mut tree, p) = page_with_text("hello");
        let mut scanner = scanner();
        scanner.scan(&mut tree);

        let leaf = tree.create_text(" gm alice.eth");
        tree.append_child(p, leaf).unwrap();

        // Journal delivery arms the debounce; nothing fires early
        assert!(scanner.poll(&mut tree, 1000.0).is_none());
        assert!(scanner.poll(&mut tree, 1100.0).is_none());
        let report = scanner.poll(&mut tree, 1200.0).expect("debounce due");
        assert_eq!(report.markers_created, 1);
        assert_eq!(markers(&tree).len(), 1);
    }

    #[test]
    fn test_burst_coalesces_into_one_scan() {
        let (mut tree, p) = page_with_text("start");
        let mut scanner = scanner();
        scanner.scan(&mut tree);
        let before = scanner.stats().scans_run;

        for (t, text) in [(0.0, "one alice.eth"), (100.0, "two bob.eth"), (190.0, "x")] {
            let leaf = tree.create_text(text);
            tree.append_child(p, leaf).unwrap();
            assert!(scanner.poll(&mut tree, t).is_none());
        }
        // 190 + 200 window
        assert!(scanner.poll(&mut tree, 380.0).is_none());
        let report = scanner.poll(&mut tree, 390.0).expect("single flush");
        assert_eq!(report.markers_created, 2);
        assert_eq!(scanner.stats().scans_run, before + 1);
    }

    #[test]
    fn test_scroll_rescans_previously_offscreen_content() {
        let mut tree = PageTree::new();
        let p = tree.create_element("p");
        tree.append_child(tree.root(), p).unwrap();
        tree.set_bounds(p, crate::dom::Rect::new(0.0, 3000.0, 200.0, 20.0));
        let leaf = tree.create_text("below the fold alice.eth");
        tree.append_child(p, leaf).unwrap();
        tree.clear_journal();

        let mut scanner = scanner();
        let first = scanner.scan(&mut tree);
        assert_eq!(first.markers_created, 0);
        assert_eq!(first.leaves_skipped_offscreen, 1);

        tree.set_bounds(p, crate::dom::Rect::new(0.0, 100.0, 200.0, 20.0));
        scanner.handle_event(&mut tree, &PageEvent::Scrolled, 500.0);
        let report = scanner.poll(&mut tree, 700.0).expect("debounce due");
        assert_eq!(report.markers_created, 1);
    }

    // -------------------------------------------------------------------------
    // Feature flag
    // -------------------------------------------------------------------------

    #[test]
    fn test_disable_strips_everything_synchronously() {
        let (mut tree, p) = page_with_text("hi alice.eth and 0x52908400098527886E0F7030069857D2E4169EE7");
        let mut scanner = scanner();
        scanner.scan(&mut tree);
        assert_eq!(markers(&tree).len(), 2);

        scanner.set_enabled(&mut tree, false);
        assert!(markers(&tree).is_empty());
        assert_eq!(
            tree.text_content(p),
            "hi alice.eth and 0x52908400098527886E0F7030069857D2E4169EE7"
        );
        assert!(!scanner.overlay().is_open());

        // Further events are inert while disabled
        let leaf = tree.create_text("more bob.eth");
        tree.append_child(p, leaf).unwrap();
        assert!(scanner.poll(&mut tree, 0.0).is_none());
        assert!(scanner.poll(&mut tree, 10_000.0).is_none());
        assert!(markers(&tree).is_empty());
    }

    #[test]
    fn test_disable_clears_cross_node_attrs() {
        let mut tree = PageTree::new();
        let a = tree.create_element("span");
        tree.append_child(tree.root(), a).unwrap();
        let head = tree.create_text("alice.");
        tree.append_child(a, head).unwrap();
        let b = tree.create_element("span");
        tree.append_child(tree.root(), b).unwrap();
        let tail = tree.create_text("eth");
        tree.append_child(b, tail).unwrap();
        tree.clear_journal();

        let mut scanner = scanner();
        let report = scanner.scan(&mut tree);
        assert_eq!(report.cross_node_hits.len(), 1);
        assert!(tree.attr(a, CROSS_ID_ATTR).is_some());

        scanner.set_enabled(&mut tree, false);
        assert!(tree.attr(a, CROSS_ID_ATTR).is_none());
        assert!(tree.attr(b, CROSS_ID_ATTR).is_none());
    }

    #[test]
    fn test_reenable_rescans_immediately() {
        let (mut tree, _) = page_with_text("gm alice.eth");
        let mut scanner = scanner();
        scanner.scan(&mut tree);
        scanner.set_enabled(&mut tree, false);
        assert!(markers(&tree).is_empty());

        let report = scanner.set_enabled(&mut tree, true).expect("immediate scan");
        assert_eq!(report.markers_created, 1);
        assert_eq!(markers(&tree).len(), 1);
    }

    #[test]
    fn test_flag_channel_ignores_malformed_payloads() {
        let (mut tree, _) = page_with_text("gm alice.eth");
        let mut scanner = scanner();
        scanner.scan(&mut tree);

        // Same-state and non-boolean payloads change nothing
        assert!(scanner.apply_flag_value(&mut tree, &json!(true)).is_none());
        assert!(scanner.apply_flag_value(&mut tree, &json!("off")).is_none());
        assert!(scanner.apply_flag_value(&mut tree, &json!(null)).is_none());
        assert_eq!(markers(&tree).len(), 1);

        assert!(scanner.apply_flag_value(&mut tree, &json!(false)).is_none());
        assert!(markers(&tree).is_empty());
        let report = scanner
            .apply_flag_value(&mut tree, &json!(true))
            .expect("clean transition rescans");
        assert_eq!(report.markers_created, 1);
    }

    // -------------------------------------------------------------------------
    // Overlay
    // -------------------------------------------------------------------------

    #[test]
    fn test_hover_opens_card_with_positioned_payload() {
        let (mut tree, _) = page_with_text("gm alice.eth");
        let mut scanner = scanner();
        scanner.scan(&mut tree);
        let marker = markers(&tree)[0];
        tree.set_bounds(marker, crate::dom::Rect::new(50.0, 120.0, 80.0, 16.0));

        let payload = scanner.hover(&tree, marker).expect("card opens");
        assert_eq!(payload.value, "alice.eth");
        assert_eq!(payload.kind, EntityKind::Ens);
        assert_eq!(payload.x, 50.0);
        assert_eq!(payload.y, 120.0 + 16.0 + ANCHOR_OFFSET_Y);
        assert!(scanner.overlay().is_open());
    }

    #[test]
    fn test_hover_on_non_marker_does_nothing() {
        let (tree_src, p) = page_with_text("plain");
        let mut scanner = scanner();
        assert!(scanner.hover(&tree_src, p).is_none());
        assert!(!scanner.overlay().is_open());
    }

    #[test]
    fn test_pointer_down_dismissal_rules() {
        let (mut tree, _) = page_with_text("gm alice.eth");
        let mut scanner = scanner();
        scanner.scan(&mut tree);
        let marker = markers(&tree)[0];
        scanner.hover(&tree, marker).unwrap();

        // Inside the card, or on the marker itself: stays open
        assert!(!scanner.pointer_down(&tree, None, true));
        assert!(!scanner.pointer_down(&tree, Some(marker), false));
        assert!(scanner.overlay().is_open());

        // Anywhere else: closed
        assert!(scanner.pointer_down(&tree, Some(tree.root()), false));
        assert!(!scanner.overlay().is_open());
    }

    #[test]
    fn test_disable_while_card_open_closes_it() {
        let (mut tree, _) = page_with_text("gm alice.eth");
        let mut scanner = scanner();
        scanner.scan(&mut tree);
        let marker = markers(&tree)[0];
        scanner.hover(&tree, marker).unwrap();
        assert!(scanner.overlay().is_open());

        scanner.set_enabled(&mut tree, false);
        assert!(!scanner.overlay().is_open());
        // Hovering a (now stripped) marker id while disabled is inert
        assert!(scanner.hover(&tree, marker).is_none());
    }

    // -------------------------------------------------------------------------
    // Notice banner
    // -------------------------------------------------------------------------

    #[test]
    fn test_notice_expires_through_poll() {
        let (mut tree, _) = page_with_text("plain");
        let mut scanner = scanner();
        scanner.show_notice("site disabled", 0.0);
        assert_eq!(scanner.notice_phase(100.0), Some(NoticePhase::Visible));
        assert_eq!(scanner.notice_phase(2100.0), Some(NoticePhase::Fading));

        scanner.poll(&mut tree, 2100.0);
        assert!(scanner.notice().is_some());
        scanner.poll(&mut tree, 2400.0);
        assert!(scanner.notice().is_none());
    }

    // -------------------------------------------------------------------------
    // Mode resolution
    // -------------------------------------------------------------------------

    #[test]
    fn test_allowlisted_host_gets_aggressive_mode() {
        let scanner = PageScanner::new("web.telegram.org", ScannerConfig::default());
        assert_eq!(scanner.mode(), ScanMode::Aggressive);
        let scanner = PageScanner::new("example.org", ScannerConfig::default());
        assert_eq!(scanner.mode(), ScanMode::Conservative);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ScannerConfig = serde_json::from_str("{}").unwrap();
        assert!(config.legacy_suffixes);
        assert_eq!(config.debounce_ms, DEBOUNCE_MS);
        assert!(config.aggressive_hosts.contains(&"x.com".to_string()));

        let config: ScannerConfig =
            serde_json::from_str(r#"{"legacy_suffixes": false, "debounce_ms": 50}"#).unwrap();
        assert!(!config.legacy_suffixes);
        assert_eq!(config.debounce_ms, 50.0);
    }
}
