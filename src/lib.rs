//! EfpCore: Page Entity Scanner + Profile Overlay
//!
//! A Rust/WASM implementation of the naming-entity annotation pipeline for
//! content scripts: detects name-service names (`alice.eth`, `bob.box` and
//! the legacy `.xyz` form) and hex account addresses in a live, mutating
//! page tree, wraps them in interactive markers, and drives a profile-card
//! overlay from them.
//!
//! # Architecture
//!
//! ## Tree mirror (`dom/`)
//! - `tree.rs` - PageTree: arena-backed content tree with generational node
//!   ids, layout rects, and a mutation journal for insertion batching
//!
//! ## Scanner Components (`scanner/`)
//! - `patterns.rs` - PatternMatcher: unified name/address regex with an
//!   Aho-Corasick prefilter
//! - `classify.rs` - scan eligibility (script-like containers, inert
//!   metadata, marker exclusion)
//! - `processed.rs` - ProcessedSet: identity-keyed rescan suppression
//! - `viewport.rs` - viewport proximity filter
//! - `schedule.rs` - ScanScheduler: trailing-edge debounce over page events
//! - `engine.rs` - DualModeScanner: conservative and aggressive strategies
//! - `crossnode.rs` - CrossNodeMatcher: split-name detection across
//!   adjacent leaves
//! - `annotate.rs` - MarkerRenderer: marker splicing and full-page stripping
//! - `overlay.rs` - profile-card positioning, controller, notice banner
//! - `state.rs` - feature-flag state from raw settings payloads
//! - `core.rs` - PageScanner: the orchestrator owning the whole pipeline
//! - `wasm.rs` - PageAnnotator: the JS-facing facade
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { PageAnnotator } from 'efpcore';
//!
//! await init();
//!
//! const annotator = new PageAnnotator(location.hostname, null);
//! annotator.appendNode(null, { tag: 'p', children: [{ text: 'gm alice.eth' }] });
//! annotator.setViewport(innerWidth, innerHeight);
//!
//! // Pump from a timer; a report comes back when a debounced scan fired
//! setInterval(() => {
//!   const report = annotator.poll();
//!   if (report) console.log(report.markers_created, report.timings);
//! }, 50);
//! ```

pub mod dom;
pub mod scanner;

// Public exports - tree mirror
pub use dom::*;

// Public exports - scanner pipeline
pub use scanner::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
