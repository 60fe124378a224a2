//! PageAnnotator: WASM facade over the scanning pipeline
//!
//! One JS object per page load. The content script mirrors the host DOM
//! into the arena through node specs, forwards page events, and pumps
//! `poll()` from its timer loop; everything else happens on this side of
//! the boundary in a single call per interaction.

use wasm_bindgen::prelude::*;

use crate::dom::{NodeId, NodeSpec, PageTree, Rect};
use crate::scanner::classify;
use crate::scanner::core::{PageScanner, ScannerConfig};
use crate::scanner::overlay::OverlayMessage;
use crate::scanner::schedule::PageEvent;
use serde::Serialize;

fn now_ms() -> f64 {
    js_sys::Date::now()
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    match serde_wasm_bindgen::to_value(value) {
        Ok(v) => v,
        Err(e) => {
            web_sys::console::error_1(
                &format!("[PageAnnotator] Serialization failed: {:?}", e).into(),
            );
            JsValue::NULL
        }
    }
}

/// One annotated marker, as reported to JS
#[derive(Debug, Clone, Serialize)]
pub struct MarkerInfo {
    pub id: NodeId,
    pub value: String,
    pub kind: String,
}

#[wasm_bindgen]
pub struct PageAnnotator {
    tree: PageTree,
    scanner: PageScanner,
}

#[wasm_bindgen]
impl PageAnnotator {
    /// `config` is an optional plain object matching `ScannerConfig`;
    /// missing fields take their defaults
    #[wasm_bindgen(constructor)]
    pub fn new(hostname: &str, config: JsValue) -> Self {
        let config: ScannerConfig = if config.is_undefined() || config.is_null() {
            ScannerConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config).unwrap_or_default()
        };
        Self {
            tree: PageTree::new(),
            scanner: PageScanner::new(hostname, config),
        }
    }

    // -------------------------------------------------------------------------
    // Tree mirroring
    // -------------------------------------------------------------------------

    /// Build a subtree from a node spec under `parent` (or the root when
    /// `parent` is null). Returns the new subtree's node id. Insertions
    /// land in the mutation journal and are picked up by the next `poll`.
    #[wasm_bindgen(js_name = appendNode)]
    pub fn js_append_node(&mut self, parent: JsValue, spec: JsValue) -> Result<JsValue, JsValue> {
        let parent: NodeId = if parent.is_undefined() || parent.is_null() {
            self.tree.root()
        } else {
            serde_wasm_bindgen::from_value(parent)
                .map_err(|e| JsValue::from_str(&format!("Bad node id: {:?}", e)))?
        };
        let spec: NodeSpec = serde_wasm_bindgen::from_value(spec)
            .map_err(|e| JsValue::from_str(&format!("Bad node spec: {:?}", e)))?;
        let id = self
            .tree
            .build_spec(parent, &spec)
            .map_err(|e| JsValue::from_str(&e))?;
        Ok(to_js(&id))
    }

    #[wasm_bindgen(js_name = removeNode)]
    pub fn js_remove_node(&mut self, id: JsValue) -> Result<(), JsValue> {
        let id: NodeId = serde_wasm_bindgen::from_value(id)
            .map_err(|e| JsValue::from_str(&format!("Bad node id: {:?}", e)))?;
        self.tree.remove(id);
        Ok(())
    }

    /// Mirror a layout rect from the host's getBoundingClientRect
    #[wasm_bindgen(js_name = setBounds)]
    pub fn js_set_bounds(
        &mut self,
        id: JsValue,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    ) -> Result<(), JsValue> {
        let id: NodeId = serde_wasm_bindgen::from_value(id)
            .map_err(|e| JsValue::from_str(&format!("Bad node id: {:?}", e)))?;
        self.tree.set_bounds(id, Rect::new(left, top, width, height));
        Ok(())
    }

    #[wasm_bindgen(js_name = setViewport)]
    pub fn js_set_viewport(&mut self, width: f64, height: f64) {
        self.tree.set_viewport(width, height);
    }

    #[wasm_bindgen(js_name = textContent)]
    pub fn js_text_content(&self) -> String {
        self.tree.text_content(self.tree.root())
    }

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn js_node_count(&self) -> usize {
        self.tree.node_count()
    }

    // -------------------------------------------------------------------------
    // Events and scheduling
    // -------------------------------------------------------------------------

    #[wasm_bindgen(js_name = scrolled)]
    pub fn js_scrolled(&mut self) {
        self.scanner
            .handle_event(&mut self.tree, &PageEvent::Scrolled, now_ms());
    }

    #[wasm_bindgen(js_name = resized)]
    pub fn js_resized(&mut self) {
        self.scanner
            .handle_event(&mut self.tree, &PageEvent::Resized, now_ms());
    }

    /// Pump from the host's timer loop. Returns the scan report when a
    /// debounced scan fired, null otherwise.
    #[wasm_bindgen(js_name = poll)]
    pub fn js_poll(&mut self) -> JsValue {
        match self.scanner.poll(&mut self.tree, now_ms()) {
            Some(report) => to_js(&report),
            None => JsValue::NULL,
        }
    }

    /// Immediate scan, bypassing the debounce
    #[wasm_bindgen(js_name = scanNow)]
    pub fn js_scan_now(&mut self) -> JsValue {
        to_js(&self.scanner.scan(&mut self.tree))
    }

    // -------------------------------------------------------------------------
    // Feature flag
    // -------------------------------------------------------------------------

    #[wasm_bindgen(js_name = isEnabled)]
    pub fn js_is_enabled(&self) -> bool {
        self.scanner.is_enabled()
    }

    #[wasm_bindgen(js_name = setEnabled)]
    pub fn js_set_enabled(&mut self, enabled: bool) -> JsValue {
        match self.scanner.set_enabled(&mut self.tree, enabled) {
            Some(report) => to_js(&report),
            None => JsValue::NULL,
        }
    }

    /// Raw settings-channel payload; anything but a clean boolean
    /// transition is ignored
    #[wasm_bindgen(js_name = applyFlagValue)]
    pub fn js_apply_flag_value(&mut self, raw: JsValue) -> JsValue {
        let raw: serde_json::Value = match serde_wasm_bindgen::from_value(raw) {
            Ok(v) => v,
            Err(_) => serde_json::Value::Null,
        };
        match self.scanner.apply_flag_value(&mut self.tree, &raw) {
            Some(report) => to_js(&report),
            None => JsValue::NULL,
        }
    }

    // -------------------------------------------------------------------------
    // Markers and overlay
    // -------------------------------------------------------------------------

    /// Every marker currently in the tree, document order
    #[wasm_bindgen(js_name = markers)]
    pub fn js_markers(&self) -> JsValue {
        let markers: Vec<MarkerInfo> = self
            .tree
            .elements()
            .into_iter()
            .filter(|&e| classify::is_marker(&self.tree, e))
            .map(|id| MarkerInfo {
                id,
                value: self
                    .tree
                    .attr(id, crate::scanner::annotate::DATA_VALUE)
                    .unwrap_or_default()
                    .to_string(),
                kind: self
                    .tree
                    .attr(id, crate::scanner::annotate::DATA_KIND)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();
        to_js(&markers)
    }

    /// Pointer entered a marker. Returns the positioned card payload, or
    /// null when no card opens.
    #[wasm_bindgen(js_name = hover)]
    pub fn js_hover(&mut self, id: JsValue) -> JsValue {
        let id: NodeId = match serde_wasm_bindgen::from_value(id) {
            Ok(id) => id,
            Err(_) => return JsValue::NULL,
        };
        match self.scanner.hover(&self.tree, id) {
            Some(payload) => to_js(&payload),
            None => JsValue::NULL,
        }
    }

    /// Pointer down anywhere on the page. Returns true when the card was
    /// closed by this press.
    #[wasm_bindgen(js_name = pointerDown)]
    pub fn js_pointer_down(&mut self, target: JsValue, inside_overlay: bool) -> bool {
        let target: Option<NodeId> = if target.is_undefined() || target.is_null() {
            None
        } else {
            serde_wasm_bindgen::from_value(target).ok()
        };
        self.scanner.pointer_down(&self.tree, target, inside_overlay)
    }

    /// The card's embedded surface finished loading. Returns the one-shot
    /// render message to post to it, or null.
    #[wasm_bindgen(js_name = surfaceLoaded)]
    pub fn js_surface_loaded(&mut self) -> JsValue {
        match self.scanner.surface_loaded() {
            Some(message) => to_js(&message),
            None => JsValue::NULL,
        }
    }

    /// Inbound postMessage from the card surface
    #[wasm_bindgen(js_name = surfaceMessage)]
    pub fn js_surface_message(&mut self, message: JsValue) {
        if let Ok(message) = serde_wasm_bindgen::from_value::<OverlayMessage>(message) {
            self.scanner.handle_surface_message(&message);
        }
    }

    #[wasm_bindgen(js_name = isCardOpen)]
    pub fn js_is_card_open(&self) -> bool {
        self.scanner.overlay().is_open()
    }

    // -------------------------------------------------------------------------
    // Notice and introspection
    // -------------------------------------------------------------------------

    #[wasm_bindgen(js_name = showNotice)]
    pub fn js_show_notice(&mut self, text: &str) {
        self.scanner.show_notice(text, now_ms());
    }

    #[wasm_bindgen(js_name = noticeText)]
    pub fn js_notice_text(&self) -> Option<String> {
        self.scanner.notice().map(|n| n.text.clone())
    }

    #[wasm_bindgen(js_name = mode)]
    pub fn js_mode(&self) -> String {
        self.scanner.mode().as_str().to_string()
    }

    #[wasm_bindgen(js_name = stats)]
    pub fn js_stats(&self) -> JsValue {
        to_js(self.scanner.stats())
    }
}
