//! ViewportFilter - bound scan cost to the visible band
//!
//! A leaf whose container's rect falls outside `[-margin, height + margin]`
//! is skipped for the current round only. Scrolling changes what is visible,
//! not what is matchable, so filtered leaves are never marked processed.

use crate::dom::Rect;

/// True when the rect vertically intersects the viewport band
pub fn is_near_viewport(rect: &Rect, viewport_height: f64, margin: f64) -> bool {
    rect.bottom() >= -margin && rect.top <= viewport_height + margin
}

// ==================== TESTS ====================
