//! Overlay: profile card placement + surface lifecycle + notice banner
//!
//! The positioner is a pure function of its inputs. The controller keeps
//! the at-most-one-open invariant and releases the RENDER_PROFILE message
//! exactly once, after the embedded surface reports it finished loading.
//! The notice banner is the transient "disabled on this site" toast: shown,
//! held, faded, self-removed.

use crate::scanner::patterns::EntityKind;
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

pub const CARD_WIDTH: f64 = 420.0;
pub const CARD_HEIGHT: f64 = 500.0;
pub const CARD_MARGIN: f64 = 12.0;
/// Extra gap when the card flips above the anchor
pub const FLIP_GAP: f64 = 18.0;
/// Vertical offset between a marker's bottom edge and the card anchor
pub const ANCHOR_OFFSET_Y: f64 = 6.0;

pub const NOTICE_VISIBLE_MS: f64 = 2000.0;
pub const NOTICE_FADE_MS: f64 = 300.0;

// =============================================================================
// Positioner
// =============================================================================

/// Viewport-safe placement for the default card size
pub fn position_card(anchor_x: f64, anchor_y: f64, viewport_w: f64, viewport_h: f64) -> (f64, f64) {
    position_card_sized(
        anchor_x,
        anchor_y,
        viewport_w,
        viewport_h,
        CARD_WIDTH,
        CARD_HEIGHT,
        CARD_MARGIN,
    )
}

/// Clamp horizontally inside `[margin, vw - width - margin]`; prefer below
/// the anchor, flip above (`anchor_y - height - FLIP_GAP`) when the bottom
/// band would overflow, then clamp the low side to `margin`.
pub fn position_card_sized(
    anchor_x: f64,
    anchor_y: f64,
    viewport_w: f64,
    viewport_h: f64,
    width: f64,
    height: f64,
    margin: f64,
) -> (f64, f64) {
    let mut x = anchor_x;
    if x + width > viewport_w - margin {
        x = viewport_w - width - margin;
    }
    if x < margin {
        x = margin;
    }

    let mut y = anchor_y;
    if y + height > viewport_h - margin {
        y = anchor_y - height - FLIP_GAP;
    }
    if y < margin {
        y = margin;
    }

    (x, y)
}

// =============================================================================
// Surface messages
// =============================================================================

/// Payload handed to the profile card surface on marker activation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePayload {
    pub value: String,
    pub kind: EntityKind,
    pub x: f64,
    pub y: f64,
}

/// Message exchanged with the embedded card surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum OverlayMessage {
    #[serde(rename = "RENDER_PROFILE")]
    RenderProfile(ProfilePayload),
    #[serde(rename = "CLOSE_POPUP")]
    Close,
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug)]
struct OverlaySurface {
    payload: ProfilePayload,
    delivered: bool,
}

/// At-most-one-open overlay surface
#[derive(Debug, Default)]
pub struct OverlayController {
    current: Option<OverlaySurface>,
}

impl OverlayController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a surface for `payload`, tearing down any prior one first.
    /// Returns true when a prior surface was closed.
    pub fn open(&mut self, payload: ProfilePayload) -> bool {
        let replaced = self.current.is_some();
        self.current = Some(OverlaySurface {
            payload,
            delivered: false,
        });
        replaced
    }

    /// The surface finished loading: release the one-shot render message
    pub fn surface_loaded(&mut self) -> Option<OverlayMessage> {
        let surface = self.current.as_mut()?;
        if surface.delivered {
            return None;
        }
        surface.delivered = true;
        Some(OverlayMessage::RenderProfile(surface.payload.clone()))
    }

    /// Inbound message from the surface
    pub fn handle_message(&mut self, message: &OverlayMessage) {
        if matches!(message, OverlayMessage::Close) {
            self.close();
        }
    }

    /// Returns true when a surface was actually open
    pub fn close(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_payload(&self) -> Option<&ProfilePayload> {
        self.current.as_ref().map(|surface| &surface.payload)
    }
}

// =============================================================================
// Notice banner
// =============================================================================

/// Lifecycle phase of a notice banner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticePhase {
    Visible,
    Fading,
    Expired,
}

/// Transient, non-interactive blocked-site notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub text: String,
    shown_at_ms: f64,
}

impl Notice {
    pub fn new(text: &str, now_ms: f64) -> Self {
        Self {
            text: text.to_string(),
            shown_at_ms: now_ms,
        }
    }

    pub fn phase(&self, now_ms: f64) -> NoticePhase {
        let age = now_ms - self.shown_at_ms;
        if age < NOTICE_VISIBLE_MS {
            NoticePhase::Visible
        } else if age < NOTICE_VISIBLE_MS + NOTICE_FADE_MS {
            NoticePhase::Fading
        } else {
            NoticePhase::Expired
        }
    }
}

// ==================== TESTS ====================
